//! Version range constraints between packages.

use serde::{Serialize, Deserialize};

use super::version::Version;

/// A requirement on another package, e.g. `org.example.Lib [1.0, 2.0)`.
///
/// `min` must not be greater than `max`; constructing an inverted range is a caller bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
	pub package: String,
	pub min: Version,
	pub max: Version,
	pub min_included: bool,
	pub max_included: bool,
}

impl Dependency {
	pub fn new(package: String, min: Version, max: Version, min_included: bool, max_included: bool) -> Self {
		Self { package, min, max, min_included, max_included }
	}

	/// Tests whether `version` lies within the range honoring inclusivity.
	pub fn test(&self, version: &Version) -> bool {
		let lower = if self.min_included { *version >= self.min } else { *version > self.min };
		let upper = if self.max_included { *version <= self.max } else { *version < self.max };
		lower && upper
	}
}

impl std::fmt::Display for Dependency {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {}{}, {}{}",
			self.package,
			if self.min_included { '[' } else { '(' },
			self.min,
			self.max,
			if self.max_included { ']' } else { ')' },
		)
	}
}

impl std::str::FromStr for Dependency {
	type Err = crate::Error;

	/// Parses the interval form produced by `Display`, e.g. `org.example.Lib [1.0, 2.0)`.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let err = || crate::Error::Parse(format!("`{}` is not a dependency range", s));

		let (package, interval) = s.trim().split_once(char::is_whitespace).ok_or_else(err)?;
		let interval = interval.trim();

		let mut chars = interval.chars();
		let min_included = match chars.next().ok_or_else(err)? {
			'[' => true,
			'(' => false,
			_ => return Err(err()),
		};
		let max_included = match chars.next_back().ok_or_else(err)? {
			']' => true,
			')' => false,
			_ => return Err(err()),
		};

		let inner = &interval[1..interval.len() - 1];
		let (min, max) = inner.split_once(',').ok_or_else(err)?;
		let min = Version::new(min.trim())?;
		let max = Version::new(max.trim())?;
		if min > max {
			return Err(crate::Error::Parse(format!("`{}` has an inverted range", s)));
		}

		Ok(Dependency::new(package.to_string(), min, max, min_included, max_included))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn dep(s: &str) -> Dependency { s.parse().unwrap() }
	fn v(s: &str) -> Version { Version::new(s).unwrap() }

	#[test] fn dependency_inside_range() { assert!(dep("a.B [1.0, 2.0)").test(&v("1.5"))) }
	#[test] fn dependency_excluded_max() { assert!(!dep("a.B [1.0, 2.0)").test(&v("2.0"))) }
	#[test] fn dependency_included_min() { assert!(dep("a.B [1.0, 2.0)").test(&v("1.0"))) }
	#[test] fn dependency_included_max() { assert!(dep("a.B [1.0, 2.0]").test(&v("2.0"))) }
	#[test] fn dependency_excluded_min() { assert!(!dep("a.B (1.0, 2.0)").test(&v("1.0"))) }
	#[test] fn dependency_below_range() { assert!(!dep("a.B [1.0, 2.0)").test(&v("0.9"))) }
	#[test] fn dependency_point_range() { assert!(dep("a.B [1.3, 1.3]").test(&v("1.3"))) }
	#[test] fn dependency_display_round_trips() { assert_eq!(dep("a.B [1.0, 2.0)").to_string(), "a.B [1.0, 2.0)") }
	#[test] fn dependency_rejects_inverted_range() { assert!("a.B [2.0, 1.0)".parse::<Dependency>().is_err()) }
	#[test] fn dependency_rejects_garbage() { assert!("a.B".parse::<Dependency>().is_err()) }
}
