//! Package version numbers.

use serde::{Serialize, Deserialize};

/// A version number such as `1.20.3` or `2.0b`.
///
/// Components are compared numerically with the alphabetic suffix as a
/// tie break; a missing trailing component compares as zero, so
/// `1.2 == 1.2.0` and `1.2 < 1.2.1`.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
	parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Part {
	number: u32,
	suffix: String,
}

impl Part {
	fn zero() -> Part {
		Part { number: 0, suffix: String::new() }
	}

	fn is_zero(&self) -> bool {
		self.number == 0 && self.suffix.is_empty()
	}

	fn parse(s: &str) -> crate::Result<Part> {
		let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
		if digits_end == 0 {
			return Err(crate::Error::Parse(format!("version component `{}` does not start with a digit", s)));
		}
		let number = s[..digits_end].parse::<u32>()
			.map_err(|e| crate::Error::Parse(format!("version component `{}`: {}", s, e)))?;
		let suffix = &s[digits_end..];
		if !suffix.chars().all(|c| c.is_ascii_alphabetic()) {
			return Err(crate::Error::Parse(format!("version component `{}` has a non alphabetic suffix", s)));
		}
		Ok(Part { number, suffix: suffix.to_string() })
	}
}

impl std::fmt::Display for Part {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}{}", self.number, self.suffix)
	}
}

impl Version {
	pub fn new(version: &str) -> crate::Result<Self> {
		if version.trim().is_empty() {
			return Err(crate::Error::Parse("version string is empty".to_string()));
		}
		let parts = version.split('.').map(Part::parse).collect::<crate::Result<Vec<_>>>()?;
		Ok(Version { parts })
	}

	/// The same version with trailing zero components removed, at least one component remains.
	///
	/// String ids are built from normalized versions so `1.2` and `1.2.0` produce the same id.
	pub fn normalized(&self) -> Version {
		let mut parts = self.parts.clone();
		while parts.len() > 1 && parts.last().map(Part::is_zero).unwrap_or(false) {
			parts.pop();
		}
		Version { parts }
	}

	pub fn num_parts(&self) -> usize {
		self.parts.len()
	}
}

impl std::str::FromStr for Version {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> { Self::new(s) }
}

impl TryFrom<String> for Version {
	type Error = crate::Error;
	fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(&value) }
}

impl From<Version> for String {
	fn from(value: Version) -> String { value.to_string() }
}

impl std::fmt::Display for Version {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		for (i, part) in self.parts.iter().enumerate() {
			if i != 0 {
				write!(f, ".")?;
			}
			write!(f, "{}", part)?;
		}
		Ok(())
	}
}

impl Ord for Version {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		let n = self.parts.len().max(other.parts.len());
		let zero = Part::zero();
		for i in 0..n {
			let a = self.parts.get(i).unwrap_or(&zero);
			let b = other.parts.get(i).unwrap_or(&zero);
			match a.cmp(b) {
				std::cmp::Ordering::Equal => {},
				ord => return ord,
			}
		}
		std::cmp::Ordering::Equal
	}
}

impl PartialOrd for Version {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for Version {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == std::cmp::Ordering::Equal
	}
}

impl std::hash::Hash for Version {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		/* Hash must agree with Eq so trailing zeros are ignored */
		for part in &self.normalized().parts {
			part.hash(state);
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn v(s: &str) -> Version { Version::new(s).unwrap() }

	#[test] fn version_not_compared_lexically() { assert!(v("1.2.4") < v("1.2.10")) }
	#[test] fn version_shorter_prefix_is_lt() { assert!(v("1.2") < v("1.2.1")) }
	#[test] fn version_trailing_zeros_are_eq() { assert_eq!(v("1.2"), v("1.2.0")) }
	#[test] fn version_identical_are_eq() { assert_eq!(v("1.2.3"), v("1.2.3")) }
	#[test] fn version_higher_is_gt() { assert!(v("1.2.4") > v("1.2.3")) }
	#[test] fn version_suffix_breaks_ties() { assert!(v("1.2") < v("1.2a") && v("1.2a") < v("1.2b")) }
	#[test] fn version_leading_component_dominates() { assert!(v("2.0") > v("1.999.999")) }
	#[test] fn version_rejects_empty() { assert!(Version::new("").is_err()) }
	#[test] fn version_rejects_non_numeric() { assert!(Version::new("a.b").is_err()) }
	#[test] fn version_normalized_strips_zeros() { assert_eq!(v("1.2.0.0").normalized().to_string(), "1.2") }
	#[test] fn version_normalized_keeps_one_part() { assert_eq!(v("0.0").normalized().to_string(), "0") }
	#[test] fn version_display_round_trips() { assert_eq!(v("1.20.3b").to_string(), "1.20.3b") }

	#[test]
	fn version_order_is_total_and_transitive() {
		let versions = ["0.1", "1.0", "1.0.1", "1.2", "1.2a", "1.10", "2.0", "10.0"].map(v);
		for a in &versions {
			for b in &versions {
				/* exactly one of <, ==, > holds */
				let relations = [a < b, a == b, a > b];
				assert_eq!(relations.iter().filter(|r| **r).count(), 1);
				for c in &versions {
					if a < b && b < c {
						assert!(a < c);
					}
				}
			}
		}
	}
}
