//! Planned units of work.

use serde::{Serialize, Deserialize};

use crate::catalog::{Version, package};

/// One planned install or uninstall. The ordered operation list is the
/// hand-off artifact between the planner and the executor and is
/// serializable for inspection or replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallOperation {
	pub package: String,
	pub version: Version,
	/// true = install, false = uninstall.
	pub install: bool,
	/// Requested installation directory; `None` lets the executor choose.
	#[serde(default)]
	pub target: Option<std::path::PathBuf>,
}

impl InstallOperation {
	pub fn install(package: String, version: Version, target: Option<std::path::PathBuf>) -> Self {
		Self { package, version, install: true, target }
	}

	pub fn uninstall(package: String, version: Version) -> Self {
		Self { package, version, install: false, target: None }
	}

	pub fn string_id(&self) -> String {
		package::string_id(&self.package, &self.version)
	}
}

impl std::fmt::Display for InstallOperation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {} {}",
			if self.install { "install" } else { "uninstall" },
			self.package,
			self.version,
		)
	}
}

/// Removes redundant operations from a finalized plan:
/// exact duplicates, and pairs that install and later uninstall the
/// same package version (the pair cancels out). Uninstall followed by
/// install of the same version is a deliberate refresh and is kept.
pub fn simplify(ops: &mut Vec<InstallOperation>) {
	/* duplicates of the same (package, version, install) keep the first occurrence */
	let mut seen = std::collections::HashSet::<(String, bool)>::new();
	ops.retain(|op| seen.insert((op.string_id(), op.install)));

	loop {
		let mut remove: Option<(usize, usize)> = None;

		'outer: for i in 0..ops.len() {
			if !ops[i].install {
				continue;
			}
			for j in i + 1..ops.len() {
				if !ops[j].install && ops[j].string_id() == ops[i].string_id() {
					remove = Some((i, j));
					break 'outer;
				}
			}
		}

		match remove {
			Some((i, j)) => {
				log::debug!("Simplifying away {} and {}", ops[i], ops[j]);
				ops.remove(j);
				ops.remove(i);
			}
			None => break,
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn op(p: &str, v: &str, install: bool) -> InstallOperation {
		let version = Version::new(v).unwrap();
		if install {
			InstallOperation::install(p.to_string(), version, None)
		} else {
			InstallOperation::uninstall(p.to_string(), version)
		}
	}

	#[test]
	fn duplicates_are_removed() {
		let mut ops = vec![op("a.B", "1.0", true), op("a.C", "1.0", true), op("a.B", "1.0", true)];
		simplify(&mut ops);
		assert_eq!(ops, vec![op("a.B", "1.0", true), op("a.C", "1.0", true)]);
	}

	#[test]
	fn install_then_uninstall_cancels_out() {
		let mut ops = vec![op("a.B", "1.0", true), op("a.C", "1.0", true), op("a.B", "1.0", false)];
		simplify(&mut ops);
		assert_eq!(ops, vec![op("a.C", "1.0", true)]);
	}

	#[test]
	fn uninstall_then_install_is_kept() {
		let mut ops = vec![op("a.B", "1.0", false), op("a.B", "1.0", true)];
		simplify(&mut ops);
		assert_eq!(ops.len(), 2);
	}

	#[test]
	fn different_versions_do_not_cancel() {
		let mut ops = vec![op("a.B", "2.0", true), op("a.B", "1.0", false)];
		simplify(&mut ops);
		assert_eq!(ops.len(), 2);
	}

	#[test]
	fn padded_versions_share_an_identity() {
		let mut ops = vec![op("a.B", "1.0", true), op("a.B", "1.0.0", false)];
		simplify(&mut ops);
		assert!(ops.is_empty());
	}
}
