//! Choosing installation directories.

use std::path::{Path, PathBuf};

use crate::catalog::PackageVersion;
use crate::config::DepotConfig;

/// Last segment of a hierarchical package name, `B` for `a.B`.
pub fn short_name(package: &str) -> &str {
	package.rsplit('.').next().unwrap_or(package)
}

/// The directory this package would normally install to,
/// e.g. `<install_dir>/NotepadPlusPlus`. May already exist.
pub fn ideal_installation_directory(config: &DepotConfig, pv: &PackageVersion) -> PathBuf {
	config.install_dir().join(short_name(&pv.package))
}

/// Version qualified fallback location,
/// e.g. `<install_dir>/NotepadPlusPlus-8.4`. May already exist.
pub fn secondary_installation_directory(config: &DepotConfig, pv: &PackageVersion) -> PathBuf {
	config.install_dir().join(format!("{}-{}", short_name(&pv.package), pv.version.normalized()))
}

/// Returns `path` itself when free, otherwise the first free
/// `<path>_2`, `<path>_3`, ... variant.
pub fn find_non_existing(path: &Path) -> PathBuf {
	if !path.exists() {
		return path.to_path_buf();
	}

	let name = path.file_name()
		.map(|n| n.to_string_lossy().to_string())
		.unwrap_or_else(|| "package".to_string());

	let mut i = 2u32;
	loop {
		let candidate = path.with_file_name(format!("{}_{}", name, i));
		if !candidate.exists() {
			return candidate;
		}
		i += 1;
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn short_name_takes_the_last_segment() {
		assert_eq!(short_name("org.example.NotepadPlusPlus"), "NotepadPlusPlus");
		assert_eq!(short_name("flat"), "flat");
	}

	#[test]
	fn find_non_existing_returns_free_path_unchanged() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("B");
		assert_eq!(find_non_existing(&path), path);
	}

	#[test]
	fn find_non_existing_skips_occupied_variants() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("B");
		std::fs::create_dir(&path).unwrap();
		std::fs::create_dir(dir.path().join("B_2")).unwrap();
		assert_eq!(find_non_existing(&path), dir.path().join("B_3"));
	}
}
