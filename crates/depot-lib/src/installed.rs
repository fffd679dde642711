//! Tracking which package versions are installed where.
//!
//! The installed state is owned by whatever collaborator observes the
//! host (a scanner, a persisted store). The planner and executor only
//! read it and report completed transitions back through
//! [`InstalledStore::record_installed`] / [`InstalledStore::record_uninstalled`].

use std::path::Path;
use std::sync::Mutex;

use crate::catalog::{InstalledPackageVersion, Version};

pub trait InstalledStore {
	fn get_all_installed(&self) -> Vec<InstalledPackageVersion>;

	/// The highest installed version of `package`, if any.
	fn get_newest_installed(&self, package: &str) -> Option<InstalledPackageVersion>;

	/// The installation occupying `directory`, if any.
	fn find_owner(&self, directory: &Path) -> Option<InstalledPackageVersion>;

	/// Called by the executor after an install hook completed.
	fn record_installed(&self, ipv: InstalledPackageVersion);

	/// Called by the executor after an uninstall hook completed.
	fn record_uninstalled(&self, package: &str, version: &Version);
}

/// Mutex guarded in-memory store, shareable between the planner and a
/// monitor thread. Front ends persist the entry list themselves.
#[derive(Debug, Default)]
pub struct MemoryInstalledStore {
	entries: Mutex<Vec<InstalledPackageVersion>>,
}

impl MemoryInstalledStore {
	pub fn new(entries: Vec<InstalledPackageVersion>) -> Self {
		Self { entries: Mutex::new(entries) }
	}

	pub fn entries(&self) -> Vec<InstalledPackageVersion> {
		self.entries.lock().expect("installed store mutex poisoned").clone()
	}
}

impl InstalledStore for MemoryInstalledStore {
	fn get_all_installed(&self) -> Vec<InstalledPackageVersion> {
		self.entries()
	}

	fn get_newest_installed(&self, package: &str) -> Option<InstalledPackageVersion> {
		self.entries.lock().expect("installed store mutex poisoned")
			.iter()
			.filter(|e| e.package == package)
			.max_by(|a, b| a.version.cmp(&b.version))
			.cloned()
	}

	fn find_owner(&self, directory: &Path) -> Option<InstalledPackageVersion> {
		self.entries.lock().expect("installed store mutex poisoned")
			.iter()
			.find(|e| e.directory == directory)
			.cloned()
	}

	fn record_installed(&self, ipv: InstalledPackageVersion) {
		log::info!("Recording {} as installed in {}", ipv.string_id(), ipv.directory.display());
		let mut entries = self.entries.lock().expect("installed store mutex poisoned");
		entries.retain(|e| !(e.package == ipv.package && e.version == ipv.version));
		entries.push(ipv);
	}

	fn record_uninstalled(&self, package: &str, version: &Version) {
		log::info!("Recording {} {} as uninstalled", package, version);
		self.entries.lock().expect("installed store mutex poisoned")
			.retain(|e| !(e.package == package && e.version == *version));
	}
}

/// Checks a user supplied installation directory before it is handed to the planner.
pub fn check_installation_directory(installed: &dyn InstalledStore, dir: &Path) -> crate::Result<()> {
	if dir.as_os_str().is_empty() {
		return Err(crate::Error::Parse("the installation directory cannot be empty".to_string()));
	}

	if let Some(owner) = installed.find_owner(dir) {
		log::debug!("Directory {} is owned by {} {}", dir.display(), owner.package, owner.version);
		return Err(crate::Error::DirectoryConflict(dir.to_path_buf()));
	}

	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;

	fn ipv(p: &str, v: &str, dir: &str) -> InstalledPackageVersion {
		InstalledPackageVersion {
			package: p.to_string(),
			version: Version::new(v).unwrap(),
			directory: std::path::PathBuf::from(dir),
		}
	}

	#[test]
	fn newest_installed_prefers_highest_version() {
		let store = MemoryInstalledStore::new(vec![ipv("a.B", "1.2", "/apps/B"), ipv("a.B", "1.10", "/apps/B-1.10")]);
		assert_eq!(store.get_newest_installed("a.B").unwrap().version, Version::new("1.10").unwrap());
	}

	#[test]
	fn find_owner_matches_directory() {
		let store = MemoryInstalledStore::new(vec![ipv("a.B", "1.2", "/apps/B")]);
		assert!(store.find_owner(Path::new("/apps/B")).is_some());
		assert!(store.find_owner(Path::new("/apps/C")).is_none());
	}

	#[test]
	fn record_uninstalled_removes_only_that_version() {
		let store = MemoryInstalledStore::new(vec![ipv("a.B", "1.2", "/apps/B"), ipv("a.B", "1.10", "/apps/B-1.10")]);
		store.record_uninstalled("a.B", &Version::new("1.2").unwrap());
		assert_eq!(store.get_all_installed().len(), 1);
	}

	#[test]
	fn occupied_directory_is_rejected() {
		let store = MemoryInstalledStore::new(vec![ipv("a.B", "1.2", "/apps/B")]);
		assert!(matches!(
			check_installation_directory(&store, Path::new("/apps/B")),
			Err(crate::Error::DirectoryConflict(_))
		));
	}
}
