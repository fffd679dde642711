//! # The package catalog
//!
//! The catalog is the read only query surface the planner works against.
//! The native interchange format is a JSON file listing packages and
//! their versions; for repeated use it is converted once and cached on
//! disk in a binary form.
//!
//! Every query returns owned deep copies so callers can freely mutate
//! their working snapshots without touching catalog state.

pub mod version;
pub mod dependency;
pub mod package;

pub use version::Version;
pub use dependency::Dependency;
pub use package::Package;
pub use package::PackageVersion;
pub use package::InstalledPackageVersion;
pub use package::DownloadDescriptor;
pub use package::HashAlgorithm;
pub use package::InstallUnit;
pub use package::DetectHint;

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::{Serialize, Deserialize};

pub trait Catalog {
	fn find_package(&self, name: &str) -> Option<Package>;

	/// All versions of `package`, sorted by package name then version.
	fn find_package_versions(&self, package: &str) -> Vec<PackageVersion>;

	fn find_package_version(&self, package: &str, version: &Version) -> Option<PackageVersion>;

	/// Packages whose last name segment equals `short`, e.g. `B` for `a.B`.
	fn find_packages_by_short_name(&self, short: &str) -> Vec<Package>;
}

/// In-memory catalog backed by the JSON interchange format.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MemoryCatalog {
	packages: HashMap<String, Package>,
	/// Versions per package, kept sorted ascending.
	versions: HashMap<String, Vec<PackageVersion>>,
}

/// Shape of the JSON interchange file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
	#[serde(default)]
	packages: Vec<Package>,
	#[serde(default)]
	versions: Vec<PackageVersion>,
}

impl MemoryCatalog {
	pub fn add_package(&mut self, package: Package) {
		self.packages.insert(package.name.clone(), package);
	}

	/// Inserts `pv` keeping the per-package version list sorted.
	/// An existing entry with the same version is replaced.
	pub fn add_package_version(&mut self, pv: PackageVersion) {
		let list = self.versions.entry(pv.package.clone()).or_default();
		match list.binary_search_by(|e| e.version.cmp(&pv.version)) {
			Ok(i) => list[i] = pv,
			Err(i) => list.insert(i, pv),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.packages.is_empty() && self.versions.is_empty()
	}

	pub fn package_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.packages.keys().cloned().collect();
		names.sort();
		names
	}

	pub fn read_from_json(reader: impl Read) -> crate::Result<Self> {
		let file: CatalogFile = serde_json::from_reader(reader)?;
		let mut db = MemoryCatalog::default();
		for p in file.packages {
			db.add_package(p);
		}
		for pv in file.versions {
			db.add_package_version(pv);
		}
		log::info!("Read catalog with {} packages.", db.packages.len());
		Ok(db)
	}

	fn cache_path(config: &crate::DepotConfig) -> std::path::PathBuf {
		config.data_dir().join("catalog.bin")
	}

	pub fn load_from_disk(config: &crate::DepotConfig) -> crate::Result<Self> {
		let mut f = std::fs::File::open(Self::cache_path(config))?;
		let mut v = Vec::<u8>::new();
		f.read_to_end(&mut v)?;
		Ok(bincode::deserialize::<MemoryCatalog>(&v)?)
	}

	pub fn save_to_disk(&self, config: &crate::DepotConfig) -> crate::Result<()> {
		let data = bincode::serialize(self)?;
		let mut f = std::fs::File::create(Self::cache_path(config))?;
		f.write_all(&data)?;
		Ok(())
	}
}

impl Catalog for MemoryCatalog {
	fn find_package(&self, name: &str) -> Option<Package> {
		self.packages.get(name).cloned()
	}

	fn find_package_versions(&self, package: &str) -> Vec<PackageVersion> {
		self.versions.get(package).cloned().unwrap_or_default()
	}

	fn find_package_version(&self, package: &str, version: &Version) -> Option<PackageVersion> {
		self.versions.get(package)?
			.iter()
			.find(|pv| pv.version == *version)
			.cloned()
	}

	fn find_packages_by_short_name(&self, short: &str) -> Vec<Package> {
		let mut found: Vec<Package> = self.packages.values()
			.filter(|p| p.name.rsplit('.').next() == Some(short))
			.cloned()
			.collect();
		found.sort_by(|a, b| a.name.cmp(&b.name));
		found
	}
}
