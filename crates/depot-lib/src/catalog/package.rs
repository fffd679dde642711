//! Catalog data types.

use serde::{Serialize, Deserialize};

use super::version::Version;
use super::dependency::Dependency;

/// A piece of installable software, identified by a hierarchical name
/// like `org.example.NotepadPlusPlus`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
	pub name: String,
	pub title: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub homepage: Option<String>,
}

impl Package {
	pub fn new(name: String, title: String) -> Self {
		Self { name, title, description: None, homepage: None }
	}

	/// `Title (full.package.name)` for user facing messages.
	pub fn title_and_name(&self) -> String {
		format!("{} ({})", self.title, self.name)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
	Sha256,
	Sha512,
}

/// Where a package version's artifact comes from and how to verify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadDescriptor {
	pub url: String,
	/// Hex digest of the artifact, or empty if not recorded.
	#[serde(default)]
	pub hash: String,
	#[serde(default = "default_hash_algorithm")]
	pub algorithm: HashAlgorithm,
}

fn default_hash_algorithm() -> HashAlgorithm { HashAlgorithm::Sha256 }

impl DownloadDescriptor {
	pub fn is_valid(&self) -> bool {
		!self.url.is_empty()
	}
}

/// Whether the downloaded artifact is an archive to unpack or a single binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallUnit {
	#[default]
	Archive,
	SingleFile,
}

/// Hint for detecting an existing installation, a file path with its expected digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectHint {
	pub path: String,
	pub hash: String,
}

/// One version of a package.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct PackageVersion {
	pub package: String,
	pub version: Version,
	#[serde(default)]
	pub dependencies: Vec<Dependency>,
	#[serde(default)]
	pub download: Option<DownloadDescriptor>,
	#[serde(default)]
	pub unit: InstallUnit,
	/// Files worth surfacing to the user after installation (relative paths).
	#[serde(default)]
	pub important_files: Vec<String>,
	#[serde(default)]
	pub detect: Vec<DetectHint>,
}

impl PackageVersion {
	pub fn new(package: String, version: Version) -> Self {
		Self {
			package,
			version,
			dependencies: Vec::new(),
			download: None,
			unit: InstallUnit::default(),
			important_files: Vec::new(),
			detect: Vec::new(),
		}
	}

	/// `package/version` with the version normalized.
	pub fn string_id(&self) -> String {
		string_id(&self.package, &self.version)
	}

	pub fn has_valid_download(&self) -> bool {
		self.download.as_ref().map(DownloadDescriptor::is_valid).unwrap_or(false)
	}
}

/// Identity string for a package version, `package/version` with the version normalized.
pub fn string_id(package: &str, version: &Version) -> String {
	format!("{}/{}", package, version.normalized())
}

impl std::hash::Hash for PackageVersion {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.package.hash(state);
		self.version.hash(state);
	}
}

impl std::cmp::PartialEq for PackageVersion {
	fn eq(&self, other: &Self) -> bool {
		self.package == other.package &&
		self.version == other.version
	}
}

impl std::cmp::Ord for PackageVersion {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		match self.package.cmp(&other.package) {
			core::cmp::Ordering::Equal => {}
			ord => return ord,
		}
		self.version.cmp(&other.version)
	}
}

impl std::cmp::PartialOrd for PackageVersion {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl std::fmt::Display for PackageVersion {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {}", self.package, self.version)
	}
}

/// An observed installation of a package version on the host.
///
/// Owned by the installed state collaborator; the planner and executor
/// treat these as read only facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledPackageVersion {
	pub package: String,
	pub version: Version,
	pub directory: std::path::PathBuf,
}

impl InstalledPackageVersion {
	pub fn string_id(&self) -> String {
		string_id(&self.package, &self.version)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn pv(p: &str, v: &str) -> PackageVersion {
		PackageVersion::new(p.to_string(), Version::new(v).unwrap())
	}

	#[test] fn package_version_identity_ignores_metadata() {
		let mut a = pv("a.B", "1.0");
		a.important_files.push("bin/b.exe".to_string());
		assert_eq!(a, pv("a.B", "1.0"));
	}
	#[test] fn package_version_string_id_is_normalized() { assert_eq!(pv("a.B", "1.2.0").string_id(), "a.B/1.2") }
	#[test] fn package_version_sorts_by_package_then_version() {
		let mut list = vec![pv("b.C", "1.0"), pv("a.B", "2.0"), pv("a.B", "1.5")];
		list.sort();
		assert_eq!(list, vec![pv("a.B", "1.5"), pv("a.B", "2.0"), pv("b.C", "1.0")]);
	}
	#[test] fn download_without_url_is_invalid() {
		assert!(!DownloadDescriptor { url: String::new(), hash: String::new(), algorithm: HashAlgorithm::Sha256 }.is_valid());
	}
}
