//! Various helper functions and fakes for testing depot.
//!
//! The fixtures build fully isolated [`depot::Depot`] instances under a
//! temp directory, so tests can run the planner and the executor side
//! by side without touching real state.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use depot::Depot;
use depot::DepotConfig;
use depot::MemoryCatalog;
use depot::catalog::{
	Dependency, DownloadDescriptor, HashAlgorithm, InstallUnit,
	InstalledPackageVersion, Package, PackageVersion, Version,
};
use depot::executor::{CloseFlags, Downloader, HookOutput, HookRunner};
use depot::installed::MemoryInstalledStore;

pub fn version(v: &str) -> Version {
	Version::new(v).expect("failed to create version from string.")
}

/// `test.A` style package with the short name as title.
pub fn package(name: &str) -> Package {
	let title = name.rsplit('.').next().unwrap_or(name).to_string();
	Package::new(name.to_string(), title)
}

/// A downloadable single-file package version.
pub fn package_version(name: &str, v: &str) -> PackageVersion {
	let mut pv = PackageVersion::new(name.to_string(), version(v));
	let short = name.rsplit('.').next().unwrap_or(name);
	pv.unit = InstallUnit::SingleFile;
	pv.download = Some(DownloadDescriptor {
		url: format!("https://example.com/files/{}-{}.bin", short, v),
		hash: String::new(),
		algorithm: HashAlgorithm::Sha256,
	});
	pv
}

/// A downloadable archive package version, served as a zip.
pub fn archive_package_version(name: &str, v: &str) -> PackageVersion {
	let mut pv = package_version(name, v);
	let short = name.rsplit('.').next().unwrap_or(name);
	pv.unit = InstallUnit::Archive;
	pv.download = Some(DownloadDescriptor {
		url: format!("https://example.com/files/{}-{}.zip", short, v),
		hash: String::new(),
		algorithm: HashAlgorithm::Sha256,
	});
	pv
}

/// Parses the `package [min, max)` interval form.
pub fn dependency(range: &str) -> Dependency {
	range.parse().expect("failed to parse dependency range.")
}

/// Builds an isolated depot under a temp directory.
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub fn depot_with(catalog: MemoryCatalog, installed: Vec<InstalledPackageVersion>) -> (Depot, tempfile::TempDir) {
	let root = tempfile::tempdir().expect("failed to create temp directory.");

	let install_dir = root.path().join("apps");
	let download_dir = root.path().join("downloads");
	let data_dir = root.path().join("data");
	for dir in [&install_dir, &download_dir, &data_dir] {
		std::fs::create_dir_all(dir).expect("failed to create depot directory.");
	}

	let config = DepotConfig::new(install_dir, download_dir, data_dir);
	let depot = Depot::new(
		config,
		Box::new(catalog),
		Box::new(MemoryInstalledStore::new(installed)),
	);
	(depot, root)
}

/// Records `package`/`v` as installed in `dir` and creates the directory.
pub fn mark_installed(depot: &Depot, package: &str, v: &str, dir: &Path) {
	std::fs::create_dir_all(dir).expect("failed to create installation directory.");
	std::fs::write(dir.join("contents.txt"), b"installed fixture").expect("failed to write fixture file.");
	depot.installed().record_installed(InstalledPackageVersion {
		package: package.to_string(),
		version: version(v),
		directory: dir.to_path_buf(),
	});
}

/// Downloader that fabricates artifacts instead of fetching them.
/// Urls ending in `.zip` produce a real archive containing `payload.txt`.
#[derive(Debug, Default)]
pub struct FakeDownloader {
	/// Fail downloads whose url contains this needle.
	pub fail_on: Option<String>,
	/// Every url handed to the downloader, in order.
	pub downloads: Mutex<Vec<String>>,
}

impl FakeDownloader {
	pub fn failing_on(needle: &str) -> Self {
		Self { fail_on: Some(needle.to_string()), ..Default::default() }
	}

	pub fn download_count(&self) -> usize {
		self.downloads.lock().expect("downloader mutex poisoned").len()
	}
}

impl Downloader for FakeDownloader {
	fn download(&self, descriptor: &DownloadDescriptor, dir: &Path) -> depot::Result<String> {
		if let Some(needle) = &self.fail_on {
			if descriptor.url.contains(needle.as_str()) {
				return Err(depot::Error::Download(format!("injected failure for {}", descriptor.url)));
			}
		}

		self.downloads.lock().expect("downloader mutex poisoned").push(descriptor.url.clone());

		let name = depot::executor::download::file_name_from_url(&descriptor.url);
		if name.ends_with(".zip") {
			let file = std::fs::File::create(dir.join(&name))?;
			let mut writer = zip::ZipWriter::new(file);
			writer.start_file("payload.txt", zip::write::FileOptions::default())?;
			writer.write_all(b"fixture payload")?;
			writer.finish()?;
		} else {
			std::fs::write(dir.join(&name), b"fixture payload")?;
		}
		Ok(name)
	}
}

/// One observed hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookCall {
	Install(std::path::PathBuf),
	Uninstall(std::path::PathBuf),
	Stop(std::path::PathBuf),
}

/// Hook runner that records every call and can inject failures.
#[derive(Debug, Default)]
pub struct RecordingHookRunner {
	/// Fail install hooks whose directory contains this needle.
	pub fail_install_on: Option<String>,
	pub calls: Mutex<Vec<HookCall>>,
}

impl RecordingHookRunner {
	pub fn failing_install_on(needle: &str) -> Self {
		Self { fail_install_on: Some(needle.to_string()), ..Default::default() }
	}

	pub fn calls(&self) -> Vec<HookCall> {
		self.calls.lock().expect("hook runner mutex poisoned").clone()
	}
}

impl HookRunner for RecordingHookRunner {
	fn run_install_hook(&self, dir: &Path, _env: &[(String, String)]) -> depot::Result<HookOutput> {
		self.calls.lock().expect("hook runner mutex poisoned").push(HookCall::Install(dir.to_path_buf()));
		if let Some(needle) = &self.fail_install_on {
			if dir.to_string_lossy().contains(needle.as_str()) {
				return Err(depot::Error::Script(format!("injected install hook failure in {}", dir.display())));
			}
		}
		Ok(HookOutput { exit_code: 0, output: String::new() })
	}

	fn run_uninstall_hook(&self, dir: &Path, _env: &[(String, String)]) -> depot::Result<HookOutput> {
		self.calls.lock().expect("hook runner mutex poisoned").push(HookCall::Uninstall(dir.to_path_buf()));
		Ok(HookOutput { exit_code: 0, output: String::new() })
	}

	fn stop_running_instances(&self, dir: &Path, _close: CloseFlags) -> depot::Result<()> {
		self.calls.lock().expect("hook runner mutex poisoned").push(HookCall::Stop(dir.to_path_buf()));
		Ok(())
	}
}
