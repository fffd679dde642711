//! Executing a finalized list of install operations.
//!
//! [`Executor::process`] drives one operation list through a serial
//! pipeline: resolve and lock every target, download all artifacts,
//! stop running instances, apply the installs/uninstalls, then clean up
//! whatever a failed or cancelled batch left behind. Weights follow the
//! stages, 70% download, 10% stop, 19% apply and 1% cleanup, so a
//! monitor subscribed to the job sees meaningful progress.
//!
//! A batch is not a transaction: operations that completed stay
//! applied when a later one fails. Locks are released on every exit
//! path.

pub mod download;
pub mod hooks;
mod directories;

pub use download::Downloader;
pub use download::HttpDownloader;
pub use hooks::HookRunner;
pub use hooks::HookOutput;
pub use hooks::CloseFlags;
pub use hooks::ScriptHookRunner;
pub use directories::find_non_existing;

use std::path::{Path, PathBuf};

use crate::catalog::{Catalog, PackageVersion, InstallUnit, InstalledPackageVersion};
use crate::config::DepotConfig;
use crate::installed::InstalledStore;
use crate::job::Job;
use crate::locks::LockRegistry;
use crate::resolver::InstallOperation;

pub struct Executor<'a> {
	config: &'a DepotConfig,
	catalog: &'a dyn Catalog,
	installed: &'a dyn InstalledStore,
	locks: &'a LockRegistry,
	downloader: &'a dyn Downloader,
	hooks: &'a dyn HookRunner,
}

impl<'a> Executor<'a> {
	pub fn new(
		config: &'a DepotConfig,
		catalog: &'a dyn Catalog,
		installed: &'a dyn InstalledStore,
		locks: &'a LockRegistry,
		downloader: &'a dyn Downloader,
		hooks: &'a dyn HookRunner,
	) -> Self {
		Self { config, catalog, installed, locks, downloader, hooks }
	}

	/// Runs `ops` to completion or to the first error.
	///
	/// The job carries progress, the current step hint and the first
	/// error; the same error is returned. On success progress ends at
	/// exactly 1.0.
	pub fn process(&self, job: &Job, mut ops: Vec<InstallOperation>, close: CloseFlags) -> crate::Result<()> {
		/*
		An update pair arrives as install-new then uninstall-old.
		Packages that cannot coexist with themselves behave better the
		other way around.
		*/
		if ops.len() == 2 && ops[0].package == ops[1].package && ops[0].install && !ops[1].install {
			ops.swap(0, 1);
		}

		log::info!("Processing {} operations", ops.len());

		let pvs = match self.resolve_operations(&ops) {
			Ok(pvs) => pvs,
			Err(e) => {
				job.set_error(&e.to_string());
				return Err(e);
			}
		};

		/* lock everything involved before any destructive work */
		let mut locked = Vec::<String>::new();
		let mut result = Ok(());
		for pv in &pvs {
			let id = pv.string_id();
			if locked.contains(&id) {
				continue;
			}
			match self.locks.lock(&id) {
				Ok(()) => locked.push(id),
				Err(e) => {
					result = Err(e);
					break;
				}
			}
		}

		if result.is_ok() {
			result = self.run_operations(job, &ops, &pvs, close);
		}

		/* locks are released on every exit path */
		for id in &locked {
			self.locks.unlock(id);
		}

		match result {
			Ok(()) => {
				job.set_progress(1.0);
				Ok(())
			}
			Err(e) => {
				job.set_error(&e.to_string());
				Err(e)
			}
		}
	}

	fn resolve_operations(&self, ops: &[InstallOperation]) -> crate::Result<Vec<PackageVersion>> {
		ops.iter()
			.map(|op| self.catalog.find_package_version(&op.package, &op.version)
				.ok_or_else(|| crate::Error::NotFound(
					format!("cannot find the package version {} {}", op.package, op.version)
				)))
			.collect()
	}

	fn run_operations(
		&self,
		job: &Job,
		ops: &[InstallOperation],
		pvs: &[PackageVersion],
		close: CloseFlags,
	) -> crate::Result<()> {
		let n = ops.len() as f64;

		/* provisional download directories and binary names per operation */
		let mut dirs: Vec<Option<PathBuf>> = vec![None; ops.len()];
		let mut binaries: Vec<String> = vec![String::new(); ops.len()];

		let mut first_error: Option<crate::Error> = None;
		/* index after the last operation fully applied */
		let mut processed = 0usize;

		/* download the artifacts, 70% */
		for (i, op) in ops.iter().enumerate() {
			if job.is_cancelled() {
				first_error = Some(crate::Error::Cancelled);
				break;
			}

			if op.install {
				let sub = job.sub_job(0.7 / n, &format!("Downloading {}", pvs[i]));
				match self.download_operation(op, &pvs[i], &mut dirs[i]) {
					Ok(binary) => {
						binaries[i] = binary;
						sub.set_progress(1.0);
					}
					Err(e) => {
						first_error = Some(e);
						break;
					}
				}
			} else {
				job.add_progress(0.7 / n);
			}
		}

		/* stop running instances of everything being removed, 10% */
		if first_error.is_none() {
			for (i, op) in ops.iter().enumerate() {
				if job.is_cancelled() {
					first_error = Some(crate::Error::Cancelled);
					break;
				}

				if !op.install {
					let sub = job.sub_job(0.1 / n, &format!("Stopping {}", pvs[i]));
					match self.stop_operation(op, close) {
						Ok(()) => sub.set_progress(1.0),
						Err(e) => {
							first_error = Some(e);
							break;
						}
					}
				} else {
					job.add_progress(0.1 / n);
				}
			}
		}

		/* apply, 19% */
		if first_error.is_none() {
			for (i, op) in ops.iter().enumerate() {
				if job.is_cancelled() {
					first_error = Some(crate::Error::Cancelled);
					break;
				}

				let verb = if op.install { "Installing" } else { "Uninstalling" };
				let sub = job.sub_job(0.19 / n, &format!("{} {}", verb, pvs[i]));

				let applied = if op.install {
					let dir = dirs[i].as_deref().expect("install operations have a download directory");
					self.apply_install(op, &pvs[i], dir, &binaries[i])
				} else {
					self.apply_uninstall(op, &pvs[i])
				};

				match applied {
					Ok(()) => {
						sub.set_progress(1.0);
						processed = i + 1;
					}
					Err(e) => {
						first_error = Some(e);
						break;
					}
				}
			}
		}

		/* the batch stopped early: drop provisional directories never applied, 1% */
		if first_error.is_some() {
			for dir in dirs.iter().skip(processed) {
				if let Some(dir) = dir {
					if dir.exists() {
						log::info!("Deleting {}", dir.display());
						if let Err(e) = std::fs::remove_dir_all(dir) {
							log::warn!("Failed to delete {}: {}", dir.display(), e);
						}
					}
				}
				job.add_progress(0.01 / n);
			}
		}

		match first_error {
			None => Ok(()),
			Some(e) => Err(e),
		}
	}

	/// Picks the provisional directory, downloads the artifact into it
	/// and unpacks archives. The directory is recorded in `slot` before
	/// any network work so a failed download still gets cleaned up.
	fn download_operation(
		&self,
		op: &InstallOperation,
		pv: &PackageVersion,
		slot: &mut Option<PathBuf>,
	) -> crate::Result<String> {
		let descriptor = pv.download.as_ref()
			.filter(|d| d.is_valid())
			.ok_or_else(|| crate::Error::Download(format!("{} has no valid download", pv)))?;

		/* not the final location; the apply stage may move it */
		let dir = match &op.target {
			Some(target) => target.clone(),
			None => directories::ideal_installation_directory(self.config, pv),
		};
		let dir = directories::find_non_existing(&dir);
		if dir.exists() {
			return Err(crate::Error::DirectoryConflict(dir));
		}

		std::fs::create_dir_all(&dir)?;
		*slot = Some(dir.clone());

		let file_name = self.downloader.download(descriptor, &dir)?;

		match pv.unit {
			InstallUnit::Archive => {
				let archive = dir.join(&file_name);
				download::unpack_archive(&archive, &dir)?;
				std::fs::remove_file(&archive)?;
				Ok(String::new())
			}
			InstallUnit::SingleFile => Ok(file_name),
		}
	}

	fn stop_operation(&self, op: &InstallOperation, close: CloseFlags) -> crate::Result<()> {
		let installed = self.installed.get_all_installed()
			.into_iter()
			.find(|ipv| ipv.package == op.package && ipv.version == op.version);

		match installed {
			Some(ipv) => self.hooks.stop_running_instances(&ipv.directory, close),
			/* nothing known to be running */
			None => Ok(()),
		}
	}

	/// Finalizes the installation directory, runs the install hook and
	/// records the new installation.
	fn apply_install(
		&self,
		op: &InstallOperation,
		pv: &PackageVersion,
		provisional: &Path,
		binary: &str,
	) -> crate::Result<()> {
		let mut dir = provisional.to_path_buf();

		match &op.target {
			None => {
				/* prefer the ideal location, then the version qualified one, then a numbered variant */
				let ideal = directories::ideal_installation_directory(self.config, pv);
				if !try_claim(&mut dir, &ideal) {
					let secondary = directories::secondary_installation_directory(self.config, pv);
					if !try_claim(&mut dir, &secondary) {
						let fallback = directories::find_non_existing(&secondary);
						try_claim(&mut dir, &fallback);
					}
				}
			}
			Some(target) => {
				if target.exists() {
					if dir != *target {
						/* a fixed destination is occupied by something else */
						log::info!("Deleting {}", dir.display());
						let _ = std::fs::remove_dir_all(&dir);
						return Err(crate::Error::DirectoryConflict(target.clone()));
					}
				} else if std::fs::rename(&dir, target).is_ok() {
					dir = target.clone();
				} else {
					log::info!("Deleting {}", dir.display());
					let _ = std::fs::remove_dir_all(&dir);
					return Err(crate::Error::DirectoryConflict(target.clone()));
				}
			}
		}

		let env = hook_environment(pv, binary);
		let output = self.hooks.run_install_hook(&dir, &env)?;
		if !output.output.is_empty() {
			log::debug!("Install hook output: {}", output.output.trim_end());
		}

		self.installed.record_installed(InstalledPackageVersion {
			package: pv.package.clone(),
			version: pv.version.clone(),
			directory: dir,
		});
		Ok(())
	}

	/// Runs the uninstall hook, forgets the installation and removes
	/// its directory.
	fn apply_uninstall(&self, op: &InstallOperation, pv: &PackageVersion) -> crate::Result<()> {
		let installed = self.installed.get_all_installed()
			.into_iter()
			.find(|ipv| ipv.package == op.package && ipv.version == op.version);

		let Some(ipv) = installed else {
			log::warn!("{} is not known to be installed, nothing to remove", pv);
			return Ok(());
		};

		let env = hook_environment(pv, "");
		let output = self.hooks.run_uninstall_hook(&ipv.directory, &env)?;
		if !output.output.is_empty() {
			log::debug!("Uninstall hook output: {}", output.output.trim_end());
		}

		self.installed.record_uninstalled(&op.package, &op.version);

		if ipv.directory.exists() {
			std::fs::remove_dir_all(&ipv.directory)?;
		}
		Ok(())
	}
}

/// Moves `dir` to `candidate` when possible. Returns whether `dir` now
/// is the candidate, either because they were equal already or because
/// the rename succeeded.
fn try_claim(dir: &mut PathBuf, candidate: &Path) -> bool {
	if dir.as_path() == candidate {
		return true;
	}
	if !candidate.exists() && std::fs::rename(dir.as_path(), candidate).is_ok() {
		*dir = candidate.to_path_buf();
		return true;
	}
	false
}

/// Environment passed to every hook invocation.
fn hook_environment(pv: &PackageVersion, binary: &str) -> Vec<(String, String)> {
	vec![
		("DEPOT_PACKAGE_NAME".to_string(), pv.package.clone()),
		("DEPOT_PACKAGE_VERSION".to_string(), pv.version.to_string()),
		("DEPOT_PACKAGE_BINARY".to_string(), binary.to_string()),
	]
}
