//! The context object tying the catalog, installed store, lock
//! registry and configuration together.
//!
//! Front ends build one [`Depot`] and use it for every plan and
//! execution; nothing in the library reaches for global state, so
//! isolated instances (and isolated tests) can run side by side.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::catalog::{Catalog, Package};
use crate::config::DepotConfig;
use crate::executor::{CloseFlags, Downloader, Executor, HookRunner};
use crate::installed::InstalledStore;
use crate::job::Job;
use crate::locks::LockRegistry;
use crate::resolver::{InstallOperation, Resolver, UpdateOptions};

pub struct Depot {
	config: DepotConfig,
	catalog: Box<dyn Catalog + Send + Sync>,
	installed: Box<dyn InstalledStore + Send + Sync>,
	locks: LockRegistry,
}

impl Depot {
	pub fn new(
		config: DepotConfig,
		catalog: Box<dyn Catalog + Send + Sync>,
		installed: Box<dyn InstalledStore + Send + Sync>,
	) -> Self {
		Self { config, catalog, installed, locks: LockRegistry::new() }
	}

	pub fn config(&self) -> &DepotConfig {
		&self.config
	}

	pub fn catalog(&self) -> &dyn Catalog {
		&*self.catalog
	}

	pub fn installed(&self) -> &dyn InstalledStore {
		&*self.installed
	}

	pub fn locks(&self) -> &LockRegistry {
		&self.locks
	}

	pub fn resolver(&self) -> Resolver<'_> {
		Resolver::new(&*self.catalog, &*self.installed)
	}

	pub fn executor<'a>(&'a self, downloader: &'a dyn Downloader, hooks: &'a dyn HookRunner) -> Executor<'a> {
		Executor::new(&self.config, &*self.catalog, &*self.installed, &self.locks, downloader, hooks)
	}

	/// Finds a package by its full name, falling back to an unambiguous
	/// short name. Ambiguous short names fail naming every candidate.
	pub fn find_one_package(&self, name: &str) -> crate::Result<Package> {
		if let Some(p) = self.catalog.find_package(name) {
			return Ok(p);
		}

		let mut matches = self.catalog.find_packages_by_short_name(name);
		match matches.len() {
			0 => Err(crate::Error::NotFound(format!("unknown package: {}", name))),
			1 => Ok(matches.remove(0)),
			_ => {
				let names: Vec<String> = matches.iter().map(Package::title_and_name).collect();
				Err(crate::Error::NotFound(
					format!("more than one package was found: {}", names.join(", "))
				))
			}
		}
	}

	/// Plans installation of the newest installable version of each
	/// named package. `target` applies to the first name only.
	pub fn plan_install(&self, names: &[String], target: Option<PathBuf>) -> crate::Result<Vec<InstallOperation>> {
		let resolver = self.resolver();
		let mut installed = resolver.installed_snapshot();
		let mut ops = Vec::new();

		for (i, name) in names.iter().enumerate() {
			let p = self.find_one_package(name)?;
			let pv = resolver.find_newest_installable(&p.name)
				.ok_or_else(|| crate::Error::Unsatisfiable(
					format!("no installable version found for the package {}", p.title_and_name())
				))?;

			let mut avoid = HashSet::new();
			let target = if i == 0 { target.clone() } else { None };
			ops.extend(resolver.plan_installation(&pv, &mut installed, &mut avoid, target)?);
		}

		Ok(ops)
	}

	/// Plans removal of the newest installed version of each named package.
	pub fn plan_remove(&self, names: &[String]) -> crate::Result<Vec<InstallOperation>> {
		let resolver = self.resolver();
		let mut installed = resolver.installed_snapshot();
		let mut ops = Vec::new();

		for name in names {
			let p = self.find_one_package(name)?;
			let pv = resolver.find_newest_installed(&p.name)
				.ok_or_else(|| crate::Error::NotFound(
					format!("package {} is not installed", p.title_and_name())
				))?;

			ops.extend(resolver.plan_uninstallation(&pv, &mut installed)?);
		}

		Ok(ops)
	}

	/// Plans updates for the named packages.
	pub fn plan_update(&self, names: &[String], options: &UpdateOptions) -> crate::Result<Vec<InstallOperation>> {
		let packages = names.iter()
			.map(|name| self.find_one_package(name))
			.collect::<crate::Result<Vec<_>>>()?;

		self.resolver().plan_updates(&packages, &[], options)
	}

	/// Plans updates for every package with an installed version.
	pub fn plan_update_all(&self, options: &UpdateOptions) -> crate::Result<Vec<InstallOperation>> {
		let mut names: Vec<String> = self.installed.get_all_installed()
			.into_iter()
			.map(|ipv| ipv.package)
			.collect();
		names.sort();
		names.dedup();

		/* installed packages unknown to the catalog cannot be updated */
		let packages: Vec<Package> = names.iter()
			.filter_map(|name| self.catalog.find_package(name))
			.collect();

		self.resolver().plan_updates(&packages, &[], options)
	}

	/// Executes a finalized plan. See [`Executor::process`].
	pub fn execute(
		&self,
		job: &Job,
		ops: Vec<InstallOperation>,
		close: CloseFlags,
		downloader: &dyn Downloader,
		hooks: &dyn HookRunner,
	) -> crate::Result<()> {
		self.executor(downloader, hooks).process(job, ops, close)
	}
}
