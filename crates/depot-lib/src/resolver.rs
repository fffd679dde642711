//! Planning install, uninstall and update operations.
//!
//! The planner turns a request ("install P", "update everything",
//! "remove P") into an ordered [`InstallOperation`] list by walking the
//! dependency relation in the catalog. Resolution is greedy: the
//! highest version satisfying a range wins, and a per-pass avoid set
//! blocks dependency cycles. Planning never touches the host, it only
//! reads the catalog and the installed snapshot handed to it, so a
//! failed plan has no side effects and callers never act on a partial
//! plan.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::catalog::{Catalog, Dependency, Package, PackageVersion, InstalledPackageVersion};
use crate::installed::InstalledStore;

pub mod operation;
pub use operation::InstallOperation;
pub use operation::simplify;

/// Options for [`Resolver::plan_updates`].
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
	/// Reuse the directory of the version being replaced.
	pub keep_directories: bool,
	/// Allow targets with no installed version (install semantics).
	/// When false such targets fail the whole batch.
	pub install: bool,
	/// Preferred directory for the first target.
	pub target: Option<PathBuf>,
}

pub struct Resolver<'a> {
	catalog: &'a dyn Catalog,
	installed: &'a dyn InstalledStore,
}

impl<'a> Resolver<'a> {
	pub fn new(catalog: &'a dyn Catalog, installed: &'a dyn InstalledStore) -> Self {
		Self { catalog, installed }
	}

	/// Resolves the installed facts to catalog package versions.
	///
	/// Installed versions unknown to the catalog are skipped, they can
	/// neither be depended on nor planned against.
	pub fn installed_snapshot(&self) -> Vec<PackageVersion> {
		self.installed.get_all_installed()
			.iter()
			.filter_map(|ipv| self.catalog.find_package_version(&ipv.package, &ipv.version))
			.collect()
	}

	/// All installable versions matching `dep`, excluding the avoid set.
	pub fn find_all_matches_to_install(&self, dep: &Dependency, avoid: &HashSet<String>) -> Vec<PackageVersion> {
		self.catalog.find_package_versions(&dep.package)
			.into_iter()
			.filter(|pv| dep.test(&pv.version))
			.filter(PackageVersion::has_valid_download)
			.filter(|pv| !avoid.contains(&pv.string_id()))
			.collect()
	}

	/// The highest installable version matching `dep`, excluding the avoid set.
	pub fn find_best_match_to_install(&self, dep: &Dependency, avoid: &HashSet<String>) -> Option<PackageVersion> {
		self.find_all_matches_to_install(dep, avoid)
			.into_iter()
			.max_by(|a, b| a.version.cmp(&b.version))
	}

	pub fn find_all_installed_matches(&self, dep: &Dependency) -> Vec<InstalledPackageVersion> {
		self.installed.get_all_installed()
			.into_iter()
			.filter(|ipv| ipv.package == dep.package && dep.test(&ipv.version))
			.collect()
	}

	pub fn find_highest_installed_match(&self, dep: &Dependency) -> Option<InstalledPackageVersion> {
		self.find_all_installed_matches(dep)
			.into_iter()
			.max_by(|a, b| a.version.cmp(&b.version))
	}

	/// The highest version of `package` with a valid download.
	pub fn find_newest_installable(&self, package: &str) -> Option<PackageVersion> {
		self.catalog.find_package_versions(package)
			.into_iter()
			.filter(PackageVersion::has_valid_download)
			.max_by(|a, b| a.version.cmp(&b.version))
	}

	/// The newest installed version of `package` resolved through the
	/// catalog, or `None` when nothing is installed or the catalog does
	/// not know the installed version.
	pub fn find_newest_installed(&self, package: &str) -> Option<PackageVersion> {
		let ipv = self.installed.get_newest_installed(package)?;
		self.catalog.find_package_version(&ipv.package, &ipv.version)
	}

	/// Plans installation of `pv` and everything it requires.
	///
	/// `installed` is the working snapshot, it grows with every planned
	/// install so later targets see earlier decisions. `avoid` blocks
	/// versions from candidate selection for the duration of the pass,
	/// which is what terminates dependency cycles. `target` applies to
	/// `pv` itself, dependencies always pick their directory
	/// automatically.
	pub fn plan_installation(
		&self,
		pv: &PackageVersion,
		installed: &mut Vec<PackageVersion>,
		avoid: &mut HashSet<String>,
		target: Option<PathBuf>,
	) -> crate::Result<Vec<InstallOperation>> {
		let mut ops = Vec::new();
		self.plan_installation_inner(pv, installed, avoid, target, &mut ops)?;
		Ok(ops)
	}

	fn plan_installation_inner(
		&self,
		pv: &PackageVersion,
		installed: &mut Vec<PackageVersion>,
		avoid: &mut HashSet<String>,
		target: Option<PathBuf>,
		ops: &mut Vec<InstallOperation>,
	) -> crate::Result<()> {
		if installed.iter().any(|i| i == pv) {
			return Ok(());
		}

		if avoid.contains(&pv.string_id()) {
			return Err(crate::Error::Unsatisfiable(
				format!("{} is already being considered, its dependencies form a cycle", pv)
			));
		}
		avoid.insert(pv.string_id());

		for dep in &pv.dependencies {
			if installed.iter().any(|i| i.package == dep.package && dep.test(&i.version)) {
				continue;
			}

			let candidate = self.find_best_match_to_install(dep, avoid)
				.ok_or_else(|| crate::Error::Unsatisfiable(
					format!("no installable version matches {} required by {}", dep, pv)
				))?;
			log::debug!("Chose {} for {} required by {}", candidate, dep, pv);

			self.plan_installation_inner(&candidate, installed, avoid, None, ops)?;
		}

		ops.push(InstallOperation::install(pv.package.clone(), pv.version.clone(), target));
		installed.push(pv.clone());
		Ok(())
	}

	/// Plans uninstallation of `pv` and of every installed package that
	/// can no longer satisfy its dependencies without it.
	///
	/// Dependents come first in the returned list, post-order, so the
	/// executor removes them before their dependency disappears. The
	/// walk shrinks the snapshot at every level which guarantees
	/// termination without an avoid set.
	pub fn plan_uninstallation(
		&self,
		pv: &PackageVersion,
		installed: &mut Vec<PackageVersion>,
	) -> crate::Result<Vec<InstallOperation>> {
		let mut ops = Vec::new();
		self.plan_uninstallation_inner(pv, installed, &mut ops);
		Ok(ops)
	}

	fn plan_uninstallation_inner(
		&self,
		pv: &PackageVersion,
		installed: &mut Vec<PackageVersion>,
		ops: &mut Vec<InstallOperation>,
	) {
		let Some(position) = installed.iter().position(|i| i == pv) else {
			/* already planned for removal on a previous level */
			return;
		};
		installed.remove(position);

		/* with pv gone, anything whose dependency on it has no other installed provider must go too */
		let dependents: Vec<PackageVersion> = installed.iter()
			.filter(|m| m.dependencies.iter().any(|d|
				d.package == pv.package &&
				d.test(&pv.version) &&
				!installed.iter().any(|other| other.package == d.package && d.test(&other.version))
			))
			.cloned()
			.collect();

		for dependent in dependents {
			log::debug!("{} loses its last provider when {} is removed", dependent, pv);
			self.plan_uninstallation_inner(&dependent, installed, ops);
		}

		ops.push(InstallOperation::uninstall(pv.package.clone(), pv.version.clone()));
	}

	/// Plans updates for a set of packages and dependency ranges.
	///
	/// Per target the newest installable version is compared against
	/// the newest installed one; up to date targets are skipped. Where
	/// possible the old and new version are paired into an
	/// uninstall-then-install couple so packages that cannot coexist
	/// with their own next version update in place; pairs where that
	/// attempt drags in side effects fall back to independent install
	/// and uninstall planning. The first error aborts the whole batch.
	pub fn plan_updates(
		&self,
		packages: &[Package],
		ranges: &[Dependency],
		options: &UpdateOptions,
	) -> crate::Result<Vec<InstallOperation>> {
		struct UpdatePair {
			newest: PackageVersion,
			installed: Option<PackageVersion>,
			directory: Option<PathBuf>,
			used: bool,
		}

		let mut installed = self.installed_snapshot();
		let mut ops = Vec::new();
		let mut pairs = Vec::<UpdatePair>::new();

		/* packages first */
		for p in packages {
			let newest = self.find_newest_installable(&p.name)
				.ok_or_else(|| crate::Error::Unsatisfiable(
					format!("no installable version found for the package {}", p.title_and_name())
				))?;

			let installed_fact = self.installed.get_newest_installed(&p.name);
			let newest_installed = installed_fact.as_ref()
				.and_then(|f| self.catalog.find_package_version(&f.package, &f.version));

			if newest_installed.is_none() && !options.install {
				return Err(crate::Error::Unsatisfiable(
					format!("no installed version found for the package {}", p.title_and_name())
				));
			}

			if let Some(b) = &newest_installed {
				if b.version >= newest.version {
					log::debug!("{} is up to date", p.name);
					continue;
				}
			}

			pairs.push(UpdatePair {
				newest,
				installed: newest_installed,
				directory: installed_fact.map(|f| f.directory),
				used: false,
			});
		}

		/* version ranges second */
		for range in ranges {
			let p = self.catalog.find_package(&range.package)
				.ok_or_else(|| crate::Error::NotFound(format!("cannot find the package {}", range.package)))?;

			let newest = self.find_best_match_to_install(range, &HashSet::new())
				.ok_or_else(|| crate::Error::Unsatisfiable(
					format!("no installable version found for the package {}", p.title_and_name())
				))?;

			let installed_fact = self.find_highest_installed_match(range);
			let newest_installed = installed_fact.as_ref()
				.and_then(|f| self.catalog.find_package_version(&f.package, &f.version));

			if newest_installed.is_none() && !options.install {
				return Err(crate::Error::Unsatisfiable(
					format!("no installed version found for the package {}", p.title_and_name())
				));
			}

			if let Some(b) = &newest_installed {
				if b.version >= newest.version {
					continue;
				}
			}

			pairs.push(UpdatePair {
				newest,
				installed: newest_installed,
				directory: installed_fact.map(|f| f.directory),
				used: false,
			});
		}

		/*
		Many packages cannot be installed side by side with their own
		next version, they overwrite shared state such as menu entries.
		Pair the uninstall of the old version directly with the install
		of the new one where that resolves without touching anything
		else; the reversed order for an update.
		*/
		for i in 0..pairs.len() {
			let Some(old) = pairs[i].installed.clone() else { continue };

			let mut installed_copy = installed.clone();
			let mut combined = match self.plan_uninstallation(&old, &mut installed_copy) {
				Ok(ops) => ops,
				Err(e) => {
					log::debug!("Combined update attempt for {} failed: {}", old, e);
					continue;
				}
			};

			let target = if i == 0 && options.target.is_some() {
				options.target.clone()
			} else if options.keep_directories {
				pairs[i].directory.clone()
			} else {
				None
			};

			let mut avoid = HashSet::new();
			match self.plan_installation(&pairs[i].newest, &mut installed_copy, &mut avoid, target) {
				Ok(install_ops) => combined.extend(install_ops),
				Err(e) => {
					log::debug!("Combined update attempt for {} failed: {}", pairs[i].newest, e);
					continue;
				}
			}

			if combined.len() == 2 {
				pairs[i].used = true;
				installed = installed_copy;
				ops.append(&mut combined);
			}
		}

		/* independent install planning for everything the combined pass left */
		for pair in pairs.iter().filter(|p| !p.used) {
			let target = if options.keep_directories && pair.installed.is_some() {
				pair.directory.clone()
			} else {
				None
			};

			let mut avoid = HashSet::new();
			let install_ops = self.plan_installation(&pair.newest, &mut installed, &mut avoid, target)?;
			ops.extend(install_ops);
		}

		/* and the matching uninstalls of the replaced versions */
		for pair in pairs.iter().filter(|p| !p.used) {
			if let Some(old) = &pair.installed {
				let uninstall_ops = self.plan_uninstallation(old, &mut installed)?;
				ops.extend(uninstall_ops);
			}
		}

		operation::simplify(&mut ops);
		Ok(ops)
	}
}
