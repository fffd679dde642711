use std::io::Write;
use std::sync::Arc;

use depot::Depot;
use depot::DepotConfig;
use depot::Job;
use depot::MemoryCatalog;
use depot::catalog::InstalledPackageVersion;
use depot::executor::{CloseFlags, HttpDownloader, ScriptHookRunner};
use depot::installed::MemoryInstalledStore;
use depot::resolver::{InstallOperation, UpdateOptions};

#[derive(Debug, thiserror::Error)]
enum Error {
	#[error("depot error: {0}")]
	Depot(#[from] depot::Error),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("worker panicked")]
	WorkerPanicked,
}

#[tokio::main]
async fn main() {
	env_logger::init();

	let mut opts;

	/* Parse console input */
	let parsed_options = {
		let args: Vec<String> = std::env::args().collect();

		opts = getopts::Options::new();
		opts.optflag("h", "help", "Show help");
		opts.optflag("", "all", "Update every installed package");
		opts.optflag("", "dry-run", "Print the plan without executing it");
		opts.optflag("", "keep-directories", "Reuse the directory of the replaced version when updating");
		opts.optopt("", "target", "Installation directory for the first package", "DIR");
		opts.parsing_style(getopts::ParsingStyle::FloatingFrees);

		let parsed_options = match opts.parse(&args[1..]) {
			Ok(m) => { m }
			Err(e) => { println!("Unable to parse options: {}", e); return }
		};

		if parsed_options.opt_present("h") {
			eprintln!("{}", opts.usage("Usage: depot [install|remove|update|list] [packages..]"));
			return;
		}

		parsed_options
	};

	let config = DepotConfig::load_or_default();

	let catalog = match MemoryCatalog::load_from_disk(&config) {
		Ok(db) => db,
		Err(e) => {
			match e {
				depot::Error::IO(e) if e.kind() == std::io::ErrorKind::NotFound => {
					match import_catalog(&config) {
						Ok(db) => db,
						Err(e) => {
							log::error!("Failed to import the catalog: {}", e);
							log::error!("Place a catalog.json into {}", config.data_dir().display());
							return
						}
					}
				}
				depot::Error::Bincode(_) => {
					log::warn!("Catalog cache format likely changed, re-importing...");
					match import_catalog(&config) {
						Ok(db) => db,
						Err(e) => {
							log::error!("Failed to import the catalog: {}", e);
							return
						}
					}
				}
				_ => {
					log::error!("Failed to open the catalog: {}", e);
					return;
				}
			}
		}
	};

	let installed = match load_installed_store(&config) {
		Ok(store) => store,
		Err(e) => {
			log::error!("Failed to read the installed package list: {}", e);
			return;
		}
	};

	let depot = Arc::new(Depot::new(config, Box::new(catalog), Box::new(installed)));

	let Some(command) = parsed_options.free.first() else {
		eprintln!("{}", opts.usage("Usage: depot [install|remove|update|list] [packages..]"));
		return;
	};

	let names: Vec<String> = parsed_options.free[1..].to_vec();
	let dry_run = parsed_options.opt_present("dry-run");
	let target = parsed_options.opt_str("target").map(std::path::PathBuf::from);

	let plan = match command.as_str() {
		"install" => {
			if names.is_empty() { log::error!("No packages given."); return }
			depot.plan_install(&names, target)
		}
		"remove" => {
			if names.is_empty() { log::error!("No packages given."); return }
			depot.plan_remove(&names)
		}
		"update" => {
			let options = UpdateOptions {
				keep_directories: parsed_options.opt_present("keep-directories"),
				install: false,
				target,
			};
			if parsed_options.opt_present("all") {
				depot.plan_update_all(&options)
			} else if names.is_empty() {
				log::error!("No packages given, did you mean --all?");
				return
			} else {
				depot.plan_update(&names, &options)
			}
		}
		"list" => {
			list_packages(&depot);
			return;
		}
		other => {
			log::error!("Unknown command `{}`.", other);
			return;
		}
	};

	let ops = match plan {
		Ok(ops) => ops,
		Err(e) => {
			log::error!("Planning failed: {}", e);
			return;
		}
	};

	if ops.is_empty() {
		println!("Nothing to do.");
		return;
	}

	println!("Planned operations:");
	for op in &ops {
		println!("  {}", op);
	}

	if dry_run {
		return;
	}

	let result = run_operations(depot.clone(), ops).await;

	if let Err(e) = save_installed_store(&depot) {
		log::error!("Failed to save the installed package list: {}", e);
	}

	match result {
		Ok(()) => println!("Done."),
		Err(e) => {
			log::error!("Execution failed: {}", e);
			std::process::exit(1);
		}
	}
}

fn import_catalog(config: &DepotConfig) -> depot::Result<MemoryCatalog> {
	let path = config.data_dir().join("catalog.json");
	log::info!("Importing catalog from {}", path.display());
	let f = std::fs::File::open(path)?;
	let db = MemoryCatalog::read_from_json(f)?;
	db.save_to_disk(config)?;
	Ok(db)
}

fn installed_store_path(config: &DepotConfig) -> std::path::PathBuf {
	config.data_dir().join("installed.json")
}

fn load_installed_store(config: &DepotConfig) -> Result<MemoryInstalledStore, Error> {
	match std::fs::File::open(installed_store_path(config)) {
		Ok(f) => {
			let entries: Vec<InstalledPackageVersion> = serde_json::from_reader(f)?;
			Ok(MemoryInstalledStore::new(entries))
		}
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MemoryInstalledStore::default()),
		Err(e) => Err(e.into()),
	}
}

fn save_installed_store(depot: &Depot) -> Result<(), Error> {
	let f = std::fs::File::create(installed_store_path(depot.config()))?;
	serde_json::to_writer_pretty(f, &depot.installed().get_all_installed())?;
	Ok(())
}

fn list_packages(depot: &Depot) {
	let resolver = depot.resolver();
	let catalog = depot.catalog();

	let mut names: Vec<String> = depot.installed().get_all_installed()
		.into_iter()
		.map(|ipv| ipv.package)
		.collect();
	names.sort();
	names.dedup();

	if names.is_empty() {
		println!("No packages installed.");
	}

	for name in names {
		let installed = depot.installed().get_newest_installed(&name)
			.map(|ipv| ipv.version.to_string())
			.unwrap_or_else(|| "-".to_string());
		let available = resolver.find_newest_installable(&name)
			.map(|pv| pv.version.to_string())
			.unwrap_or_else(|| "-".to_string());
		let title = catalog.find_package(&name)
			.map(|p| p.title)
			.unwrap_or_else(|| name.clone());

		println!("{:40} {:12} installed, {:12} available", title, installed, available);
	}
}

/// Runs the executor on a blocking worker while this task renders
/// progress and waits for Ctrl-C to request cancellation.
async fn run_operations(depot: Arc<Depot>, ops: Vec<InstallOperation>) -> Result<(), Error> {
	let job = Job::new();
	let mut rx = job.subscribe();

	let worker = {
		let depot = depot.clone();
		let job = job.clone();
		tokio::task::spawn_blocking(move || -> depot::Result<()> {
			let downloader = HttpDownloader::new(depot.config())?;
			let hooks = ScriptHookRunner { print_script_output: true };
			depot.execute(&job, ops, CloseFlags::CLOSE_WINDOWS, &downloader, &hooks)
		})
	};
	tokio::pin!(worker);

	loop {
		tokio::select! {
			changed = rx.changed() => {
				if changed.is_ok() {
					let snapshot = rx.borrow_and_update().clone();
					print!("\r{:5.1}% {}", snapshot.progress * 100.0, snapshot.hint);
					let _ = std::io::stdout().flush();
				}
			}
			_ = tokio::signal::ctrl_c() => {
				log::warn!("Cancellation requested...");
				job.cancel();
			}
			result = &mut worker => {
				println!();
				return match result {
					Ok(r) => r.map_err(Error::Depot),
					Err(_) => Err(Error::WorkerPanicked),
				};
			}
		}
	}
}
