//! Directory layout and network behaviour configuration.

use std::path::PathBuf;

use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepotConfig {
	install_dir: PathBuf,
	download_dir: PathBuf,
	data_dir: PathBuf,
	https_only: bool,
}

impl Default for DepotConfig {
	fn default() -> Self {
		Self {
			install_dir: {
				#[cfg(target_os = "windows")]
				let path = PathBuf::from(std::env::var("APPDATA").expect("APPDATA missing."));

				#[cfg(not(target_os = "windows"))]
				let path = if let Ok(e) = std::env::var("XDG_DATA_HOME") {
					PathBuf::from(e)
				} else {
					PathBuf::from(std::env::var("HOME").expect("HOME environment variable not set.")).join(".local/share")
				};

				let path = path.join("depot").join("apps");
				std::fs::create_dir_all(&path).expect("failed to create the installation directory.");
				path
			},
			download_dir: {
				#[cfg(target_os = "windows")]
				let path = PathBuf::from(std::env::var("APPDATA").expect("APPDATA missing."));

				#[cfg(not(target_os = "windows"))]
				let path = if let Ok(e) = std::env::var("XDG_CACHE_HOME") {
					PathBuf::from(e)
				} else {
					PathBuf::from(std::env::var("HOME").expect("HOME environment variable not set.")).join(".cache")
				};

				let path = path.join("depot").join("downloads");
				std::fs::create_dir_all(&path).expect("failed to create the downloads directory.");
				path
			},
			data_dir: {
				#[cfg(target_os = "windows")]
				let path = PathBuf::from(std::env::var("APPDATA").expect("APPDATA missing."));

				#[cfg(not(target_os = "windows"))]
				let path = if let Ok(e) = std::env::var("XDG_DATA_HOME") {
					PathBuf::from(e)
				} else {
					PathBuf::from(std::env::var("HOME").expect("HOME environment variable not set.")).join(".local/share")
				};

				let path = path.join("depot").join("data");
				std::fs::create_dir_all(&path).expect("failed to create the data directory.");
				path
			},
			https_only: true,
		}
	}
}

impl DepotConfig {
	/// Creates a config using the given directories as they are.
	///
	/// `Default` derives the directories from the environment instead.
	pub fn new(install_dir: PathBuf, download_dir: PathBuf, data_dir: PathBuf) -> Self {
		Self { install_dir, download_dir, data_dir, https_only: true }
	}

	pub fn install_dir(&self) -> &PathBuf {
		&self.install_dir
	}
	/// returns if the directory is valid or not.
	pub fn set_install_dir(&mut self, install_dir: PathBuf) -> bool {
		if install_dir.is_dir() {
			self.install_dir = install_dir;
			true
		} else {
			false
		}
	}

	pub fn download_dir(&self) -> &PathBuf {
		&self.download_dir
	}
	/// returns if the directory is valid or not.
	pub fn set_download_dir(&mut self, download_dir: PathBuf) -> bool {
		if download_dir.is_dir() {
			self.download_dir = download_dir;
			true
		} else {
			false
		}
	}

	pub fn data_dir(&self) -> &PathBuf {
		&self.data_dir
	}
	/// returns if the directory is valid or not.
	pub fn set_data_dir(&mut self, data_dir: PathBuf) -> bool {
		if data_dir.is_dir() {
			self.data_dir = data_dir;
			true
		} else {
			false
		}
	}

	pub fn https_only(&self) -> bool {
		self.https_only
	}
	pub fn set_https_only(&mut self, https_only: bool) {
		self.https_only = https_only;
	}

	fn config_file_path() -> PathBuf {
		#[cfg(target_os = "windows")]
		let path = PathBuf::from(std::env::var("APPDATA").expect("APPDATA missing."));

		#[cfg(not(target_os = "windows"))]
		let path = if let Ok(e) = std::env::var("XDG_CONFIG_HOME") {
			PathBuf::from(e)
		} else {
			PathBuf::from(std::env::var("HOME").expect("HOME environment variable not set.")).join(".config")
		};

		path.join("depot").join("config.json")
	}

	pub fn load_from_disk() -> crate::Result<Self> {
		let f = std::fs::File::open(Self::config_file_path())?;
		Ok(serde_json::from_reader(f)?)
	}

	pub fn save_to_disk(&self) -> crate::Result<()> {
		let path = Self::config_file_path();
		std::fs::create_dir_all(path.parent().expect("config path should have a parent directory"))?;
		let f = std::fs::File::create(path)?;
		Ok(serde_json::to_writer_pretty(f, self)?)
	}

	/// Load the config falling back to `Default` when there is no config file yet.
	pub fn load_or_default() -> Self {
		match Self::load_from_disk() {
			Ok(config) => config,
			Err(crate::Error::IO(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
			Err(e) => {
				log::warn!("Failed to read config file: {}", e);
				log::warn!("Using default config.");
				Self::default()
			}
		}
	}
}
