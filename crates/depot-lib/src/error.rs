//! Library error type.

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("not found: {0}")]
	NotFound(String),
	#[error("cannot satisfy dependency: {0}")]
	Unsatisfiable(String),
	#[error("package version {0} is locked by another operation")]
	Locked(String),
	#[error("directory {} is already in use", .0.display())]
	DirectoryConflict(std::path::PathBuf),
	#[error("download failed: {0}")]
	Download(String),
	#[error("hook script failed: {0}")]
	Script(String),
	#[error("the operation was cancelled")]
	Cancelled,
	#[error("reqwest error: {0}")]
	Reqwest(#[from] reqwest::Error),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("bincode error: {0}")]
	Bincode(#[from] bincode::Error),
	#[error("zip error: {0}")]
	Zip(#[from] zip::result::ZipError),
	#[error("parsing error: {0}")]
	Parse(String),
}
