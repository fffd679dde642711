//! Downloading and unpacking package artifacts.

use std::path::Path;

use sha2::Digest;

use crate::catalog::{DownloadDescriptor, HashAlgorithm};

/// Fetches a package artifact into a directory. Implementations verify
/// the content hash recorded in the descriptor byte for byte.
pub trait Downloader {
	/// Downloads into `dir` (which must exist) and returns the local file name.
	fn download(&self, descriptor: &DownloadDescriptor, dir: &Path) -> crate::Result<String>;
}

/// Downloader backed by a blocking HTTP client.
pub struct HttpDownloader {
	client: reqwest::blocking::Client,
}

impl HttpDownloader {
	pub fn new(config: &crate::DepotConfig) -> crate::Result<Self> {
		Ok(HttpDownloader {
			client: reqwest::blocking::Client::builder()
				.https_only(config.https_only())
				.build()?,
		})
	}
}

impl Downloader for HttpDownloader {
	fn download(&self, descriptor: &DownloadDescriptor, dir: &Path) -> crate::Result<String> {
		log::info!("Downloading {}", descriptor.url);

		let response = self.client.get(&descriptor.url).send()?.error_for_status()?;
		let body = response.bytes()?;

		verify_hash(descriptor, &body)?;

		let file_name = file_name_from_url(&descriptor.url);
		std::fs::write(dir.join(&file_name), &body)?;
		log::debug!("Wrote {} ({} bytes)", file_name, body.len());

		Ok(file_name)
	}
}

/// Checks `data` against the descriptor's recorded digest.
/// Descriptors without a recorded hash pass.
pub fn verify_hash(descriptor: &DownloadDescriptor, data: &[u8]) -> crate::Result<()> {
	if descriptor.hash.is_empty() {
		log::debug!("No hash recorded for {}, skipping verification", descriptor.url);
		return Ok(());
	}

	let actual = match descriptor.algorithm {
		HashAlgorithm::Sha256 => hex::encode(sha2::Sha256::digest(data)),
		HashAlgorithm::Sha512 => hex::encode(sha2::Sha512::digest(data)),
	};

	if !actual.eq_ignore_ascii_case(&descriptor.hash) {
		return Err(crate::Error::Download(
			format!("hash mismatch for {}: expected {} got {}", descriptor.url, descriptor.hash, actual)
		));
	}

	Ok(())
}

/// File name component of a download url, query parameters stripped.
pub fn file_name_from_url(url: &str) -> String {
	let path = url.split(['?', '#']).next().unwrap_or(url);
	path.rsplit('/')
		.next()
		.filter(|s| !s.is_empty())
		.unwrap_or("download")
		.to_string()
}

/// Unpacks `archive` into `dir` based on its file extension.
/// `.zip`, `.tar.gz` and `.tgz` are supported.
pub fn unpack_archive(archive: &Path, dir: &Path) -> crate::Result<()> {
	let name = archive.file_name()
		.map(|n| n.to_string_lossy().to_lowercase())
		.unwrap_or_default();

	if name.ends_with(".zip") {
		let file = std::fs::File::open(archive)?;
		zip::ZipArchive::new(file)?.extract(dir)?;
	} else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
		let file = std::fs::File::open(archive)?;
		tar::Archive::new(flate2::read::GzDecoder::new(file)).unpack(dir)?;
	} else {
		return Err(crate::Error::Download(format!("unsupported archive type: {}", name)));
	}

	log::debug!("Unpacked {} into {}", archive.display(), dir.display());
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;

	fn descriptor(hash: &str, algorithm: HashAlgorithm) -> DownloadDescriptor {
		DownloadDescriptor { url: "https://example.com/b.zip".to_string(), hash: hash.to_string(), algorithm }
	}

	#[test]
	fn file_name_from_url_strips_query() {
		assert_eq!(file_name_from_url("https://example.com/a/b-1.0.zip?token=1"), "b-1.0.zip");
		assert_eq!(file_name_from_url("https://example.com/"), "download");
	}

	#[test]
	fn matching_hash_passes() {
		/* sha256 of "hello" */
		let d = descriptor("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824", HashAlgorithm::Sha256);
		assert!(verify_hash(&d, b"hello").is_ok());
	}

	#[test]
	fn hash_comparison_is_case_insensitive() {
		let d = descriptor("2CF24DBA5FB0A30E26E83B2AC5B9E29E1B161E5C1FA7425E73043362938B9824", HashAlgorithm::Sha256);
		assert!(verify_hash(&d, b"hello").is_ok());
	}

	#[test]
	fn mismatched_hash_fails() {
		let d = descriptor("00000000", HashAlgorithm::Sha256);
		assert!(matches!(verify_hash(&d, b"hello"), Err(crate::Error::Download(_))));
	}

	#[test]
	fn missing_hash_passes() {
		let d = descriptor("", HashAlgorithm::Sha256);
		assert!(verify_hash(&d, b"anything").is_ok());
	}

	#[test]
	fn unknown_archive_type_is_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let archive = dir.path().join("b.rar");
		std::fs::write(&archive, b"junk").unwrap();
		assert!(matches!(unpack_archive(&archive, dir.path()), Err(crate::Error::Download(_))));
	}
}
