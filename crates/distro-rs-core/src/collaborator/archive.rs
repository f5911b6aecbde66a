//! Zip archive entry extraction.

use std::io::Read;
use std::path::Path;

use super::ArchiveReader;

/// Largest entry [`ZipArchiveReader`] reads into memory.
pub const MAX_ENTRY_SIZE: u64 = 8 * 1024 * 1024;

/// Reads entries from zip based archives (`.jar`, `.zip`, `.omod`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveReader;

impl ArchiveReader for ZipArchiveReader {
	fn read_entry(&self, archive: &Path, entry_name: &str) -> crate::Result<Option<Vec<u8>>> {
		let mut zip = zip::ZipArchive::new(std::fs::File::open(archive)?)?;
		let mut entry = match zip.by_name(entry_name) {
			Ok(entry) => entry,
			Err(zip::result::ZipError::FileNotFound) => {
				log::debug!("{} has no entry {}", archive.display(), entry_name);
				return Ok(None)
			},
			Err(e) => return Err(e.into()),
		};
		let mut content = Vec::new();
		entry.by_ref().take(MAX_ENTRY_SIZE + 1).read_to_end(&mut content)?;
		if content.len() as u64 > MAX_ENTRY_SIZE {
			return Err(crate::Error::Parse(format!("{} in {} is larger than {} bytes", entry_name, archive.display(), MAX_ENTRY_SIZE)))
		}
		Ok(Some(content))
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use std::io::Write;

	fn write_zip(path: &Path) {
		let mut zip = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
		zip.start_file("openmrs-distro.properties", zip::write::FileOptions::default()).unwrap();
		zip.write_all(b"name=test\n").unwrap();
		zip.finish().unwrap();
	}

	#[test]
	fn reads_present_entry() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("distro.jar");
		write_zip(&path);
		let content = ZipArchiveReader.read_entry(&path, "openmrs-distro.properties").unwrap();
		assert_eq!(content.as_deref(), Some(b"name=test\n".as_slice()));
	}

	#[test]
	fn missing_entry_is_none() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("distro.jar");
		write_zip(&path);
		assert!(ZipArchiveReader.read_entry(&path, "other.txt").unwrap().is_none());
	}

	#[test]
	fn not_a_zip_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("distro.jar");
		std::fs::write(&path, b"plain text").unwrap();
		assert!(matches!(ZipArchiveReader.read_entry(&path, "x"), Err(crate::Error::Zip(_))));
	}

	#[test]
	fn oversized_entry_is_refused() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("big.jar");
		let mut zip = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
		zip.start_file("openmrs-distro.properties", zip::write::FileOptions::default()).unwrap();
		zip.write_all(&vec![b'#'; MAX_ENTRY_SIZE as usize + 1]).unwrap();
		zip.finish().unwrap();

		assert!(matches!(ZipArchiveReader.read_entry(&path, "openmrs-distro.properties"), Err(crate::Error::Parse(_))));
	}
}
