//! Interfaces to everything outside the resolver and differential engine.
//!
//! The core only talks to these traits. [`maven::MavenRepository`] and
//! [`archive::ZipArchiveReader`] are the default implementations.

use std::path::{Path, PathBuf};

use crate::artifact::Artifact;

pub mod archive;
pub mod maven;

pub use archive::ZipArchiveReader;
pub use maven::MavenRepository;

/// Places an artifact's file in a directory.
pub trait ArtifactFetcher {
	/// Copies or downloads `artifact` into `dest_dir`, named by [`Artifact::dest_file_name`].
	///
	/// Returns the path of the written file.
	fn fetch(&self, artifact: &Artifact, dest_dir: &Path) -> crate::Result<PathBuf>;
}

/// Reads single entries out of an archive file.
pub trait ArchiveReader {
	/// Returns `None` when the archive has no entry named `entry_name`.
	fn read_entry(&self, archive: &Path, entry_name: &str) -> crate::Result<Option<Vec<u8>>>;
}

/// Answers "what is the newest version" for the `LATEST` keywords.
pub trait VersionLookup {
	fn latest_release(&self, artifact: &Artifact) -> crate::Result<String>;
	fn latest_snapshot(&self, artifact: &Artifact) -> crate::Result<String>;
}

/// Asks the user for a value.
pub trait Prompter {
	fn prompt(&self, text: &str, default: Option<&str>) -> crate::Result<String>;
}
