//! Various helper functions for testing
//!
//! functions in this module should use results and not use any panics to avoid confusion in callers

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use distro_rs_core::artifact::Artifact;
use distro_rs_core::collaborator::{ArtifactFetcher, Prompter, VersionLookup};

/// Creates a temporary server directory with a platform war and module files.
///
/// # Parameters
/// - `platform` - Version of `openmrs-<version>.war` to create, `None` for no war.
/// - `modules` - `(id, version)` pairs written as `modules/<id>-<version>.omod`.
pub fn server_dir(platform: Option<&str>, modules: &[(&str, &str)]) -> std::io::Result<tempfile::TempDir> {
	let dir = tempfile::tempdir()?;
	if let Some(version) = platform {
		std::fs::write(dir.path().join(format!("openmrs-{version}.war")), b"")?;
	}
	let modules_dir = dir.path().join("modules");
	std::fs::create_dir_all(&modules_dir)?;
	for (id, version) in modules {
		std::fs::write(modules_dir.join(format!("{id}-{version}.omod")), b"")?;
	}
	Ok(dir)
}

/// Writes a zip archive at `path` holding `entries` as `(name, content)`.
pub fn write_archive(path: impl AsRef<Path>, entries: &[(&str, &str)]) -> zip::result::ZipResult<()> {
	let mut zip = zip::ZipWriter::new(std::fs::File::create(path)?);
	for (name, content) in entries {
		zip.start_file(*name, zip::write::FileOptions::default())?;
		zip.write_all(content.as_bytes())?;
	}
	zip.finish()?;
	Ok(())
}

/// A config whose data and download directories live under `root`.
pub fn config_in(root: impl AsRef<Path>) -> std::io::Result<distro_rs_core::Config> {
	let mut config = distro_rs_core::Config::default();
	let data = root.as_ref().join("data");
	let downloads = root.as_ref().join("downloads");
	std::fs::create_dir_all(&data)?;
	std::fs::create_dir_all(&downloads)?;
	config.set_data_dir(data);
	config.set_download_dir(downloads);
	Ok(config)
}

/// Serves packaged distros from memory.
///
/// Each registered artifact id is packaged as an archive holding the given descriptor text
/// when fetched. Every fetch is recorded.
#[derive(Default)]
pub struct FixtureFetcher {
	distros: HashMap<String, Option<String>>,
	pub fetched: RefCell<Vec<Artifact>>,
}

impl FixtureFetcher {
	pub fn new() -> Self {
		Self::default()
	}

	/// Serves `artifact_id` as an archive containing `descriptor` as `openmrs-distro.properties`.
	pub fn with_distro(mut self, artifact_id: &str, descriptor: &str) -> Self {
		self.distros.insert(artifact_id.to_string(), Some(descriptor.to_string()));
		self
	}

	/// Serves `artifact_id` as an archive with no descriptor in it.
	pub fn with_empty_distro(mut self, artifact_id: &str) -> Self {
		self.distros.insert(artifact_id.to_string(), None);
		self
	}

	pub fn fetch_count(&self) -> usize {
		self.fetched.borrow().len()
	}
}

impl ArtifactFetcher for FixtureFetcher {
	fn fetch(&self, artifact: &Artifact, dest_dir: &Path) -> distro_rs_core::Result<PathBuf> {
		self.fetched.borrow_mut().push(artifact.clone());
		let descriptor = self.distros.get(&artifact.artifact_id)
			.ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, format!("no fixture for {artifact}")))?;

		let dest = dest_dir.join(artifact.dest_file_name());
		let mut entries = vec![("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\n")];
		if let Some(descriptor) = descriptor {
			entries.push(("openmrs-distro.properties", descriptor.as_str()));
		}
		write_archive(&dest, &entries)?;
		Ok(dest)
	}
}

/// Version lookup answering with fixed versions.
pub struct FixedVersions {
	pub release: String,
	pub snapshot: String,
}

impl VersionLookup for FixedVersions {
	fn latest_release(&self, _: &Artifact) -> distro_rs_core::Result<String> {
		Ok(self.release.clone())
	}

	fn latest_snapshot(&self, _: &Artifact) -> distro_rs_core::Result<String> {
		Ok(self.snapshot.clone())
	}
}

/// Answers prompts from a map keyed by prompt text, falling back to the offered default.
#[derive(Default)]
pub struct CannedPrompter {
	pub answers: HashMap<String, String>,
	pub asked: RefCell<Vec<String>>,
}

impl CannedPrompter {
	pub fn answering(answers: &[(&str, &str)]) -> Self {
		Self {
			answers: answers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
			asked: Default::default(),
		}
	}
}

impl Prompter for CannedPrompter {
	fn prompt(&self, text: &str, default: Option<&str>) -> distro_rs_core::Result<String> {
		self.asked.borrow_mut().push(text.to_string());
		self.answers.get(text)
			.cloned()
			.or_else(|| default.map(str::to_string))
			.ok_or_else(|| distro_rs_core::Error::Parse(format!("no canned answer for \"{text}\"")))
	}
}
