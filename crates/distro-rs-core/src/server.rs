//! Server installation bookkeeping.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::artifact::Artifact;
use crate::collaborator::Prompter;
use crate::descriptor::Descriptor;
use crate::differential::{Differ, UpgradeDifferential};

pub mod scan;
pub use scan::scan_installed_artifacts;

/// Database driver name of the embedded H2 database.
pub const DRIVER_H2: &str = "h2";

/// A single server installation.
///
/// Saved to `<data_dir>/servers/<name>.bin`. As with any on disk record, call
/// [`save_to_disk()`](ServerInstance::save_to_disk()) after changing it, it is not saved automatically.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ServerInstance {
	name: String,
	path: PathBuf,
	platform_version: String,
	db_driver: String,
	artifacts: Vec<Artifact>,
	properties: BTreeMap<String, String>,
	distro: Option<Artifact>,
}

impl ServerInstance {
	/// Registers a new server.
	///
	/// The installed artifacts are read from `path` with [`scan_installed_artifacts`]. If no
	/// platform file is found there, the platform at `platform_version` is assumed.
	///
	/// # Errors
	/// - [`AlreadyExists`](crate::Error::AlreadyExists) when a saved server has the same name or path.
	/// - [`IO`](crate::Error::IO) when `path` or the servers directory can't be read.
	pub fn new(config: &crate::Config, name: impl Into<String>, path: impl AsRef<Path>, platform_version: impl Into<String>, db_driver: impl Into<String>) -> crate::Result<Self> {
		let name = name.into();
		let path = path.as_ref();
		let servers_dir = servers_dir(config);

		if servers_dir.is_dir() {
			log::debug!("Checking for existing servers in {}", servers_dir.display());
			for server_path in servers_dir.read_dir()?.map(|r| r.map(|r| r.path())) {
				let server = Self::load_by_file(server_path?)?;
				if server.name == name || server.path == path {
					return Err(crate::Error::AlreadyExists)
				}
			}
		}

		let mut server = Self {
			name,
			path: path.to_path_buf(),
			platform_version: platform_version.into(),
			db_driver: db_driver.into(),
			artifacts: Vec::new(),
			properties: BTreeMap::new(),
			distro: None,
		};
		server.rescan()?;

		log::info!("Created server {} at {}", server.name, server.path.display());
		Ok(server)
	}

	/* Fields */

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn platform_version(&self) -> &str {
		&self.platform_version
	}

	pub fn db_driver(&self) -> &str {
		&self.db_driver
	}

	pub fn artifacts(&self) -> &[Artifact] {
		&self.artifacts
	}

	pub fn set_artifacts(&mut self, artifacts: Vec<Artifact>) {
		if let Some(platform) = artifacts.iter().find(|a| a.is_platform()) {
			self.platform_version = platform.version.to_string();
		}
		self.artifacts = artifacts;
	}

	pub fn properties(&self) -> &BTreeMap<String, String> {
		&self.properties
	}

	pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.properties.insert(name.into(), value.into());
	}

	pub fn distro(&self) -> Option<&Artifact> {
		self.distro.as_ref()
	}

	pub fn set_distro(&mut self, distro: Option<Artifact>) {
		self.distro = distro;
	}

	/* Artifacts */

	/// Re-reads the installed artifacts from the server directory.
	pub fn rescan(&mut self) -> crate::Result<()> {
		let mut artifacts = scan_installed_artifacts(&self.path)?;
		if !artifacts.iter().any(Artifact::is_platform) {
			log::debug!("No platform file in {}, assuming {}", self.path.display(), self.platform_version);
			artifacts.insert(0, Artifact::platform(self.platform_version.as_str()));
		}
		self.set_artifacts(artifacts);
		Ok(())
	}

	/// Descriptor describing this server as a bare platform installation.
	pub fn platform_descriptor(&self) -> Descriptor {
		Descriptor::for_platform(self.name.as_str(), self.platform_version.as_str(), self.db_driver == DRIVER_H2)
	}

	/// Changes needed to bring this server to `descriptor`.
	///
	/// # Errors
	/// - [`CoreArtifactDeletionAttempted`](crate::Error::CoreArtifactDeletionAttempted) when the descriptor names no platform.
	pub fn calculate_update_differential(&self, descriptor: &Descriptor) -> crate::Result<UpgradeDifferential> {
		self.calculate_update_differential_with(&Differ::new(), descriptor)
	}

	pub fn calculate_update_differential_with<I: crate::artifact::ArtifactIdentity>(&self, differ: &Differ<I>, descriptor: &Descriptor) -> crate::Result<UpgradeDifferential> {
		differ.diff(&self.artifacts, &descriptor.target_artifacts())
	}

	/* Properties */

	/// Stores the descriptor's custom properties on this server.
	///
	/// Values come from `overrides`, then the descriptor, then `prompter`, see
	/// [`reconcile_properties`](crate::reconcile::reconcile_properties).
	pub fn apply_properties(&mut self, descriptor: &Descriptor, overrides: &HashMap<String, String>, prompter: &dyn Prompter) -> crate::Result<()> {
		let resolved = crate::reconcile::reconcile_properties(descriptor, overrides, prompter)?;
		log::info!("Setting {} properties on server {}", resolved.len(), self.name);
		self.properties.extend(resolved);
		Ok(())
	}

	/* Serialization */

	/// Loads a server with the given name.
	///
	/// # Errors
	/// - [`IO`](crate::Error::IO) when opening or reading from the file.
	/// - [`Bincode`](crate::Error::Bincode) when deserializing the file.
	pub fn load_by_name(config: &crate::Config, name: impl AsRef<str>) -> crate::Result<Self> {
		Self::load_by_file(servers_dir(config).join(format!("{}.bin", name.as_ref())))
	}

	/// Loads a server from a file at a given path.
	pub fn load_by_file(path: impl AsRef<Path>) -> crate::Result<Self> {
		let file = std::fs::File::open(path)?;
		Ok(bincode::deserialize_from(file)?)
	}

	/// Saves the server record.
	///
	/// # Errors
	/// - [`IO`](crate::Error::IO) when opening the file, writing to it or creating it's parent directories.
	/// - [`Bincode`](crate::Error::Bincode) when serializing the file.
	pub fn save_to_disk(&self, config: &crate::Config) -> crate::Result<()> {
		let path = servers_dir(config).join(format!("{}.bin", self.name));
		std::fs::create_dir_all(path.with_file_name(""))?;
		let file = std::fs::File::create(path)?;
		bincode::serialize_into(file, self)?;
		Ok(())
	}
}

fn servers_dir(config: &crate::Config) -> PathBuf {
	config.data_dir().join("servers")
}
