//! Tool configuration and the per call resolver context.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_REPOSITORY_URL: &str = "https://mavenrepo.openmrs.org/public";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	repository_url: String,
	data_dir: PathBuf,
	download_dir: PathBuf,
	https_only: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			repository_url: DEFAULT_REPOSITORY_URL.to_string(),
			data_dir: xdg_dir("XDG_DATA_HOME", ".local/share").join("distro-rs").join("data"),
			download_dir: xdg_dir("XDG_CACHE_HOME", ".cache").join("distro-rs").join("downloads"),
			https_only: true,
		}
	}
}

fn xdg_dir(var: &str, home_fallback: &str) -> PathBuf {
	if cfg!(target_os = "windows") {
		if let Ok(e) = std::env::var("APPDATA") {
			return PathBuf::from(e)
		}
	}

	if let Ok(e) = std::env::var(var) {
		PathBuf::from(e)
	} else if let Ok(home) = std::env::var("HOME") {
		PathBuf::from(home).join(home_fallback)
	} else {
		log::warn!("Neither {} nor HOME is set, using the current directory.", var);
		PathBuf::from(".")
	}
}

impl Config {
	pub fn default_path() -> PathBuf {
		xdg_dir("XDG_CONFIG_HOME", ".config").join("distro-rs").join("config.json")
	}

	/// Loads the config from [`default_path()`](Config::default_path()).
	///
	/// # Errors
	/// - [`IO`](crate::Error::IO) when the file is missing or unreadable.
	/// - [`SerdeJSON`](crate::Error::SerdeJSON) when the file is malformed.
	pub fn load_from_disk() -> crate::Result<Self> {
		Self::load_from_file(Self::default_path())
	}

	pub fn load_from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
		let file = std::fs::File::open(path)?;
		Ok(serde_json::from_reader(file)?)
	}

	pub fn save_to_disk(&self) -> crate::Result<()> {
		let path = Self::default_path();
		std::fs::create_dir_all(path.with_file_name(""))?;
		let file = std::fs::File::create(path)?;
		serde_json::to_writer_pretty(file, self)?;
		Ok(())
	}

	pub fn repository_url(&self) -> &str {
		&self.repository_url
	}
	pub fn set_repository_url(&mut self, url: impl Into<String>) {
		self.repository_url = url.into();
	}

	pub fn data_dir(&self) -> &Path {
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

	pub fn download_dir(&self) -> &Path {
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

	pub fn https_only(&self) -> bool {
		self.https_only
	}
	pub fn set_https_only(&mut self, https_only: bool) {
		self.https_only = https_only;
	}
}

/// Inputs the resolver would otherwise take from the process or the build session.
#[derive(Debug, Clone, Default)]
pub struct ResolverContext {
	/// Relative descriptor paths are resolved against this and fetched archives land here.
	pub working_dir: PathBuf,
	/// Values for `${...}` placeholders in descriptor files. `None` leaves placeholders as is.
	pub project_properties: Option<HashMap<String, String>>,
}

impl ResolverContext {
	pub fn new(working_dir: impl Into<PathBuf>) -> Self {
		Self {
			working_dir: working_dir.into(),
			project_properties: None,
		}
	}

	/// Sets the consuming project's version, exposed as `project.version` and
	/// `project.parent.version` alongside `extra`.
	pub fn with_project(mut self, version: impl Into<String>, extra: HashMap<String, String>) -> Self {
		let version = version.into();
		let mut properties = extra;
		properties.insert("project.version".to_string(), version.clone());
		properties.insert("project.parent.version".to_string(), version);
		self.project_properties = Some(properties);
		self
	}
}
