//! Artifact coordinates and identity.

use serde::{Deserialize, Serialize};

use crate::version::Version;

/// Group of packaged distributions.
pub const GROUP_DISTRO: &str = "org.openmrs.distro";
/// Group of add-on modules.
pub const GROUP_MODULE: &str = "org.openmrs.module";
/// Group of the platform web application.
pub const GROUP_WEB: &str = "org.openmrs.web";

/// Artifact id of the platform web application.
pub const WEBAPP_ARTIFACT_ID: &str = "openmrs-webapp";
/// Canonical artifact id of the reference application distro.
pub const REFERENCEAPPLICATION_ARTIFACT_ID: &str = "referenceapplication-package";
/// Module packages are published as a derived artifact carrying this suffix.
pub const MODULE_SUFFIX: &str = "-omod";

/// The packaging of an artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArtifactType {
	#[default] Jar,
	War,
	Zip,
	Omod,
	Other(String),
}

impl ArtifactType {
	pub fn as_str(&self) -> &str {
		match self {
			ArtifactType::Jar => "jar",
			ArtifactType::War => "war",
			ArtifactType::Zip => "zip",
			ArtifactType::Omod => "omod",
			ArtifactType::Other(s) => s,
		}
	}
}

impl From<&str> for ArtifactType {
	fn from(value: &str) -> Self {
		match value.to_ascii_lowercase().as_str() {
			"jar" => ArtifactType::Jar,
			"war" => ArtifactType::War,
			"zip" => ArtifactType::Zip,
			"omod" => ArtifactType::Omod,
			_ => ArtifactType::Other(value.to_string()),
		}
	}
}

impl From<String> for ArtifactType {
	fn from(value: String) -> Self { value.as_str().into() }
}

impl From<ArtifactType> for String {
	fn from(value: ArtifactType) -> Self { value.as_str().to_string() }
}

impl std::fmt::Display for ArtifactType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A named, versioned and typed unit of installable software.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artifact {
	pub group_id: String,
	pub artifact_id: String,
	pub version: Version,
	pub kind: ArtifactType,
	/* Only used to name the file when fetching. */
	dest_file_name: Option<String>,
}

impl Artifact {
	pub fn new(artifact_id: impl Into<String>, version: impl Into<Version>, group_id: impl Into<String>) -> Self {
		Self {
			group_id: group_id.into(),
			artifact_id: artifact_id.into(),
			version: version.into(),
			kind: ArtifactType::Jar,
			dest_file_name: None,
		}
	}

	pub fn with_type(mut self, kind: impl Into<ArtifactType>) -> Self {
		self.kind = kind.into();
		self
	}

	/// The platform web application artifact at the given version.
	pub fn platform(version: impl Into<Version>) -> Self {
		Self::new(WEBAPP_ARTIFACT_ID, version, GROUP_WEB).with_type(ArtifactType::War)
	}

	/// A module artifact, `id` given without the `-omod` suffix.
	pub fn module(id: &str, version: impl Into<Version>) -> Self {
		Self::new(format!("{id}{MODULE_SUFFIX}"), version, GROUP_MODULE)
	}

	/// `true` when this is the platform web application rather than a module.
	pub fn is_platform(&self) -> bool {
		self.kind == ArtifactType::War && self.artifact_id == WEBAPP_ARTIFACT_ID
	}

	/// The name of the file the artifact is stored under once installed.
	pub fn dest_file_name(&self) -> String {
		if let Some(name) = &self.dest_file_name {
			return name.clone()
		}
		if self.is_platform() {
			format!("openmrs-{}.war", self.version)
		} else if let Some(id) = self.artifact_id.strip_suffix(MODULE_SUFFIX) {
			format!("{}-{}.omod", id, self.version)
		} else {
			format!("{}-{}.{}", self.artifact_id, self.version, self.kind)
		}
	}

	pub fn set_dest_file_name(&mut self, name: impl Into<String>) {
		self.dest_file_name = Some(name.into());
	}

	/// The leading token of the artifact id, up to the first `-`.
	pub fn short_name(&self) -> &str {
		match self.artifact_id.split_once('-') {
			Some((head, _)) => head,
			None => &self.artifact_id,
		}
	}
}

impl std::fmt::Display for Artifact {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}:{}:{}", self.group_id, self.artifact_id, self.version, self.kind)
	}
}

/// Decides whether two artifacts are "the same thing" regardless of version.
pub trait ArtifactIdentity {
	fn same_artifact(&self, left: &Artifact, right: &Artifact) -> bool;
}

/// Matches artifacts by [`Artifact::short_name`].
///
/// Coarse: `appui-omod` and `appui-extras-omod` are considered the same artifact.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortNameIdentity;

impl ArtifactIdentity for ShortNameIdentity {
	fn same_artifact(&self, left: &Artifact, right: &Artifact) -> bool {
		left.short_name() == right.short_name()
	}
}
