//! Remote Maven style repository access.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::{ArtifactFetcher, VersionLookup};
use crate::artifact::Artifact;
use crate::version::Version;

/// Artifact fetching and version lookup backed by a Maven layout repository over HTTP.
#[derive(Debug, Clone)]
pub struct MavenRepository {
	base_url: String,
	client: reqwest::blocking::Client,
}

impl MavenRepository {
	/// Repository at [`Config::repository_url`](crate::Config::repository_url).
	pub fn new(config: &crate::Config) -> crate::Result<Self> {
		Self::with_base_url(config.repository_url(), config.https_only())
	}

	pub fn with_base_url(base_url: impl Into<String>, https_only: bool) -> crate::Result<Self> {
		let client = reqwest::blocking::Client::builder()
			.https_only(https_only)
			.build()?;
		Ok(Self {
			base_url: base_url.into().trim_end_matches('/').to_string(),
			client,
		})
	}

	fn artifact_url(&self, artifact: &Artifact) -> String {
		artifact_url(&self.base_url, artifact)
	}

	fn get(&self, url: &str) -> crate::Result<reqwest::blocking::Response> {
		log::debug!("GET {}", url);
		Ok(self.client.get(url).send()?.error_for_status()?)
	}

	/// All versions listed in the artifact's `maven-metadata.xml`.
	fn versions(&self, artifact: &Artifact) -> crate::Result<Vec<Version>> {
		let url = format!("{}/maven-metadata.xml", self.artifact_url(artifact));
		let metadata = self.get(&url)?.text()?;
		Ok(parse_versions(&metadata))
	}

	/// Remote file name, which for snapshots carries the deploy timestamp instead of `SNAPSHOT`.
	fn remote_file_name(&self, artifact: &Artifact) -> crate::Result<String> {
		let extension = artifact.kind.as_str();
		let mut version = artifact.version.to_string();
		if artifact.version.is_unstable() {
			let url = format!("{}/{}/maven-metadata.xml", self.artifact_url(artifact), artifact.version);
			let metadata = self.get(&url)?.text()?;
			match parse_snapshot_value(&metadata, extension, artifact.version.as_str()) {
				Some(value) => version = value,
				None => log::warn!("No timestamped build of {} listed, trying plain snapshot name", artifact),
			}
		}
		Ok(format!("{}-{}.{}", artifact.artifact_id, version, extension))
	}
}

impl ArtifactFetcher for MavenRepository {
	fn fetch(&self, artifact: &Artifact, dest_dir: &Path) -> crate::Result<PathBuf> {
		let url = format!("{}/{}/{}", self.artifact_url(artifact), artifact.version, self.remote_file_name(artifact)?);
		let dest = dest_dir.join(artifact.dest_file_name());

		log::info!("Downloading {} from {}", artifact, url);
		let content = self.get(&url)?.bytes()?;

		std::fs::create_dir_all(dest_dir)?;
		std::fs::write(&dest, &content)?;
		log::debug!("Wrote {} bytes to {}", content.len(), dest.display());
		Ok(dest)
	}
}

impl VersionLookup for MavenRepository {
	fn latest_release(&self, artifact: &Artifact) -> crate::Result<String> {
		self.versions(artifact)?
			.into_iter()
			.filter(|v| !v.is_unstable())
			.max()
			.map(String::from)
			.ok_or_else(|| crate::Error::Parse(format!("no released versions of {}:{}", artifact.group_id, artifact.artifact_id)))
	}

	fn latest_snapshot(&self, artifact: &Artifact) -> crate::Result<String> {
		self.versions(artifact)?
			.into_iter()
			.filter(Version::is_unstable)
			.max()
			.map(String::from)
			.ok_or_else(|| crate::Error::Parse(format!("no snapshot versions of {}:{}", artifact.group_id, artifact.artifact_id)))
	}
}

/// `<base>/<group as path>/<artifact id>`
fn artifact_url(base_url: &str, artifact: &Artifact) -> String {
	format!("{}/{}/{}", base_url, artifact.group_id.replace('.', "/"), artifact.artifact_id)
}

fn version_pattern() -> &'static regex::Regex {
	static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
	PATTERN.get_or_init(|| regex::Regex::new(r"<version>\s*([^<\s]+)\s*</version>").expect("version pattern is valid"))
}

fn snapshot_block_pattern() -> &'static regex::Regex {
	static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
	PATTERN.get_or_init(|| regex::Regex::new(r"(?s)<snapshotVersion>(.*?)</snapshotVersion>").expect("snapshot pattern is valid"))
}

/// Matches the snapshot metadata tags read by [`parse_snapshot_value`], tag name in group 1.
fn snapshot_field_pattern() -> &'static regex::Regex {
	static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
	PATTERN.get_or_init(|| {
		regex::Regex::new(r"<(classifier|extension|value|timestamp|buildNumber)>\s*([^<]*?)\s*</(?:classifier|extension|value|timestamp|buildNumber)>")
			.expect("snapshot field pattern is valid")
	})
}

/// First value of the tag `name` in `body`.
fn field(body: &str, name: &str) -> Option<String> {
	snapshot_field_pattern()
		.captures_iter(body)
		.find(|c| c.get(1).map(|m| m.as_str()) == Some(name))
		.and_then(|c| c.get(2))
		.map(|m| m.as_str().to_string())
}

fn parse_versions(metadata: &str) -> Vec<Version> {
	version_pattern().captures_iter(metadata)
		.filter_map(|c| c.get(1))
		.map(|m| Version::parse(m.as_str()))
		.collect()
}

/// Finds the timestamped version for `extension` in version level snapshot metadata.
fn parse_snapshot_value(metadata: &str, extension: &str, version: &str) -> Option<String> {
	for cap in snapshot_block_pattern().captures_iter(metadata) {
		let Some(body) = cap.get(1).map(|m| m.as_str()) else { continue };
		if field(body, "classifier").is_some() {
			continue;
		}
		if field(body, "extension").as_deref() == Some(extension) {
			if let Some(value) = field(body, "value") {
				return Some(value)
			}
		}
	}

	/* Older metadata only records the latest timestamp and build number. */
	let timestamp = field(metadata, "timestamp")?;
	let build_number = field(metadata, "buildNumber")?;
	let base = version.strip_suffix("-SNAPSHOT").unwrap_or(version);
	Some(format!("{base}-{timestamp}-{build_number}"))
}
