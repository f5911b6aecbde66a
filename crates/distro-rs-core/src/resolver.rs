//! Turns a user supplied distro specifier into a [`Descriptor`].
//!
//! A specifier is either a path to a descriptor file or a coordinate `group:artifact:version` /
//! `artifact:version`. Coordinates are fetched through an [`ArtifactFetcher`] and the descriptor
//! is read out of the packaged archive.

use std::path::Path;

use crate::artifact::{self, Artifact};
use crate::collaborator::{ArchiveReader, ArtifactFetcher, VersionLookup};
use crate::config::ResolverContext;
use crate::descriptor::{Descriptor, DESCRIPTOR_FILE_NAME};
use crate::version::Version;

/// Version keyword for the newest release.
pub const LATEST_KEYWORD: &str = "LATEST";
/// Version keyword for the newest snapshot.
pub const LATEST_SNAPSHOT_KEYWORD: &str = "LATEST-SNAPSHOT";
/// Short name users type for the reference application distro.
pub const REFERENCEAPPLICATION_ALIAS: &str = "referenceapplication";

/// Reference application releases below this can't be installed.
pub const SUPPORTED_FLOOR: &str = "2.1";
/// Reference application releases up to this never published a descriptor.
pub const LEGACY_CEILING: &str = "2.3.1";

/// File name a fetched distro archive is stored under while its descriptor is read.
const DISTRO_ARCHIVE_FILE_NAME: &str = "openmrs-distro.jar";

/// Expands the short group names accepted in specifiers.
pub fn expand_group(group: &str) -> &str {
	match group {
		"distro" => artifact::GROUP_DISTRO,
		"module" => artifact::GROUP_MODULE,
		"web" => artifact::GROUP_WEB,
		other => other,
	}
}

/// Parses a `group:artifact:version` or `artifact:version` coordinate.
///
/// - The group defaults to the distro group.
/// - `referenceapplication` in the distro group becomes `referenceapplication-package`.
/// - Artifacts in the module group get the `-omod` suffix.
/// - `LATEST` and `LATEST-SNAPSHOT` are resolved through `lookup`. Without one the keyword is kept.
///
/// # Errors
/// - [`InvalidSpecifier`](crate::Error::InvalidSpecifier) when there are more than three or fewer than two segments, or a segment is empty.
/// - Whatever `lookup` returns when resolving a keyword.
pub fn parse_distro_artifact(specifier: &str, lookup: Option<&dyn VersionLookup>) -> crate::Result<Artifact> {
	let split: Vec<&str> = specifier.split(':').collect();
	if split.len() > 3 || split.len() < 2 || split.iter().any(|s| s.trim().is_empty()) {
		return Err(crate::Error::InvalidSpecifier(specifier.to_string()))
	}

	let group_id = if split.len() == 3 { expand_group(split[0].trim()) } else { artifact::GROUP_DISTRO };
	let mut artifact_id = infer_distro_artifact_id(split[split.len() - 2].trim(), group_id).to_string();
	let version = split[split.len() - 1].trim();

	if group_id == artifact::GROUP_MODULE && !artifact_id.ends_with(artifact::MODULE_SUFFIX) {
		artifact_id.push_str(artifact::MODULE_SUFFIX);
	}

	let mut artifact = Artifact::new(artifact_id, version, group_id);

	if version.to_ascii_uppercase().contains(LATEST_KEYWORD) {
		match lookup {
			Some(lookup) if version.eq_ignore_ascii_case(LATEST_SNAPSHOT_KEYWORD) => {
				artifact.version = Version::parse(lookup.latest_snapshot(&artifact)?);
			},
			Some(lookup) if version.eq_ignore_ascii_case(LATEST_KEYWORD) => {
				artifact.version = Version::parse(lookup.latest_release(&artifact)?);
			},
			Some(_) => log::warn!("Unrecognized version keyword \"{}\" in {}", version, specifier),
			None => log::warn!("No version lookup available, \"{}\" left unresolved in {}", version, specifier),
		}
	}

	log::debug!("Parsed distro specifier {} as {}", specifier, artifact);
	Ok(artifact)
}

fn infer_distro_artifact_id<'a>(artifact_id: &'a str, group_id: &str) -> &'a str {
	if group_id == artifact::GROUP_DISTRO && artifact_id == REFERENCEAPPLICATION_ALIAS {
		artifact::REFERENCEAPPLICATION_ARTIFACT_ID
	} else {
		artifact_id
	}
}

fn is_reference_application(artifact: &Artifact) -> bool {
	artifact.artifact_id == artifact::REFERENCEAPPLICATION_ARTIFACT_ID
}

/// Reference application releases with a built in descriptor.
pub fn is_legacy_reference_application(artifact: &Artifact) -> bool {
	is_reference_application(artifact)
		&& artifact.version >= Version::parse(SUPPORTED_FLOOR)
		&& artifact.version <= Version::parse(LEGACY_CEILING)
}

/// Reference application releases too old to install.
pub fn is_unsupported_reference_application(artifact: &Artifact) -> bool {
	is_reference_application(artifact) && artifact.version < Version::parse(SUPPORTED_FLOOR)
}

/// Resolves specifiers using injected collaborators.
pub struct DistroResolver<'a> {
	context: ResolverContext,
	fetcher: &'a dyn ArtifactFetcher,
	archive: &'a dyn ArchiveReader,
	lookup: Option<&'a dyn VersionLookup>,
}

impl<'a> DistroResolver<'a> {
	pub fn new(context: ResolverContext, fetcher: &'a dyn ArtifactFetcher, archive: &'a dyn ArchiveReader) -> Self {
		Self {
			context,
			fetcher,
			archive,
			lookup: None,
		}
	}

	/// Enables `LATEST` keyword resolution.
	pub fn version_lookup(mut self, lookup: &'a dyn VersionLookup) -> Self {
		self.lookup = Some(lookup);
		self
	}

	pub fn context(&self) -> &ResolverContext {
		&self.context
	}

	/// Resolves a descriptor file path or a coordinate into a descriptor.
	///
	/// A path is tried first. If a file exists there it must be a descriptor, and its placeholders
	/// are substituted from the context's project properties. Anything else is parsed as a coordinate.
	///
	/// # Errors
	/// - [`InvalidSpecifier`](crate::Error::InvalidSpecifier) for a malformed coordinate.
	/// - [`UnsupportedVersion`](crate::Error::UnsupportedVersion) for reference application releases below 2.1.
	/// - [`Parse`](crate::Error::Parse) when the file at the path is not a valid descriptor.
	/// - [`UnresolvedPlaceholder`](crate::Error::UnresolvedPlaceholder) when the file references an unknown project property.
	/// - [`DescriptorMissing`](crate::Error::DescriptorMissing) when the fetched archive has no descriptor.
	/// - Errors from the fetcher and archive reader.
	pub fn resolve(&self, specifier: &str) -> crate::Result<Descriptor> {
		let path = self.context.working_dir.join(specifier);
		if path.is_file() {
			log::debug!("Reading descriptor from {}", path.display());
			let descriptor = Descriptor::load_from_file(&path)?;
			return match &self.context.project_properties {
				Some(properties) => descriptor.resolve_placeholders(properties),
				None => Ok(descriptor),
			}
		}

		let artifact = parse_distro_artifact(specifier, self.lookup)?;
		if is_unsupported_reference_application(&artifact) {
			return Err(crate::Error::UnsupportedVersion(format!("reference application versions below {SUPPORTED_FLOOR} are not supported, found {}", artifact.version)))
		}
		if is_legacy_reference_application(&artifact) {
			log::info!("Using built in descriptor for reference application {}", artifact.version);
			return Ok(Descriptor::legacy_reference_application(&artifact.version))
		}

		self.download_descriptor(artifact)
	}

	/// Resolves `specifier` and writes the descriptor to `destination`.
	pub fn resolve_and_save(&self, specifier: &str, destination: impl AsRef<Path>) -> crate::Result<Descriptor> {
		let descriptor = self.resolve(specifier)?;
		descriptor.save_to(destination)?;
		Ok(descriptor)
	}

	/// The descriptor at `path` (relative to the working dir), or `None` if there isn't a valid one.
	pub fn descriptor_from_file(&self, path: impl AsRef<Path>) -> Option<Descriptor> {
		let path = self.context.working_dir.join(path);
		if !path.is_file() {
			return None
		}
		match Descriptor::load_from_file(&path) {
			Ok(descriptor) => {
				log::debug!("Read descriptor from {}", path.display());
				Some(descriptor)
			},
			Err(e) => {
				log::debug!("{} is not a descriptor: {}", path.display(), e);
				None
			},
		}
	}

	/// The descriptor in the working directory, if there is one.
	pub fn descriptor_from_working_dir(&self) -> Option<Descriptor> {
		self.descriptor_from_file(DESCRIPTOR_FILE_NAME)
	}

	/// Fetches the distro archive and reads its packaged descriptor.
	pub fn download_descriptor(&self, artifact: Artifact) -> crate::Result<Descriptor> {
		let name = artifact.to_string();
		let content = self.extract_file(artifact, DESCRIPTOR_FILE_NAME)?
			.ok_or(crate::Error::DescriptorMissing(name.clone()))?;
		let text = String::from_utf8(content)
			.map_err(|_| crate::Error::Parse(format!("descriptor in {name} is not valid UTF-8")))?;
		Descriptor::parse(&text)
	}

	/// Fetches the distro archive into the working directory, reads one entry and removes the archive again.
	pub fn extract_file(&self, mut artifact: Artifact, entry_name: &str) -> crate::Result<Option<Vec<u8>>> {
		artifact.set_dest_file_name(DISTRO_ARCHIVE_FILE_NAME);
		let archive = self.fetcher.fetch(&artifact, &self.context.working_dir)?;
		let content = self.archive.read_entry(&archive, entry_name);
		if let Err(e) = std::fs::remove_file(&archive) {
			log::warn!("Failed to remove {}: {}", archive.display(), e);
		}
		content
	}
}
