//! Library error type.

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

use crate::artifact::Artifact;

#[derive(Debug, Error)]
pub enum Error {
	/// The specifier could not be split into a coordinate.
	#[error("invalid distro: {0}")]
	InvalidSpecifier(String),
	/// The distro exists but is older than anything this tool can install.
	#[error("unsupported version: {0}")]
	UnsupportedVersion(String),
	/// A differential would have removed the platform artifact.
	#[error("only modules can be deleted, deleting the platform artifact {0} is not possible")]
	CoreArtifactDeletionAttempted(Artifact),
	/// The fetched distro archive did not contain a descriptor.
	#[error("descriptor missing from {0}")]
	DescriptorMissing(String),
	#[error("unresolved placeholder: ${{{0}}}")]
	UnresolvedPlaceholder(String),
	#[error("parsing error: {0}")]
	Parse(String),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("reqwest error: {0}")]
	Reqwest(#[from] reqwest::Error),
	#[error("zip error: {0}")]
	Zip(#[from] zip::result::ZipError),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("bincode error: {0}")]
	Bincode(#[from] bincode::Error),
	#[error("already exists")]
	AlreadyExists,
}
