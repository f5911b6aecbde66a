//! Works out what is installed in a server directory from its file names.

use std::path::Path;

use crate::artifact::Artifact;

/// Directory under the server root holding module files.
pub const MODULES_DIR: &str = "modules";

/// Lists the artifacts installed in `server_dir`.
///
/// The platform comes from `openmrs-<version>.war` in the root, modules from
/// `modules/<id>-<version>.omod`. Files that don't carry a version are skipped, a bare
/// `openmrs.war` included. [`ServerInstance`](crate::ServerInstance) supplies its recorded
/// platform version in that case.
/// The platform, if found, is first. Modules follow sorted by file name.
///
/// # Errors
/// - [`IO`](crate::Error::IO) when `server_dir` can't be read.
pub fn scan_installed_artifacts(server_dir: impl AsRef<Path>) -> crate::Result<Vec<Artifact>> {
	let server_dir = server_dir.as_ref();
	let mut artifacts = Vec::new();

	for entry in walkdir::WalkDir::new(server_dir).min_depth(1).max_depth(1).sort_by_file_name() {
		let entry = entry.map_err(std::io::Error::from)?;
		if !entry.file_type().is_file() {
			continue;
		}
		let file_name = entry.file_name().to_string_lossy();
		let Some(stem) = file_name.strip_suffix(".war") else { continue };
		match split_versioned_name(stem) {
			Some(("openmrs", version)) => {
				let mut platform = Artifact::platform(version);
				platform.set_dest_file_name(file_name.as_ref());
				artifacts.push(platform);
			},
			_ => log::debug!("Ignoring {} while looking for the platform", file_name),
		}
	}

	let modules_dir = server_dir.join(MODULES_DIR);
	if !modules_dir.is_dir() {
		log::debug!("{} has no modules directory", server_dir.display());
		return Ok(artifacts)
	}

	for entry in walkdir::WalkDir::new(&modules_dir).min_depth(1).max_depth(1).sort_by_file_name() {
		let entry = entry.map_err(std::io::Error::from)?;
		if !entry.file_type().is_file() {
			continue;
		}
		let file_name = entry.file_name().to_string_lossy();
		let Some(stem) = file_name.strip_suffix(".omod") else { continue };
		match split_versioned_name(stem) {
			Some((id, version)) => {
				let mut module = Artifact::module(id, version);
				module.set_dest_file_name(file_name.as_ref());
				artifacts.push(module);
			},
			None => log::warn!("Module file {} has no version in its name, skipping", file_name),
		}
	}

	log::debug!("Found {} installed artifacts in {}", artifacts.len(), server_dir.display());
	Ok(artifacts)
}

/// Splits `name-1.2.3` at the first `-` that is followed by a digit.
fn split_versioned_name(stem: &str) -> Option<(&str, &str)> {
	let bytes = stem.as_bytes();
	(0..bytes.len().saturating_sub(1))
		.find(|&i| bytes[i] == b'-' && bytes[i + 1].is_ascii_digit())
		.filter(|&i| i > 0)
		.map(|i| (&stem[..i], &stem[i + 1..]))
}

#[cfg(test)]
mod test {
	use super::*;

	#[test] fn splits_simple_name() { assert_eq!(split_versioned_name("appui-1.9.0"), Some(("appui", "1.9.0"))) }
	#[test] fn keeps_dashes_in_id() { assert_eq!(split_versioned_name("app-ui-2.0-SNAPSHOT"), Some(("app-ui", "2.0-SNAPSHOT"))) }
	#[test] fn no_version_is_none() { assert_eq!(split_versioned_name("openmrs"), None) }
	#[test] fn leading_version_is_none() { assert_eq!(split_versioned_name("-1.0"), None) }

	#[test]
	fn scans_platform_and_modules() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::create_dir(dir.path().join(MODULES_DIR)).unwrap();
		std::fs::write(dir.path().join("openmrs-2.5.9.war"), b"").unwrap();
		std::fs::write(dir.path().join("openmrs.war"), b"").unwrap();
		std::fs::write(dir.path().join(MODULES_DIR).join("webservices.rest-2.38.0.omod"), b"").unwrap();
		std::fs::write(dir.path().join(MODULES_DIR).join("appui-1.16.0.omod"), b"").unwrap();
		std::fs::write(dir.path().join(MODULES_DIR).join("notes.txt"), b"").unwrap();

		let artifacts = scan_installed_artifacts(dir.path()).unwrap();
		assert_eq!(artifacts.len(), 3);
		assert!(artifacts[0].is_platform());
		assert_eq!(artifacts[0].version.as_str(), "2.5.9");
		assert_eq!(artifacts[1].artifact_id, "appui-omod");
		assert_eq!(artifacts[2].artifact_id, "webservices.rest-omod");
		assert_eq!(artifacts[2].dest_file_name(), "webservices.rest-2.38.0.omod");
	}

	#[test]
	fn missing_modules_dir_is_fine() {
		let dir = tempfile::tempdir().unwrap();
		assert!(scan_installed_artifacts(dir.path()).unwrap().is_empty());
	}

	#[test]
	fn missing_server_dir_is_io_error() {
		let dir = tempfile::tempdir().unwrap();
		assert!(matches!(scan_installed_artifacts(dir.path().join("nope")), Err(crate::Error::IO(_))));
	}
}
