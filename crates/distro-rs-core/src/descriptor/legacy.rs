//! Reference application releases from before distros carried their own descriptor.

use super::Descriptor;
use crate::version::Version;

/// Reference application version and the platform it shipped on, oldest first.
const REFERENCE_APPLICATION_PLATFORMS: &[(&str, &str)] = &[
	("2.1", "1.10.2"),
	("2.2", "1.11.2"),
	("2.3", "1.11.4"),
	("2.3.1", "1.11.5"),
];

pub(super) fn reference_application(version: &Version) -> Descriptor {
	/* Patch releases ride on the platform of the release they patch. */
	let platform = REFERENCE_APPLICATION_PLATFORMS.iter()
		.rev()
		.find(|(refapp, _)| Version::parse(refapp) <= *version)
		.or(REFERENCE_APPLICATION_PLATFORMS.first())
		.map(|(_, platform)| *platform)
		.unwrap_or_default();

	Descriptor {
		entries: vec![
			("name".to_string(), "Reference Application".to_string()),
			("version".to_string(), version.to_string()),
			("war.openmrs".to_string(), platform.to_string()),
		],
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test] fn exact_release_uses_its_platform() { assert_eq!(reference_application(&Version::parse("2.3.1")).platform_version(), Some("1.11.5")) }
	#[test] fn patch_release_uses_release_platform() { assert_eq!(reference_application(&Version::parse("2.2.1")).platform_version(), Some("1.11.2")) }
	#[test] fn keeps_requested_version() { assert_eq!(reference_application(&Version::parse("2.3")).version(), Some("2.3")) }
}
