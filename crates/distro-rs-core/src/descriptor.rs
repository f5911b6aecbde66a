//! The distribution descriptor: target state of a server installation.
//!
//! A descriptor is a flat list of `key=value` entries. The keys carry meaning by prefix:
//! - `name`, `version` - the distro itself.
//! - `war.openmrs` - platform version, `war.openmrs.groupId` overrides its group.
//! - `omod.<id>` - module version, with optional `omod.<id>.groupId` and `omod.<id>.type`.
//! - `property.<name>`, `property.<name>.prompt`, `property.<name>.default` - custom properties.
//! - `db.h2.supported` - whether the distro can run on the embedded H2 database.
//!
//! Unknown keys are kept so a descriptor renders back to what it was read from.

use std::collections::HashMap;
use std::path::Path;

use crate::artifact::{Artifact, ArtifactType, GROUP_MODULE, GROUP_WEB, MODULE_SUFFIX, WEBAPP_ARTIFACT_ID};
use crate::version::Version;

pub mod properties;
mod legacy;

/// Name of the descriptor file inside a packaged distro or a project directory.
pub const DESCRIPTOR_FILE_NAME: &str = "openmrs-distro.properties";

const NAME: &str = "name";
const VERSION: &str = "version";
const PLATFORM: &str = "war.openmrs";
const H2_SUPPORTED: &str = "db.h2.supported";
const MODULE_PREFIX: &str = "omod.";
const PROPERTY_PREFIX: &str = "property.";
const GROUP_ID_SUFFIX: &str = ".groupId";
const TYPE_SUFFIX: &str = ".type";
const PROMPT_SUFFIX: &str = ".prompt";
const DEFAULT_SUFFIX: &str = ".default";

/// A custom property declared by a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyDefinition {
	pub name: String,
	/// Literal value.
	pub value: Option<String>,
	/// Text shown when asking the user for a value.
	pub prompt: Option<String>,
	/// Value offered when prompting.
	pub default: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
	entries: Vec<(String, String)>,
}

impl Descriptor {
	/// Builds a descriptor from parsed entries.
	///
	/// # Errors
	/// - [`Parse`](crate::Error::Parse) when a module or the platform has an empty version or
	/// `db.h2.supported` is not a boolean.
	pub fn from_entries(entries: Vec<(String, String)>) -> crate::Result<Self> {
		let descriptor = Self { entries };
		descriptor.validate()?;
		Ok(descriptor)
	}

	pub fn parse(text: &str) -> crate::Result<Self> {
		Self::from_entries(properties::parse(text)?)
	}

	/// Reads a descriptor file.
	///
	/// # Errors
	/// Files that aren't UTF-8 are read as ISO-8859-1.
	///
	/// # Errors
	/// - [`IO`](crate::Error::IO) when the file can't be read.
	/// - [`Parse`](crate::Error::Parse) when the contents aren't a valid descriptor.
	pub fn load_from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
		let bytes = std::fs::read(path.as_ref())?;
		Self::parse(&properties::decode(bytes))
	}

	/// Minimal descriptor for a server that runs the platform with no distro on top.
	pub fn for_platform(name: impl Into<String>, platform_version: impl Into<String>, h2_support: bool) -> Self {
		let platform_version = platform_version.into();
		let mut entries = vec![
			(NAME.to_string(), name.into()),
			(VERSION.to_string(), platform_version.clone()),
			(PLATFORM.to_string(), platform_version),
		];
		if h2_support {
			entries.push((H2_SUPPORTED.to_string(), "true".to_string()));
		}
		Self { entries }
	}

	/// The built in descriptor for reference application releases that never published one.
	pub fn legacy_reference_application(version: &Version) -> Self {
		legacy::reference_application(version)
	}

	fn validate(&self) -> crate::Result<()> {
		for (key, value) in &self.entries {
			let is_version_key = key == PLATFORM || self.module_id(key).is_some();
			if is_version_key && value.is_empty() {
				return Err(crate::Error::Parse(format!("{key} has no version")))
			}
			if key == H2_SUPPORTED && value.parse::<bool>().is_err() {
				return Err(crate::Error::Parse(format!("{key} must be true or false, found \"{value}\"")))
			}
		}
		Ok(())
	}

	/* Raw access */

	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
	}

	pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/* Fields */

	pub fn name(&self) -> Option<&str> {
		self.get(NAME)
	}

	pub fn version(&self) -> Option<&str> {
		self.get(VERSION)
	}

	pub fn platform_version(&self) -> Option<&str> {
		self.get(PLATFORM)
	}

	pub fn h2_support(&self) -> bool {
		self.get(H2_SUPPORTED).map(|v| v == "true").unwrap_or(false)
	}

	/// The platform artifact, if the descriptor names a platform version.
	pub fn platform_artifact(&self) -> Option<Artifact> {
		let version = self.platform_version()?;
		let group = self.get(&format!("{PLATFORM}{GROUP_ID_SUFFIX}")).unwrap_or(GROUP_WEB);
		Some(Artifact::new(WEBAPP_ARTIFACT_ID, version, group).with_type(ArtifactType::War))
	}

	/// Module artifacts in the order they were declared.
	pub fn module_artifacts(&self) -> Vec<Artifact> {
		self.entries.iter()
			.filter_map(|(key, version)| {
				let id = self.module_id(key)?;
				let group = self.get(&format!("{MODULE_PREFIX}{id}{GROUP_ID_SUFFIX}")).unwrap_or(GROUP_MODULE);
				let kind = self.get(&format!("{MODULE_PREFIX}{id}{TYPE_SUFFIX}")).unwrap_or("jar");
				let artifact_id = if id.ends_with(MODULE_SUFFIX) { id.to_string() } else { format!("{id}{MODULE_SUFFIX}") };
				Some(Artifact::new(artifact_id, version.as_str(), group).with_type(kind))
			})
			.collect()
	}

	/// Platform artifact followed by the modules, the full target list for a differential.
	pub fn target_artifacts(&self) -> Vec<Artifact> {
		self.platform_artifact().into_iter().chain(self.module_artifacts()).collect()
	}

	/// Names of declared custom properties, each listed once, in declaration order.
	pub fn property_names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = Vec::new();
		for (key, _) in &self.entries {
			if let Some(rest) = key.strip_prefix(PROPERTY_PREFIX) {
				let name = rest.strip_suffix(PROMPT_SUFFIX)
					.or_else(|| rest.strip_suffix(DEFAULT_SUFFIX))
					.unwrap_or(rest);
				if !name.is_empty() && !names.contains(&name) {
					names.push(name);
				}
			}
		}
		names
	}

	pub fn property(&self, name: &str) -> PropertyDefinition {
		let key = format!("{PROPERTY_PREFIX}{name}");
		PropertyDefinition {
			name: name.to_string(),
			value: self.get(&key).map(str::to_string),
			prompt: self.get(&format!("{key}{PROMPT_SUFFIX}")).map(str::to_string),
			default: self.get(&format!("{key}{DEFAULT_SUFFIX}")).map(str::to_string),
		}
	}

	pub fn properties(&self) -> Vec<PropertyDefinition> {
		self.property_names().into_iter().map(|n| self.property(n)).collect()
	}

	/// Strips `omod.` and rejects the `.groupId`/`.type` modifiers.
	fn module_id<'k>(&self, key: &'k str) -> Option<&'k str> {
		let id = key.strip_prefix(MODULE_PREFIX)?;
		if id.is_empty() || id.ends_with(GROUP_ID_SUFFIX) || id.ends_with(TYPE_SUFFIX) {
			return None
		}
		Some(id)
	}

	/* Placeholders */

	/// Replaces every `${key}` in values with `mapping[key]`.
	///
	/// # Errors
	/// - [`UnresolvedPlaceholder`](crate::Error::UnresolvedPlaceholder) naming the first key missing from `mapping`.
	pub fn resolve_placeholders(self, mapping: &HashMap<String, String>) -> crate::Result<Self> {
		let pattern = placeholder_pattern();
		let mut entries = Vec::with_capacity(self.entries.len());
		for (key, value) in self.entries {
			let mut resolved = String::with_capacity(value.len());
			let mut last = 0;
			for cap in pattern.captures_iter(&value) {
				let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else { continue };
				let replacement = mapping.get(name.as_str())
					.ok_or_else(|| crate::Error::UnresolvedPlaceholder(name.as_str().to_string()))?;
				resolved.push_str(&value[last..whole.start()]);
				resolved.push_str(replacement);
				last = whole.end();
			}
			resolved.push_str(&value[last..]);
			entries.push((key, resolved));
		}
		Self::from_entries(entries)
	}

	/* Serialization */

	pub fn render(&self) -> String {
		properties::render(self.entries())
	}

	/// Writes the descriptor to `path`, creating parent directories as needed.
	pub fn save_to(&self, path: impl AsRef<Path>) -> crate::Result<()> {
		let path = path.as_ref();
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(path, self.render())?;
		log::debug!("Saved descriptor to {}", path.display());
		Ok(())
	}
}

fn placeholder_pattern() -> &'static regex::Regex {
	static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
	PATTERN.get_or_init(|| regex::Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"))
}

#[cfg(test)]
mod test {
	use super::*;

	const SAMPLE: &str = "\
name=Reference Application
version=2.12.0
war.openmrs=2.5.9
omod.appui=1.16.0
omod.webservices.rest=2.38.0
omod.webservices.rest.type=omod
omod.custom=1.0
omod.custom.groupId=org.example
property.site.name=Clinic
property.admin.password.prompt=Admin password?
property.admin.password.default=Admin123
db.h2.supported=true
";

	fn sample() -> Descriptor { Descriptor::parse(SAMPLE).unwrap() }

	#[test]
	fn reads_fields() {
		let d = sample();
		assert_eq!(d.name(), Some("Reference Application"));
		assert_eq!(d.version(), Some("2.12.0"));
		assert_eq!(d.platform_version(), Some("2.5.9"));
		assert!(d.h2_support());
	}

	#[test]
	fn platform_artifact_is_webapp_war() {
		let platform = sample().platform_artifact().unwrap();
		assert!(platform.is_platform());
		assert_eq!(platform.version, Version::parse("2.5.9"));
	}

	#[test]
	fn modules_keep_declaration_order_and_modifiers() {
		let modules = sample().module_artifacts();
		let ids: Vec<_> = modules.iter().map(|a| a.artifact_id.as_str()).collect();
		assert_eq!(ids, ["appui-omod", "webservices.rest-omod", "custom-omod"]);
		assert_eq!(modules[1].kind, ArtifactType::Omod);
		assert_eq!(modules[2].group_id, "org.example");
		assert_eq!(modules[0].group_id, GROUP_MODULE);
	}

	#[test]
	fn target_artifacts_start_with_platform() {
		let targets = sample().target_artifacts();
		assert_eq!(targets.len(), 4);
		assert!(targets[0].is_platform());
	}

	#[test]
	fn properties_are_grouped_by_name() {
		let d = sample();
		assert_eq!(d.property_names(), ["site.name", "admin.password"]);
		let password = d.property("admin.password");
		assert_eq!(password.value, None);
		assert_eq!(password.prompt.as_deref(), Some("Admin password?"));
		assert_eq!(password.default.as_deref(), Some("Admin123"));
		assert_eq!(d.property("site.name").value.as_deref(), Some("Clinic"));
	}

	#[test]
	fn empty_module_version_is_rejected() {
		assert!(matches!(Descriptor::parse("omod.appui="), Err(crate::Error::Parse(_))));
	}

	#[test]
	fn non_boolean_h2_flag_is_rejected() {
		assert!(matches!(Descriptor::parse("db.h2.supported=maybe"), Err(crate::Error::Parse(_))));
	}

	#[test]
	fn placeholders_are_substituted() {
		let d = Descriptor::parse("version=${project.version}\nomod.appui=${project.parent.version}-x").unwrap();
		let mapping = HashMap::from([
			("project.version".to_string(), "3.0.0".to_string()),
			("project.parent.version".to_string(), "3.0.0".to_string()),
		]);
		let d = d.resolve_placeholders(&mapping).unwrap();
		assert_eq!(d.version(), Some("3.0.0"));
		assert_eq!(d.get("omod.appui"), Some("3.0.0-x"));
	}

	#[test]
	fn unknown_placeholder_fails() {
		let d = Descriptor::parse("version=${project.version}").unwrap();
		let err = d.resolve_placeholders(&HashMap::new()).unwrap_err();
		assert!(matches!(err, crate::Error::UnresolvedPlaceholder(k) if k == "project.version"));
	}

	#[test]
	fn platform_only_descriptor() {
		let d = Descriptor::for_platform("server1", "2.6.0", true);
		assert_eq!(d.platform_version(), Some("2.6.0"));
		assert!(d.module_artifacts().is_empty());
		assert!(d.h2_support());
	}

	#[test]
	fn reads_file_written_by_properties_store() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(DESCRIPTOR_FILE_NAME);
		let stored = b"#Generated distro\n#Mon Jan 01 10:00:00 UTC 2024\nname=Caf\xe9 Clinic\nwar.openmrs=2.6.1\nomod.appui 1.16.0\nproperty.server.url=http\\://localhost\\:8080/openmrs\nproperty.motd=Welcome \\\n    to the \\u00e9clinic\n";
		std::fs::write(&path, stored).unwrap();

		let d = Descriptor::load_from_file(&path).unwrap();
		assert_eq!(d.name(), Some("Café Clinic"));
		assert_eq!(d.module_artifacts()[0].version, Version::parse("1.16.0"));
		assert_eq!(d.property("server.url").value.as_deref(), Some("http://localhost:8080/openmrs"));
		assert_eq!(d.property("motd").value.as_deref(), Some("Welcome to the éclinic"));
	}

	#[test]
	fn saved_descriptor_loads_back() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(DESCRIPTOR_FILE_NAME);
		let d = Descriptor::parse("name=Café\nproperty.url=http\\://h\\:80/a\nwar.openmrs=2.6.1").unwrap();
		d.save_to(&path).unwrap();
		assert_eq!(Descriptor::load_from_file(&path).unwrap(), d);
	}

	#[test]
	fn renders_back_to_parsed_entries() {
		let d = sample();
		assert_eq!(Descriptor::parse(&d.render()).unwrap(), d);
	}
}
