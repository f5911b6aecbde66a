//! Decides the value of each custom property a descriptor declares.

use std::collections::{BTreeMap, HashMap};

use crate::collaborator::Prompter;
use crate::descriptor::{Descriptor, PropertyDefinition};

/// Where a reconciled value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertySource {
	/// Supplied by the caller for this run.
	Override,
	/// Literal value in the descriptor.
	Descriptor,
	/// Entered by the user.
	Prompt,
}

/// Resolves one property, in order of preference: caller override, descriptor literal, prompt.
///
/// Returns `Ok(None)` when the property has none of these. Such properties are skipped rather
/// than treated as an error, a descriptor may declare properties that only some servers use.
pub fn reconcile_property(
	definition: &PropertyDefinition,
	overrides: &HashMap<String, String>,
	prompter: &dyn Prompter,
) -> crate::Result<Option<(String, PropertySource)>> {
	if let Some(value) = overrides.get(&definition.name) {
		return Ok(Some((value.clone(), PropertySource::Override)))
	}
	if let Some(value) = &definition.value {
		return Ok(Some((value.clone(), PropertySource::Descriptor)))
	}
	if let Some(prompt) = &definition.prompt {
		let value = prompter.prompt(prompt, definition.default.as_deref())?;
		return Ok(Some((value, PropertySource::Prompt)))
	}
	log::debug!("Property {} has no value, override or prompt, skipping", definition.name);
	Ok(None)
}

/// Reconciles every property `descriptor` declares.
///
/// # Errors
/// Only errors from `prompter` are returned. Properties with no source of a value are left out.
pub fn reconcile_properties(
	descriptor: &Descriptor,
	overrides: &HashMap<String, String>,
	prompter: &dyn Prompter,
) -> crate::Result<BTreeMap<String, String>> {
	let mut resolved = BTreeMap::new();
	for definition in descriptor.properties() {
		if let Some((value, source)) = reconcile_property(&definition, overrides, prompter)? {
			log::trace!("Property {} = {} ({:?})", definition.name, value, source);
			resolved.insert(definition.name, value);
		}
	}
	Ok(resolved)
}

#[cfg(test)]
mod test {
	use super::*;
	use std::cell::RefCell;

	/// Answers every prompt with the default, or `"typed"`, and records what was asked.
	#[derive(Default)]
	struct RecordingPrompter {
		asked: RefCell<Vec<String>>,
	}

	impl Prompter for RecordingPrompter {
		fn prompt(&self, text: &str, default: Option<&str>) -> crate::Result<String> {
			self.asked.borrow_mut().push(text.to_string());
			Ok(default.unwrap_or("typed").to_string())
		}
	}

	fn descriptor() -> Descriptor {
		Descriptor::parse("\
property.literal=from-file
property.prompted.prompt=Value?
property.prompted.default=fallback
property.bare.prompt=Bare?
property.both=file
property.both.prompt=Both?
property.empty.default=unused
").unwrap()
	}

	#[test]
	fn override_beats_literal_and_prompt() {
		let prompter = RecordingPrompter::default();
		let overrides = HashMap::from([("both".to_string(), "cli".to_string()), ("prompted".to_string(), "cli2".to_string())]);
		let resolved = reconcile_properties(&descriptor(), &overrides, &prompter).unwrap();
		assert_eq!(resolved["both"], "cli");
		assert_eq!(resolved["prompted"], "cli2");
		assert_eq!(*prompter.asked.borrow(), ["Bare?"]);
	}

	#[test]
	fn literal_beats_prompt() {
		let prompter = RecordingPrompter::default();
		let resolved = reconcile_properties(&descriptor(), &HashMap::new(), &prompter).unwrap();
		assert_eq!(resolved["literal"], "from-file");
		assert_eq!(resolved["both"], "file");
		assert!(!prompter.asked.borrow().contains(&"Both?".to_string()));
	}

	#[test]
	fn prompt_offers_default() {
		let resolved = reconcile_properties(&descriptor(), &HashMap::new(), &RecordingPrompter::default()).unwrap();
		assert_eq!(resolved["prompted"], "fallback");
		assert_eq!(resolved["bare"], "typed");
	}

	#[test]
	fn property_without_any_source_is_skipped() {
		let resolved = reconcile_properties(&descriptor(), &HashMap::new(), &RecordingPrompter::default()).unwrap();
		assert!(!resolved.contains_key("empty"));
	}

	#[test]
	fn prompter_errors_propagate() {
		struct Failing;
		impl Prompter for Failing {
			fn prompt(&self, _: &str, _: Option<&str>) -> crate::Result<String> {
				Err(crate::Error::IO(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stdin closed")))
			}
		}
		assert!(matches!(reconcile_properties(&descriptor(), &HashMap::new(), &Failing), Err(crate::Error::IO(_))));
	}
}
