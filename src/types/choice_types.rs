use indexmap::IndexMap;
use std::sync::Arc;

use super::{CHOICE_MARKER, ElementDefinition};
use crate::error::{PfbFhirError, Result};

/// Type codes whose property suffix is not plain first-letter capitalisation.
const IRREGULAR_SUFFIXES: &[(&str, &str)] = &[
    ("dateTime", "DateTime"),
    ("CodeableConcept", "CodeableConcept"),
];

/// Expands polymorphic `[x]` elements into one concretely typed element per
/// admissible type, e.g. `Observation.value[x]` into `Observation.valueString`,
/// `Observation.valueQuantity`, ...
#[derive(Debug, Default, Clone, Copy)]
pub struct ChoiceTypeExpander;

impl ChoiceTypeExpander {
    pub fn new() -> Self {
        Self
    }

    /// Build an element lookup with every choice element replaced by its
    /// typed variants.
    ///
    /// Elements already present under a synthesized id keep their explicit
    /// definition, so the result does not depend on snapshot order.
    pub fn expand_lookup(
        &self,
        elements: &[ElementDefinition],
    ) -> Result<IndexMap<String, Arc<ElementDefinition>>> {
        let mut lookup: IndexMap<String, Arc<ElementDefinition>> = elements
            .iter()
            .filter(|element| !element.is_choice())
            .map(|element| (element.id.clone(), Arc::new(element.clone())))
            .collect();

        for element in elements.iter().filter(|element| element.is_choice()) {
            for variant in self.expand_element(element)? {
                if lookup.contains_key(&variant.id) {
                    tracing::debug!("{} already defined, keeping explicit element", variant.id);
                    continue;
                }
                lookup.insert(variant.id.clone(), Arc::new(variant));
            }
        }

        Ok(lookup)
    }

    pub fn expand_element(&self, element: &ElementDefinition) -> Result<Vec<ElementDefinition>> {
        if !element.is_choice() {
            return Err(PfbFhirError::schema_error(format!(
                "Element {} is not a choice type",
                element.id
            )));
        }
        if element.element_type.is_empty() {
            return Err(PfbFhirError::schema_error(format!(
                "Choice type {} missing type definitions",
                element.id
            )));
        }

        let mut variants: Vec<ElementDefinition> = Vec::with_capacity(element.element_type.len());
        for code in element.type_codes() {
            let Some(code) = code else {
                return Err(PfbFhirError::schema_error(format!(
                    "Choice type {} has a type without a code",
                    element.id
                )));
            };

            let id = element.id.replace(CHOICE_MARKER, &Self::type_suffix(code));
            if variants.iter().any(|variant| variant.id == id) {
                continue;
            }
            let mut variant = element.with_type(code).with_id(id);
            variant.path = element
                .path
                .as_ref()
                .map(|path| path.replace(CHOICE_MARKER, &Self::type_suffix(code)));
            variants.push(variant);
        }

        Ok(variants)
    }

    /// Property-name suffix for a type code (`string` -> `String`).
    pub fn type_suffix(code: &str) -> String {
        if let Some((_, suffix)) = IRREGULAR_SUFFIXES.iter().find(|(c, _)| *c == code) {
            return suffix.to_string();
        }

        let mut chars = code.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}
