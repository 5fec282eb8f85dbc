//! Read-only lookups of extension definitions and value set codes.
//!
//! Fetching terminology from remote servers is out of scope; the store is
//! filled from already downloaded resources.

pub mod describe;

pub use describe::{AttributeEnum, JsonType, PropertyDescriber, PropertyDescription, normalize_type};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::Result;
use crate::types::{ElementBinding, StructureDefinition};

pub trait TerminologyLookup: Send + Sync {
    fn lookup_extension(&self, url: &str) -> Option<&ExtensionDefinition>;

    fn lookup_value_set(&self, url: &str) -> Option<&ValueSetCodes>;
}

/// Canonical urls may carry a `|version` suffix; lookups ignore it.
pub fn strip_version(url: &str) -> &str {
    url.split('|').next().unwrap_or(url)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionDefinition {
    pub url: String,
    pub description: Option<String>,
    pub sub_extensions: Vec<SubExtension>,
    pub value_type: Option<String>,
    pub binding: Option<ElementBinding>,
}

/// One slice of a complex extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubExtension {
    pub slice_name: String,
    pub definition: Option<String>,
    pub value_type: Option<String>,
    pub binding: Option<ElementBinding>,
}

impl ExtensionDefinition {
    /// Derive the definition from an extension profile. Profiles without a
    /// url cannot be looked up and yield `None`.
    pub fn from_structure_definition(profile: &StructureDefinition) -> Option<Self> {
        let url = profile.url.clone()?;
        let elements = profile.elements();

        let description = profile
            .description
            .clone()
            .or_else(|| profile.root_element().and_then(|root| root.description().map(str::to_string)));

        let value = elements
            .iter()
            .find(|element| !element.id.contains(':') && is_value_element(&element.id));

        let sub_extensions = elements
            .iter()
            .filter(|element| element.id.contains(".extension:"))
            .filter_map(|slice| {
                let slice_name = slice.slice_name.clone()?;
                let value_prefix = format!("{}.value", slice.id);
                let value = elements
                    .iter()
                    .find(|element| element.id.starts_with(&value_prefix));
                Some(SubExtension {
                    slice_name,
                    definition: slice.description().map(str::to_string),
                    value_type: value.and_then(|v| v.type_code()).map(str::to_string),
                    binding: value.and_then(|v| v.binding.clone()),
                })
            })
            .collect();

        Some(Self {
            url,
            description,
            sub_extensions,
            value_type: value.and_then(|v| v.type_code()).map(str::to_string),
            binding: value.and_then(|v| v.binding.clone()),
        })
    }

    pub fn sub_extension(&self, name: &str) -> Option<&SubExtension> {
        self.sub_extensions
            .iter()
            .find(|sub| sub.slice_name == name)
    }
}

fn is_value_element(id: &str) -> bool {
    id.rsplit('.')
        .next()
        .is_some_and(|segment| segment.starts_with("value"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSetCodes {
    pub url: String,
    pub codes: Vec<String>,
}

impl ValueSetCodes {
    /// Collect the codes of a ValueSet resource: expansion members first,
    /// then composed concepts, nested concepts included.
    pub fn from_value_set(resource: &Value) -> Option<Self> {
        let url = resource.get("url")?.as_str()?.to_string();
        let mut codes = IndexSet::new();

        if let Some(contains) = resource.pointer("/expansion/contains") {
            collect_codes(contains, "contains", &mut codes);
        }
        if let Some(includes) = resource.pointer("/compose/include").and_then(Value::as_array) {
            for include in includes {
                if let Some(concepts) = include.get("concept") {
                    collect_codes(concepts, "concept", &mut codes);
                }
            }
        }

        Some(Self {
            url,
            codes: codes.into_iter().collect(),
        })
    }
}

fn collect_codes(items: &Value, nested_field: &str, codes: &mut IndexSet<String>) {
    let Some(items) = items.as_array() else {
        return;
    };
    for item in items {
        if let Some(code) = item.get("code").and_then(Value::as_str) {
            codes.insert(code.to_string());
        }
        if let Some(nested) = item.get(nested_field) {
            collect_codes(nested, nested_field, codes);
        }
    }
}

/// In-memory terminology, keyed by canonical url.
#[derive(Debug, Clone, Default)]
pub struct TerminologyStore {
    extensions: IndexMap<String, ExtensionDefinition>,
    value_sets: IndexMap<String, ValueSetCodes>,
}

impl TerminologyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_extension(&mut self, definition: ExtensionDefinition) {
        self.extensions
            .insert(strip_version(&definition.url).to_string(), definition);
    }

    pub fn insert_value_set(&mut self, value_set: ValueSetCodes) {
        self.value_sets
            .insert(strip_version(&value_set.url).to_string(), value_set);
    }

    /// Add an extension StructureDefinition, a ValueSet, or every such entry
    /// of a Bundle. Returns how many definitions were added.
    pub fn load_resource(&mut self, resource: &Value) -> Result<usize> {
        match resource.get("resourceType").and_then(Value::as_str) {
            Some("Bundle") => {
                let mut loaded = 0;
                let entries = resource
                    .get("entry")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                for entry in entries {
                    if let Some(inner) = entry.get("resource") {
                        loaded += self.load_resource(inner)?;
                    }
                }
                Ok(loaded)
            }
            Some("StructureDefinition") => {
                let profile: StructureDefinition = serde_json::from_value(resource.clone())?;
                if profile.base_type.as_deref() != Some("Extension") {
                    return Ok(0);
                }
                match ExtensionDefinition::from_structure_definition(&profile) {
                    Some(definition) => {
                        self.insert_extension(definition);
                        Ok(1)
                    }
                    None => Ok(0),
                }
            }
            Some("ValueSet") => match ValueSetCodes::from_value_set(resource) {
                Some(value_set) => {
                    self.insert_value_set(value_set);
                    Ok(1)
                }
                None => Ok(0),
            },
            other => {
                tracing::debug!("Skipping {:?} resource, not terminology", other);
                Ok(0)
            }
        }
    }

    /// Load every json document below `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let mut store = Self::new();
        let mut loaded = 0;
        for entry in WalkDir::new(dir.as_ref()).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = std::fs::read_to_string(path)?;
            let resource: Value = serde_json::from_str(&text)?;
            loaded += store.load_resource(&resource)?;
        }
        tracing::info!(
            "Loaded {} terminology definitions from {}",
            loaded,
            dir.as_ref().display()
        );
        Ok(store)
    }

    pub fn extension_count(&self) -> usize {
        self.extensions.len()
    }

    pub fn value_set_count(&self) -> usize {
        self.value_sets.len()
    }
}

impl TerminologyLookup for TerminologyStore {
    fn lookup_extension(&self, url: &str) -> Option<&ExtensionDefinition> {
        self.extensions.get(strip_version(url))
    }

    fn lookup_value_set(&self, url: &str) -> Option<&ValueSetCodes> {
        self.value_sets.get(strip_version(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn race_extension() -> Value {
        json!({
            "resourceType": "StructureDefinition",
            "id": "us-core-race",
            "url": "http://hl7.org/fhir/us/core/StructureDefinition/us-core-race",
            "type": "Extension",
            "description": "Concepts classifying the person into a named category of humans",
            "snapshot": {"element": [
                {"id": "Extension", "path": "Extension", "definition": "US Core Race Extension"},
                {"id": "Extension.extension:ombCategory", "path": "Extension.extension", "sliceName": "ombCategory",
                 "definition": "The 5 race category codes", "type": [{"code": "Extension"}]},
                {"id": "Extension.extension:ombCategory.value[x]", "path": "Extension.extension.value[x]",
                 "type": [{"code": "Coding"}],
                 "binding": {"strength": "required", "valueSet": "http://hl7.org/fhir/us/core/ValueSet/omb-race-category"}},
                {"id": "Extension.extension:text", "path": "Extension.extension", "sliceName": "text",
                 "definition": "Plain text representation", "type": [{"code": "Extension"}]},
                {"id": "Extension.extension:text.value[x]", "path": "Extension.extension.value[x]",
                 "type": [{"code": "string"}]},
                {"id": "Extension.url", "path": "Extension.url", "type": [{"code": "uri"}]},
                {"id": "Extension.value[x]", "path": "Extension.value[x]", "max": "0"}
            ]}
        })
    }

    #[test]
    fn test_extension_definition() {
        let mut store = TerminologyStore::new();
        assert_eq!(store.load_resource(&race_extension()).unwrap(), 1);

        let race = store
            .lookup_extension("http://hl7.org/fhir/us/core/StructureDefinition/us-core-race|5.0.1")
            .unwrap();
        assert_eq!(
            race.description.as_deref(),
            Some("Concepts classifying the person into a named category of humans")
        );
        let omb = race.sub_extension("ombCategory").unwrap();
        assert_eq!(omb.value_type.as_deref(), Some("Coding"));
        assert_eq!(
            omb.binding.as_ref().and_then(|b| b.value_set.as_deref()),
            Some("http://hl7.org/fhir/us/core/ValueSet/omb-race-category")
        );
        assert_eq!(race.sub_extension("text").unwrap().value_type.as_deref(), Some("string"));
        assert_eq!(race.value_type, None);
    }

    #[test]
    fn test_value_set_codes_from_bundle() {
        let bundle = json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [
                {"resource": {
                    "resourceType": "ValueSet",
                    "url": "http://hl7.org/fhir/ValueSet/administrative-gender",
                    "compose": {"include": [{"system": "http://hl7.org/fhir/administrative-gender",
                        "concept": [{"code": "male"}, {"code": "female"}, {"code": "other", "concept": [{"code": "unknown"}]}]}]}
                }},
                {"resource": {
                    "resourceType": "ValueSet",
                    "url": "http://example.org/ValueSet/expanded",
                    "expansion": {"contains": [{"code": "a", "contains": [{"code": "b"}]}, {"code": "a"}]}
                }},
                {"resource": {"resourceType": "Patient", "id": "ignored"}}
            ]
        });
        let mut store = TerminologyStore::new();
        assert_eq!(store.load_resource(&bundle).unwrap(), 2);
        assert_eq!(
            store
                .lookup_value_set("http://hl7.org/fhir/ValueSet/administrative-gender|4.0.1")
                .unwrap()
                .codes,
            vec!["male", "female", "other", "unknown"]
        );
        assert_eq!(
            store.lookup_value_set("http://example.org/ValueSet/expanded").unwrap().codes,
            vec!["a", "b"]
        );
        assert!(store.lookup_value_set("http://example.org/missing").is_none());
    }
}
