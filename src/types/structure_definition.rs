use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use walkdir::WalkDir;

use super::ElementDefinition;
use crate::error::Result;

/// The profile document an entity is built from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StructureDefinition {
    #[serde(default = "structure_definition_type")]
    pub resource_type: String,

    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Snapshot {
    #[serde(default)]
    pub element: Vec<ElementDefinition>,
}

fn structure_definition_type() -> String {
    "StructureDefinition".to_string()
}

impl StructureDefinition {
    pub fn new(id: impl Into<String>, elements: Vec<ElementDefinition>) -> Self {
        Self {
            resource_type: structure_definition_type(),
            id: id.into(),
            snapshot: Some(Snapshot { element: elements }),
            ..Default::default()
        }
    }

    pub fn elements(&self) -> &[ElementDefinition] {
        self.snapshot
            .as_ref()
            .map(|snapshot| snapshot.element.as_slice())
            .unwrap_or_default()
    }

    pub fn root_element(&self) -> Option<&ElementDefinition> {
        self.elements().first()
    }

    /// Type codes referenced by any snapshot element.
    pub fn referenced_types(&self) -> impl Iterator<Item = &str> {
        self.elements()
            .iter()
            .flat_map(|element| element.type_codes().flatten())
    }
}

/// Profiles available to the schema graph, keyed by id.
///
/// Fetching and caching profiles from a registry happens elsewhere; this is
/// the already-downloaded set.
#[derive(Debug, Clone, Default)]
pub struct ProfileSet {
    profiles: IndexMap<String, StructureDefinition>,
}

impl ProfileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, profile: StructureDefinition) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    pub fn with_profile(mut self, profile: StructureDefinition) -> Self {
        self.insert(profile);
        self
    }

    /// Look a profile up by id, falling back to its name.
    pub fn get(&self, key: &str) -> Option<&StructureDefinition> {
        self.profiles.get(key).or_else(|| {
            self.profiles
                .values()
                .find(|profile| profile.name.as_deref() == Some(key))
        })
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StructureDefinition> {
        self.profiles.values()
    }

    /// Load every StructureDefinition json document below `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let mut set = Self::new();
        for entry in WalkDir::new(dir.as_ref()).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some("json")
            {
                continue;
            }

            let text = std::fs::read_to_string(path)?;
            let document: serde_json::Value = serde_json::from_str(&text)?;
            if document.get("resourceType").and_then(|v| v.as_str())
                != Some("StructureDefinition")
            {
                tracing::debug!("Skipping non StructureDefinition {}", path.display());
                continue;
            }
            let profile: StructureDefinition = serde_json::from_value(document)?;
            tracing::debug!("Loaded profile {} from {}", profile.id, path.display());
            set.insert(profile);
        }

        tracing::info!(
            "Loaded {} profiles from {}",
            set.len(),
            dir.as_ref().display()
        );
        Ok(set)
    }
}
