use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PfbFhirError, Result};
use crate::types::{EntityCategory, Link};

/// Which flavour of property map a record is resolved for.
///
/// Resolved schema chains are cached per `(entity, mode)` so both flavours
/// can be produced by one process without sharing cache entries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    #[default]
    AsIs,
    Simplified,
}

impl ResolutionMode {
    pub fn is_simplified(&self) -> bool {
        matches!(self, ResolutionMode::Simplified)
    }
}

impl std::fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionMode::AsIs => write!(f, "as-is"),
            ResolutionMode::Simplified => write!(f, "simplified"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub mode: ResolutionMode,
    /// Passes of the single-item-list collapse. Each pass removes one level
    /// of singleton nesting per key.
    pub list_collapse_passes: usize,
    /// Top level field holding inline sub-records; its keys are skipped.
    pub contained_marker: String,
    /// Entity whose root element anchors open-ended extensions.
    pub extension_entity: String,
    /// Field naming the record type.
    pub discriminant_field: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            mode: ResolutionMode::AsIs,
            list_collapse_passes: 3,
            contained_marker: "contained".to_string(),
            extension_entity: "Extension".to_string(),
            discriminant_field: "resourceType".to_string(),
        }
    }
}

impl TransformConfig {
    pub fn simplified() -> Self {
        Self::default().with_mode(ResolutionMode::Simplified)
    }

    pub fn with_mode(mut self, mode: ResolutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_list_collapse_passes(mut self, passes: usize) -> Self {
        self.list_collapse_passes = passes;
        self
    }

    pub fn with_contained_marker(mut self, marker: impl Into<String>) -> Self {
        self.contained_marker = marker.into();
        self
    }

    pub fn with_extension_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.extension_entity = entity_id.into();
        self
    }
}

/// The entity model: which resources are emitted and how they link.
///
/// Declaration order is significant, it is the dependency order handed to
/// downstream emitters.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelConfig {
    pub entities: IndexMap<String, EntityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    #[serde(default)]
    pub id: Option<String>,
    pub category: EntityCategory,
    /// Explicit profile url; the last path segment names the profile.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub links: IndexMap<String, LinkConfig>,
    /// Accepted so existing model files load; the transform does not read it.
    #[serde(default)]
    pub submitter_id: Option<SubmitterIdAlias>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "targetProfile")]
    pub target_profile: TargetProfile,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetProfile {
    One(String),
    Many(Vec<String>),
}

impl TargetProfile {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            TargetProfile::One(target) => vec![target.clone()],
            TargetProfile::Many(targets) => targets.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitterIdAlias {
    pub identifier_system: String,
}

impl ModelConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: ModelConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: ModelConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json` file, anything else is read as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.entities.is_empty() {
            return Err(PfbFhirError::configuration_error(
                "model declares no entities",
            ));
        }
        for (name, entity) in &self.entities {
            for (link_name, link) in &entity.links {
                if link.target_profile.to_vec().is_empty() {
                    return Err(PfbFhirError::configuration_error(format!(
                        "link {name}.{link_name} has no targetProfile"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Entity ids in declaration order.
    pub fn dependency_order(&self) -> Vec<String> {
        self.entities
            .iter()
            .map(|(name, entity)| entity.entity_id(name))
            .collect()
    }
}

impl EntityConfig {
    /// The entity id, defaulting to its key in the model.
    pub fn entity_id(&self, key: &str) -> String {
        self.id.clone().unwrap_or_else(|| key.to_string())
    }

    /// Name of the profile document backing this entity.
    pub fn profile_name(&self, key: &str) -> String {
        match &self.source {
            Some(source) => source
                .trim_end_matches(".json")
                .rsplit('/')
                .next()
                .unwrap_or(source)
                .to_string(),
            None => self.entity_id(key),
        }
    }

    pub fn links(&self) -> IndexMap<String, Link> {
        self.links
            .iter()
            .map(|(name, link)| {
                let id = link.id.clone().unwrap_or_else(|| name.clone());
                (
                    name.clone(),
                    Link {
                        id,
                        target_profile: link.target_profile.to_vec(),
                        required: link.required,
                    },
                )
            })
            .collect()
    }
}
