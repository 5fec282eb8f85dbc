use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::{ChoiceTypeExpander, ElementDefinition, StructureDefinition};
use crate::error::Result;

/// Category of embedded profiles pulled in by type references.
pub const SUB_PROFILE: &str = "sub-profile";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityCategory {
    /// A profile reached only through an element type reference.
    SubProfile,
    /// A top level entity, categorised by the model (`Clinical`, ...).
    Named(String),
}

impl From<String> for EntityCategory {
    fn from(value: String) -> Self {
        if value == SUB_PROFILE {
            EntityCategory::SubProfile
        } else {
            EntityCategory::Named(value)
        }
    }
}

impl From<EntityCategory> for String {
    fn from(value: EntityCategory) -> Self {
        value.to_string()
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityCategory::SubProfile => write!(f, "{SUB_PROFILE}"),
            EntityCategory::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Typed edge between entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    #[serde(rename = "targetProfile")]
    pub target_profile: Vec<String>,
    pub required: bool,
}

/// A named schema node: a resource type or an embedded structure.
///
/// Built once from its profile; the element lookup is immutable afterwards
/// and never contains choice (`[x]`) entries.
#[derive(Debug, Clone)]
pub struct Entity {
    id: String,
    category: EntityCategory,
    links: IndexMap<String, Link>,
    source: Option<String>,
    root_element: Arc<ElementDefinition>,
    discriminant_element: Arc<ElementDefinition>,
    element_lookup: IndexMap<String, Arc<ElementDefinition>>,
}

impl Entity {
    pub fn from_profile(
        id: impl Into<String>,
        category: EntityCategory,
        profile: &StructureDefinition,
    ) -> Result<Self> {
        let id = id.into();
        let element_lookup = ChoiceTypeExpander::new().expand_lookup(profile.elements())?;

        let root_element = profile
            .root_element()
            .cloned()
            .unwrap_or_else(|| ElementDefinition::new(profile.id.clone()));

        let mut discriminant = ElementDefinition::new(format!("{id}.resourceType"))
            .with_types(["string"]);
        discriminant.short = root_element.short.clone();
        discriminant.definition = root_element.definition.clone();

        tracing::debug!(
            "Built entity {} ({}) with {} elements",
            id,
            category,
            element_lookup.len()
        );

        Ok(Self {
            id,
            category,
            links: IndexMap::new(),
            source: profile.url.clone(),
            root_element: Arc::new(root_element),
            discriminant_element: Arc::new(discriminant),
            element_lookup,
        })
    }

    pub fn with_links(mut self, links: IndexMap<String, Link>) -> Self {
        self.links = links;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> &EntityCategory {
        &self.category
    }

    pub fn links(&self) -> &IndexMap<String, Link> {
        &self.links
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_sub_profile(&self) -> bool {
        self.category == EntityCategory::SubProfile
    }

    /// First snapshot element, describing the entity itself.
    pub fn root_element(&self) -> &Arc<ElementDefinition> {
        &self.root_element
    }

    /// Synthetic string element standing in for the record's type field.
    pub fn discriminant_element(&self) -> &Arc<ElementDefinition> {
        &self.discriminant_element
    }

    pub fn element_lookup(&self) -> &IndexMap<String, Arc<ElementDefinition>> {
        &self.element_lookup
    }

    /// Look up an element by its path relative to this entity
    /// (`name.given` finds `Patient.name.given`).
    pub fn element(&self, relative_path: &str) -> Option<&Arc<ElementDefinition>> {
        self.element_lookup
            .get(&format!("{}.{}", self.id, relative_path))
    }
}
