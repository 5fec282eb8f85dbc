use indexmap::IndexMap;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use super::{ElementDefinition, Entity, EntityCategory, Link, ProfileSet};
use crate::core::ModelConfig;
use crate::error::{PfbFhirError, Result};

/// Edge between two entities, as declared by a model link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityEdge<'a> {
    pub source: &'a str,
    pub link: &'a Link,
    pub target: String,
}

/// All entities known to a run, keyed by id.
///
/// Loaded once before any record is processed and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    entities: IndexMap<String, Entity>,
    dependency_order: Vec<String>,
}

impl SchemaGraph {
    pub fn from_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let entities: IndexMap<String, Entity> = entities
            .into_iter()
            .map(|entity| (entity.id().to_string(), entity))
            .collect();
        let dependency_order = entities
            .values()
            .filter(|entity| !entity.is_sub_profile())
            .map(|entity| entity.id().to_string())
            .collect();
        Self {
            entities,
            dependency_order,
        }
    }

    /// Build the graph for a model: one entity per configured entry, plus a
    /// sub-profile entity for every profile reachable through element types.
    pub fn load(model: &ModelConfig, profiles: &ProfileSet) -> Result<Self> {
        let mut entities: IndexMap<String, Entity> = IndexMap::new();
        let mut pending: VecDeque<String> = VecDeque::new();

        for (key, config) in &model.entities {
            let id = config.entity_id(key);
            let profile_name = config.profile_name(key);
            let profile = profiles
                .get(&profile_name)
                .or_else(|| profiles.get(&id))
                .ok_or_else(|| {
                    PfbFhirError::configuration_error(format!(
                        "no profile {profile_name} for entity {id}"
                    ))
                })?;

            let mut entity = Entity::from_profile(id.clone(), config.category.clone(), profile)?
                .with_links(config.links());
            if let Some(source) = &config.source {
                entity = entity.with_source(source.clone());
            }
            pending.extend(profile.referenced_types().map(str::to_string));
            entities.insert(id, entity);
        }

        let mut missing: HashSet<String> = HashSet::new();
        while let Some(type_code) = pending.pop_front() {
            if entities.contains_key(&type_code) || missing.contains(&type_code) {
                continue;
            }
            match profiles.get(&type_code) {
                Some(profile) => {
                    let entity =
                        Entity::from_profile(type_code.clone(), EntityCategory::SubProfile, profile)?;
                    pending.extend(profile.referenced_types().map(str::to_string));
                    entities.insert(type_code, entity);
                }
                None => {
                    tracing::debug!("No profile for type {}, treating it as primitive", type_code);
                    missing.insert(type_code);
                }
            }
        }

        tracing::info!(
            "Schema graph loaded: {} entities ({} configured)",
            entities.len(),
            model.entities.len()
        );

        Ok(Self {
            entities,
            dependency_order: model.dependency_order(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity(&self, id: &str) -> Result<&Entity> {
        self.get(id).ok_or_else(|| PfbFhirError::unknown_entity(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Configured entity ids, in model declaration order.
    pub fn dependency_order(&self) -> &[String] {
        &self.dependency_order
    }

    /// Root element of the generic extension profile; anchors properties
    /// that only exist as open-ended extensions.
    pub fn extension_root(&self, extension_entity: &str) -> Result<&Arc<ElementDefinition>> {
        self.get(extension_entity)
            .map(Entity::root_element)
            .ok_or_else(|| {
                PfbFhirError::resolution_error(format!(
                    "{extension_entity} profile is not part of the schema graph"
                ))
            })
    }

    pub fn edges(&self) -> impl Iterator<Item = EntityEdge<'_>> {
        self.entities.values().flat_map(|entity| {
            entity.links().values().flat_map(move |link| {
                link.target_profile.iter().map(move |target| EntityEdge {
                    source: entity.id(),
                    link,
                    target: target.rsplit('/').next().unwrap_or(target).to_string(),
                })
            })
        })
    }
}
