use serde_json::{Map, Value};
use std::sync::Arc;

use crate::core::TransformConfig;
use crate::error::{PfbFhirError, Result};
use crate::resolver::{PropertyResolver, ResolutionCache, ResolvedProperties, SeenMessages};
use crate::simplifier::ContextSimplifier;
use crate::types::SchemaGraph;

/// One record after resolution, and simplification when configured.
#[derive(Debug, Clone)]
pub struct TransformedRecord {
    pub entity_id: String,
    pub resource_id: Option<String>,
    pub properties: ResolvedProperties,
}

impl TransformedRecord {
    /// `{flattened_key: value}` in property order.
    pub fn to_flat_json(&self) -> Value {
        let map: Map<String, Value> = self
            .properties
            .iter()
            .map(|(key, property)| (key.clone(), property.value.clone()))
            .collect();
        Value::Object(map)
    }
}

/// Drives records through resolution and simplification.
///
/// The cache and the seen-message set live as long as the transformer and
/// may be shared with other transformers over the same graph.
#[derive(Debug)]
pub struct Transformer {
    graph: Arc<SchemaGraph>,
    config: TransformConfig,
    cache: Arc<ResolutionCache>,
    seen: Arc<SeenMessages>,
}

impl Transformer {
    pub fn new(graph: Arc<SchemaGraph>, config: TransformConfig) -> Self {
        Self {
            graph,
            config,
            cache: Arc::new(ResolutionCache::new()),
            seen: Arc::new(SeenMessages::new()),
        }
    }

    pub fn with_cache(mut self, cache: Arc<ResolutionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_seen_messages(mut self, seen: Arc<SeenMessages>) -> Self {
        self.seen = seen;
        self
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    pub fn seen_messages(&self) -> &Arc<SeenMessages> {
        &self.seen
    }

    /// Resolve one record and simplify it in simplified mode.
    ///
    /// Records of a type the graph does not know, or whose type is only a
    /// sub-profile, are skipped with a warning logged once per type.
    pub fn transform(&self, record: &Value) -> Result<Option<TransformedRecord>> {
        let discriminant = &self.config.discriminant_field;
        let resource_type = record
            .get(discriminant)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PfbFhirError::resolution_error(format!("Record has no '{discriminant}' field"))
            })?;

        let Some(entity) = self
            .graph
            .get(resource_type)
            .filter(|entity| !entity.is_sub_profile())
        else {
            let message = format!("No entity for {resource_type}, records skipped");
            if self.seen.first_occurrence(&message) {
                tracing::warn!("{}", message);
            }
            return Ok(None);
        };

        let resource_id = record.get("id").and_then(Value::as_str).map(str::to_string);
        let resolver = PropertyResolver::new(&self.graph, &self.config, &self.cache, &self.seen);
        let mut properties = resolver.resolve(record, entity)?;

        if self.config.mode.is_simplified() {
            tracing::debug!(
                "Simplifying {}/{}",
                resource_type,
                resource_id.as_deref().unwrap_or("-")
            );
            properties = ContextSimplifier::new(&self.config, &self.seen).simplify(properties);
        }

        Ok(Some(TransformedRecord {
            entity_id: entity.id().to_string(),
            resource_id,
            properties,
        }))
    }
}
