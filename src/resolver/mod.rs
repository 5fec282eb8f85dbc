//! Resolution of flattened record keys against the schema graph.
//!
//! Every flattened key of a record is matched to the element of its first
//! segment (the root element) and then walked segment by segment through
//! the entities its types point at, producing the chain of element
//! definitions downstream emitters need.

pub mod cache;
pub mod property;

pub use cache::{ResolutionCache, SeenMessages};
pub use property::{ExtensionOrigin, Property, ResolvedProperties};

use serde_json::Value;
use std::sync::Arc;

use crate::core::TransformConfig;
use crate::error::{PfbFhirError, Result};
use crate::types::payload::{KEY_SEPARATOR, flatten, is_index, simple_key};
use crate::types::{ElementDefinition, Entity, PayloadShape, SchemaGraph};

/// Types describing structure nested inside the owning entity. Walking into
/// one keeps the current entity and qualifies later lookups with a prefix.
const INLINE_TYPES: &[&str] = &["BackboneElement", "Element"];

pub fn is_inline_type(type_code: &str) -> bool {
    INLINE_TYPES.contains(&type_code)
}

pub struct PropertyResolver<'a> {
    graph: &'a SchemaGraph,
    config: &'a TransformConfig,
    cache: &'a ResolutionCache,
    seen: &'a SeenMessages,
}

impl<'a> PropertyResolver<'a> {
    pub fn new(
        graph: &'a SchemaGraph,
        config: &'a TransformConfig,
        cache: &'a ResolutionCache,
        seen: &'a SeenMessages,
    ) -> Self {
        Self {
            graph,
            config,
            cache,
            seen,
        }
    }

    /// Resolve every flattened key of `record` against `entity`.
    ///
    /// Keys without a schema match that are not extension shaped are dropped
    /// with a warning logged once per process. Walk failures are returned.
    pub fn resolve(&self, record: &Value, entity: &Entity) -> Result<ResolvedProperties> {
        let mode = self.config.mode;
        let resource_id = record.get("id").and_then(Value::as_str).unwrap_or("-");
        let mut resolved = ResolvedProperties::new();
        let mut contained_reported = false;
        let mut cache_hits = 0usize;

        for (flattened_key, value) in flatten(record) {
            let simple = simple_key(&flattened_key);

            if simple == self.config.contained_marker {
                if !contained_reported {
                    tracing::warn!(
                        "{}/{} includes '{}' resources. Unsupported at this time. Ignoring.",
                        entity.id(),
                        resource_id,
                        self.config.contained_marker
                    );
                    contained_reported = true;
                }
                continue;
            }

            if let Some(mut cached) = self.cache.get(entity.id(), mode, &flattened_key) {
                cached.value = value;
                resolved.insert(flattened_key, cached);
                cache_hits += 1;
                continue;
            }

            match self.root_element(record, entity, simple)? {
                Some(root_element) => {
                    let property = Property::new(flattened_key.clone(), value, root_element);
                    resolved.insert(flattened_key, property);
                }
                None => {
                    let message = format!(
                        "Could not find payload property definition. {}.{}",
                        entity.id(),
                        simple
                    );
                    if self.seen.first_occurrence(&message) {
                        tracing::warn!("{} ({}/{} {})", message, entity.id(), resource_id, flattened_key);
                    }
                }
            }
        }

        for property in resolved.values_mut() {
            if property.complete {
                continue;
            }
            self.walk(record, entity, property)?;
            property.complete = true;
            self.cache.insert(entity.id(), mode, property.clone());
        }

        tracing::debug!(
            "Resolved {}/{}: {} properties, {} from cache",
            entity.id(),
            resource_id,
            resolved.len(),
            cache_hits
        );

        Ok(resolved)
    }

    fn root_element(
        &self,
        record: &Value,
        entity: &Entity,
        simple: &str,
    ) -> Result<Option<Arc<ElementDefinition>>> {
        if simple == self.config.discriminant_field {
            return Ok(Some(entity.discriminant_element().clone()));
        }
        if let Some(element) = entity.element(simple) {
            return Ok(Some(element.clone()));
        }
        let extension_shaped = record
            .get(simple)
            .map(|payload| PayloadShape::of(payload).is_extension())
            .unwrap_or(false);
        if extension_shaped {
            let root = self.graph.extension_root(&self.config.extension_entity)?;
            return Ok(Some(root.clone()));
        }
        Ok(None)
    }

    /// Walk the non-index segments of `property`'s key and record the
    /// element each one resolves to.
    ///
    /// Inline structures keep the current entity and extend the lookup
    /// prefix; any other type switches to the entity of that name before the
    /// next segment is looked up. A segment without a match must sit inside
    /// an extension carrying payload, otherwise the record and the schema
    /// disagree and the walk fails.
    pub fn walk(&self, record: &Value, entity: &Entity, property: &mut Property) -> Result<()> {
        let payload = record.get(&property.simple_key);
        let mut current = entity;
        let mut next_entity: Option<String> = None;
        let mut prefix = String::new();
        let mut leaf_elements = Vec::new();

        for segment in property
            .flattened_key
            .split(KEY_SEPARATOR)
            .filter(|segment| !is_index(segment))
        {
            if let Some(type_code) = next_entity.take() {
                current = self.graph.entity(&type_code)?;
            }

            let path = format!("{prefix}{segment}");
            let (type_code, element) = match self.lookup(current, &path)? {
                Some(found) => found,
                None => {
                    tracing::debug!(
                        "{} not found in {}, root element {}",
                        path,
                        current.id(),
                        property.root_element.id
                    );
                    if !extension_payload(payload, segment) {
                        return Err(PfbFhirError::resolution_error(format!(
                            "'{}' from {} not found in {} and is not an extension",
                            path,
                            property.flattened_key,
                            current.id()
                        )));
                    }
                    let root = self.graph.extension_root(&self.config.extension_entity)?;
                    (self.config.extension_entity.clone(), root.clone())
                }
            };

            leaf_elements.push(Arc::new(element.with_type(type_code.as_str())));

            if is_inline_type(&type_code) {
                prefix = format!("{path}{KEY_SEPARATOR}");
            } else {
                prefix.clear();
                next_entity = Some(type_code);
            }
        }

        tracing::debug!(
            "Walked {}:{} through {} elements",
            entity.id(),
            property.flattened_key,
            leaf_elements.len()
        );
        property.leaf_elements = leaf_elements;
        Ok(())
    }

    fn lookup(
        &self,
        entity: &Entity,
        path: &str,
    ) -> Result<Option<(String, Arc<ElementDefinition>)>> {
        let element = if path == self.config.discriminant_field {
            Some(entity.discriminant_element())
        } else {
            entity.element(path)
        };
        let Some(element) = element else {
            return Ok(None);
        };
        let type_code = element.type_code().ok_or_else(|| {
            PfbFhirError::schema_error(format!("Element {} has no type code", element.id))
        })?;
        Ok(Some((type_code.to_string(), element.clone())))
    }
}

/// Whether the payload under a key's first segment can hold an unmatched
/// `segment`: either it carries extensions itself or its `segment` member does.
fn extension_payload(payload: Option<&Value>, segment: &str) -> bool {
    let Some(payload) = payload else {
        return false;
    };
    match PayloadShape::of(payload) {
        PayloadShape::ExtensionObject => true,
        PayloadShape::Object => payload
            .get(segment)
            .map(|member| PayloadShape::of(member).is_extension())
            .unwrap_or(false),
        PayloadShape::Scalar | PayloadShape::List => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extension_payload() {
        let payload = json!({"extension": [{"url": "x"}]});
        assert!(extension_payload(Some(&payload), "anything"));

        let nested = json!({"_given": {"extension": []}, "family": "Hills"});
        assert!(extension_payload(Some(&nested), "_given"));
        assert!(!extension_payload(Some(&nested), "family"));

        assert!(!extension_payload(Some(&json!([{"extension": []}])), "extension"));
        assert!(!extension_payload(Some(&json!("male")), "gender"));
        assert!(!extension_payload(None, "gender"));
    }

    #[test]
    fn test_inline_types() {
        assert!(is_inline_type("BackboneElement"));
        assert!(is_inline_type("Element"));
        assert!(!is_inline_type("HumanName"));
    }
}
