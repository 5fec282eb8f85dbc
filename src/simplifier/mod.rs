//! Structural simplification of resolved properties.
//!
//! Properties are bucketed by root key and pushed through a fixed sequence
//! of rewrites. The order matters: extensions are folded while their list
//! indices are still present, singleton lists are collapsed next, and coding
//! folding relies on the collapsed `.coding.system` shape.

mod codings;
mod extensions;
mod identifiers;
mod lists;

use indexmap::IndexMap;

use crate::core::TransformConfig;
use crate::resolver::{Property, ResolvedProperties, SeenMessages};

/// Property name whose arrays are folded by the identifier stage and left
/// alone by the list collapse.
pub const IDENTIFIER: &str = "identifier";

/// Properties grouped by root key, each bucket in flattening order.
pub type Buckets = IndexMap<String, Vec<Property>>;

pub struct ContextSimplifier<'a> {
    config: &'a TransformConfig,
    seen: &'a SeenMessages,
}

impl<'a> ContextSimplifier<'a> {
    pub fn new(config: &'a TransformConfig, seen: &'a SeenMessages) -> Self {
        Self { config, seen }
    }

    pub fn simplify(&self, properties: ResolvedProperties) -> ResolvedProperties {
        let property_count = properties.len();
        let mut buckets = group_by_root(properties);

        extensions::fold_extensions(&mut buckets, &self.config.extension_entity, self.seen);
        lists::collapse_single_item_lists(
            &mut buckets,
            self.config.list_collapse_passes,
            &self.config.extension_entity,
        );
        codings::fold_codings(&mut buckets);
        identifiers::fold_identifiers(&mut buckets);

        let mut simplified = ResolvedProperties::new();
        for property in buckets.into_values().flatten() {
            simplified.insert(property.flattened_key.clone(), property);
        }

        tracing::debug!(
            "Simplified {} properties into {}",
            property_count,
            simplified.len()
        );
        simplified
    }
}

pub fn group_by_root(properties: ResolvedProperties) -> Buckets {
    let mut buckets = Buckets::new();
    for property in properties.into_values() {
        buckets
            .entry(property.root_key().to_string())
            .or_default()
            .push(property);
    }
    buckets
}

/// Whether `key` is `node` or lies below it, matching whole segments only.
pub(crate) fn is_under(key: &str, node: &str) -> bool {
    key.strip_prefix(node)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}
