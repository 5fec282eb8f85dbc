use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{Buckets, is_under};
use crate::resolver::property::property_name;
use crate::resolver::{ExtensionOrigin, Property, SeenMessages};
use crate::types::payload::{EXTENSION_FIELD, last_url_segment};

/// Splits a key into its deepest `extension.{n}` node and the remainder.
static EXTENSION_NODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((?:.*\.)?extension\.[0-9]+)\.(.+)$").expect("extension node pattern")
});

/// Fold extension trees into `{name}.{subName}` keys.
///
/// Root extensions (`extension.{i}...`, bucket `X.extension`) and named
/// extensions (`_field.extension.{i}...`, the generic extension bucket) are
/// folded first; extensions nested inside ordinary properties follow.
pub(super) fn fold_extensions(buckets: &mut Buckets, extension_entity: &str, seen: &SeenMessages) {
    for (root_key, properties) in buckets.iter_mut() {
        let folded = if root_key == extension_entity {
            fold_named_extensions(properties, seen)
        } else if is_root_extension_bucket(root_key) {
            let members: Vec<&Property> = properties.iter().collect();
            let folded = fold_extension_set(&members, EXTENSION_FIELD, "", seen);
            (!folded.is_empty()).then_some(folded)
        } else {
            continue;
        };
        if let Some(folded) = folded {
            *properties = folded;
        }
    }

    for (root_key, properties) in buckets.iter_mut() {
        if root_key == extension_entity || is_root_extension_bucket(root_key) {
            continue;
        }
        if let Some(folded) = fold_property_extensions(properties, seen) {
            *properties = folded;
        }
    }
}

fn is_root_extension_bucket(root_key: &str) -> bool {
    property_name(root_key) == EXTENSION_FIELD
}

/// Named extensions of every field sharing the generic extension bucket,
/// folded per field into `{field}.{name}.{subName}`.
fn fold_named_extensions(properties: &[Property], seen: &SeenMessages) -> Option<Vec<Property>> {
    let mut fields: IndexMap<&str, Vec<&Property>> = IndexMap::new();
    for property in properties {
        fields
            .entry(property.simple_key.as_str())
            .or_default()
            .push(property);
    }

    let mut result = Vec::with_capacity(properties.len());
    let mut folded_any = false;
    for (field, members) in fields {
        let base = format!("{field}.{EXTENSION_FIELD}");
        let folded = fold_extension_set(&members, &base, &format!("{field}."), seen);
        if folded.is_empty() {
            result.extend(members.into_iter().cloned());
        } else {
            folded_any = true;
            result.extend(folded);
        }
    }

    folded_any.then_some(result)
}

/// Fold every `{base}.{i}` extension instance present in `members`.
fn fold_extension_set(
    members: &[&Property],
    base: &str,
    key_prefix: &str,
    seen: &SeenMessages,
) -> Vec<Property> {
    let mut folded = Vec::new();
    for index in 0.. {
        let instance = format!("{base}.{index}");
        let instance_members: Vec<&Property> = members
            .iter()
            .copied()
            .filter(|property| is_under(&property.flattened_key, &instance))
            .collect();
        if instance_members.is_empty() {
            break;
        }
        let Some(url) = url_of(&instance_members, &instance) else {
            warn_once(seen, format!("Extension {instance} has no url, skipped"));
            continue;
        };
        let key = format!("{key_prefix}{}", last_url_segment(url));
        folded.extend(fold_instance(&instance_members, &instance, &key, url, seen));
    }
    folded
}

/// Extensions nested inside ordinary properties, e.g. a geolocation on an
/// address: `address.0.extension.0...` folds to `address.0.{name}.{subName}`.
fn fold_property_extensions(properties: &[Property], seen: &SeenMessages) -> Option<Vec<Property>> {
    let mut instances: IndexSet<String> = IndexSet::new();
    for property in properties {
        let Some(captures) = EXTENSION_NODE.captures(&property.flattened_key) else {
            continue;
        };
        let node = &captures[1];
        if extension_depth(node) == 1 {
            instances.insert(node.to_string());
        }
    }
    if instances.is_empty() {
        return None;
    }

    let mut folded = Vec::new();
    let mut consumed: Vec<&str> = Vec::new();
    for instance in &instances {
        let members: Vec<&Property> = properties
            .iter()
            .filter(|property| is_under(&property.flattened_key, instance))
            .collect();
        let Some(url) = url_of(&members, instance) else {
            warn_once(seen, format!("Extension {instance} has no url, skipped"));
            continue;
        };
        let key = format!("{}{}", property_prefix(instance), last_url_segment(url));
        let instance_folded = fold_instance(&members, instance, &key, url, seen);
        if instance_folded.is_empty() {
            continue;
        }
        folded.extend(instance_folded);
        consumed.push(instance);
    }
    if folded.is_empty() {
        return None;
    }

    let mut result: Vec<Property> = properties
        .iter()
        .filter(|property| {
            !consumed
                .iter()
                .any(|instance| is_under(&property.flattened_key, instance))
        })
        .cloned()
        .collect();
    result.extend(folded);
    Some(result)
}

/// Fold one extension instance. Complex extensions yield one property per
/// direct sub-extension under `{key}.{subName}`; simple ones yield `key`.
fn fold_instance(
    members: &[&Property],
    instance: &str,
    key: &str,
    url: &str,
    seen: &SeenMessages,
) -> Vec<Property> {
    let mut folded = Vec::new();
    let mut complex = false;

    for index in 0.. {
        let child = format!("{instance}.{EXTENSION_FIELD}.{index}");
        let child_members: Vec<&Property> = members
            .iter()
            .copied()
            .filter(|property| is_under(&property.flattened_key, &child))
            .collect();
        if child_members.is_empty() {
            break;
        }
        complex = true;
        let Some(child_url) = url_of(&child_members, &child) else {
            warn_once(seen, format!("Extension {url} has a sub-extension without url"));
            continue;
        };
        let origin = ExtensionOrigin {
            url: url.to_string(),
            child_url: Some(child_url.to_string()),
        };
        let child_key = format!("{key}.{}", last_url_segment(child_url));
        folded.extend(pick_values(&child_members, &child, &child_key, &origin));
    }

    if !complex {
        let origin = ExtensionOrigin {
            url: url.to_string(),
            child_url: None,
        };
        folded.extend(pick_values(members, instance, key, &origin));
    }

    if folded.is_empty() {
        warn_once(seen, format!("Extension {url} has no values to fold"));
    }
    folded
}

/// The `value*` entries directly under `node`, renamed to `key`.
///
/// A single entry keeps `key`; among several a `.code` leaf wins, otherwise
/// each leaf keeps its path below the value as a suffix.
fn pick_values(
    members: &[&Property],
    node: &str,
    key: &str,
    origin: &ExtensionOrigin,
) -> Vec<Property> {
    let value_prefix = format!("{node}.value");
    let values: Vec<&Property> = members
        .iter()
        .copied()
        .filter(|property| property.flattened_key.starts_with(&value_prefix))
        .collect();

    let renamed = |property: &Property, key: String| {
        property.renamed(key).with_extension(origin.clone())
    };

    match values.as_slice() {
        [] => Vec::new(),
        [single] => vec![renamed(*single, key.to_string())],
        _ => {
            if let Some(code) = values
                .iter()
                .copied()
                .find(|property| property.flattened_key.ends_with(".code"))
            {
                return vec![renamed(code, key.to_string())];
            }
            values
                .iter()
                .copied()
                .map(|property| {
                    let under_node = &property.flattened_key[node.len() + 1..];
                    match under_node.split_once('.') {
                        Some((_, leaf)) => renamed(property, format!("{key}.{leaf}")),
                        None => renamed(property, key.to_string()),
                    }
                })
                .collect()
        }
    }
}

fn url_of<'p>(members: &[&'p Property], node: &str) -> Option<&'p str> {
    let url_key = format!("{node}.url");
    members
        .iter()
        .copied()
        .find(|property| property.flattened_key == url_key)
        .and_then(|property| property.value.as_str())
}

fn extension_depth(node: &str) -> usize {
    node.split('.')
        .filter(|segment| *segment == EXTENSION_FIELD)
        .count()
}

/// Key segments in front of the `extension` segment, dot terminated.
fn property_prefix(instance: &str) -> String {
    instance
        .split('.')
        .take_while(|segment| *segment != EXTENSION_FIELD)
        .map(|segment| format!("{segment}."))
        .collect()
}

fn warn_once(seen: &SeenMessages, message: String) {
    if seen.first_occurrence(&message) {
        tracing::warn!("{}", message);
    }
}
