use super::{Buckets, IDENTIFIER, is_under};
use crate::resolver::Property;
use crate::resolver::property::property_name;

/// Rewrite `x.0.y` to `x.y` wherever `x` holds a single list member.
///
/// Each pass handles one level of nesting per key; passes stop early once
/// nothing changes.
pub(super) fn collapse_single_item_lists(
    buckets: &mut Buckets,
    passes: usize,
    extension_entity: &str,
) {
    for pass in 0..passes {
        let mut changed = false;
        for (root_key, properties) in buckets.iter_mut() {
            if root_key == extension_entity || property_name(root_key) == IDENTIFIER {
                continue;
            }
            changed |= collapse_bucket(properties);
        }
        tracing::debug!("List collapse pass {}: changed {}", pass, changed);
        if !changed {
            break;
        }
    }
}

fn collapse_bucket(properties: &mut [Property]) -> bool {
    let mut changed = false;
    for index in 0..properties.len() {
        let Some(list_path) = first_list_path(&properties[index].flattened_key) else {
            continue;
        };

        let second = format!("{list_path}.1");
        if properties
            .iter()
            .any(|property| is_under(&property.flattened_key, &second))
        {
            continue;
        }

        let first = format!("{list_path}.0");
        tracing::debug!("{} is a single item list", first);
        for property in properties.iter_mut() {
            if is_under(&property.flattened_key, &first) {
                property.flattened_key =
                    format!("{list_path}{}", &property.flattened_key[first.len()..]);
                changed = true;
            }
        }
    }
    changed
}

/// Path of the list holding the key's first `0` segment.
fn first_list_path(key: &str) -> Option<String> {
    let segments: Vec<&str> = key.split('.').collect();
    let position = segments.iter().position(|segment| *segment == "0")?;
    if position == 0 {
        return None;
    }
    Some(segments[..position].join("."))
}
