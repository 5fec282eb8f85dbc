use super::Buckets;
use crate::resolver::Property;
use crate::types::payload::last_url_segment;

const SYSTEM_SUFFIX: &str = ".coding.system";
const CODE_SUFFIX: &str = ".coding.code";
const DISPLAY_SUFFIX: &str = ".coding.display";

/// Fold the first `coding` triple of every bucket into one key named after
/// the code system: `code.coding.system`/`code.coding.code` become
/// `code.{system}`, or `code.{system}.display` when only a display exists.
///
/// The matched coded entries are dropped even when no folded key can be
/// built from them.
pub(super) fn fold_codings(buckets: &mut Buckets) {
    for properties in buckets.values_mut() {
        fold_bucket(properties);
    }
}

fn fold_bucket(properties: &mut Vec<Property>) {
    let system = position_with_suffix(properties, SYSTEM_SUFFIX);
    let code = position_with_suffix(properties, CODE_SUFFIX);
    let display = position_with_suffix(properties, DISPLAY_SUFFIX);

    let originals: Vec<usize> = [system, code, display].into_iter().flatten().collect();
    if originals.is_empty() {
        return;
    }
    let folded = system.and_then(|system| folded_coding(properties, system, code, display));

    let mut position = 0;
    properties.retain(|_| {
        let keep = !originals.contains(&position);
        position += 1;
        keep
    });
    properties.extend(folded);
}

fn folded_coding(
    properties: &[Property],
    system: usize,
    code: Option<usize>,
    display: Option<usize>,
) -> Option<Property> {
    let system_property = &properties[system];
    let system_value = system_property.value.as_str()?;
    let key = &system_property.flattened_key;
    let base = &key[..key.len() - SYSTEM_SUFFIX.len()];
    let system_name = last_url_segment(system_value);

    match (code, display) {
        (Some(code), _) => Some(properties[code].renamed(format!("{base}.{system_name}"))),
        (None, Some(display)) => {
            Some(properties[display].renamed(format!("{base}.{system_name}.display")))
        }
        (None, None) => None,
    }
}

fn position_with_suffix(properties: &[Property], suffix: &str) -> Option<usize> {
    properties
        .iter()
        .position(|property| property.flattened_key.ends_with(suffix))
}
