use url::Url;

use super::{Buckets, IDENTIFIER, is_under};
use crate::resolver::Property;
use crate::resolver::property::property_name;
use crate::types::payload::last_url_segment;

/// Fold each `identifier.{i}` member into `identifier.{i}.{name}` carrying
/// the member's value. The name is the identifier type code when present,
/// otherwise derived from the system url.
pub(super) fn fold_identifiers(buckets: &mut Buckets) {
    for (root_key, properties) in buckets.iter_mut() {
        if property_name(root_key) != IDENTIFIER {
            continue;
        }
        fold_bucket(properties);
    }
}

fn fold_bucket(properties: &mut Vec<Property>) {
    let mut folded = Vec::new();
    let mut consumed = Vec::new();

    for index in 0.. {
        let member = format!("{IDENTIFIER}.{index}");
        let members: Vec<&Property> = properties
            .iter()
            .filter(|property| is_under(&property.flattened_key, &member))
            .collect();
        if members.is_empty() {
            break;
        }
        let field = |name: &str| {
            let key = format!("{member}.{name}");
            members
                .iter()
                .find(|property| property.flattened_key == key)
                .copied()
        };

        let Some(value) = field("value") else {
            tracing::debug!("{} has no value, left as is", member);
            continue;
        };
        let type_code = field("type.coding.0.code").and_then(|p| p.value.as_str());
        let system = field("system").and_then(|p| p.value.as_str());
        let Some(name) = type_code
            .map(str::to_string)
            .or_else(|| system.map(identifier_name))
        else {
            tracing::debug!("{} has neither type nor system, left as is", member);
            continue;
        };

        folded.push(value.renamed(format!("{member}.{name}")));
        consumed.push(member);
    }

    if folded.is_empty() {
        return;
    }
    properties.retain(|property| {
        !consumed
            .iter()
            .any(|member| is_under(&property.flattened_key, member))
    });
    properties.extend(folded);
}

/// Short name of an identifier system: the last path segment of the url,
/// or for host-only urls the second-to-last label of the host.
pub fn identifier_name(system: &str) -> String {
    let Ok(url) = Url::parse(system) else {
        return last_url_segment(system).to_string();
    };

    if let Some(segment) = url
        .path_segments()
        .and_then(|segments| segments.filter(|segment| !segment.is_empty()).last())
    {
        return segment.to_string();
    }

    match url.host_str() {
        Some(host) => {
            let labels: Vec<&str> = host.split('.').collect();
            let from_end = if labels.len() > 2 { 1 } else { 0 };
            labels
                .iter()
                .rev()
                .nth(from_end)
                .copied()
                .unwrap_or(host)
                .to_string()
        }
        None => last_url_segment(url.path()).to_string(),
    }
}
