use serde::{Deserialize, Serialize};

use super::TerminologyLookup;
use crate::resolver::{Property, ResolvedProperties, SeenMessages};
use crate::types::ElementBinding;
use crate::types::payload::last_url_segment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Number,
    Boolean,
}

/// Map a FHIR type code onto the json type of its values.
pub fn normalize_type(code: &str) -> Option<JsonType> {
    match code {
        "http://hl7.org/fhirpath/System.String"
        | "http://hl7.org/fhirpath/System.Date"
        | "http://hl7.org/fhirpath/System.DateTime"
        | "http://hl7.org/fhirpath/System.Time" => Some(JsonType::String),
        "http://hl7.org/fhirpath/System.Integer" | "http://hl7.org/fhirpath/System.Decimal" => {
            Some(JsonType::Number)
        }
        "http://hl7.org/fhirpath/System.Boolean" => Some(JsonType::Boolean),
        "code" | "uri" | "url" | "canonical" | "oid" | "uuid" | "xhtml" | "date" | "time"
        | "instant" | "id" | "markdown" | "base64Binary" | "string" | "dateTime" => {
            Some(JsonType::String)
        }
        "decimal" | "positiveInt" | "unsignedInt" | "integer" | "integer64" => {
            Some(JsonType::Number)
        }
        "boolean" => Some(JsonType::Boolean),
        _ => None,
    }
}

/// Controlled vocabulary a property's values are drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeEnum {
    pub url: String,
    pub strength: String,
    pub codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescription {
    pub key: String,
    pub json_type: JsonType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<AttributeEnum>,
}

/// Turns resolved properties into the type, documentation and term binding
/// facts a dictionary emitter needs.
pub struct PropertyDescriber<'a> {
    terminology: &'a dyn TerminologyLookup,
    seen: &'a SeenMessages,
}

impl<'a> PropertyDescriber<'a> {
    pub fn new(terminology: &'a dyn TerminologyLookup, seen: &'a SeenMessages) -> Self {
        Self { terminology, seen }
    }

    pub fn describe_all(&self, properties: &ResolvedProperties) -> Vec<PropertyDescription> {
        properties.values().map(|property| self.describe(property)).collect()
    }

    pub fn describe(&self, property: &Property) -> PropertyDescription {
        let terminal = property.terminal_element();
        let json_type = match property.type_code() {
            Some(code) => normalize_type(code).unwrap_or_else(|| {
                self.warn_once(format!("No mapping for {code} default to string"));
                JsonType::String
            }),
            None => JsonType::String,
        };

        let mut description = terminal.description().map(str::to_string);
        let mut binding = terminal.binding.clone();

        if let Some(origin) = &property.extension {
            match self.terminology.lookup_extension(&origin.url) {
                Some(definition) => {
                    let sub = origin
                        .child_url
                        .as_deref()
                        .and_then(|child| definition.sub_extension(last_url_segment(child)));
                    let parts: Vec<&str> = [
                        definition.description.as_deref(),
                        sub.and_then(|sub| sub.definition.as_deref()),
                    ]
                    .into_iter()
                    .flatten()
                    .collect();
                    if !parts.is_empty() {
                        description = Some(parts.join(". "));
                    }
                    if binding.is_none() {
                        binding = match sub {
                            Some(sub) => sub.binding.clone(),
                            None => definition.binding.clone(),
                        };
                    }
                }
                None => {
                    self.warn_once(format!("No extension definition for {}", origin.url));
                }
            }
        }

        PropertyDescription {
            key: property.flattened_key.clone(),
            json_type,
            description,
            required: property.is_required(),
            enumeration: binding.and_then(|binding| self.enumeration(property, &binding)),
        }
    }

    fn enumeration(&self, property: &Property, binding: &ElementBinding) -> Option<AttributeEnum> {
        let Some(url) = binding.value_set.as_deref() else {
            self.warn_once(format!(
                "{} is bound without a value set",
                property.terminal_element().id
            ));
            return None;
        };
        let Some(value_set) = self.terminology.lookup_value_set(url) else {
            self.warn_once(format!("No value set {url} for {}", property.flattened_key));
            return None;
        };
        Some(AttributeEnum {
            url: url.to_string(),
            strength: binding.strength.clone(),
            codes: value_set.codes.clone(),
        })
    }

    fn warn_once(&self, message: String) {
        if self.seen.first_occurrence(&message) {
            tracing::warn!("{}", message);
        }
    }
}
