mod common;

use common::*;
use pfb_fhir::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_bound_code_gets_enumeration() {
    let transformer = transformer(TransformConfig::default());
    let record = transformer.transform(&patient()).unwrap().unwrap();
    let store = terminology();
    let describer = PropertyDescriber::new(&store, transformer.seen_messages());

    let gender = describer.describe(&record.properties["gender"]);
    assert_eq!(gender.json_type, JsonType::String);
    assert_eq!(gender.description.as_deref(), Some("Patient.gender definition"));
    assert!(!gender.required);
    assert_eq!(
        gender.enumeration,
        Some(AttributeEnum {
            url: GENDER_VALUE_SET.to_string(),
            strength: "required".to_string(),
            codes: vec![
                "male".to_string(),
                "female".to_string(),
                "other".to_string(),
                "unknown".to_string()
            ],
        })
    );
}

#[test]
fn test_types_follow_terminal_element() {
    let transformer = transformer(TransformConfig::default());
    let record = transformer.transform(&observation()).unwrap().unwrap();
    let store = TerminologyStore::new();
    let describer = PropertyDescriber::new(&store, transformer.seen_messages());

    let descriptions = describer.describe_all(&record.properties);
    let by_key = |key: &str| {
        descriptions
            .iter()
            .find(|description| description.key == key)
            .unwrap()
    };

    assert_eq!(by_key("valueQuantity.value").json_type, JsonType::Number);
    assert_eq!(by_key("effectiveDateTime").json_type, JsonType::String);
    assert!(by_key("status").required);
    assert!(!by_key("subject.reference").required);
    assert_eq!(
        by_key("resourceType").description.as_deref(),
        Some("Information about a Observation")
    );
    assert_eq!(descriptions.len(), record.properties.len());
}

#[test]
fn test_folded_extension_uses_extension_definition() {
    let transformer = transformer(TransformConfig::simplified());
    let record = transformer.transform(&patient()).unwrap().unwrap();
    let store = terminology();
    let describer = PropertyDescriber::new(&store, transformer.seen_messages());

    let race = describer.describe(&record.properties["us-core-race.ombCategory"]);
    assert_eq!(race.json_type, JsonType::String);
    assert_eq!(
        race.description.as_deref(),
        Some("Concepts classifying the person into a named category of humans. The 5 race category codes")
    );
    let enumeration = race.enumeration.unwrap();
    assert_eq!(enumeration.url, "http://hl7.org/fhir/us/core/ValueSet/omb-race-category");
    assert_eq!(enumeration.codes.len(), 5);
}

#[test]
fn test_unknown_extension_keeps_element_description() {
    let transformer = transformer(TransformConfig::simplified());
    let record = transformer.transform(&patient()).unwrap().unwrap();
    let store = TerminologyStore::new();
    let describer = PropertyDescriber::new(&store, transformer.seen_messages());

    let birth_time = describer.describe(&record.properties["_birthDate.patient-birthTime"]);
    assert_eq!(birth_time.json_type, JsonType::String);
    assert_eq!(
        birth_time.description.as_deref(),
        Some("Extension.value[x] definition")
    );
    assert!(transformer.seen_messages().contains(
        "No extension definition for http://hl7.org/fhir/StructureDefinition/patient-birthTime"
    ));
}

#[test]
fn test_missing_value_set_and_unmapped_type_warn() {
    let seen = SeenMessages::new();
    let store = TerminologyStore::new();
    let describer = PropertyDescriber::new(&store, &seen);

    let root = ElementDefinition::new("Observation.valueAge")
        .with_types(["Age"])
        .with_binding(ElementBinding::new("extensible").with_value_set("http://example.org/vs"))
        .shared();
    let mut property = Property::new("valueAge", json!({}), root.clone());
    property.leaf_elements = vec![root];

    let description = describer.describe(&property);
    assert_eq!(description.json_type, JsonType::String);
    assert_eq!(description.enumeration, None);
    assert!(seen.contains("No mapping for Age default to string"));
    assert!(seen.contains("No value set http://example.org/vs for valueAge"));

    let warnings = seen.len();
    describer.describe(&property);
    assert_eq!(seen.len(), warnings);
}

#[test]
fn test_description_serializes_for_dictionary_emitters() {
    let description = PropertyDescription {
        key: "gender".to_string(),
        json_type: JsonType::String,
        description: None,
        required: false,
        enumeration: None,
    };
    assert_eq!(
        serde_json::to_value(&description).unwrap(),
        json!({"key": "gender", "json_type": "string", "required": false})
    );
}
