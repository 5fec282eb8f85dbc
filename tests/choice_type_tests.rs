mod common;

use common::*;
use pfb_fhir::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

#[test]
fn test_patient_choice_elements_expanded() {
    let graph = schema_graph();
    let patient = graph.get("Patient").unwrap();

    let boolean = patient.element("deceasedBoolean").unwrap();
    assert_eq!(boolean.type_code(), Some("boolean"));
    assert_eq!(boolean.path.as_deref(), Some("Patient.deceasedBoolean"));
    let date_time = patient.element("deceasedDateTime").unwrap();
    assert_eq!(date_time.type_code(), Some("dateTime"));
    assert!(patient.element("deceased[x]").is_none());
}

#[test]
fn test_no_entity_keeps_choice_markers() {
    let graph = schema_graph();
    for entity in graph.entities() {
        for id in entity.element_lookup().keys() {
            assert!(!id.contains(CHOICE_MARKER), "{id} left unexpanded");
        }
    }

    let extension = graph.get("Extension").unwrap();
    for suffix in ["String", "Code", "Boolean", "Decimal", "DateTime", "Coding", "Address"] {
        assert!(
            extension.element(&format!("value{suffix}")).is_some(),
            "value{suffix} missing"
        );
    }
}

#[test]
fn test_choice_without_types_is_schema_error() {
    let profile: StructureDefinition = serde_json::from_value(json!({
        "resourceType": "StructureDefinition",
        "id": "Broken",
        "snapshot": {"element": [
            {"id": "Broken", "path": "Broken"},
            {"id": "Broken.value[x]", "path": "Broken.value[x]"}
        ]}
    }))
    .unwrap();

    let error = Entity::from_profile("Broken", EntityCategory::SubProfile, &profile).unwrap_err();
    assert!(matches!(error, PfbFhirError::Schema { .. }));
    assert!(error.to_string().contains("Broken.value[x]"));
}

#[test]
fn test_choice_type_without_code_is_schema_error() {
    let profile: StructureDefinition = serde_json::from_value(json!({
        "resourceType": "StructureDefinition",
        "id": "Broken",
        "snapshot": {"element": [
            {"id": "Broken", "path": "Broken"},
            {"id": "Broken.value[x]", "path": "Broken.value[x]", "type": [{"code": "string"}, {}]}
        ]}
    }))
    .unwrap();

    let result = Entity::from_profile("Broken", EntityCategory::SubProfile, &profile);
    assert!(matches!(result, Err(PfbFhirError::Schema { .. })));
}

#[test]
fn test_variants_keep_element_facts() {
    let choice = ElementDefinition::new("Observation.value[x]")
        .with_types(["Quantity", "string"])
        .with_short("Actual result")
        .with_min(1);
    let variants = ChoiceTypeExpander::new().expand_element(&choice).unwrap();

    assert_eq!(variants.len(), 2);
    for variant in &variants {
        assert_eq!(variant.short.as_deref(), Some("Actual result"));
        assert!(variant.is_required());
        assert!(!variant.is_choice());
    }
    assert_eq!(choice.element_type.len(), 2);
}

fn type_code() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "string",
        "boolean",
        "integer",
        "decimal",
        "dateTime",
        "Quantity",
        "CodeableConcept",
        "Reference",
        "Period",
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn test_expansion_is_total(
        name in "[a-z]{1,8}",
        codes in prop::collection::vec(type_code(), 1..6),
    ) {
        let element = ElementDefinition::new(format!("Observation.{name}[x]"))
            .with_types(codes.iter().copied());
        let lookup = ChoiceTypeExpander::new().expand_lookup(&[element]).unwrap();

        let mut distinct = codes.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(lookup.len(), distinct.len());

        for code in distinct {
            let id = format!("Observation.{name}{}", ChoiceTypeExpander::type_suffix(code));
            let variant = lookup.get(&id);
            prop_assert!(variant.is_some(), "{} missing", id);
            prop_assert_eq!(variant.and_then(|v| v.type_code()), Some(code));
        }
        prop_assert!(lookup.keys().all(|id| !id.contains(CHOICE_MARKER)));
    }
}
