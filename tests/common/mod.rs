use pfb_fhir::*;
use serde_json::{Value, json};
use std::sync::Arc;

pub const GENDER_VALUE_SET: &str = "http://hl7.org/fhir/ValueSet/administrative-gender|4.0.1";
pub const RACE_URL: &str = "http://hl7.org/fhir/us/core/StructureDefinition/us-core-race";
pub const GEOLOCATION_URL: &str = "http://hl7.org/fhir/StructureDefinition/geolocation";

#[allow(dead_code)]
pub const MODEL: &str = r#"
entities:
  Patient:
    category: Administrative
  Observation:
    category: Clinical
    links:
      subject:
        targetProfile: http://hl7.org/fhir/StructureDefinition/Patient
"#;

fn element(id: &str, types: &[&str]) -> ElementDefinition {
    ElementDefinition::new(id)
        .with_types(types.iter().copied())
        .with_short(format!("{id} short"))
        .with_definition(format!("{id} definition"))
}

fn root(id: &str) -> ElementDefinition {
    ElementDefinition::new(id)
        .with_short(format!("{id} resource"))
        .with_definition(format!("Information about a {id}"))
}

fn profile(id: &str, elements: Vec<ElementDefinition>) -> StructureDefinition {
    let mut profile = StructureDefinition::new(id, elements);
    profile.url = Some(format!("http://hl7.org/fhir/StructureDefinition/{id}"));
    profile.name = Some(id.to_string());
    profile.base_type = Some(id.to_string());
    profile
}

#[allow(dead_code)]
pub fn patient_profile() -> StructureDefinition {
    profile(
        "Patient",
        vec![
            root("Patient"),
            element("Patient.id", &["id"]),
            element("Patient.extension", &["Extension"]),
            element("Patient.identifier", &["Identifier"]),
            element("Patient.active", &["boolean"]),
            element("Patient.name", &["HumanName"]),
            element("Patient.gender", &["code"]).with_binding(
                ElementBinding::new("required").with_value_set(GENDER_VALUE_SET),
            ),
            element("Patient.birthDate", &["date"]),
            element("Patient.deceased[x]", &["boolean", "dateTime"]),
            element("Patient.address", &["Address"]),
            element("Patient.contact", &["BackboneElement"]),
            element("Patient.contact.relationship", &["CodeableConcept"]),
            element("Patient.contact.name", &["HumanName"]),
            element("Patient.contained", &["Resource"]),
        ],
    )
}

#[allow(dead_code)]
pub fn observation_profile() -> StructureDefinition {
    profile(
        "Observation",
        vec![
            root("Observation"),
            element("Observation.id", &["id"]),
            element("Observation.status", &["code"]).with_min(1),
            element("Observation.code", &["CodeableConcept"]).with_min(1),
            element("Observation.subject", &["Reference"]),
            element("Observation.effective[x]", &["dateTime", "Period"]),
            element("Observation.value[x]", &["Quantity", "CodeableConcept", "string"]),
            element("Observation.component", &["BackboneElement"]),
            element("Observation.component.code", &["CodeableConcept"]),
            element("Observation.component.value[x]", &["Quantity", "string"]),
        ],
    )
}

#[allow(dead_code)]
pub fn datatype_profiles() -> Vec<StructureDefinition> {
    vec![
        profile(
            "Extension",
            vec![
                root("Extension"),
                element("Extension.extension", &["Extension"]),
                element("Extension.url", &["uri"]),
                element(
                    "Extension.value[x]",
                    &["string", "code", "boolean", "decimal", "dateTime", "Coding", "Address"],
                ),
            ],
        ),
        profile(
            "Identifier",
            vec![
                root("Identifier"),
                element("Identifier.type", &["CodeableConcept"]),
                element("Identifier.system", &["uri"]),
                element("Identifier.value", &["string"]),
            ],
        ),
        profile(
            "HumanName",
            vec![
                root("HumanName"),
                element("HumanName.use", &["code"]),
                element("HumanName.family", &["string"]),
                element("HumanName.given", &["string"]),
            ],
        ),
        profile(
            "Address",
            vec![
                root("Address"),
                element("Address.extension", &["Extension"]),
                element("Address.line", &["string"]),
                element("Address.city", &["string"]),
                element("Address.state", &["string"]),
            ],
        ),
        profile(
            "CodeableConcept",
            vec![
                root("CodeableConcept"),
                element("CodeableConcept.coding", &["Coding"]),
                element("CodeableConcept.text", &["string"]),
            ],
        ),
        profile(
            "Coding",
            vec![
                root("Coding"),
                element("Coding.system", &["uri"]),
                element("Coding.code", &["code"]),
                element("Coding.display", &["string"]),
            ],
        ),
        profile(
            "Reference",
            vec![
                root("Reference"),
                element("Reference.reference", &["string"]),
                element("Reference.display", &["string"]),
            ],
        ),
        profile(
            "Quantity",
            vec![
                root("Quantity"),
                element("Quantity.value", &["decimal"]),
                element("Quantity.unit", &["string"]),
                element("Quantity.system", &["uri"]),
                element("Quantity.code", &["code"]),
            ],
        ),
        profile(
            "Period",
            vec![
                root("Period"),
                element("Period.start", &["dateTime"]),
                element("Period.end", &["dateTime"]),
            ],
        ),
    ]
}

#[allow(dead_code)]
pub fn profile_set() -> ProfileSet {
    let mut profiles = ProfileSet::new()
        .with_profile(patient_profile())
        .with_profile(observation_profile());
    for datatype in datatype_profiles() {
        profiles.insert(datatype);
    }
    profiles
}

#[allow(dead_code)]
pub fn schema_graph() -> Arc<SchemaGraph> {
    let model = ModelConfig::from_yaml_str(MODEL).unwrap();
    Arc::new(SchemaGraph::load(&model, &profile_set()).unwrap())
}

#[allow(dead_code)]
pub fn transformer(config: TransformConfig) -> Transformer {
    Transformer::new(schema_graph(), config)
}

#[allow(dead_code)]
pub fn patient() -> Value {
    json!({
        "resourceType": "Patient",
        "id": "pat-1",
        "extension": [
            {
                "url": RACE_URL,
                "extension": [
                    {
                        "url": "ombCategory",
                        "valueCoding": {
                            "system": "urn:oid:2.16.840.1.113883.6.238",
                            "code": "2106-3",
                            "display": "White"
                        }
                    },
                    {"url": "text", "valueString": "White"}
                ]
            }
        ],
        "identifier": [
            {"type": {"coding": [{"system": "http://terminology.hl7.org/CodeSystem/v2-0203", "code": "MR"}]}, "value": "123"},
            {"system": "http://x/y", "value": "456"}
        ],
        "active": true,
        "name": [{"use": "official", "family": "Hills818", "given": ["Na515", "Mae"]}],
        "gender": "female",
        "birthDate": "1970-01-01",
        "_birthDate": {
            "extension": [
                {"url": "http://hl7.org/fhir/StructureDefinition/patient-birthTime", "valueDateTime": "1970-01-01T10:00:00Z"}
            ]
        },
        "deceasedBoolean": false,
        "address": [
            {
                "extension": [
                    {
                        "url": GEOLOCATION_URL,
                        "extension": [
                            {"url": "latitude", "valueDecimal": 42.36},
                            {"url": "longitude", "valueDecimal": -71.05}
                        ]
                    }
                ],
                "line": ["1 Main St"],
                "city": "Boston",
                "state": "MA"
            }
        ]
    })
}

#[allow(dead_code)]
pub fn observation() -> Value {
    json!({
        "resourceType": "Observation",
        "id": "obs-1",
        "status": "final",
        "code": {
            "coding": [{"system": "http://loinc.org", "code": "1234-5", "display": "Foo"}]
        },
        "subject": {"reference": "Patient/pat-1"},
        "effectiveDateTime": "2020-01-01T00:00:00Z",
        "valueQuantity": {"value": 180.5, "unit": "cm", "system": "http://unitsofmeasure.org", "code": "cm"}
    })
}

#[allow(dead_code)]
pub fn terminology() -> TerminologyStore {
    let mut store = TerminologyStore::new();
    store
        .load_resource(&json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [
                {"resource": {
                    "resourceType": "StructureDefinition",
                    "id": "us-core-race",
                    "url": RACE_URL,
                    "type": "Extension",
                    "description": "Concepts classifying the person into a named category of humans",
                    "snapshot": {"element": [
                        {"id": "Extension", "path": "Extension"},
                        {"id": "Extension.extension:ombCategory", "path": "Extension.extension",
                         "sliceName": "ombCategory", "definition": "The 5 race category codes",
                         "type": [{"code": "Extension"}]},
                        {"id": "Extension.extension:ombCategory.value[x]", "path": "Extension.extension.value[x]",
                         "type": [{"code": "Coding"}],
                         "binding": {"strength": "required",
                                     "valueSet": "http://hl7.org/fhir/us/core/ValueSet/omb-race-category"}},
                        {"id": "Extension.url", "path": "Extension.url", "type": [{"code": "uri"}]}
                    ]}
                }},
                {"resource": {
                    "resourceType": "ValueSet",
                    "url": "http://hl7.org/fhir/ValueSet/administrative-gender",
                    "compose": {"include": [{"system": "http://hl7.org/fhir/administrative-gender",
                        "concept": [{"code": "male"}, {"code": "female"}, {"code": "other"}, {"code": "unknown"}]}]}
                }},
                {"resource": {
                    "resourceType": "ValueSet",
                    "url": "http://hl7.org/fhir/us/core/ValueSet/omb-race-category",
                    "expansion": {"contains": [
                        {"code": "1002-5"}, {"code": "2028-9"}, {"code": "2054-5"},
                        {"code": "2076-8"}, {"code": "2106-3"}
                    ]}
                }}
            ]
        }))
        .unwrap();
    store
}

#[allow(dead_code)]
pub fn flat_keys(record: &TransformedRecord) -> Vec<String> {
    record.properties.keys().cloned().collect()
}
