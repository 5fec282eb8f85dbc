// Element definitions as they appear in a profile snapshot

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One schema fact from a profile snapshot.
///
/// Element definitions are shared between entities, cached properties and
/// per-record properties through `Arc`, so they are never mutated in place.
/// Narrowing the admissible types goes through [`ElementDefinition::with_type`],
/// which returns a new value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub element_type: Vec<ElementType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<ElementBinding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ElementType {
    /// Absent codes only occur in corrupt profiles.
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_profile: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ElementBinding {
    pub strength: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_set: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ElementType {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            profile: None,
            target_profile: None,
        }
    }
}

impl ElementBinding {
    pub fn new(strength: impl Into<String>) -> Self {
        Self {
            strength: strength.into(),
            value_set: None,
            description: None,
        }
    }

    pub fn with_value_set(mut self, value_set: impl Into<String>) -> Self {
        self.value_set = Some(value_set.into());
        self
    }
}

impl ElementDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            path: Some(id.clone()),
            id,
            ..Default::default()
        }
    }

    pub fn with_type(&self, code: impl Into<String>) -> Self {
        let mut narrowed = self.clone();
        narrowed.element_type = vec![ElementType::new(code)];
        narrowed
    }

    pub fn with_id(&self, id: impl Into<String>) -> Self {
        let mut renamed = self.clone();
        renamed.id = id.into();
        renamed
    }

    pub fn with_types<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.element_type = codes.into_iter().map(ElementType::new).collect();
        self
    }

    pub fn with_short(mut self, short: impl Into<String>) -> Self {
        self.short = Some(short.into());
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_binding(mut self, binding: ElementBinding) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn with_min(mut self, min: u32) -> Self {
        self.min = Some(min);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// First admissible type code.
    pub fn type_code(&self) -> Option<&str> {
        self.element_type.first().and_then(|t| t.code.as_deref())
    }

    pub fn type_codes(&self) -> impl Iterator<Item = Option<&str>> {
        self.element_type.iter().map(|t| t.code.as_deref())
    }

    /// Polymorphic elements carry the `[x]` marker in their id.
    pub fn is_choice(&self) -> bool {
        self.id.contains(CHOICE_MARKER)
    }

    pub fn is_required(&self) -> bool {
        self.min.is_some_and(|min| min >= 1)
    }

    /// Preferred human description: the long definition, else the short one.
    pub fn description(&self) -> Option<&str> {
        self.definition.as_deref().or(self.short.as_deref())
    }
}

pub const CHOICE_MARKER: &str = "[x]";
