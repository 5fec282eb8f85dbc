use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

use crate::types::ElementDefinition;
use crate::types::payload::simple_key;

/// Resolved properties of one record, in flattening order.
pub type ResolvedProperties = IndexMap<String, Property>;

/// Where a folded property came from when it was produced from an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionOrigin {
    pub url: String,
    /// Url of the sub-extension, for complex extensions.
    pub child_url: Option<String>,
}

/// One flattened key of a record together with its schema chain.
///
/// `root_element` is the match for the first key segment, `leaf_elements`
/// the ordered matches for every non-index segment (the first included),
/// each narrowed to the single type the walk followed. Once `complete` is
/// set the chain is record independent and may be served from the cache;
/// only `value` changes between records.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub flattened_key: String,
    pub simple_key: String,
    pub value: Value,
    pub root_element: Arc<ElementDefinition>,
    pub leaf_elements: Vec<Arc<ElementDefinition>>,
    pub complete: bool,
    pub extension: Option<ExtensionOrigin>,
}

impl Property {
    pub fn new(
        flattened_key: impl Into<String>,
        value: Value,
        root_element: Arc<ElementDefinition>,
    ) -> Self {
        let flattened_key = flattened_key.into();
        Self {
            simple_key: simple_key(&flattened_key).to_string(),
            flattened_key,
            value,
            root_element,
            leaf_elements: Vec::new(),
            complete: false,
            extension: None,
        }
    }

    /// Copy of this property under a new key; the schema chain is shared.
    pub fn renamed(&self, flattened_key: impl Into<String>) -> Self {
        let mut renamed = self.clone();
        renamed.flattened_key = flattened_key.into();
        renamed
    }

    pub fn with_extension(mut self, origin: ExtensionOrigin) -> Self {
        self.extension = Some(origin);
        self
    }

    /// Grouping key of the simplifier: the root element id, e.g.
    /// `Patient.identifier`, or `Extension` for extension rooted keys.
    pub fn root_key(&self) -> &str {
        &self.root_element.id
    }

    /// Last segment of the root key.
    pub fn property_name(&self) -> &str {
        property_name(self.root_key())
    }

    /// Element the walk ended on.
    pub fn terminal_element(&self) -> &Arc<ElementDefinition> {
        self.leaf_elements.last().unwrap_or(&self.root_element)
    }

    /// Type code of the terminal element.
    pub fn type_code(&self) -> Option<&str> {
        self.terminal_element().type_code()
    }

    pub fn is_required(&self) -> bool {
        self.root_element.is_required()
    }

    pub fn is_extension(&self) -> bool {
        self.extension.is_some()
    }

    pub fn extension_url(&self) -> Option<&str> {
        self.extension.as_ref().map(|origin| origin.url.as_str())
    }
}

/// `Patient.identifier` -> `identifier`; keys without a dot are returned as is.
pub fn property_name(root_key: &str) -> &str {
    root_key
        .rsplit_once('.')
        .map(|(_, name)| name)
        .unwrap_or(root_key)
}
