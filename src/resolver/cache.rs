use papaya::HashMap as PapayaMap;

use super::Property;
use crate::core::ResolutionMode;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    entity_id: String,
    mode: ResolutionMode,
    flattened_key: String,
}

impl CacheKey {
    fn new(entity_id: &str, mode: ResolutionMode, flattened_key: &str) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            mode,
            flattened_key: flattened_key.to_string(),
        }
    }
}

/// Resolved schema chains, shared by every record of the same entity.
///
/// Backed by a concurrent map so a single cache can be handed to several
/// workers. Entries are written once, on the first record that carries a
/// key, and never invalidated.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: PapayaMap<CacheKey, Property>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity_id: &str, mode: ResolutionMode, flattened_key: &str) -> Option<Property> {
        let key = CacheKey::new(entity_id, mode, flattened_key);
        self.entries.pin().get(&key).cloned()
    }

    /// Store a walked property. Incomplete properties are ignored.
    pub fn insert(&self, entity_id: &str, mode: ResolutionMode, property: Property) {
        if !property.complete {
            return;
        }
        let key = CacheKey::new(entity_id, mode, &property.flattened_key);
        self.entries.pin().insert(key, property);
    }

    pub fn contains(&self, entity_id: &str, mode: ResolutionMode, flattened_key: &str) -> bool {
        let key = CacheKey::new(entity_id, mode, flattened_key);
        self.entries.pin().contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.pin().clear();
    }
}

/// Messages already logged, for warnings that should appear once per process
/// rather than once per record.
#[derive(Debug, Default)]
pub struct SeenMessages {
    messages: PapayaMap<String, ()>,
}

impl SeenMessages {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time `message` is seen.
    pub fn first_occurrence(&self, message: &str) -> bool {
        self.messages.pin().insert(message.to_string(), ()).is_none()
    }

    pub fn contains(&self, message: &str) -> bool {
        self.messages.pin().contains_key(message)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
