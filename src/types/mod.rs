pub mod choice_types;
pub mod element;
pub mod entity;
pub mod payload;
pub mod schema_graph;
pub mod structure_definition;

pub use choice_types::ChoiceTypeExpander;
pub use element::{CHOICE_MARKER, ElementBinding, ElementDefinition, ElementType};
pub use entity::{Entity, EntityCategory, Link, SUB_PROFILE};
pub use payload::{PayloadShape, flatten};
pub use schema_graph::{EntityEdge, SchemaGraph};
pub use structure_definition::{ProfileSet, Snapshot, StructureDefinition};
