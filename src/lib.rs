//! # pfb-fhir
//!
//! Turns FHIR resources into flat, dot-path keyed property maps backed by
//! the profiles that describe them.
//!
//! ## Features
//!
//! - **Schema Graph**: entities built from StructureDefinitions, with
//!   choice (`[x]`) elements expanded into concretely typed elements
//! - **Property Resolution**: every flattened key of a record mapped to the
//!   chain of element definitions it walks through, cached per entity
//! - **Simplification**: singleton lists, extensions, codings and
//!   identifiers folded into data-frame friendly keys
//! - **Terminology**: extension and value set lookups for describing
//!   properties to dictionary emitters
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pfb_fhir::*;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<()> {
//! let model = ModelConfig::from_path("model.yaml")?;
//! let profiles = ProfileSet::from_dir("profiles")?;
//! let graph = Arc::new(SchemaGraph::load(&model, &profiles)?);
//!
//! let transformer = Transformer::new(graph, TransformConfig::simplified());
//! let patient: serde_json::Value = serde_json::from_str(r#"{"resourceType": "Patient"}"#)?;
//! if let Some(record) = transformer.transform(&patient)? {
//!     println!("{}", record.to_flat_json());
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;
pub mod resolver;
pub mod simplifier;
pub mod terminology;
pub mod transformer;
pub mod types;

pub use crate::core::*;
pub use error::{PfbFhirError, Result};
pub use resolver::{
    ExtensionOrigin, Property, PropertyResolver, ResolutionCache, ResolvedProperties,
    SeenMessages,
};
pub use simplifier::ContextSimplifier;
pub use terminology::{
    AttributeEnum, ExtensionDefinition, JsonType, PropertyDescriber, PropertyDescription,
    TerminologyLookup, TerminologyStore, ValueSetCodes,
};
pub use transformer::{TransformedRecord, Transformer};
pub use types::*;
