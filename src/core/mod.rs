pub mod config;

pub use config::{
    EntityConfig, LinkConfig, ModelConfig, ResolutionMode, TargetProfile, TransformConfig,
};
