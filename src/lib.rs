//! Build configuration for Trellis, the multi-target mod packager.
//!
//! Loads `trellis.toml` into an immutable [`BuildSettings`] value that every
//! pipeline stage receives explicitly.

pub mod config;

pub use config::{
    BuildSettings, ConfigError, ConfigOverrides, DependencyDecl, MappingSettings, ModuleSettings,
    ProjectSettings, PublishSettings, VariantSpec,
};
