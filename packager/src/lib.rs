//! Trellis packager library.
//!
//! This crate compiles a shared mod module once and turns it into one
//! deployable bundle per platform variant. It is used by the `trellis` CLI
//! binary and can be consumed programmatically for testing or custom build
//! workflows.
//!
//! # Modules
//!
//! - [`assembler`] - Layering of module, platform and embedded jars
//! - [`bundle`] - Writing jars and POMs to the output directory
//! - [`checksum`] - SHA-256 and SHA-1 digests of artefacts
//! - [`classfile`] - Class file parsing and re-encoding
//! - [`classindex`] - Class hierarchy index for validation and remapping
//! - [`cli`] - Command-line argument definitions
//! - [`compiler`] - Running compile commands and collecting their output
//! - [`error`] - Run-level and per-variant error types
//! - [`executor`] - Command execution abstraction
//! - [`jar`] - In-memory jar contents, manifests and merge rules
//! - [`module`] - The shared module stage
//! - [`naming`] - Bundle identities and collision checks
//! - [`output`] - User-facing progress and summary text
//! - [`pipeline`] - Whole-build orchestration
//! - [`pom`] - Maven POM rendering
//! - [`publish`] - Maven repository uploads
//! - [`remap`] - Namespace remapping of bundles and access rules
//! - [`report`] - The JSON build report
//! - [`resolver`] - Dependency declaration merging and lookup
//! - [`rules`] - Access rule loading, validation and translation
//! - [`variant`] - The per-platform pipeline

pub mod assembler;
pub mod bundle;
pub mod checksum;
pub mod classfile;
pub mod classindex;
pub mod cli;
pub mod compiler;
pub mod error;
pub mod executor;
pub mod jar;
pub mod module;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod pom;
pub mod publish;
pub mod remap;
pub mod report;
pub mod resolver;
pub mod rules;
pub mod variant;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
