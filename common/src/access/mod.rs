//! Access rules and the two on-disk formats that carry them.
//!
//! The canonical source is a Fabric access widener. Forge and NeoForge read
//! access transformers instead; [`transformer::translate`] converts between
//! the two while preserving effective access.

pub mod error;
pub mod rule;
pub mod transformer;
pub mod widener;

pub use error::AccessRuleError;
pub use rule::{
    AccessChange, AccessKey, AccessRule, AccessRuleSet, AccessTarget, EffectiveAccess,
    EffectiveAccessMap, Visibility,
};
pub use transformer::{TransformerEntry, TransformerFile};
