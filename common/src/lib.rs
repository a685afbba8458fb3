//! Shared domain types for the Trellis packaging pipeline: Maven
//! coordinates, target platforms, dependency scopes, JVM descriptors, Tiny v2
//! mapping tables, and access rules in both widener and transformer form.

pub mod access;
pub mod coordinate;
pub mod descriptor;
pub mod mappings;
pub mod platform;
pub mod scope;

pub use access::{
    AccessChange, AccessKey, AccessRule, AccessRuleError, AccessRuleSet, AccessTarget,
    EffectiveAccess, Visibility,
};
pub use coordinate::{Coordinate, CoordinateError, LibraryKey};
pub use descriptor::DescriptorError;
pub use mappings::{MappingError, MappingTable, MemberKey};
pub use platform::{AccessFormat, Platform, UnknownPlatform};
pub use scope::DependencyScope;
