//! Errors raised while reading, rewriting, or translating access rules.

use crate::descriptor::DescriptorError;
use thiserror::Error;

/// Errors raised by the access-rule model and both file formats.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessRuleError {
    /// The file does not start with a recognised header.
    #[error("missing access widener header; expected \"accessWidener v1|v2 <namespace>\"")]
    MissingHeader,

    /// The header names an unsupported format version.
    #[error("unsupported access widener version \"{found}\"")]
    UnsupportedVersion {
        /// The version token found in the header.
        found: String,
    },

    /// A line could not be parsed.
    #[error("line {line}: {reason}")]
    Syntax {
        /// One-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// A rule combines a directive with a target it cannot apply to.
    #[error("invalid rule \"{rule}\": {reason}")]
    InvalidRule {
        /// The rule in access-widener syntax.
        rule: String,
        /// Why the combination is rejected.
        reason: String,
    },

    /// Two rule sets or a rule set and a mapping table disagree on namespace.
    #[error("namespace mismatch: expected \"{expected}\", found \"{found}\"")]
    NamespaceMismatch {
        /// The namespace required by the receiver.
        expected: String,
        /// The namespace that was supplied.
        found: String,
    },

    /// A rule cannot be expressed in the requested target format.
    #[error("cannot translate \"{rule}\": {reason}")]
    Untranslatable {
        /// The rule as written in its source format.
        rule: String,
        /// Which construct the target format lacks.
        reason: String,
    },

    /// A descriptor in a rule failed to remap.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// Convenience alias for access-rule results.
pub type Result<T> = std::result::Result<T, AccessRuleError>;
