//! Access rule loading, merging, validation and per-platform rendering.

use crate::classindex::ClassIndex;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use thiserror::Error;
use trellis_common::access::{transformer, widener};
use trellis_common::{AccessFormat, AccessRule, AccessRuleError, AccessRuleSet, AccessTarget, Platform};

/// Errors raised while preparing a variant's access rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessRuleTranslationError {
    /// The rule file could not be read.
    #[error("failed to read access rules from {path}: {reason}")]
    Read {
        /// Rule file.
        path: Utf8PathBuf,
        /// I/O failure.
        reason: String,
    },

    /// The rule file is malformed.
    #[error("invalid access rules in {path}")]
    Parse {
        /// Rule file.
        path: Utf8PathBuf,
        /// Parser failure.
        #[source]
        source: AccessRuleError,
    },

    /// Merging or translating the rules failed.
    #[error(transparent)]
    Rules(#[from] AccessRuleError),

    /// A rule names a class that no jar of the variant defines.
    #[error("rule \"{rule}\" targets unknown class {class}")]
    UnknownClass {
        /// The rule in access-widener syntax.
        rule: String,
        /// The missing class.
        class: String,
    },

    /// A rule names a member its class does not have.
    #[error("rule \"{rule}\" targets unknown member {member} of {class}")]
    UnknownMember {
        /// The rule in access-widener syntax.
        rule: String,
        /// Owning class.
        class: String,
        /// The missing member, with its descriptor when known.
        member: String,
    },
}

/// Result type for access rule preparation.
pub type Result<T> = std::result::Result<T, AccessRuleTranslationError>;

/// Parse an access widener file.
///
/// # Errors
///
/// Returns [`AccessRuleTranslationError::Read`] or
/// [`AccessRuleTranslationError::Parse`].
pub fn load_rules(path: &Utf8Path) -> Result<AccessRuleSet> {
    let text = std::fs::read_to_string(path).map_err(|err| AccessRuleTranslationError::Read {
        path: path.to_owned(),
        reason: err.to_string(),
    })?;
    let rules = widener::parse(&text).map_err(|source| AccessRuleTranslationError::Parse {
        path: path.to_owned(),
        source,
    })?;
    debug!("loaded {} access rules from {path}", rules.len());
    Ok(rules)
}

/// The canonical rules plus a variant's extra widener, if any.
///
/// # Errors
///
/// Returns [`AccessRuleTranslationError`] when the extra file is unreadable,
/// malformed, or declares a different namespace.
pub fn with_extra(canonical: &AccessRuleSet, extra: Option<&Utf8Path>) -> Result<AccessRuleSet> {
    let mut merged = canonical.clone();
    if let Some(path) = extra {
        let added = merged.merge(&load_rules(path)?)?;
        debug!("merged {added} extra access rules from {path}");
    }
    Ok(merged)
}

/// Check every rule against the classes visible to a variant.
///
/// # Errors
///
/// Returns [`AccessRuleTranslationError::UnknownClass`] or
/// [`AccessRuleTranslationError::UnknownMember`] for the first rule whose
/// target does not exist.
pub fn validate(rules: &AccessRuleSet, index: &ClassIndex) -> Result<()> {
    rules.rules().iter().try_for_each(|rule| validate_rule(rule, index))
}

fn validate_rule(rule: &AccessRule, index: &ClassIndex) -> Result<()> {
    let class = rule.class();
    if !index.contains(class) {
        return Err(AccessRuleTranslationError::UnknownClass {
            rule: rule.to_string(),
            class: class.to_owned(),
        });
    }
    let (known, member) = match rule.target() {
        AccessTarget::Class => return Ok(()),
        AccessTarget::Method { name, descriptor } => (
            index.has_method(class, name, descriptor),
            format!("{name}{descriptor}"),
        ),
        AccessTarget::Field { name, descriptor } => (
            index.has_field(class, name, descriptor.as_deref()),
            match descriptor {
                Some(descriptor) => format!("{name}:{descriptor}"),
                None => name.clone(),
            },
        ),
    };
    if known {
        Ok(())
    } else {
        Err(AccessRuleTranslationError::UnknownMember {
            rule: rule.to_string(),
            class: class.to_owned(),
            member,
        })
    }
}

/// An access rule file ready to store in a jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRules {
    /// Jar entry the file belongs at.
    pub entry: String,
    /// File text.
    pub text: String,
}

/// Render `rules` in the format `platform` reads.
///
/// # Errors
///
/// Returns [`AccessRuleTranslationError::Rules`] when a rule cannot be
/// expressed as an access transformer.
pub fn render(rules: &AccessRuleSet, platform: Platform, mod_id: &str) -> Result<RenderedRules> {
    let text = match platform.access_format() {
        AccessFormat::Widener => widener::format(rules),
        AccessFormat::Transformer => transformer::translate(rules)?.to_string(),
    };
    Ok(RenderedRules {
        entry: platform.access_file_entry(mod_id),
        text,
    })
}
