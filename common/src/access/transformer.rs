//! Forge and NeoForge access transformer files.
//!
//! ```text
//! public net.minecraft.world.level.block.Block
//! protected-f net.minecraft.world.level.block.Block onRemove(Lnet/minecraft/world/level/Level;)V
//! public-f net.minecraft.world.level.Level random
//! ```
//!
//! Class names are dotted; method descriptors keep internal names. A
//! transformer only ever widens access, so `private-f` removes `final`
//! without touching visibility.

use super::error::{AccessRuleError, Result};
use super::rule::{AccessKey, AccessRuleSet, EffectiveAccess, EffectiveAccessMap, Visibility};
use crate::descriptor::is_method_descriptor;
use std::fmt;

/// One transformer line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformerEntry {
    /// Class or member the line applies to.
    pub key: AccessKey,
    /// Access granted by the line.
    pub access: EffectiveAccess,
}

impl fmt::Display for TransformerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modifier = match self.access.visibility {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Unchanged => "private",
        };
        let suffix = if self.access.definalize { "-f" } else { "" };
        let dotted = self.key.class().replace('/', ".");
        match &self.key {
            AccessKey::Class(_) => write!(f, "{modifier}{suffix} {dotted}"),
            AccessKey::Method {
                name, descriptor, ..
            } => write!(f, "{modifier}{suffix} {dotted} {name}{descriptor}"),
            AccessKey::Field { name, .. } => write!(f, "{modifier}{suffix} {dotted} {name}"),
        }
    }
}

/// A parsed or translated access transformer file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformerFile {
    entries: Vec<TransformerEntry>,
}

impl TransformerFile {
    /// Lines in file order.
    #[must_use]
    pub fn entries(&self) -> &[TransformerEntry] {
        &self.entries
    }

    /// The combined access per target.
    #[must_use]
    pub fn effective_access(&self) -> EffectiveAccessMap {
        let mut map = EffectiveAccessMap::new();
        for entry in &self.entries {
            let slot = map.entry(entry.key.clone()).or_default();
            *slot = slot.merge(entry.access);
        }
        map
    }
}

impl fmt::Display for TransformerFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

/// Translate a widener rule set into transformer lines.
///
/// Rules on the same target are merged into one line so the transformer
/// grants exactly the widener's effective access.
///
/// # Errors
///
/// Returns [`AccessRuleError::Untranslatable`] for transitive rules, which
/// have no transformer equivalent.
///
/// # Examples
///
/// ```
/// use trellis_common::access::{transformer, widener};
///
/// let rules = widener::parse(
///     "accessWidener v1 named\nextendable class net/minecraft/world/level/block/Block\n",
/// )
/// .expect("valid widener");
/// let file = transformer::translate(&rules).expect("translatable");
/// assert_eq!(file.to_string(), "public-f net.minecraft.world.level.block.Block\n");
/// ```
pub fn translate(rules: &AccessRuleSet) -> Result<TransformerFile> {
    if let Some(rule) = rules.rules().iter().find(|rule| rule.is_transitive()) {
        return Err(AccessRuleError::Untranslatable {
            rule: rule.to_string(),
            reason: "access transformers cannot export rules to dependent mods".to_owned(),
        });
    }
    let entries = rules
        .effective_access()
        .into_iter()
        .map(|(key, access)| TransformerEntry { key, access })
        .collect();
    Ok(TransformerFile { entries })
}

/// Parse an access transformer document.
///
/// # Errors
///
/// Returns [`AccessRuleError::Syntax`] for malformed lines and
/// [`AccessRuleError::Untranslatable`] for lines a widener cannot express:
/// `+f`, `default`, protected-only widening, wildcard targets and lines that
/// change nothing.
pub fn parse(text: &str) -> Result<TransformerFile> {
    let mut entries = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let content = raw
            .split_once('#')
            .map_or(raw, |(content, _)| content)
            .trim();
        if content.is_empty() {
            continue;
        }
        entries.push(parse_line(index + 1, content)?);
    }
    Ok(TransformerFile { entries })
}

fn parse_line(line: usize, content: &str) -> Result<TransformerEntry> {
    let syntax = |reason: String| AccessRuleError::Syntax { line, reason };
    let untranslatable = |reason: &str| AccessRuleError::Untranslatable {
        rule: content.to_owned(),
        reason: reason.to_owned(),
    };

    let tokens: Vec<&str> = content.split_whitespace().collect();
    let (modifier, class, member) = match tokens.as_slice() {
        [modifier, class] => (*modifier, *class, None),
        [modifier, class, member] => (*modifier, *class, Some(*member)),
        _ => return Err(syntax(format!("expected 2 or 3 tokens in \"{content}\""))),
    };

    let (base, definalize) = if let Some(base) = modifier.strip_suffix("-f") {
        (base, true)
    } else if modifier.ends_with("+f") {
        return Err(untranslatable("adding final (+f) cannot be expressed as widening"));
    } else {
        (modifier, false)
    };
    let visibility = match base {
        "public" => Visibility::Public,
        "protected" => Visibility::Protected,
        "private" => Visibility::Unchanged,
        "default" => return Err(untranslatable("package-private widening has no widener form")),
        other => return Err(syntax(format!("unknown access modifier \"{other}\""))),
    };
    if visibility == Visibility::Unchanged && !definalize {
        return Err(untranslatable("line changes neither visibility nor finality"));
    }
    if visibility == Visibility::Protected && !definalize {
        return Err(untranslatable(
            "protected access without -f has no widener form; use protected-f or public",
        ));
    }

    if class.contains('/') || class.is_empty() {
        return Err(syntax(format!("class \"{class}\" must be dotted")));
    }
    let class = class.replace('.', "/");
    let key = match member {
        None => AccessKey::Class(class),
        Some(member) => match member.split_once('(') {
            Some((name, rest)) => {
                let descriptor = format!("({rest}");
                if name == "*" {
                    return Err(untranslatable("wildcard method targets"));
                }
                if name.is_empty() || !is_method_descriptor(&descriptor) {
                    return Err(syntax(format!("malformed method \"{member}\"")));
                }
                AccessKey::Method {
                    class,
                    name: name.to_owned(),
                    descriptor,
                }
            }
            None if member == "*" => return Err(untranslatable("wildcard field targets")),
            None => AccessKey::Field {
                class,
                name: member.to_owned(),
            },
        },
    };
    Ok(TransformerEntry {
        key,
        access: EffectiveAccess::new(visibility, definalize),
    })
}
