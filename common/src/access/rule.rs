//! The format-independent access-rule model.
//!
//! Rules are stored the way an access widener declares them. Comparing two
//! rule sets across formats goes through [`EffectiveAccess`], the visibility
//! a target ends up with and whether its `final` modifier is removed.

use super::error::{AccessRuleError, Result};
use crate::descriptor::{is_field_descriptor, is_method_descriptor};
use crate::mappings::MappingTable;
use std::collections::BTreeMap;
use std::fmt;

/// Widener directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessChange {
    /// Make the target public.
    Accessible,
    /// Make the target overridable or subclassable.
    Extendable,
    /// Remove `final` from a field.
    Mutable,
}

impl AccessChange {
    /// Directive keyword without the `transitive-` prefix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accessible => "accessible",
            Self::Extendable => "extendable",
            Self::Mutable => "mutable",
        }
    }

    pub(crate) fn parse(keyword: &str) -> Option<(Self, bool)> {
        let (transitive, bare) = match keyword.strip_prefix("transitive-") {
            Some(bare) => (true, bare),
            None => (false, keyword),
        };
        let change = match bare {
            "accessible" => Self::Accessible,
            "extendable" => Self::Extendable,
            "mutable" => Self::Mutable,
            _ => return None,
        };
        Some((change, transitive))
    }
}

/// What a rule points at inside its class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessTarget {
    /// The class itself.
    Class,
    /// A method identified by name and descriptor.
    Method {
        /// Method name.
        name: String,
        /// Method descriptor.
        descriptor: String,
    },
    /// A field. Transformer files omit the descriptor.
    Field {
        /// Field name.
        name: String,
        /// Field descriptor, when known.
        descriptor: Option<String>,
    },
}

impl AccessTarget {
    /// Widener keyword for the target kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Method { .. } => "method",
            Self::Field { .. } => "field",
        }
    }
}

/// One access rule, with the class in internal (slash-separated) form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccessRule {
    change: AccessChange,
    transitive: bool,
    class: String,
    target: AccessTarget,
}

impl AccessRule {
    /// Build a rule after checking the directive applies to the target.
    ///
    /// # Errors
    ///
    /// Returns [`AccessRuleError::InvalidRule`] for `mutable` on anything but
    /// a field, `extendable` on a field, or malformed names and descriptors.
    pub fn new(
        change: AccessChange,
        transitive: bool,
        class: impl Into<String>,
        target: AccessTarget,
    ) -> Result<Self> {
        let rule = Self {
            change,
            transitive,
            class: class.into(),
            target,
        };
        match rule.problem() {
            Some(reason) => Err(AccessRuleError::InvalidRule {
                rule: rule.to_string(),
                reason: reason.to_owned(),
            }),
            None => Ok(rule),
        }
    }

    pub(crate) fn problem(&self) -> Option<&'static str> {
        if self.class.is_empty() || self.class.contains(['.', ' ']) {
            return Some("class must be an internal name such as net/minecraft/Foo");
        }
        match (&self.target, self.change) {
            (AccessTarget::Class | AccessTarget::Method { .. }, AccessChange::Mutable) => {
                Some("mutable applies to fields only")
            }
            (AccessTarget::Field { .. }, AccessChange::Extendable) => {
                Some("extendable does not apply to fields")
            }
            (AccessTarget::Method { descriptor, .. }, _) if !is_method_descriptor(descriptor) => {
                Some("malformed method descriptor")
            }
            (
                AccessTarget::Field {
                    descriptor: Some(descriptor),
                    ..
                },
                _,
            ) if !is_field_descriptor(descriptor) => Some("malformed field descriptor"),
            _ => None,
        }
    }

    /// The directive.
    #[must_use]
    pub const fn change(&self) -> AccessChange {
        self.change
    }

    /// Whether the rule is exported to dependent mods.
    #[must_use]
    pub const fn is_transitive(&self) -> bool {
        self.transitive
    }

    /// Internal name of the owning class.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// The class or member the rule applies to.
    #[must_use]
    pub const fn target(&self) -> &AccessTarget {
        &self.target
    }

    /// Key under which the rule's effect is recorded.
    #[must_use]
    pub fn key(&self) -> AccessKey {
        let class = self.class.clone();
        match &self.target {
            AccessTarget::Class => AccessKey::Class(class),
            AccessTarget::Method { name, descriptor } => AccessKey::Method {
                class,
                name: name.clone(),
                descriptor: descriptor.clone(),
            },
            AccessTarget::Field { name, .. } => AccessKey::Field {
                class,
                name: name.clone(),
            },
        }
    }

    /// The access the rule grants.
    ///
    /// `extendable` on a class means public and non-final; on a method it
    /// means at least protected and non-final.
    #[must_use]
    pub fn effective(&self) -> EffectiveAccess {
        match (self.change, &self.target) {
            (AccessChange::Accessible, _) => EffectiveAccess::new(Visibility::Public, false),
            (AccessChange::Extendable, AccessTarget::Class) => {
                EffectiveAccess::new(Visibility::Public, true)
            }
            (AccessChange::Extendable, _) => EffectiveAccess::new(Visibility::Protected, true),
            (AccessChange::Mutable, _) => EffectiveAccess::new(Visibility::Unchanged, true),
        }
    }

    /// Rewrite the class, member names and descriptors through `table`.
    ///
    /// Members without a mapping keep their name; their descriptor is still
    /// rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`AccessRuleError::Descriptor`] when a descriptor is malformed.
    pub fn remap(&self, table: &MappingTable) -> Result<Self> {
        let class = table.map_type_name(&self.class)?;
        let target = match &self.target {
            AccessTarget::Class => AccessTarget::Class,
            AccessTarget::Method { name, descriptor } => AccessTarget::Method {
                name: table
                    .map_method(&self.class, name, descriptor)
                    .unwrap_or(name)
                    .to_owned(),
                descriptor: table.map_descriptor(descriptor)?,
            },
            AccessTarget::Field { name, descriptor } => {
                let mapped = match descriptor {
                    Some(descriptor) => table.map_field(&self.class, name, descriptor),
                    None => table.map_field_by_name(&self.class, name),
                };
                AccessTarget::Field {
                    name: mapped.unwrap_or(name).to_owned(),
                    descriptor: descriptor
                        .as_deref()
                        .map(|value| table.map_descriptor(value))
                        .transpose()?,
                }
            }
        };
        Ok(Self {
            change: self.change,
            transitive: self.transitive,
            class,
            target,
        })
    }
}

impl fmt::Display for AccessRule {
    /// Formats the rule as an access-widener line with tab separators.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.transitive {
            f.write_str("transitive-")?;
        }
        write!(f, "{}\t{}\t{}", self.change.as_str(), self.target.kind(), self.class)?;
        match &self.target {
            AccessTarget::Class => Ok(()),
            AccessTarget::Method { name, descriptor } => write!(f, "\t{name}\t{descriptor}"),
            AccessTarget::Field { name, descriptor } => {
                write!(f, "\t{name}\t{}", descriptor.as_deref().unwrap_or("?"))
            }
        }
    }
}

/// Identity of a class or member whose access is changed.
///
/// Fields are keyed by name only because transformer files do not carry
/// field descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessKey {
    /// A class, by internal name.
    Class(String),
    /// A method.
    Method {
        /// Internal name of the owner.
        class: String,
        /// Method name.
        name: String,
        /// Method descriptor.
        descriptor: String,
    },
    /// A field.
    Field {
        /// Internal name of the owner.
        class: String,
        /// Field name.
        name: String,
    },
}

impl AccessKey {
    /// Internal name of the class the key belongs to.
    #[must_use]
    pub fn class(&self) -> &str {
        match self {
            Self::Class(class) | Self::Method { class, .. } | Self::Field { class, .. } => class,
        }
    }
}

impl fmt::Display for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => f.write_str(class),
            Self::Method {
                class,
                name,
                descriptor,
            } => write!(f, "{class}.{name}{descriptor}"),
            Self::Field { class, name } => write!(f, "{class}.{name}"),
        }
    }
}

/// Visibility a rule widens its target to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Visibility {
    /// Visibility is left alone.
    #[default]
    Unchanged,
    /// At least protected.
    Protected,
    /// Public.
    Public,
}

/// The combined effect of every rule on one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EffectiveAccess {
    /// Widened visibility.
    pub visibility: Visibility,
    /// Whether `final` is removed.
    pub definalize: bool,
}

impl EffectiveAccess {
    /// Build an effective access value.
    #[must_use]
    pub const fn new(visibility: Visibility, definalize: bool) -> Self {
        Self {
            visibility,
            definalize,
        }
    }

    /// The union of two effects on the same target.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            visibility: self.visibility.max(other.visibility),
            definalize: self.definalize || other.definalize,
        }
    }
}

/// Effective access per target, in a stable order.
pub type EffectiveAccessMap = BTreeMap<AccessKey, EffectiveAccess>;

/// An ordered, duplicate-free list of rules in one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRuleSet {
    namespace: String,
    rules: Vec<AccessRule>,
}

impl AccessRuleSet {
    /// An empty rule set in `namespace`.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            rules: Vec::new(),
        }
    }

    /// Namespace the class and member names belong to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Append a rule unless an identical one is already present.
    ///
    /// Returns `true` when the rule was added.
    pub fn push(&mut self, rule: AccessRule) -> bool {
        if self.rules.contains(&rule) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    /// Append every rule of `other` that is not already present.
    ///
    /// # Errors
    ///
    /// Returns [`AccessRuleError::NamespaceMismatch`] when the namespaces
    /// differ.
    pub fn merge(&mut self, other: &Self) -> Result<usize> {
        if other.namespace != self.namespace {
            return Err(AccessRuleError::NamespaceMismatch {
                expected: self.namespace.clone(),
                found: other.namespace.clone(),
            });
        }
        Ok(other
            .rules
            .iter()
            .filter(|rule| self.push((*rule).clone()))
            .count())
    }

    /// Whether any rule needs the v2 widener format.
    #[must_use]
    pub fn has_transitive_rules(&self) -> bool {
        self.rules.iter().any(AccessRule::is_transitive)
    }

    /// The combined access of every targeted class and member.
    #[must_use]
    pub fn effective_access(&self) -> EffectiveAccessMap {
        let mut map = EffectiveAccessMap::new();
        for rule in &self.rules {
            let entry = map.entry(rule.key()).or_default();
            *entry = entry.merge(rule.effective());
        }
        map
    }

    /// Rewrite every rule into the target namespace of `table`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessRuleError::NamespaceMismatch`] when the table does not
    /// start from this set's namespace, or a descriptor error.
    pub fn remap(&self, table: &MappingTable) -> Result<Self> {
        if table.from_namespace() != self.namespace {
            return Err(AccessRuleError::NamespaceMismatch {
                expected: self.namespace.clone(),
                found: table.from_namespace().to_owned(),
            });
        }
        let mut remapped = Self::new(table.to_namespace());
        for rule in &self.rules {
            remapped.push(rule.remap(table)?);
        }
        Ok(remapped)
    }
}

impl Extend<AccessRule> for AccessRuleSet {
    fn extend<I: IntoIterator<Item = AccessRule>>(&mut self, iter: I) {
        for rule in iter {
            self.push(rule);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn method(name: &str, descriptor: &str) -> AccessTarget {
        AccessTarget::Method {
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
        }
    }

    fn field(name: &str, descriptor: &str) -> AccessTarget {
        AccessTarget::Field {
            name: name.to_owned(),
            descriptor: Some(descriptor.to_owned()),
        }
    }

    #[fixture]
    fn rules() -> AccessRuleSet {
        let mut set = AccessRuleSet::new("named");
        set.extend([
            AccessRule::new(AccessChange::Accessible, false, "a/Tree", field("leaves", "I"))
                .expect("valid"),
            AccessRule::new(AccessChange::Mutable, false, "a/Tree", field("leaves", "I"))
                .expect("valid"),
            AccessRule::new(AccessChange::Extendable, false, "a/Tree", method("fall", "()V"))
                .expect("valid"),
        ]);
        set
    }

    #[rstest]
    #[case::mutable_class(AccessChange::Mutable, AccessTarget::Class)]
    #[case::mutable_method(AccessChange::Mutable, method("m", "()V"))]
    #[case::extendable_field(AccessChange::Extendable, field("f", "I"))]
    #[case::bad_descriptor(AccessChange::Accessible, method("m", "V"))]
    fn rejects_invalid_combinations(#[case] change: AccessChange, #[case] target: AccessTarget) {
        let err = AccessRule::new(change, false, "a/Tree", target).expect_err("invalid");
        assert!(matches!(err, AccessRuleError::InvalidRule { .. }));
    }

    #[rstest]
    fn rejects_dotted_class_names() {
        assert!(AccessRule::new(AccessChange::Accessible, false, "a.Tree", AccessTarget::Class).is_err());
    }

    #[rstest]
    fn effective_access_merges_rules_on_one_target(rules: AccessRuleSet) {
        let map = rules.effective_access();
        let leaves = map
            .get(&AccessKey::Field {
                class: "a/Tree".to_owned(),
                name: "leaves".to_owned(),
            })
            .expect("field present");
        assert_eq!(*leaves, EffectiveAccess::new(Visibility::Public, true));
        assert_eq!(map.len(), 2);
    }

    #[rstest]
    fn push_collapses_duplicates(mut rules: AccessRuleSet) {
        let duplicate = rules.rules().first().cloned().expect("rule");
        assert!(!rules.push(duplicate));
        assert_eq!(rules.len(), 3);
    }

    #[rstest]
    fn merge_requires_matching_namespace(mut rules: AccessRuleSet) {
        let other = AccessRuleSet::new("intermediary");
        assert!(matches!(
            rules.merge(&other),
            Err(AccessRuleError::NamespaceMismatch { .. })
        ));
    }

    #[rstest]
    fn remap_rewrites_classes_members_and_descriptors(rules: AccessRuleSet) {
        let table = MappingTable::builder("named", "intermediary")
            .class("a/Tree", "net/minecraft/class_1")
            .field("a/Tree", "leaves", "I", "field_7")
            .method("a/Tree", "fall", "()V", "method_3")
            .build();
        let remapped = rules.remap(&table).expect("remap");
        assert_eq!(remapped.namespace(), "intermediary");
        let lines: Vec<String> = remapped.rules().iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            vec![
                "accessible\tfield\tnet/minecraft/class_1\tfield_7\tI",
                "mutable\tfield\tnet/minecraft/class_1\tfield_7\tI",
                "extendable\tmethod\tnet/minecraft/class_1\tmethod_3\t()V",
            ]
        );
    }

    #[rstest]
    fn remap_rejects_foreign_table(rules: AccessRuleSet) {
        let table = MappingTable::identity("official");
        assert!(rules.remap(&table).is_err());
    }
}
