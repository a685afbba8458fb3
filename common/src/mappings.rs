//! Tiny v2 mapping tables.
//!
//! A mapping table translates class, field and method names from one
//! namespace (for example `named`) into another (for example
//! `intermediary`). Member keys always use the *source* namespace for the
//! owner, name and descriptor.

use crate::descriptor::{self, DescriptorError};
use log::debug;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors raised while reading a Tiny v2 file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// The file does not start with a `tiny 2 0` header.
    #[error("missing tiny v2 header")]
    MissingHeader,

    /// The header declares an unsupported major version.
    #[error("unsupported tiny version {found}; expected 2")]
    UnsupportedVersion {
        /// The version found in the header.
        found: String,
    },

    /// A requested namespace is absent from the header.
    #[error("namespace \"{name}\" not declared; available: {available}")]
    UnknownNamespace {
        /// The requested namespace.
        name: String,
        /// Comma-separated namespaces from the header.
        available: String,
    },

    /// A row is structurally invalid.
    #[error("line {line}: {reason}")]
    Malformed {
        /// One-based line number.
        line: usize,
        /// What was wrong with the row.
        reason: String,
    },

    /// A member descriptor could not be translated between namespaces.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// A member identified by owner, name and descriptor in the source namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberKey {
    /// Internal name of the declaring class.
    pub owner: String,
    /// Member name.
    pub name: String,
    /// Field or method descriptor.
    pub descriptor: String,
}

impl MemberKey {
    /// Build a key from borrowed parts.
    #[must_use]
    pub fn new(owner: &str, name: &str, descriptor: &str) -> Self {
        Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
        }
    }
}

/// A directed mapping between two namespaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    from: String,
    to: String,
    classes: HashMap<String, String>,
    fields: HashMap<MemberKey, String>,
    methods: HashMap<MemberKey, String>,
}

impl MappingTable {
    /// A table that maps nothing, used when a variant keeps source names.
    #[must_use]
    pub fn identity(namespace: &str) -> Self {
        Self {
            from: namespace.to_owned(),
            to: namespace.to_owned(),
            ..Self::default()
        }
    }

    /// Start building a table programmatically.
    #[must_use]
    pub fn builder(from: &str, to: &str) -> MappingTableBuilder {
        MappingTableBuilder {
            table: Self {
                from: from.to_owned(),
                to: to.to_owned(),
                ..Self::default()
            },
        }
    }

    /// Parse a Tiny v2 document, selecting the `from` and `to` namespaces.
    ///
    /// Parameter, local-variable and comment rows are ignored. An empty name
    /// in a namespace column falls back to the first namespace's name.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError`] for a missing or unsupported header, an
    /// unknown namespace, or a malformed row.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_common::MappingTable;
    ///
    /// let tiny = "tiny\t2\t0\tnamed\tintermediary\n\
    ///             c\tcom/example/Tree\tnet/minecraft/class_1\n\
    ///             \tm\t()V\tfall\tmethod_10\n";
    /// let table = MappingTable::parse_tiny(tiny, "named", "intermediary").expect("valid");
    /// assert_eq!(table.map_class("com/example/Tree"), Some("net/minecraft/class_1"));
    /// assert_eq!(table.map_method("com/example/Tree", "fall", "()V"), Some("method_10"));
    /// ```
    pub fn parse_tiny(text: &str, from: &str, to: &str) -> Result<Self, MappingError> {
        let mut lines = text.lines().enumerate();
        let (_, header) = lines.next().ok_or(MappingError::MissingHeader)?;
        let namespaces = parse_header(header)?;
        let from_index = namespace_index(&namespaces, from)?;
        let to_index = namespace_index(&namespaces, to)?;

        let rows = collect_rows(lines, namespaces.len())?;
        build_table(&rows, from, to, from_index, to_index)
    }

    /// Source namespace.
    #[must_use]
    pub fn from_namespace(&self) -> &str {
        &self.from
    }

    /// Target namespace.
    #[must_use]
    pub fn to_namespace(&self) -> &str {
        &self.to
    }

    /// Whether the table renames nothing.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.classes.iter().all(|(from, to)| from == to)
            && self.fields.iter().all(|(key, to)| &key.name == to)
            && self.methods.iter().all(|(key, to)| &key.name == to)
    }

    /// Target name of a class.
    #[must_use]
    pub fn map_class(&self, name: &str) -> Option<&str> {
        self.classes.get(name).map(String::as_str)
    }

    /// Target name of a field declared exactly on `owner`.
    #[must_use]
    pub fn map_field(&self, owner: &str, name: &str, descriptor: &str) -> Option<&str> {
        self.fields
            .get(&MemberKey::new(owner, name, descriptor))
            .map(String::as_str)
    }

    /// Target name of a field when only its owner and name are known.
    ///
    /// Returns `None` when no field or more than one field matches.
    #[must_use]
    pub fn map_field_by_name(&self, owner: &str, name: &str) -> Option<&str> {
        let mut matches = self
            .fields
            .iter()
            .filter(|(key, _)| key.owner == owner && key.name == name);
        let (_, target) = matches.next()?;
        matches.next().is_none().then_some(target.as_str())
    }

    /// Source descriptor of a field when only its owner and name are known.
    #[must_use]
    pub fn field_descriptor(&self, owner: &str, name: &str) -> Option<&str> {
        let mut matches = self
            .fields
            .keys()
            .filter(|key| key.owner == owner && key.name == name);
        let key = matches.next()?;
        matches.next().is_none().then_some(key.descriptor.as_str())
    }

    /// Target name of a method declared exactly on `owner`.
    #[must_use]
    pub fn map_method(&self, owner: &str, name: &str, descriptor: &str) -> Option<&str> {
        self.methods
            .get(&MemberKey::new(owner, name, descriptor))
            .map(String::as_str)
    }

    /// Translate a descriptor into the target namespace.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] for a malformed descriptor.
    pub fn map_descriptor(&self, value: &str) -> Result<String, DescriptorError> {
        descriptor::map_descriptor(value, |name| self.map_class(name).map(str::to_owned))
    }

    /// Translate a `CONSTANT_Class` name, including array descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] for a malformed array descriptor.
    pub fn map_type_name(&self, value: &str) -> Result<String, DescriptorError> {
        descriptor::map_type_name(value, |name| self.map_class(name).map(str::to_owned))
    }

    /// Translate a generic signature.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] for a malformed signature.
    pub fn map_signature(&self, value: &str) -> Result<String, DescriptorError> {
        descriptor::map_signature(value, |name| self.map_class(name).map(str::to_owned))
    }

    /// Source class names whose target name differs and that are not also
    /// a legitimate target name.
    ///
    /// After a complete remap none of these may still be referenced.
    #[must_use]
    pub fn stale_class_names(&self) -> HashSet<&str> {
        let targets: HashSet<&str> = self.classes.values().map(String::as_str).collect();
        self.classes
            .iter()
            .filter(|(from, to)| from != to && !targets.contains(from.as_str()))
            .map(|(from, _)| from.as_str())
            .collect()
    }

    /// Iterate over class mappings as `(source, target)` pairs.
    pub fn classes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.classes.iter().map(|(from, to)| (from.as_str(), to.as_str()))
    }

    /// Iterate over field mappings.
    pub fn fields(&self) -> impl Iterator<Item = (&MemberKey, &str)> {
        self.fields.iter().map(|(key, to)| (key, to.as_str()))
    }

    /// Iterate over method mappings.
    pub fn methods(&self) -> impl Iterator<Item = (&MemberKey, &str)> {
        self.methods.iter().map(|(key, to)| (key, to.as_str()))
    }

    /// Number of class, field and method entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len() + self.fields.len() + self.methods.len()
    }

    /// Whether the table holds no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Incremental construction of a [`MappingTable`].
#[derive(Debug)]
pub struct MappingTableBuilder {
    table: MappingTable,
}

impl MappingTableBuilder {
    /// Add a class mapping.
    #[must_use]
    pub fn class(mut self, from: &str, to: &str) -> Self {
        self.table.classes.insert(from.to_owned(), to.to_owned());
        self
    }

    /// Add a field mapping keyed by source owner, name and descriptor.
    #[must_use]
    pub fn field(mut self, owner: &str, name: &str, descriptor: &str, to: &str) -> Self {
        self.table
            .fields
            .insert(MemberKey::new(owner, name, descriptor), to.to_owned());
        self
    }

    /// Add a method mapping keyed by source owner, name and descriptor.
    #[must_use]
    pub fn method(mut self, owner: &str, name: &str, descriptor: &str, to: &str) -> Self {
        self.table
            .methods
            .insert(MemberKey::new(owner, name, descriptor), to.to_owned());
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> MappingTable {
        self.table
    }
}

struct ClassRow {
    names: Vec<String>,
    fields: Vec<MemberRow>,
    methods: Vec<MemberRow>,
}

struct MemberRow {
    descriptor: String,
    names: Vec<String>,
}

fn parse_header(header: &str) -> Result<Vec<String>, MappingError> {
    let columns: Vec<&str> = header.split('\t').collect();
    match columns.as_slice() {
        ["tiny", "2", _minor, namespaces @ ..] if namespaces.len() >= 2 => {
            Ok(namespaces.iter().map(|ns| (*ns).to_owned()).collect())
        }
        ["tiny", version, ..] => Err(MappingError::UnsupportedVersion {
            found: (*version).to_owned(),
        }),
        _ => Err(MappingError::MissingHeader),
    }
}

fn namespace_index(namespaces: &[String], name: &str) -> Result<usize, MappingError> {
    namespaces
        .iter()
        .position(|ns| ns == name)
        .ok_or_else(|| MappingError::UnknownNamespace {
            name: name.to_owned(),
            available: namespaces.join(", "),
        })
}

fn collect_rows<'a>(
    lines: impl Iterator<Item = (usize, &'a str)>,
    namespace_count: usize,
) -> Result<Vec<ClassRow>, MappingError> {
    let mut rows: Vec<ClassRow> = Vec::new();
    for (index, line) in lines {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let depth = line.chars().take_while(|c| *c == '\t').count();
        let columns: Vec<&str> = line.trim_start_matches('\t').split('\t').collect();
        match (depth, columns.as_slice()) {
            (0, ["c", names @ ..]) => rows.push(ClassRow {
                names: expand_names(names, namespace_count, line_no)?,
                fields: Vec::new(),
                methods: Vec::new(),
            }),
            (1, [kind @ ("f" | "m"), descriptor, names @ ..]) => {
                let Some(class) = rows.last_mut() else {
                    // Header properties precede the first class row.
                    continue;
                };
                let row = MemberRow {
                    descriptor: (*descriptor).to_owned(),
                    names: expand_names(names, namespace_count, line_no)?,
                };
                if *kind == "f" {
                    class.fields.push(row);
                } else {
                    class.methods.push(row);
                }
            }
            (0, [kind, ..]) => {
                return Err(MappingError::Malformed {
                    line: line_no,
                    reason: format!("unknown top-level row kind \"{kind}\""),
                });
            }
            _ => debug!("skipping tiny row at line {line_no}"),
        }
    }
    Ok(rows)
}

fn expand_names(
    names: &[&str],
    namespace_count: usize,
    line: usize,
) -> Result<Vec<String>, MappingError> {
    if names.len() != namespace_count {
        return Err(MappingError::Malformed {
            line,
            reason: format!("expected {namespace_count} names, found {}", names.len()),
        });
    }
    let Some(first) = names.first().filter(|name| !name.is_empty()) else {
        return Err(MappingError::Malformed {
            line,
            reason: "first namespace name is empty".to_owned(),
        });
    };
    Ok(names
        .iter()
        .map(|name| if name.is_empty() { *first } else { *name })
        .map(str::to_owned)
        .collect())
}

fn column(names: &[String], index: usize) -> &str {
    names.get(index).map_or("", String::as_str)
}

fn build_table(
    rows: &[ClassRow],
    from: &str,
    to: &str,
    from_index: usize,
    to_index: usize,
) -> Result<MappingTable, MappingError> {
    let first_to_source: HashMap<&str, &str> = rows
        .iter()
        .map(|row| (column(&row.names, 0), column(&row.names, from_index)))
        .collect();
    let source_descriptor = |descriptor: &str| -> Result<String, MappingError> {
        if from_index == 0 {
            return Ok(descriptor.to_owned());
        }
        Ok(descriptor::map_descriptor(descriptor, |name| {
            first_to_source.get(name).map(|source| (*source).to_owned())
        })?)
    };

    let mut table = MappingTable::builder(from, to).build();
    for row in rows {
        let owner = column(&row.names, from_index);
        table
            .classes
            .insert(owner.to_owned(), column(&row.names, to_index).to_owned());
        for field in &row.fields {
            let key = MemberKey::new(
                owner,
                column(&field.names, from_index),
                &source_descriptor(&field.descriptor)?,
            );
            table
                .fields
                .insert(key, column(&field.names, to_index).to_owned());
        }
        for method in &row.methods {
            let key = MemberKey::new(
                owner,
                column(&method.names, from_index),
                &source_descriptor(&method.descriptor)?,
            );
            table
                .methods
                .insert(key, column(&method.names, to_index).to_owned());
        }
    }
    debug!(
        "loaded {} class, {} field and {} method mappings ({from} -> {to})",
        table.classes.len(),
        table.fields.len(),
        table.methods.len()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn tiny() -> &'static str {
        concat!(
            "tiny\t2\t0\tofficial\tintermediary\tnamed\n",
            "\tescaped-names\n",
            "c\ta\tnet/minecraft/class_2248\tnet/minecraft/world/level/block/Block\n",
            "\tf\tLb;\tc\tfield_1\tproperties\n",
            "\tm\t(Lb;)V\td\tmethod_9\tonRemove\n",
            "\t\tp\t1\t\t\tstate\n",
            "c\tb\tnet/minecraft/class_2680\tnet/minecraft/world/level/block/state/BlockState\n",
            "c\te\tnet/minecraft/class_9\t\n",
        )
    }

    #[rstest]
    fn maps_named_to_intermediary(tiny: &str) {
        let table = MappingTable::parse_tiny(tiny, "named", "intermediary").expect("valid");
        assert_eq!(
            table.map_class("net/minecraft/world/level/block/Block"),
            Some("net/minecraft/class_2248")
        );
        assert_eq!(
            table.map_method(
                "net/minecraft/world/level/block/Block",
                "onRemove",
                "(Lnet/minecraft/world/level/block/state/BlockState;)V"
            ),
            Some("method_9")
        );
        assert_eq!(
            table.map_field(
                "net/minecraft/world/level/block/Block",
                "properties",
                "Lnet/minecraft/world/level/block/state/BlockState;"
            ),
            Some("field_1")
        );
    }

    #[rstest]
    fn empty_name_falls_back_to_first_namespace(tiny: &str) {
        let table = MappingTable::parse_tiny(tiny, "named", "intermediary").expect("valid");
        assert_eq!(table.map_class("e"), Some("net/minecraft/class_9"));
    }

    #[rstest]
    fn field_lookup_by_name_requires_a_unique_match(tiny: &str) {
        let table = MappingTable::parse_tiny(tiny, "named", "intermediary").expect("valid");
        assert_eq!(
            table.map_field_by_name("net/minecraft/world/level/block/Block", "properties"),
            Some("field_1")
        );
        assert_eq!(table.map_field_by_name("net/minecraft/world/level/block/Block", "missing"), None);
    }

    #[rstest]
    fn unknown_namespace_is_reported(tiny: &str) {
        let err = MappingTable::parse_tiny(tiny, "named", "srg").expect_err("srg is absent");
        assert!(matches!(err, MappingError::UnknownNamespace { ref name, .. } if name == "srg"));
    }

    #[rstest]
    #[case::no_header("c\ta\tb\n")]
    #[case::tiny_v1("v1\tofficial\tnamed\n")]
    fn rejects_missing_header(#[case] text: &str) {
        assert_eq!(
            MappingTable::parse_tiny(text, "official", "named"),
            Err(MappingError::MissingHeader)
        );
    }

    #[rstest]
    fn rejects_wrong_major_version() {
        let err = MappingTable::parse_tiny("tiny\t3\t0\ta\tb\n", "a", "b").expect_err("v3");
        assert!(matches!(err, MappingError::UnsupportedVersion { .. }));
    }

    #[rstest]
    fn rejects_rows_with_missing_columns() {
        let text = "tiny\t2\t0\ta\tb\nc\tonly_one\n";
        let err = MappingTable::parse_tiny(text, "a", "b").expect_err("malformed");
        assert!(matches!(err, MappingError::Malformed { line: 2, .. }));
    }

    #[rstest]
    fn stale_names_exclude_swapped_targets() {
        let table = MappingTable::builder("named", "obf")
            .class("a/First", "a/Second")
            .class("a/Second", "a/First")
            .class("a/Third", "a/Gone")
            .class("a/Kept", "a/Kept")
            .build();
        let stale = table.stale_class_names();
        assert!(stale.contains("a/Third"));
        assert!(!stale.contains("a/First"));
        assert!(!stale.contains("a/Kept"));
    }

    #[rstest]
    fn identity_table_is_identity() {
        let table = MappingTable::identity("named");
        assert!(table.is_identity());
        assert!(table.is_empty());
        assert_eq!(table.to_namespace(), "named");
    }
}
