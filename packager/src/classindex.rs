//! Index of classes and members visible to a variant.
//!
//! The index answers two questions: whether a class or member named by an
//! access rule exists, and which ancestors a class has so that member
//! references can be resolved up the hierarchy during remapping.

use crate::classfile::{ClassFile, ClassFileError};
use crate::jar::JarContents;
use log::debug;
use std::collections::{HashMap, HashSet, VecDeque};

/// Structural facts about one class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassInfo {
    /// Superclass, absent for `java/lang/Object` and module descriptors.
    pub super_name: Option<String>,
    /// Directly implemented interfaces.
    pub interfaces: Vec<String>,
    /// Declared fields as `(name, descriptor)`.
    pub fields: HashSet<(String, String)>,
    /// Declared methods as `(name, descriptor)`.
    pub methods: HashSet<(String, String)>,
}

/// Classes keyed by internal name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassIndex {
    classes: HashMap<String, ClassInfo>,
}

impl ClassIndex {
    /// An empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every class entry of `jar`. Classes already present keep their
    /// first definition.
    ///
    /// # Errors
    ///
    /// Returns the entry name and [`ClassFileError`] of the first class that
    /// fails to parse.
    pub fn add_jar(&mut self, jar: &JarContents) -> Result<(), (String, ClassFileError)> {
        let before = self.classes.len();
        for name in jar.class_entries() {
            let Some(bytes) = jar.get(name) else { continue };
            self.add_class(bytes)
                .map_err(|err| (name.to_owned(), err))?;
        }
        debug!("indexed {} classes", self.classes.len() - before);
        Ok(())
    }

    /// Index one class file.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError`] when the bytes are not a class file.
    pub fn add_class(&mut self, bytes: &[u8]) -> Result<(), ClassFileError> {
        let class = ClassFile::parse(bytes)?;
        let name = class.name()?.into_owned();
        if self.classes.contains_key(&name) {
            return Ok(());
        }
        let members = |list: &[crate::classfile::Member]| -> Result<HashSet<(String, String)>, ClassFileError> {
            list.iter()
                .map(|member| {
                    Ok((
                        class.pool.utf8(member.name)?.into_owned(),
                        class.pool.utf8(member.descriptor)?.into_owned(),
                    ))
                })
                .collect()
        };
        let info = ClassInfo {
            super_name: class.super_name()?.map(std::borrow::Cow::into_owned),
            interfaces: class
                .interface_names()?
                .into_iter()
                .map(std::borrow::Cow::into_owned)
                .collect(),
            fields: members(&class.fields)?,
            methods: members(&class.methods)?,
        };
        self.classes.insert(name, info);
        Ok(())
    }

    /// Insert pre-built class facts.
    pub fn insert(&mut self, name: impl Into<String>, info: ClassInfo) {
        self.classes.insert(name.into(), info);
    }

    /// Facts about a class.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    /// Whether a class is known.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Number of indexed classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Whether `class` or one of its ancestors declares the method.
    #[must_use]
    pub fn has_method(&self, class: &str, name: &str, descriptor: &str) -> bool {
        self.lineage(class).any(|info| {
            info.methods
                .iter()
                .any(|(member, desc)| member == name && desc == descriptor)
        })
    }

    /// Whether `class` or one of its ancestors declares a field named
    /// `name`, with `descriptor` when given.
    #[must_use]
    pub fn has_field(&self, class: &str, name: &str, descriptor: Option<&str>) -> bool {
        self.lineage(class).any(|info| {
            info.fields.iter().any(|(member, desc)| {
                member == name && descriptor.is_none_or(|wanted| wanted == desc)
            })
        })
    }

    /// Known ancestors of `class` in breadth-first order, superclasses
    /// before interfaces at each level. The class itself is not included.
    #[must_use]
    pub fn ancestors(&self, class: &str) -> Vec<&str> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        if let Some((key, _)) = self.classes.get_key_value(class) {
            seen.insert(key.as_str());
            queue.push_back(key.as_str());
        }
        while let Some(current) = queue.pop_front() {
            let Some(info) = self.classes.get(current) else {
                continue;
            };
            for parent in info.super_name.iter().chain(info.interfaces.iter()) {
                if seen.insert(parent.as_str()) {
                    order.push(parent.as_str());
                    queue.push_back(parent.as_str());
                }
            }
        }
        order
    }

    fn lineage<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a ClassInfo> + 'a {
        std::iter::once(class)
            .chain(self.ancestors(class))
            .filter_map(|name| self.classes.get(name))
    }
}
