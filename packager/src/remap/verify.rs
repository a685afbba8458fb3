//! Post-remap scan for bindings still spelled in the source namespace.

use crate::classfile::{
    Attribute, ClassFile, ClassFileError, Constant, ConstantPool, Reader, TypeTarget, type_target,
};
use crate::jar::JarContents;
use std::collections::HashSet;
use trellis_common::MappingTable;
use trellis_common::descriptor::referenced_classes;

type MemberTriple = (String, String, String);

/// Detects references that a complete remap would have renamed.
///
/// A class binding is stale when it names a source class whose target name
/// differs. A member binding is stale when it carries a mapped member's
/// source name on the member's (renamed) owner with its (renamed)
/// descriptor.
#[derive(Debug)]
pub struct StaleBindingScanner<'a> {
    stale_classes: HashSet<&'a str>,
    stale_fields: HashSet<MemberTriple>,
    stale_methods: HashSet<MemberTriple>,
}

impl<'a> StaleBindingScanner<'a> {
    /// Prepare a scanner for `table`.
    #[must_use]
    pub fn new(table: &'a MappingTable) -> Self {
        Self {
            stale_classes: table.stale_class_names(),
            stale_fields: stale_members(table, table.fields()),
            stale_methods: stale_members(
                table,
                table.methods().filter(|(key, _)| !key.name.starts_with('<')),
            ),
        }
    }

    /// Whether the table renames anything at all.
    #[must_use]
    pub fn is_trivial(&self) -> bool {
        self.stale_classes.is_empty()
            && self.stale_fields.is_empty()
            && self.stale_methods.is_empty()
    }

    /// Stale bindings of every class in `jar`, as readable descriptions.
    ///
    /// # Errors
    ///
    /// Returns the entry name and error of the first unreadable class.
    pub fn scan_jar(&self, jar: &JarContents) -> Result<Vec<String>, (String, ClassFileError)> {
        let mut findings = Vec::new();
        if self.is_trivial() {
            return Ok(findings);
        }
        for name in jar.class_entries() {
            let Some(bytes) = jar.get(name) else { continue };
            let class = ClassFile::parse(bytes).map_err(|err| (name.to_owned(), err))?;
            self.scan_class(&class, &mut findings)
                .map_err(|err| (name.to_owned(), err))?;
        }
        Ok(findings)
    }

    /// Append the stale bindings of one class to `findings`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError`] for a malformed constant pool or
    /// annotation attribute.
    pub fn scan_class(
        &self,
        class: &ClassFile,
        findings: &mut Vec<String>,
    ) -> Result<(), ClassFileError> {
        let pool = &class.pool;
        let this = class.name()?;
        for (_, constant) in pool.iter() {
            match constant {
                Constant::Class(name) => {
                    let name = pool.utf8(*name)?;
                    self.check_type_name(&this, &name, findings);
                }
                Constant::FieldRef {
                    class,
                    name_and_type,
                } => {
                    let owner = pool.class_name(*class)?;
                    let (name, descriptor) = pool.name_and_type(*name_and_type)?;
                    self.check_descriptor(&this, &descriptor, findings);
                    self.check_member(
                        &this,
                        &self.stale_fields,
                        (&*owner, &*name, &*descriptor),
                        findings,
                    );
                }
                Constant::MethodRef {
                    class,
                    name_and_type,
                }
                | Constant::InterfaceMethodRef {
                    class,
                    name_and_type,
                } => {
                    let owner = pool.class_name(*class)?;
                    let (name, descriptor) = pool.name_and_type(*name_and_type)?;
                    self.check_descriptor(&this, &descriptor, findings);
                    self.check_member(
                        &this,
                        &self.stale_methods,
                        (&*owner, &*name, &*descriptor),
                        findings,
                    );
                }
                Constant::MethodType(descriptor) => {
                    self.check_descriptor(&this, &pool.utf8(*descriptor)?, findings);
                }
                Constant::InvokeDynamic { name_and_type, .. }
                | Constant::Dynamic { name_and_type, .. } => {
                    let (_, descriptor) = pool.name_and_type(*name_and_type)?;
                    self.check_descriptor(&this, &descriptor, findings);
                }
                _ => {}
            }
        }
        for (members, stale) in [
            (&class.fields, &self.stale_fields),
            (&class.methods, &self.stale_methods),
        ] {
            for member in members {
                let name = pool.utf8(member.name)?;
                let descriptor = pool.utf8(member.descriptor)?;
                self.check_descriptor(&this, &descriptor, findings);
                self.check_member(&this, stale, (&*this, &*name, &*descriptor), findings);
            }
        }
        let mut annotations = AnnotationDescriptors::new(pool);
        annotations.attributes(&class.attributes)?;
        for member in class.fields.iter().chain(&class.methods) {
            annotations.attributes(&member.attributes)?;
        }
        for descriptor in annotations.found {
            self.check_descriptor(&this, &descriptor, findings);
        }
        Ok(())
    }

    fn check_type_name(&self, context: &str, name: &str, findings: &mut Vec<String>) {
        if name.starts_with('[') {
            self.check_descriptor(context, name, findings);
        } else if self.stale_classes.contains(name) {
            findings.push(format!("{context}: class {name}"));
        }
    }

    fn check_descriptor(&self, context: &str, descriptor: &str, findings: &mut Vec<String>) {
        let Ok(names) = referenced_classes(descriptor) else {
            return;
        };
        for name in names {
            if self.stale_classes.contains(name.as_str()) {
                findings.push(format!("{context}: class {name} in {descriptor}"));
            }
        }
    }

    fn check_member(
        &self,
        context: &str,
        stale: &HashSet<MemberTriple>,
        (owner, name, descriptor): (&str, &str, &str),
        findings: &mut Vec<String>,
    ) {
        let key = (owner.to_owned(), name.to_owned(), descriptor.to_owned());
        if stale.contains(&key) {
            findings.push(format!("{context}: member {owner}.{name}{descriptor}"));
        }
    }
}

/// Descriptors named by annotations, collected from attribute bodies.
///
/// Annotation types, enum types and class literals live in UTF-8 constants
/// that no `Class` constant points at, so the pool walk never sees them.
struct AnnotationDescriptors<'p> {
    pool: &'p ConstantPool,
    found: Vec<String>,
}

impl<'p> AnnotationDescriptors<'p> {
    const fn new(pool: &'p ConstantPool) -> Self {
        Self {
            pool,
            found: Vec::new(),
        }
    }

    fn attributes(&mut self, attributes: &[Attribute]) -> Result<(), ClassFileError> {
        let pool = self.pool;
        for attribute in attributes {
            let name = pool.utf8(attribute.name)?;
            self.attribute(&name, &attribute.data)?;
        }
        Ok(())
    }

    fn attribute(&mut self, name: &str, data: &[u8]) -> Result<(), ClassFileError> {
        let mut reader = Reader::new(data);
        match name {
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                self.annotations(name, &mut reader)
            }
            "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                for _ in 0..reader.u8()? {
                    self.annotations(name, &mut reader)?;
                }
                Ok(())
            }
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                for _ in 0..reader.u16()? {
                    self.type_annotation(name, &mut reader)?;
                }
                Ok(())
            }
            "AnnotationDefault" => self.element_value(name, &mut reader),
            "Code" => {
                reader.bytes(4)?;
                let code_length = reader.u32()?;
                reader.bytes(length(&reader, code_length)?)?;
                let handlers = usize::from(reader.u16()?);
                reader.bytes(handlers * 8)?;
                self.nested(&mut reader)
            }
            "Record" => {
                for _ in 0..reader.u16()? {
                    reader.bytes(4)?;
                    self.nested(&mut reader)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn nested(&mut self, reader: &mut Reader<'_>) -> Result<(), ClassFileError> {
        let pool = self.pool;
        for _ in 0..reader.u16()? {
            let name = pool.utf8(reader.u16()?)?;
            let body_length = reader.u32()?;
            let body = reader.bytes(length(reader, body_length)?)?;
            self.attribute(&name, body)?;
        }
        Ok(())
    }

    fn annotations(&mut self, name: &str, reader: &mut Reader<'_>) -> Result<(), ClassFileError> {
        for _ in 0..reader.u16()? {
            self.annotation(name, reader)?;
        }
        Ok(())
    }

    fn annotation(&mut self, name: &str, reader: &mut Reader<'_>) -> Result<(), ClassFileError> {
        self.descriptor(reader.u16()?)?;
        for _ in 0..reader.u16()? {
            reader.bytes(2)?;
            self.element_value(name, reader)?;
        }
        Ok(())
    }

    fn type_annotation(
        &mut self,
        name: &str,
        reader: &mut Reader<'_>,
    ) -> Result<(), ClassFileError> {
        let offset = reader.offset();
        let target_info = match type_target(reader.u8()?) {
            Some(TypeTarget::Fixed(length)) => length,
            Some(TypeTarget::LocalVariables) => usize::from(reader.u16()?) * 6,
            None => return Err(malformed(name, offset)),
        };
        reader.bytes(target_info)?;
        let path_length = usize::from(reader.u8()?);
        reader.bytes(path_length * 2)?;
        self.annotation(name, reader)
    }

    fn element_value(&mut self, name: &str, reader: &mut Reader<'_>) -> Result<(), ClassFileError> {
        let offset = reader.offset();
        match reader.u8()? {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => {
                reader.bytes(2)?;
            }
            b'e' => {
                self.descriptor(reader.u16()?)?;
                reader.bytes(2)?;
            }
            b'c' => {
                let class_info = self.pool.utf8(reader.u16()?)?;
                if class_info != "V" {
                    self.found.push(class_info.into_owned());
                }
            }
            b'@' => self.annotation(name, reader)?,
            b'[' => {
                for _ in 0..reader.u16()? {
                    self.element_value(name, reader)?;
                }
            }
            _ => return Err(malformed(name, offset)),
        }
        Ok(())
    }

    fn descriptor(&mut self, index: u16) -> Result<(), ClassFileError> {
        self.found.push(self.pool.utf8(index)?.into_owned());
        Ok(())
    }
}

fn length(reader: &Reader<'_>, value: u32) -> Result<usize, ClassFileError> {
    usize::try_from(value).map_err(|_| ClassFileError::Truncated {
        offset: reader.offset(),
    })
}

fn malformed(attribute: &str, offset: usize) -> ClassFileError {
    ClassFileError::MalformedAttribute {
        attribute: attribute.to_owned(),
        offset,
    }
}

fn stale_members<'t>(
    table: &MappingTable,
    members: impl Iterator<Item = (&'t trellis_common::MemberKey, &'t str)>,
) -> HashSet<MemberTriple> {
    let mut sources = HashSet::new();
    let mut targets = HashSet::new();
    for (key, to) in members {
        if key.name == to {
            continue;
        }
        let owner = table.map_class(&key.owner).unwrap_or(&key.owner).to_owned();
        let Ok(descriptor) = table.map_descriptor(&key.descriptor) else {
            continue;
        };
        targets.insert((owner.clone(), to.to_owned(), descriptor.clone()));
        sources.insert((owner, key.name.clone(), descriptor));
    }
    sources.retain(|triple| !targets.contains(triple));
    sources
}
