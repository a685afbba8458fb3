//! Rewrites the bindings of one class file through a mapping table.
//!
//! Every lookup reads the class's original constant pool; every rename
//! writes an index into the working pool. UTF-8 and name-and-type
//! constants are never edited, only appended, so a constant shared between
//! a binding and something unrelated (a string literal, say) keeps its
//! meaning for the unrelated user.

use crate::classfile::{
    ACC_PRIVATE, ACC_STATIC, Attribute, ClassFile, ClassFileError, Constant, ConstantPool, Member,
    TypeTarget, type_target,
};
use crate::classindex::ClassIndex;
use thiserror::Error;
use trellis_common::{DescriptorError, MappingTable};

const LAMBDA_METAFACTORY: &str = "java/lang/invoke/LambdaMetafactory";

/// Reasons a single class cannot be remapped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassRemapError {
    /// The class file is malformed or its pool is full.
    #[error(transparent)]
    ClassFile(#[from] ClassFileError),

    /// A descriptor or signature in the class is malformed.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// An attribute body does not follow its layout.
    #[error("malformed {attribute} attribute: {reason}")]
    Attribute {
        /// Attribute name.
        attribute: String,
        /// What was wrong.
        reason: String,
    },
}

type Result<T> = std::result::Result<T, ClassRemapError>;

/// A remapped class and its new internal name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemappedClass {
    /// Internal name before remapping.
    pub original_name: String,
    /// Internal name after remapping.
    pub name: String,
    /// Encoded class file.
    pub bytes: Vec<u8>,
}

impl RemappedClass {
    /// Whether the class itself was renamed.
    #[must_use]
    pub fn renamed(&self) -> bool {
        self.original_name != self.name
    }
}

/// Remaps classes with one table, resolving inherited members through a
/// class index in the source namespace.
#[derive(Debug, Clone, Copy)]
pub struct ClassRemapper<'a> {
    table: &'a MappingTable,
    index: &'a ClassIndex,
}

impl<'a> ClassRemapper<'a> {
    /// Create a remapper.
    #[must_use]
    pub const fn new(table: &'a MappingTable, index: &'a ClassIndex) -> Self {
        Self { table, index }
    }

    /// Remap one class file.
    ///
    /// # Errors
    ///
    /// Returns [`ClassRemapError`] when the class is malformed or a new
    /// constant does not fit in its pool.
    pub fn remap(&self, bytes: &[u8]) -> Result<RemappedClass> {
        let mut class = ClassFile::parse(bytes)?;
        let source = class.pool.clone();
        let original_name = source.class_name(class.this_class)?.into_owned();
        let bootstrap_methods = read_bootstrap_methods(&source, &class.attributes)?;

        let mut rewrite = Rewrite {
            remapper: *self,
            source: &source,
            pool: &mut class.pool,
            this_name: &original_name,
            bootstrap_methods: &bootstrap_methods,
        };
        rewrite.constants()?;
        for field in &mut class.fields {
            rewrite.field(field)?;
        }
        for method in &mut class.methods {
            rewrite.method(method)?;
        }
        rewrite.attributes(&mut class.attributes)?;

        let name = class.name()?.into_owned();
        Ok(RemappedClass {
            original_name,
            name,
            bytes: class.to_bytes()?,
        })
    }

    /// Target name of a method referenced on `owner`, searching ancestors
    /// when `owner` does not declare a mapped method itself.
    #[must_use]
    pub fn resolve_method(&self, owner: &str, name: &str, descriptor: &str) -> Option<&'a str> {
        if name.starts_with('<') {
            return None;
        }
        self.table
            .map_method(owner, name, descriptor)
            .or_else(|| {
                self.index
                    .ancestors(owner)
                    .into_iter()
                    .find_map(|ancestor| self.table.map_method(ancestor, name, descriptor))
            })
    }

    /// Target name of a field referenced on `owner`, searching ancestors.
    #[must_use]
    pub fn resolve_field(&self, owner: &str, name: &str, descriptor: &str) -> Option<&'a str> {
        self.table.map_field(owner, name, descriptor).or_else(|| {
            self.index
                .ancestors(owner)
                .into_iter()
                .find_map(|ancestor| self.table.map_field(ancestor, name, descriptor))
        })
    }
}

type BootstrapMethod = (u16, Vec<u16>);

struct Rewrite<'r, 'a> {
    remapper: ClassRemapper<'a>,
    source: &'r ConstantPool,
    pool: &'r mut ConstantPool,
    this_name: &'r str,
    bootstrap_methods: &'r [BootstrapMethod],
}

impl<'r, 'a> Rewrite<'r, 'a> {
    const fn table(&self) -> &'a MappingTable {
        self.remapper.table
    }

    const fn source(&self) -> &'r ConstantPool {
        self.source
    }

    fn constants(&mut self) -> Result<()> {
        for (index, constant) in self.source().iter() {
            let replacement = match constant {
                Constant::Class(name) => self.class_constant(*name)?,
                Constant::FieldRef {
                    class,
                    name_and_type,
                } => self
                    .member_ref(*class, *name_and_type, false)?
                    .map(|nat| Constant::FieldRef {
                        class: *class,
                        name_and_type: nat,
                    }),
                Constant::MethodRef {
                    class,
                    name_and_type,
                } => self
                    .member_ref(*class, *name_and_type, true)?
                    .map(|nat| Constant::MethodRef {
                        class: *class,
                        name_and_type: nat,
                    }),
                Constant::InterfaceMethodRef {
                    class,
                    name_and_type,
                } => self
                    .member_ref(*class, *name_and_type, true)?
                    .map(|nat| Constant::InterfaceMethodRef {
                        class: *class,
                        name_and_type: nat,
                    }),
                Constant::MethodType(descriptor) => {
                    let original = self.source().utf8(*descriptor)?;
                    let mapped = self.table().map_descriptor(&original)?;
                    (mapped != original)
                        .then(|| self.pool.intern_utf8(&mapped))
                        .transpose()?
                        .map(Constant::MethodType)
                }
                Constant::InvokeDynamic {
                    bootstrap,
                    name_and_type,
                } => self
                    .call_site(*bootstrap, *name_and_type)?
                    .map(|nat| Constant::InvokeDynamic {
                        bootstrap: *bootstrap,
                        name_and_type: nat,
                    }),
                Constant::Dynamic {
                    bootstrap,
                    name_and_type,
                } => self
                    .dynamic_constant(*name_and_type)?
                    .map(|nat| Constant::Dynamic {
                        bootstrap: *bootstrap,
                        name_and_type: nat,
                    }),
                _ => None,
            };
            if let Some(constant) = replacement {
                self.pool.set(index, constant)?;
            }
        }
        Ok(())
    }

    fn class_constant(&mut self, name_index: u16) -> Result<Option<Constant>> {
        let original = self.source().utf8(name_index)?;
        let mapped = self.table().map_type_name(&original)?;
        if mapped == original {
            return Ok(None);
        }
        Ok(Some(Constant::Class(self.pool.intern_utf8(&mapped)?)))
    }

    fn member_ref(&mut self, class: u16, nat: u16, method: bool) -> Result<Option<u16>> {
        let owner = self.source().class_name(class)?;
        let (name, descriptor) = self.source().name_and_type(nat)?;
        let (mapped_name, mapped_descriptor) = if method {
            (
                self.remapper.resolve_method(&owner, &name, &descriptor),
                self.table().map_descriptor(&descriptor)?,
            )
        } else {
            (
                self.remapper.resolve_field(&owner, &name, &descriptor),
                self.table().map_descriptor(&descriptor)?,
            )
        };
        self.replace_name_and_type(&name, mapped_name, &descriptor, &mapped_descriptor)
    }

    fn call_site(&mut self, bootstrap: u16, nat: u16) -> Result<Option<u16>> {
        let (name, descriptor) = self.source().name_and_type(nat)?;
        let mapped_descriptor = self.table().map_descriptor(&descriptor)?;
        let mapped_name = self.lambda_method_name(bootstrap, &name, &descriptor)?;
        self.replace_name_and_type(&name, mapped_name, &descriptor, &mapped_descriptor)
    }

    fn dynamic_constant(&mut self, nat: u16) -> Result<Option<u16>> {
        let (name, descriptor) = self.source().name_and_type(nat)?;
        let mapped_descriptor = self.table().map_descriptor(&descriptor)?;
        self.replace_name_and_type(&name, None, &descriptor, &mapped_descriptor)
    }

    fn replace_name_and_type(
        &mut self,
        name: &str,
        mapped_name: Option<&str>,
        descriptor: &str,
        mapped_descriptor: &str,
    ) -> Result<Option<u16>> {
        let new_name = mapped_name.unwrap_or(name);
        if new_name == name && mapped_descriptor == descriptor {
            return Ok(None);
        }
        Ok(Some(
            self.pool
                .intern_name_and_type(new_name, mapped_descriptor)?,
        ))
    }

    /// The functional-interface method implemented by a
    /// `LambdaMetafactory` call site, renamed through the interface's
    /// hierarchy.
    fn lambda_method_name(
        &self,
        bootstrap: u16,
        name: &str,
        descriptor: &str,
    ) -> Result<Option<&'a str>> {
        let Some((handle, args)) = self.bootstrap_methods.get(usize::from(bootstrap)) else {
            return Ok(None);
        };
        let Constant::MethodHandle { reference, .. } = self.source().get(*handle)? else {
            return Ok(None);
        };
        let (Constant::MethodRef { class, .. } | Constant::InterfaceMethodRef { class, .. }) =
            self.source().get(*reference)?
        else {
            return Ok(None);
        };
        if self.source().class_name(*class)? != LAMBDA_METAFACTORY {
            return Ok(None);
        }
        let Some(interface) = descriptor
            .rsplit_once(')')
            .and_then(|(_, ret)| ret.strip_prefix('L'))
            .and_then(|ret| ret.strip_suffix(';'))
        else {
            return Ok(None);
        };
        let Some(Constant::MethodType(sam)) = args
            .first()
            .map(|arg| self.source().get(*arg))
            .transpose()?
        else {
            return Ok(None);
        };
        let sam_descriptor = self.source().utf8(*sam)?;
        Ok(self
            .remapper
            .resolve_method(interface, name, &sam_descriptor))
    }

    fn field(&mut self, field: &mut Member) -> Result<()> {
        let name = self.source().utf8(field.name)?;
        let descriptor = self.source().utf8(field.descriptor)?;
        if let Some(mapped) = self.table().map_field(self.this_name, &name, &descriptor) {
            if mapped != name {
                field.name = self.pool.intern_utf8(mapped)?;
            }
        }
        field.descriptor = self.descriptor_index(field.descriptor, &descriptor)?;
        self.attributes(&mut field.attributes)
    }

    fn method(&mut self, method: &mut Member) -> Result<()> {
        let name = self.source().utf8(method.name)?;
        let descriptor = self.source().utf8(method.descriptor)?;
        let mapped = if method.access & (ACC_PRIVATE | ACC_STATIC) == 0 {
            self.remapper
                .resolve_method(self.this_name, &name, &descriptor)
        } else {
            self.table().map_method(self.this_name, &name, &descriptor)
        };
        if let Some(mapped) = mapped {
            if mapped != name {
                method.name = self.pool.intern_utf8(mapped)?;
            }
        }
        method.descriptor = self.descriptor_index(method.descriptor, &descriptor)?;
        self.attributes(&mut method.attributes)
    }

    fn descriptor_index(&mut self, index: u16, descriptor: &str) -> Result<u16> {
        let mapped = self.table().map_descriptor(descriptor)?;
        if mapped == descriptor {
            Ok(index)
        } else {
            Ok(self.pool.intern_utf8(&mapped)?)
        }
    }

    fn attributes(&mut self, attributes: &mut [Attribute]) -> Result<()> {
        for attribute in attributes {
            let name = self.source().utf8(attribute.name)?.into_owned();
            let mut patcher = Patcher::new(&mut attribute.data, &name);
            self.attribute(&name, &mut patcher)?;
        }
        Ok(())
    }

    fn attribute(&mut self, name: &str, patcher: &mut Patcher<'_>) -> Result<()> {
        match name {
            "Signature" => self.signature_at(patcher),
            "Code" => self.code(patcher),
            "LocalVariableTable" => self.local_variables(patcher, false),
            "LocalVariableTypeTable" => self.local_variables(patcher, true),
            "InnerClasses" => self.inner_classes(patcher),
            "EnclosingMethod" => self.enclosing_method(patcher),
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                self.annotations(patcher)
            }
            "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                let parameters = patcher.u8()?;
                for _ in 0..parameters {
                    self.annotations(patcher)?;
                }
                Ok(())
            }
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                let count = patcher.u16()?;
                for _ in 0..count {
                    self.type_annotation(patcher)?;
                }
                Ok(())
            }
            "AnnotationDefault" => self.element_value(patcher),
            "Record" => self.record(patcher),
            _ => Ok(()),
        }
    }

    fn signature_at(&mut self, patcher: &mut Patcher<'_>) -> Result<()> {
        let index = patcher.u16()?;
        let original = self.source().utf8(index)?;
        let mapped = self.table().map_signature(&original)?;
        if mapped != original {
            patcher.replace_u16(self.pool.intern_utf8(&mapped)?)?;
        }
        Ok(())
    }

    fn descriptor_at(&mut self, patcher: &mut Patcher<'_>) -> Result<()> {
        let index = patcher.u16()?;
        let original = self.source().utf8(index)?;
        let mapped = self.table().map_descriptor(&original)?;
        if mapped != original {
            patcher.replace_u16(self.pool.intern_utf8(&mapped)?)?;
        }
        Ok(())
    }

    fn code(&mut self, patcher: &mut Patcher<'_>) -> Result<()> {
        patcher.skip(4)?;
        let code_length = patcher.u32()?;
        patcher.skip(usize::try_from(code_length).map_err(|_| patcher.malformed("code length"))?)?;
        let handlers = usize::from(patcher.u16()?);
        patcher.skip(handlers * 8)?;
        self.nested_attributes(patcher)
    }

    fn nested_attributes(&mut self, patcher: &mut Patcher<'_>) -> Result<()> {
        let count = patcher.u16()?;
        for _ in 0..count {
            let name_index = patcher.u16()?;
            let length = patcher.u32()?;
            let name = self.source().utf8(name_index)?.into_owned();
            let length =
                usize::try_from(length).map_err(|_| patcher.malformed("attribute length"))?;
            let mut nested = patcher.nested(length, &name)?;
            self.attribute(&name, &mut nested)?;
        }
        Ok(())
    }

    fn local_variables(&mut self, patcher: &mut Patcher<'_>, generic: bool) -> Result<()> {
        let count = patcher.u16()?;
        for _ in 0..count {
            patcher.skip(6)?;
            if generic {
                self.signature_at(patcher)?;
            } else {
                self.descriptor_at(patcher)?;
            }
            patcher.skip(2)?;
        }
        Ok(())
    }

    fn inner_classes(&mut self, patcher: &mut Patcher<'_>) -> Result<()> {
        let count = patcher.u16()?;
        for _ in 0..count {
            let inner = patcher.u16()?;
            let outer = patcher.u16()?;
            let simple = patcher.u16()?;
            patcher.skip(2)?;
            if simple == 0 {
                continue;
            }
            let original_inner = self.source().class_name(inner)?;
            let mapped_inner = self.pool.class_name(inner)?.into_owned();
            if mapped_inner == original_inner {
                continue;
            }
            let new_simple = if outer == 0 {
                simple_name(&mapped_inner, None)
            } else {
                let mapped_outer = self.pool.class_name(outer)?;
                simple_name(&mapped_inner, Some(&mapped_outer))
            };
            if new_simple != self.source().utf8(simple)? {
                let index = self.pool.intern_utf8(&new_simple)?;
                patcher.write_u16_at(patcher.position() - 4, index)?;
            }
        }
        Ok(())
    }

    fn enclosing_method(&mut self, patcher: &mut Patcher<'_>) -> Result<()> {
        let class = patcher.u16()?;
        let method = patcher.u16()?;
        if method == 0 {
            return Ok(());
        }
        let owner = self.source().class_name(class)?;
        let (name, descriptor) = self.source().name_and_type(method)?;
        let mapped_name = self.remapper.resolve_method(&owner, &name, &descriptor);
        let mapped_descriptor = self.table().map_descriptor(&descriptor)?;
        if let Some(nat) =
            self.replace_name_and_type(&name, mapped_name, &descriptor, &mapped_descriptor)?
        {
            patcher.replace_u16(nat)?;
        }
        Ok(())
    }

    fn annotations(&mut self, patcher: &mut Patcher<'_>) -> Result<()> {
        let count = patcher.u16()?;
        for _ in 0..count {
            self.annotation(patcher)?;
        }
        Ok(())
    }

    fn annotation(&mut self, patcher: &mut Patcher<'_>) -> Result<()> {
        self.descriptor_at(patcher)?;
        let pairs = patcher.u16()?;
        for _ in 0..pairs {
            patcher.skip(2)?;
            self.element_value(patcher)?;
        }
        Ok(())
    }

    fn type_annotation(&mut self, patcher: &mut Patcher<'_>) -> Result<()> {
        let target_type = patcher.u8()?;
        let target_info = type_target_length(target_type, patcher)?;
        patcher.skip(target_info)?;
        let path_length = usize::from(patcher.u8()?);
        patcher.skip(path_length * 2)?;
        self.annotation(patcher)
    }

    fn element_value(&mut self, patcher: &mut Patcher<'_>) -> Result<()> {
        let tag = patcher.u8()?;
        match tag {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => patcher.skip(2),
            b'e' => {
                let type_index = patcher.u16()?;
                let enum_type = self.source().utf8(type_index)?;
                let mapped_type = self.table().map_descriptor(&enum_type)?;
                if mapped_type != enum_type {
                    patcher.replace_u16(self.pool.intern_utf8(&mapped_type)?)?;
                }
                let constant_index = patcher.u16()?;
                let constant = self.source().utf8(constant_index)?;
                let owner = enum_type
                    .strip_prefix('L')
                    .and_then(|rest| rest.strip_suffix(';'));
                let mapped = owner.and_then(|owner| {
                    self.table()
                        .map_field(owner, &constant, &enum_type)
                        .or_else(|| self.table().map_field_by_name(owner, &constant))
                });
                if let Some(mapped) = mapped.filter(|mapped| *mapped != constant) {
                    let mapped = mapped.to_owned();
                    patcher.replace_u16(self.pool.intern_utf8(&mapped)?)?;
                }
                Ok(())
            }
            b'c' => {
                let index = patcher.u16()?;
                let original = self.source().utf8(index)?;
                if original == "V" {
                    return Ok(());
                }
                let mapped = self.table().map_descriptor(&original)?;
                if mapped != original {
                    patcher.replace_u16(self.pool.intern_utf8(&mapped)?)?;
                }
                Ok(())
            }
            b'@' => self.annotation(patcher),
            b'[' => {
                let count = patcher.u16()?;
                for _ in 0..count {
                    self.element_value(patcher)?;
                }
                Ok(())
            }
            other => Err(patcher.malformed(&format!("unknown element tag {other}"))),
        }
    }

    fn record(&mut self, patcher: &mut Patcher<'_>) -> Result<()> {
        let count = patcher.u16()?;
        for _ in 0..count {
            let name_index = patcher.u16()?;
            let descriptor_index = patcher.u16()?;
            let name = self.source().utf8(name_index)?;
            let descriptor = self.source().utf8(descriptor_index)?;
            if let Some(mapped) = self
                .table()
                .map_field(self.this_name, &name, &descriptor)
                .filter(|mapped| *mapped != name)
            {
                let mapped = mapped.to_owned();
                let index = self.pool.intern_utf8(&mapped)?;
                patcher.write_u16_at(patcher.position() - 4, index)?;
            }
            let mapped_descriptor = self.table().map_descriptor(&descriptor)?;
            if mapped_descriptor != descriptor {
                patcher.replace_u16(self.pool.intern_utf8(&mapped_descriptor)?)?;
            }
            self.nested_attributes(patcher)?;
        }
        Ok(())
    }
}

/// Bytes of `target_info` following `target_type`, reading the local
/// variable table length where the size depends on it.
fn type_target_length(target_type: u8, patcher: &mut Patcher<'_>) -> Result<usize> {
    match type_target(target_type) {
        Some(TypeTarget::Fixed(length)) => Ok(length),
        Some(TypeTarget::LocalVariables) => Ok(usize::from(patcher.u16()?) * 6),
        None => Err(patcher.malformed(&format!(
            "unknown type annotation target {target_type:#04x}"
        ))),
    }
}

/// Simple name of a renamed inner class given its (renamed) outer class.
fn simple_name(inner: &str, outer: Option<&str>) -> String {
    if let Some(rest) = outer
        .and_then(|outer| inner.strip_prefix(outer))
        .and_then(|rest| rest.strip_prefix('$'))
    {
        return rest.to_owned();
    }
    let base = inner.rsplit_once('/').map_or(inner, |(_, base)| base);
    base.rsplit_once('$')
        .map_or(base, |(_, simple)| simple)
        .to_owned()
}

fn read_bootstrap_methods(
    pool: &ConstantPool,
    attributes: &[Attribute],
) -> Result<Vec<BootstrapMethod>> {
    let mut methods = Vec::new();
    for attribute in attributes {
        if pool.utf8(attribute.name)? != "BootstrapMethods" {
            continue;
        }
        let mut data = attribute.data.clone();
        let mut patcher = Patcher::new(&mut data, "BootstrapMethods");
        let count = patcher.u16()?;
        for _ in 0..count {
            let handle = patcher.u16()?;
            let arg_count = patcher.u16()?;
            let args = (0..arg_count)
                .map(|_| patcher.u16())
                .collect::<Result<Vec<_>>>()?;
            methods.push((handle, args));
        }
    }
    Ok(methods)
}

/// Cursor over an attribute body that can overwrite the indices it reads.
struct Patcher<'d> {
    data: &'d mut [u8],
    position: usize,
    attribute: String,
}

impl<'d> Patcher<'d> {
    fn new(data: &'d mut [u8], attribute: &str) -> Self {
        Self {
            data,
            position: 0,
            attribute: attribute.to_owned(),
        }
    }

    const fn position(&self) -> usize {
        self.position
    }

    fn malformed(&self, reason: &str) -> ClassRemapError {
        ClassRemapError::Attribute {
            attribute: self.attribute.clone(),
            reason: format!("{reason} at offset {}", self.position),
        }
    }

    fn take(&mut self, length: usize) -> Result<&[u8]> {
        let start = self.position;
        let end = start
            .checked_add(length)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.malformed("truncated body"))?;
        self.position = end;
        self.data
            .get(start..end)
            .ok_or_else(|| self.malformed("truncated body"))
    }

    fn skip(&mut self, length: usize) -> Result<()> {
        self.take(length).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8> {
        let bytes = self.take(1)?;
        bytes
            .first()
            .copied()
            .ok_or_else(|| self.malformed("truncated body"))
    }

    fn u16(&mut self) -> Result<u16> {
        let bytes: [u8; 2] = self
            .take(2)?
            .try_into()
            .map_err(|_| self.malformed("truncated body"))?;
        Ok(u16::from_be_bytes(bytes))
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes: [u8; 4] = self
            .take(4)?
            .try_into()
            .map_err(|_| self.malformed("truncated body"))?;
        Ok(u32::from_be_bytes(bytes))
    }

    /// Overwrite the two bytes just read.
    fn replace_u16(&mut self, value: u16) -> Result<()> {
        let at = self
            .position
            .checked_sub(2)
            .ok_or_else(|| self.malformed("nothing to replace"))?;
        self.write_u16_at(at, value)
    }

    fn write_u16_at(&mut self, at: usize, value: u16) -> Result<()> {
        let error = self.malformed("write out of bounds");
        let slot = self.data.get_mut(at..at + 2).ok_or(error)?;
        slot.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    fn nested(&mut self, length: usize, attribute: &str) -> Result<Patcher<'_>> {
        let start = self.position;
        let end = start
            .checked_add(length)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.malformed("truncated nested attribute"))?;
        self.position = end;
        let error = self.malformed("truncated nested attribute");
        let data = self.data.get_mut(start..end).ok_or(error)?;
        Ok(Patcher {
            data,
            position: 0,
            attribute: attribute.to_owned(),
        })
    }
}

#[cfg(test)]
#[path = "class_remapper_tests.rs"]
mod tests;
