//! JVM class-file reading and writing.
//!
//! Only the structure needed to rename bindings is decoded: the constant
//! pool, the class header, and declared members. Attribute bodies stay as
//! raw bytes; every rename inside them replaces one constant-pool index with
//! another, so attribute lengths never change.
//!
//! UTF-8 constants are kept as their modified-UTF-8 bytes and decoded on
//! demand. Renaming never edits a UTF-8 constant in place; new names are
//! appended (or matched against an existing identical constant), because a
//! single UTF-8 constant may be shared by unrelated references such as a
//! class name and a string literal.

use std::borrow::Cow;
use thiserror::Error;

const MAGIC: u32 = 0xCAFE_BABE;

/// Largest constant-pool count a class file can declare.
pub const MAX_POOL_COUNT: usize = 65_535;

/// Errors raised while decoding or encoding a class file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFileError {
    /// The input ended before a structure was complete.
    #[error("class file truncated at offset {offset}")]
    Truncated {
        /// Byte offset of the failed read.
        offset: usize,
    },

    /// The input does not start with `0xCAFEBABE`.
    #[error("not a class file (bad magic)")]
    BadMagic,

    /// A constant-pool tag is unknown.
    #[error("unknown constant-pool tag {tag} at index {index}")]
    UnknownTag {
        /// The tag byte.
        tag: u8,
        /// Pool index of the entry.
        index: usize,
    },

    /// An index points at a missing entry or one of the wrong kind.
    #[error("constant-pool index {index} is not a {expected}")]
    BadIndex {
        /// The offending index.
        index: u16,
        /// What the reference required.
        expected: &'static str,
    },

    /// A UTF-8 constant is not valid modified UTF-8.
    #[error("constant-pool entry {index} is not valid modified UTF-8")]
    InvalidUtf8 {
        /// Pool index of the entry.
        index: u16,
    },

    /// Appending would exceed the 65535-entry limit.
    #[error("constant pool exceeds {MAX_POOL_COUNT} entries")]
    PoolOverflow,

    /// An attribute body does not match its declared layout.
    #[error("malformed {attribute} attribute at offset {offset}")]
    MalformedAttribute {
        /// Attribute name.
        attribute: String,
        /// Byte offset within the attribute body.
        offset: usize,
    },
}

/// Result type for class-file operations.
pub type Result<T> = std::result::Result<T, ClassFileError>;

/// One constant-pool entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// Index zero and the slot after a long or double.
    Unusable,
    /// Modified-UTF-8 bytes.
    Utf8(Vec<u8>),
    /// `CONSTANT_Integer`.
    Integer(u32),
    /// `CONSTANT_Float`, as raw bits.
    Float(u32),
    /// `CONSTANT_Long`.
    Long(u64),
    /// `CONSTANT_Double`, as raw bits.
    Double(u64),
    /// `CONSTANT_Class` pointing at an internal name.
    Class(u16),
    /// `CONSTANT_String`.
    String(u16),
    /// `CONSTANT_Fieldref`.
    FieldRef {
        /// Owner class entry.
        class: u16,
        /// Name-and-type entry.
        name_and_type: u16,
    },
    /// `CONSTANT_Methodref`.
    MethodRef {
        /// Owner class entry.
        class: u16,
        /// Name-and-type entry.
        name_and_type: u16,
    },
    /// `CONSTANT_InterfaceMethodref`.
    InterfaceMethodRef {
        /// Owner class entry.
        class: u16,
        /// Name-and-type entry.
        name_and_type: u16,
    },
    /// `CONSTANT_NameAndType`.
    NameAndType {
        /// Member name.
        name: u16,
        /// Member descriptor.
        descriptor: u16,
    },
    /// `CONSTANT_MethodHandle`.
    MethodHandle {
        /// Reference kind (1 to 9).
        kind: u8,
        /// Referenced member entry.
        reference: u16,
    },
    /// `CONSTANT_MethodType`.
    MethodType(u16),
    /// `CONSTANT_Dynamic`.
    Dynamic {
        /// Index into `BootstrapMethods`.
        bootstrap: u16,
        /// Name-and-type entry.
        name_and_type: u16,
    },
    /// `CONSTANT_InvokeDynamic`.
    InvokeDynamic {
        /// Index into `BootstrapMethods`.
        bootstrap: u16,
        /// Name-and-type entry.
        name_and_type: u16,
    },
    /// `CONSTANT_Module`.
    Module(u16),
    /// `CONSTANT_Package`.
    Package(u16),
}

impl Constant {
    const fn occupies_two_slots(&self) -> bool {
        matches!(self, Self::Long(_) | Self::Double(_))
    }
}

/// The constant pool of one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self {
            entries: vec![Constant::Unusable],
        }
    }
}

impl ConstantPool {
    /// The pool count as written in the class file (one more than the
    /// highest index).
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over `(index, constant)` pairs, skipping unusable slots.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, constant)| !matches!(constant, Constant::Unusable))
            .filter_map(|(index, constant)| u16::try_from(index).ok().map(|index| (index, constant)))
    }

    /// The entry at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError::BadIndex`] for an out-of-range index.
    pub fn get(&self, index: u16) -> Result<&Constant> {
        self.entries
            .get(usize::from(index))
            .ok_or(ClassFileError::BadIndex {
                index,
                expected: "valid entry",
            })
    }

    /// Replace the entry at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError::BadIndex`] for an out-of-range index.
    pub fn set(&mut self, index: u16, constant: Constant) -> Result<()> {
        let slot = self
            .entries
            .get_mut(usize::from(index))
            .ok_or(ClassFileError::BadIndex {
                index,
                expected: "valid entry",
            })?;
        *slot = constant;
        Ok(())
    }

    /// Append an entry and return its index.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError::PoolOverflow`] once the pool is full.
    pub fn push(&mut self, constant: Constant) -> Result<u16> {
        let slots = if constant.occupies_two_slots() { 2 } else { 1 };
        if self.entries.len() + slots > MAX_POOL_COUNT {
            return Err(ClassFileError::PoolOverflow);
        }
        let index = u16::try_from(self.entries.len()).map_err(|_| ClassFileError::PoolOverflow)?;
        let wide = constant.occupies_two_slots();
        self.entries.push(constant);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        Ok(index)
    }

    /// The raw bytes of a UTF-8 entry.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError::BadIndex`] when `index` is not UTF-8.
    pub fn utf8_bytes(&self, index: u16) -> Result<&[u8]> {
        match self.get(index)? {
            Constant::Utf8(bytes) => Ok(bytes),
            _ => Err(ClassFileError::BadIndex {
                index,
                expected: "UTF-8 constant",
            }),
        }
    }

    /// A UTF-8 entry decoded to a string.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError`] when `index` is not UTF-8 or does not
    /// decode.
    pub fn utf8(&self, index: u16) -> Result<Cow<'_, str>> {
        decode_modified_utf8(self.utf8_bytes(index)?).ok_or(ClassFileError::InvalidUtf8 { index })
    }

    /// The internal name a `CONSTANT_Class` entry points at.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError`] when `index` is not a class entry.
    pub fn class_name(&self, index: u16) -> Result<Cow<'_, str>> {
        match self.get(index)? {
            Constant::Class(name) => self.utf8(*name),
            _ => Err(ClassFileError::BadIndex {
                index,
                expected: "class constant",
            }),
        }
    }

    /// Name and descriptor of a `CONSTANT_NameAndType` entry.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError`] when `index` is not a name-and-type entry.
    pub fn name_and_type(&self, index: u16) -> Result<(Cow<'_, str>, Cow<'_, str>)> {
        match self.get(index)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(ClassFileError::BadIndex {
                index,
                expected: "name-and-type constant",
            }),
        }
    }

    /// Index of a UTF-8 entry holding `value`, appending one if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError::PoolOverflow`] when the pool is full.
    pub fn intern_utf8(&mut self, value: &str) -> Result<u16> {
        let encoded = encode_modified_utf8(value);
        let existing = self.iter().find_map(|(index, constant)| match constant {
            Constant::Utf8(bytes) if *bytes == encoded => Some(index),
            _ => None,
        });
        match existing {
            Some(index) => Ok(index),
            None => self.push(Constant::Utf8(encoded)),
        }
    }

    /// Index of a name-and-type entry for `name` and `descriptor`, appending
    /// entries if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError::PoolOverflow`] when the pool is full.
    pub fn intern_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name_index = self.intern_utf8(name)?;
        let descriptor_index = self.intern_utf8(descriptor)?;
        let wanted = Constant::NameAndType {
            name: name_index,
            descriptor: descriptor_index,
        };
        let existing = self
            .iter()
            .find_map(|(index, constant)| (*constant == wanted).then_some(index));
        match existing {
            Some(index) => Ok(index),
            None => self.push(wanted),
        }
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let count = usize::from(reader.u16()?);
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable);
        while entries.len() < count {
            let index = entries.len();
            let tag = reader.u8()?;
            let constant = match tag {
                1 => {
                    let length = usize::from(reader.u16()?);
                    Constant::Utf8(reader.bytes(length)?.to_vec())
                }
                3 => Constant::Integer(reader.u32()?),
                4 => Constant::Float(reader.u32()?),
                5 => Constant::Long(reader.u64()?),
                6 => Constant::Double(reader.u64()?),
                7 => Constant::Class(reader.u16()?),
                8 => Constant::String(reader.u16()?),
                9 => Constant::FieldRef {
                    class: reader.u16()?,
                    name_and_type: reader.u16()?,
                },
                10 => Constant::MethodRef {
                    class: reader.u16()?,
                    name_and_type: reader.u16()?,
                },
                11 => Constant::InterfaceMethodRef {
                    class: reader.u16()?,
                    name_and_type: reader.u16()?,
                },
                12 => Constant::NameAndType {
                    name: reader.u16()?,
                    descriptor: reader.u16()?,
                },
                15 => Constant::MethodHandle {
                    kind: reader.u8()?,
                    reference: reader.u16()?,
                },
                16 => Constant::MethodType(reader.u16()?),
                17 => Constant::Dynamic {
                    bootstrap: reader.u16()?,
                    name_and_type: reader.u16()?,
                },
                18 => Constant::InvokeDynamic {
                    bootstrap: reader.u16()?,
                    name_and_type: reader.u16()?,
                },
                19 => Constant::Module(reader.u16()?),
                20 => Constant::Package(reader.u16()?),
                _ => return Err(ClassFileError::UnknownTag { tag, index }),
            };
            let wide = constant.occupies_two_slots();
            entries.push(constant);
            if wide {
                entries.push(Constant::Unusable);
            }
        }
        Ok(Self { entries })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        let count = u16::try_from(self.entries.len()).map_err(|_| ClassFileError::PoolOverflow)?;
        put_u16(out, count);
        for constant in &self.entries {
            match constant {
                Constant::Unusable => {}
                Constant::Utf8(bytes) => {
                    out.push(1);
                    let length =
                        u16::try_from(bytes.len()).map_err(|_| ClassFileError::PoolOverflow)?;
                    put_u16(out, length);
                    out.extend_from_slice(bytes);
                }
                Constant::Integer(value) => {
                    out.push(3);
                    put_u32(out, *value);
                }
                Constant::Float(bits) => {
                    out.push(4);
                    put_u32(out, *bits);
                }
                Constant::Long(value) => {
                    out.push(5);
                    out.extend_from_slice(&value.to_be_bytes());
                }
                Constant::Double(bits) => {
                    out.push(6);
                    out.extend_from_slice(&bits.to_be_bytes());
                }
                Constant::Class(index) => put_tagged(out, 7, &[*index]),
                Constant::String(index) => put_tagged(out, 8, &[*index]),
                Constant::FieldRef {
                    class,
                    name_and_type,
                } => put_tagged(out, 9, &[*class, *name_and_type]),
                Constant::MethodRef {
                    class,
                    name_and_type,
                } => put_tagged(out, 10, &[*class, *name_and_type]),
                Constant::InterfaceMethodRef {
                    class,
                    name_and_type,
                } => put_tagged(out, 11, &[*class, *name_and_type]),
                Constant::NameAndType { name, descriptor } => {
                    put_tagged(out, 12, &[*name, *descriptor]);
                }
                Constant::MethodHandle { kind, reference } => {
                    out.push(15);
                    out.push(*kind);
                    put_u16(out, *reference);
                }
                Constant::MethodType(index) => put_tagged(out, 16, &[*index]),
                Constant::Dynamic {
                    bootstrap,
                    name_and_type,
                } => put_tagged(out, 17, &[*bootstrap, *name_and_type]),
                Constant::InvokeDynamic {
                    bootstrap,
                    name_and_type,
                } => put_tagged(out, 18, &[*bootstrap, *name_and_type]),
                Constant::Module(index) => put_tagged(out, 19, &[*index]),
                Constant::Package(index) => put_tagged(out, 20, &[*index]),
            }
        }
        Ok(())
    }
}

/// A named attribute with an undecoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// UTF-8 entry holding the attribute name.
    pub name: u16,
    /// Attribute body.
    pub data: Vec<u8>,
}

/// A declared field or method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Access flags.
    pub access: u16,
    /// UTF-8 entry holding the name.
    pub name: u16,
    /// UTF-8 entry holding the descriptor.
    pub descriptor: u16,
    /// Member attributes.
    pub attributes: Vec<Attribute>,
}

/// `ACC_PRIVATE`.
pub const ACC_PRIVATE: u16 = 0x0002;
/// `ACC_STATIC`.
pub const ACC_STATIC: u16 = 0x0008;

/// A decoded class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    /// Minor version.
    pub minor_version: u16,
    /// Major version.
    pub major_version: u16,
    /// Constant pool.
    pub pool: ConstantPool,
    /// Class access flags.
    pub access: u16,
    /// Class entry of this class.
    pub this_class: u16,
    /// Class entry of the superclass, or zero for `java/lang/Object`.
    pub super_class: u16,
    /// Class entries of implemented interfaces.
    pub interfaces: Vec<u16>,
    /// Declared fields.
    pub fields: Vec<Member>,
    /// Declared methods.
    pub methods: Vec<Member>,
    /// Class attributes.
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Decode a class file.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError`] for truncated or malformed input.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        if reader.u32()? != MAGIC {
            return Err(ClassFileError::BadMagic);
        }
        let minor_version = reader.u16()?;
        let major_version = reader.u16()?;
        let pool = ConstantPool::read(&mut reader)?;
        let access = reader.u16()?;
        let this_class = reader.u16()?;
        let super_class = reader.u16()?;
        let interface_count = usize::from(reader.u16()?);
        let interfaces = (0..interface_count)
            .map(|_| reader.u16())
            .collect::<Result<Vec<_>>>()?;
        let fields = read_members(&mut reader)?;
        let methods = read_members(&mut reader)?;
        let attributes = read_attributes(&mut reader)?;
        Ok(Self {
            minor_version,
            major_version,
            pool,
            access,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    /// Encode the class file.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError::PoolOverflow`] when a table is too large to
    /// encode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        put_u32(&mut out, MAGIC);
        put_u16(&mut out, self.minor_version);
        put_u16(&mut out, self.major_version);
        self.pool.write(&mut out)?;
        put_u16(&mut out, self.access);
        put_u16(&mut out, self.this_class);
        put_u16(&mut out, self.super_class);
        put_len(&mut out, self.interfaces.len())?;
        for interface in &self.interfaces {
            put_u16(&mut out, *interface);
        }
        write_members(&mut out, &self.fields)?;
        write_members(&mut out, &self.methods)?;
        write_attributes(&mut out, &self.attributes)?;
        Ok(out)
    }

    /// Internal name of this class.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError`] when `this_class` is not a class entry.
    pub fn name(&self) -> Result<Cow<'_, str>> {
        self.pool.class_name(self.this_class)
    }

    /// Internal name of the superclass, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError`] when `super_class` is not a class entry.
    pub fn super_name(&self) -> Result<Option<Cow<'_, str>>> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.pool.class_name(self.super_class).map(Some)
    }

    /// Internal names of the implemented interfaces.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError`] when an interface is not a class entry.
    pub fn interface_names(&self) -> Result<Vec<Cow<'_, str>>> {
        self.interfaces
            .iter()
            .map(|index| self.pool.class_name(*index))
            .collect()
    }

    /// Name of an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFileError`] when the name is not a UTF-8 entry.
    pub fn attribute_name(&self, attribute: &Attribute) -> Result<Cow<'_, str>> {
        self.pool.utf8(attribute.name)
    }
}

fn read_members(reader: &mut Reader<'_>) -> Result<Vec<Member>> {
    let count = usize::from(reader.u16()?);
    (0..count)
        .map(|_| {
            Ok(Member {
                access: reader.u16()?,
                name: reader.u16()?,
                descriptor: reader.u16()?,
                attributes: read_attributes(reader)?,
            })
        })
        .collect()
}

/// Read an attribute table.
pub(crate) fn read_attributes(reader: &mut Reader<'_>) -> Result<Vec<Attribute>> {
    let count = usize::from(reader.u16()?);
    (0..count)
        .map(|_| {
            let name = reader.u16()?;
            let length = usize::try_from(reader.u32()?).map_err(|_| ClassFileError::Truncated {
                offset: reader.offset(),
            })?;
            Ok(Attribute {
                name,
                data: reader.bytes(length)?.to_vec(),
            })
        })
        .collect()
}

fn write_members(out: &mut Vec<u8>, members: &[Member]) -> Result<()> {
    put_len(out, members.len())?;
    for member in members {
        put_u16(out, member.access);
        put_u16(out, member.name);
        put_u16(out, member.descriptor);
        write_attributes(out, &member.attributes)?;
    }
    Ok(())
}

/// Write an attribute table.
pub(crate) fn write_attributes(out: &mut Vec<u8>, attributes: &[Attribute]) -> Result<()> {
    put_len(out, attributes.len())?;
    for attribute in attributes {
        put_u16(out, attribute.name);
        let length = u32::try_from(attribute.data.len()).map_err(|_| ClassFileError::PoolOverflow)?;
        put_u32(out, length);
        out.extend_from_slice(&attribute.data);
    }
    Ok(())
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_len(out: &mut Vec<u8>, len: usize) -> Result<()> {
    put_u16(out, u16::try_from(len).map_err(|_| ClassFileError::PoolOverflow)?);
    Ok(())
}

fn put_tagged(out: &mut Vec<u8>, tag: u8, values: &[u16]) {
    out.push(tag);
    for value in values {
        put_u16(out, *value);
    }
}

/// Layout of a type annotation's `target_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeTarget {
    /// A fixed number of bytes.
    Fixed(usize),
    /// A `u16` count followed by six bytes per local-variable entry.
    LocalVariables,
}

/// `target_info` layout for a type annotation's `target_type`, if known.
pub(crate) const fn type_target(target_type: u8) -> Option<TypeTarget> {
    match target_type {
        0x00 | 0x01 | 0x16 => Some(TypeTarget::Fixed(1)),
        0x10..=0x12 | 0x17 | 0x42..=0x46 => Some(TypeTarget::Fixed(2)),
        0x13..=0x15 => Some(TypeTarget::Fixed(0)),
        0x47..=0x4B => Some(TypeTarget::Fixed(3)),
        0x40 | 0x41 => Some(TypeTarget::LocalVariables),
        _ => None,
    }
}

/// Big-endian cursor over class-file bytes.
#[derive(Debug)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub(crate) const fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub(crate) const fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.offset.checked_add(length);
        let slice = end
            .and_then(|end| self.data.get(self.offset..end))
            .ok_or(ClassFileError::Truncated {
                offset: self.offset,
            })?;
        self.offset += length;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let offset = self.offset;
        self.bytes(N)?
            .try_into()
            .map_err(|_| ClassFileError::Truncated { offset })
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(u8::from_be_bytes(self.array()?))
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.array()?))
    }
}

/// Encode a string as modified UTF-8: NUL becomes `C0 80` and
/// supplementary characters become surrogate pairs.
#[must_use]
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    let mut units = [0_u16; 2];
    for ch in value.chars() {
        for unit in ch.encode_utf16(&mut units).iter() {
            let unit = u32::from(*unit);
            match unit {
                0x01..=0x7F => out.push(unit as u8),
                0x00 | 0x80..=0x7FF => {
                    out.push(0xC0 | (unit >> 6) as u8);
                    out.push(0x80 | (unit & 0x3F) as u8);
                }
                _ => {
                    out.push(0xE0 | (unit >> 12) as u8);
                    out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                    out.push(0x80 | (unit & 0x3F) as u8);
                }
            }
        }
    }
    out
}

/// Decode modified UTF-8, borrowing when the bytes are plain ASCII.
///
/// Returns `None` for malformed input or unpaired surrogates.
#[must_use]
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<Cow<'_, str>> {
    if bytes.iter().all(|byte| (0x01..0x80).contains(byte)) {
        return std::str::from_utf8(bytes).ok().map(Cow::Borrowed);
    }
    let mut units = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied();
    while let Some(first) = iter.next() {
        let unit = match first {
            0x01..=0x7F => u16::from(first),
            0xC0..=0xDF => {
                let second = continuation(iter.next())?;
                (u16::from(first & 0x1F) << 6) | second
            }
            0xE0..=0xEF => {
                let second = continuation(iter.next())?;
                let third = continuation(iter.next())?;
                (u16::from(first & 0x0F) << 12) | (second << 6) | third
            }
            _ => return None,
        };
        units.push(unit);
    }
    String::from_utf16(&units).ok().map(Cow::Owned)
}

fn continuation(byte: Option<u8>) -> Option<u16> {
    byte.filter(|byte| byte & 0xC0 == 0x80)
        .map(|byte| u16::from(byte & 0x3F))
}

#[cfg(test)]
#[path = "classfile_tests.rs"]
mod tests;
