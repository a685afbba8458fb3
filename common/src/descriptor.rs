//! JVM type descriptors and generic signatures.
//!
//! Descriptors name classes by their internal (slash-separated) names, for
//! example `(Lnet/minecraft/world/level/Level;I)V`. Remapping walks the
//! descriptor and rewrites every class name it finds, leaving primitive
//! types and punctuation untouched.

use thiserror::Error;

/// A descriptor or signature that does not follow the JVM grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed descriptor \"{value}\" at offset {offset}")]
pub struct DescriptorError {
    /// The rejected descriptor.
    pub value: String,
    /// Byte offset where parsing stopped.
    pub offset: usize,
}

const BASE_TYPES: &[u8] = b"BCDFIJSZ";

/// Rewrite every class name in a field or method descriptor.
///
/// `map` returns the new internal name for a class, or `None` to keep it.
///
/// # Errors
///
/// Returns [`DescriptorError`] when the descriptor is malformed.
///
/// # Examples
///
/// ```
/// use trellis_common::descriptor::map_descriptor;
///
/// let mapped = map_descriptor("(La/B;[La/C;I)La/B;", |name| {
///     (name == "a/B").then(|| "x/Y".to_owned())
/// })
/// .expect("valid descriptor");
/// assert_eq!(mapped, "(Lx/Y;[La/C;I)Lx/Y;");
/// ```
pub fn map_descriptor<F>(descriptor: &str, mut map: F) -> Result<String, DescriptorError>
where
    F: FnMut(&str) -> Option<String>,
{
    let bytes = descriptor.as_bytes();
    let mut out = String::with_capacity(descriptor.len());
    let mut index = 0;
    while let Some(&byte) = bytes.get(index) {
        if byte == b'L' {
            let end = find_byte(bytes, index, b';').ok_or_else(|| error(descriptor, index))?;
            let name = descriptor
                .get(index + 1..end)
                .ok_or_else(|| error(descriptor, index))?;
            if name.is_empty() {
                return Err(error(descriptor, index));
            }
            out.push('L');
            out.push_str(&map(name).unwrap_or_else(|| name.to_owned()));
            out.push(';');
            index = end + 1;
        } else if !byte.is_ascii() {
            return Err(error(descriptor, index));
        } else {
            out.push(char::from(byte));
            index += 1;
        }
    }
    Ok(out)
}

/// Rewrite the name stored in a `CONSTANT_Class` entry.
///
/// Array classes are stored as descriptors (`[La/B;`), plain classes as
/// internal names.
///
/// # Errors
///
/// Returns [`DescriptorError`] for a malformed array descriptor.
pub fn map_type_name<F>(name: &str, mut map: F) -> Result<String, DescriptorError>
where
    F: FnMut(&str) -> Option<String>,
{
    if name.starts_with('[') {
        map_descriptor(name, map)
    } else {
        Ok(map(name).unwrap_or_else(|| name.to_owned()))
    }
}

/// Collect every class name referenced by a descriptor.
///
/// # Errors
///
/// Returns [`DescriptorError`] when the descriptor is malformed.
pub fn referenced_classes(descriptor: &str) -> Result<Vec<String>, DescriptorError> {
    let mut names = Vec::new();
    map_descriptor(descriptor, |name| {
        names.push(name.to_owned());
        None
    })?;
    Ok(names)
}

/// Return `true` when `value` is a single valid field descriptor.
#[must_use]
pub fn is_field_descriptor(value: &str) -> bool {
    let bytes = value.as_bytes();
    matches!(field_type_end(bytes, 0), Some(end) if end == bytes.len())
}

/// Return `true` when `value` is a valid method descriptor.
///
/// # Examples
///
/// ```
/// use trellis_common::descriptor::is_method_descriptor;
///
/// assert!(is_method_descriptor("(Lnet/minecraft/core/BlockPos;I)V"));
/// assert!(!is_method_descriptor("(I"));
/// assert!(!is_method_descriptor("I"));
/// ```
#[must_use]
pub fn is_method_descriptor(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.first() != Some(&b'(') {
        return false;
    }
    let mut index = 1;
    while bytes.get(index).is_some_and(|byte| *byte != b')') {
        match field_type_end(bytes, index) {
            Some(end) => index = end,
            None => return false,
        }
    }
    if bytes.get(index) != Some(&b')') {
        return false;
    }
    index += 1;
    if bytes.get(index) == Some(&b'V') {
        return index + 1 == bytes.len();
    }
    matches!(field_type_end(bytes, index), Some(end) if end == bytes.len())
}

fn field_type_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut index = start;
    while bytes.get(index) == Some(&b'[') {
        index += 1;
    }
    match bytes.get(index)? {
        b'L' => {
            let end = find_byte(bytes, index, b';')?;
            (end > index + 1).then_some(end + 1)
        }
        byte if BASE_TYPES.contains(byte) => Some(index + 1),
        _ => None,
    }
}

/// Rewrite every class name in a generic signature.
///
/// Handles class, method and field signatures, including formal type
/// parameters, type variables, wildcards and inner-class suffixes
/// (`Lpkg/Outer<TT;>.Inner;`). Inner-class suffixes are rewritten by mapping
/// the full binary name `pkg/Outer$Inner` and keeping the part after the last
/// `$` of the result.
///
/// # Errors
///
/// Returns [`DescriptorError`] when the signature is malformed.
pub fn map_signature<F>(signature: &str, mut map: F) -> Result<String, DescriptorError>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut parser = SignatureMapper {
        source: signature,
        bytes: signature.as_bytes(),
        index: 0,
        out: String::with_capacity(signature.len()),
        map: &mut map,
    };
    parser.run()?;
    Ok(parser.out)
}

struct SignatureMapper<'a, F> {
    source: &'a str,
    bytes: &'a [u8],
    index: usize,
    out: String,
    map: &'a mut F,
}

impl<F> SignatureMapper<'_, F>
where
    F: FnMut(&str) -> Option<String>,
{
    fn run(&mut self) -> Result<(), DescriptorError> {
        if self.peek() == Some(b'<') {
            self.formal_type_parameters()?;
        }
        if self.peek() == Some(b'(') {
            self.copy_byte();
            while self.peek().is_some_and(|byte| byte != b')') {
                self.type_signature()?;
            }
            self.expect(b')')?;
            self.type_signature()?;
            while self.peek() == Some(b'^') {
                self.copy_byte();
                self.type_signature()?;
            }
        }
        while self.peek().is_some() {
            self.type_signature()?;
        }
        Ok(())
    }

    fn formal_type_parameters(&mut self) -> Result<(), DescriptorError> {
        self.expect(b'<')?;
        while self.peek().is_some_and(|byte| byte != b'>') {
            let start = self.index;
            while self.peek().is_some_and(|byte| byte != b':') {
                self.index += 1;
            }
            if self.index == start {
                return Err(self.error());
            }
            self.push_slice(start, self.index)?;
            while self.peek() == Some(b':') {
                self.copy_byte();
                if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
                    self.type_signature()?;
                }
            }
        }
        self.expect(b'>')
    }

    fn type_signature(&mut self) -> Result<(), DescriptorError> {
        match self.peek().ok_or_else(|| self.error())? {
            b'L' => self.class_type_signature(),
            b'T' => {
                let end = find_byte(self.bytes, self.index, b';').ok_or_else(|| self.error())?;
                self.push_slice(self.index, end + 1)?;
                self.index = end + 1;
                Ok(())
            }
            b'[' => {
                self.copy_byte();
                self.type_signature()
            }
            byte if BASE_TYPES.contains(&byte) || byte == b'V' => {
                self.copy_byte();
                Ok(())
            }
            _ => Err(self.error()),
        }
    }

    fn class_type_signature(&mut self) -> Result<(), DescriptorError> {
        self.expect(b'L')?;
        let outer = self.identifier()?;
        let mapped_outer = (self.map)(&outer).unwrap_or_else(|| outer.clone());
        self.out.push_str(&mapped_outer);
        self.type_arguments()?;

        let mut binary_name = outer;
        while self.peek() == Some(b'.') {
            self.copy_byte();
            let simple = self.identifier()?;
            binary_name = format!("{binary_name}${simple}");
            let renamed = (self.map)(&binary_name)
                .and_then(|name| name.rsplit_once('$').map(|(_, tail)| tail.to_owned()))
                .unwrap_or(simple);
            self.out.push_str(&renamed);
            self.type_arguments()?;
        }
        self.expect(b';')
    }

    fn type_arguments(&mut self) -> Result<(), DescriptorError> {
        if self.peek() != Some(b'<') {
            return Ok(());
        }
        self.copy_byte();
        while self.peek().is_some_and(|byte| byte != b'>') {
            match self.peek() {
                Some(b'*') => self.copy_byte(),
                Some(b'+' | b'-') => {
                    self.copy_byte();
                    self.type_signature()?;
                }
                _ => self.type_signature()?,
            }
        }
        self.expect(b'>')
    }

    fn identifier(&mut self) -> Result<String, DescriptorError> {
        let start = self.index;
        while self
            .peek()
            .is_some_and(|byte| !matches!(byte, b'<' | b'.' | b';'))
        {
            self.index += 1;
        }
        if self.index == start {
            return Err(self.error());
        }
        self.source
            .get(start..self.index)
            .map(str::to_owned)
            .ok_or_else(|| self.error())
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    fn copy_byte(&mut self) {
        if let Some(byte) = self.peek().filter(u8::is_ascii) {
            self.out.push(char::from(byte));
            self.index += 1;
        }
    }

    fn expect(&mut self, expected: u8) -> Result<(), DescriptorError> {
        if self.peek() == Some(expected) {
            self.copy_byte();
            Ok(())
        } else {
            Err(self.error())
        }
    }

    fn push_slice(&mut self, start: usize, end: usize) -> Result<(), DescriptorError> {
        let slice = self.source.get(start..end).ok_or_else(|| self.error())?;
        self.out.push_str(slice);
        Ok(())
    }

    fn error(&self) -> DescriptorError {
        error(self.source, self.index)
    }
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes
        .iter()
        .skip(from)
        .position(|byte| *byte == needle)
        .map(|offset| from + offset)
}

fn error(value: &str, offset: usize) -> DescriptorError {
    DescriptorError {
        value: value.to_owned(),
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn rename(name: &str) -> Option<String> {
        match name {
            "a/Outer" => Some("b/Renamed".to_owned()),
            "a/Outer$Inner" => Some("b/Renamed$Nested".to_owned()),
            "a/Value" => Some("b/Val".to_owned()),
            _ => None,
        }
    }

    #[rstest]
    #[case("I", "I")]
    #[case("La/Value;", "Lb/Val;")]
    #[case("[[La/Value;", "[[Lb/Val;")]
    #[case("(La/Value;Ljava/lang/String;)La/Outer;", "(Lb/Val;Ljava/lang/String;)Lb/Renamed;")]
    fn maps_descriptors(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(map_descriptor(input, rename).expect("valid"), expected);
    }

    #[rstest]
    fn unterminated_class_is_rejected() {
        assert!(map_descriptor("(La/Value", rename).is_err());
    }

    #[rstest]
    fn maps_array_class_constant_names() {
        assert_eq!(map_type_name("[La/Value;", rename).expect("valid"), "[Lb/Val;");
        assert_eq!(map_type_name("a/Value", rename).expect("valid"), "b/Val");
        assert_eq!(map_type_name("java/lang/Object", rename).expect("valid"), "java/lang/Object");
    }

    #[rstest]
    #[case("Ljava/util/List<La/Value;>;", "Ljava/util/List<Lb/Val;>;")]
    #[case(
        "<L:La/Value;>Ljava/lang/Object;Ljava/lang/Comparable<TL;>;",
        "<L:Lb/Val;>Ljava/lang/Object;Ljava/lang/Comparable<TL;>;"
    )]
    #[case(
        "<T:Ljava/lang/Object;>(TT;Ljava/util/Map<+La/Value;*>;)La/Outer<TT;>.Inner;^La/Value;",
        "<T:Ljava/lang/Object;>(TT;Ljava/util/Map<+Lb/Val;*>;)Lb/Renamed<TT;>.Nested;^Lb/Val;"
    )]
    #[case("<K::Ljava/lang/Comparable<TK;>;>Ljava/lang/Object;", "<K::Ljava/lang/Comparable<TK;>;>Ljava/lang/Object;")]
    fn maps_signatures(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(map_signature(input, rename).expect("valid"), expected);
    }

    #[rstest]
    fn referenced_classes_lists_every_class() {
        let names = referenced_classes("(La/Value;[Ljava/lang/String;)V").expect("valid");
        assert_eq!(names, vec!["a/Value".to_owned(), "java/lang/String".to_owned()]);
    }

    #[rstest]
    #[case("I", true)]
    #[case("[[Ljava/lang/String;", true)]
    #[case("L;", false)]
    #[case("V", false)]
    #[case("II", false)]
    fn validates_field_descriptors(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(is_field_descriptor(value), valid);
    }

    #[rstest]
    #[case("()V", true)]
    #[case("(IJ[La/B;)La/C;", true)]
    #[case("()VV", false)]
    #[case("(V)V", false)]
    fn validates_method_descriptors(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(is_method_descriptor(value), valid);
    }
}
