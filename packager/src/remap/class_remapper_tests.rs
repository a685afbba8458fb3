//! Unit tests for single-class remapping.

use super::*;
use crate::jar::JarContents;
use crate::test_utils::ClassBuilder;
use rstest::{fixture, rstest};

#[fixture]
fn table() -> MappingTable {
    MappingTable::builder("named", "intermediary")
        .class("a/Tree", "net/minecraft/class_1")
        .class("a/Outer", "net/minecraft/class_2")
        .class("a/Outer$Inner", "net/minecraft/class_2$class_3")
        .class("a/Marker", "net/minecraft/class_4")
        .method("a/Tree", "fall", "()V", "method_10")
        .method("a/Action", "run", "()V", "method_11")
        .field("a/Tree", "height", "I", "field_20")
        .build()
}

#[fixture]
fn index() -> ClassIndex {
    let jar: JarContents = [
        (
            "a/Tree.class".to_owned(),
            ClassBuilder::new("a/Tree", Some("java/lang/Object"))
                .field("height", "I")
                .method("fall", "()V")
                .build(),
        ),
        (
            "a/Leaf.class".to_owned(),
            ClassBuilder::new("a/Leaf", Some("a/Tree")).build(),
        ),
    ]
    .into_iter()
    .collect();
    let mut index = ClassIndex::new();
    index.add_jar(&jar).expect("valid classes");
    index
}

fn member_refs(class: &ClassFile) -> Vec<(String, String, String)> {
    class
        .pool
        .iter()
        .filter_map(|(_, constant)| match constant {
            Constant::FieldRef {
                class: owner,
                name_and_type,
            }
            | Constant::MethodRef {
                class: owner,
                name_and_type,
            } => Some((*owner, *name_and_type)),
            _ => None,
        })
        .map(|(owner, nat)| {
            let (name, descriptor) = class.pool.name_and_type(nat).expect("nat");
            (
                class.pool.class_name(owner).expect("owner").into_owned(),
                name.into_owned(),
                descriptor.into_owned(),
            )
        })
        .collect()
}

fn member_names(class: &ClassFile, members: &[Member]) -> Vec<String> {
    members
        .iter()
        .map(|member| class.pool.utf8(member.name).expect("name").into_owned())
        .collect()
}

#[rstest]
fn renames_classes_and_inherited_member_references(table: MappingTable, index: ClassIndex) {
    let bytes = ClassBuilder::new("a/Leaf", Some("a/Tree"))
        .method("fall", "()V")
        .method_ref("a/Leaf", "fall", "()V")
        .field_ref("a/Leaf", "height", "I")
        .method_ref("a/Leaf", "<init>", "(La/Tree;)V")
        .build();

    let remapped = ClassRemapper::new(&table, &index)
        .remap(&bytes)
        .expect("remap");
    assert!(!remapped.renamed());

    let class = ClassFile::parse(&remapped.bytes).expect("valid output");
    assert_eq!(
        class.super_name().expect("super").as_deref(),
        Some("net/minecraft/class_1")
    );
    assert_eq!(member_names(&class, &class.methods), vec!["method_10"]);
    assert_eq!(
        member_refs(&class),
        vec![
            ("a/Leaf".to_owned(), "method_10".to_owned(), "()V".to_owned()),
            ("a/Leaf".to_owned(), "field_20".to_owned(), "I".to_owned()),
            (
                "a/Leaf".to_owned(),
                "<init>".to_owned(),
                "(Lnet/minecraft/class_1;)V".to_owned()
            ),
        ]
    );
}

#[rstest]
fn renames_declared_members_of_mapped_classes(table: MappingTable, index: ClassIndex) {
    let bytes = ClassBuilder::new("a/Tree", Some("java/lang/Object"))
        .field("height", "I")
        .method("fall", "()V")
        .build();

    let remapped = ClassRemapper::new(&table, &index)
        .remap(&bytes)
        .expect("remap");
    assert!(remapped.renamed());
    assert_eq!(remapped.name, "net/minecraft/class_1");

    let class = ClassFile::parse(&remapped.bytes).expect("valid output");
    assert_eq!(member_names(&class, &class.fields), vec!["field_20"]);
    assert_eq!(member_names(&class, &class.methods), vec!["method_10"]);
}

#[rstest]
fn leaves_string_literals_sharing_a_class_name_alone(table: MappingTable, index: ClassIndex) {
    let bytes = ClassBuilder::new("a/Tree", Some("java/lang/Object"))
        .string_constant("a/Tree")
        .build();

    let remapped = ClassRemapper::new(&table, &index)
        .remap(&bytes)
        .expect("remap");
    let class = ClassFile::parse(&remapped.bytes).expect("valid output");
    let literal = class
        .pool
        .iter()
        .find_map(|(_, constant)| match constant {
            Constant::String(index) => Some(*index),
            _ => None,
        })
        .expect("string constant");
    assert_eq!(class.pool.utf8(literal).expect("utf8"), "a/Tree");
    assert_eq!(class.name().expect("name"), "net/minecraft/class_1");
}

#[rstest]
fn rewrites_signatures_annotations_and_local_variables(table: MappingTable, index: ClassIndex) {
    let bytes = ClassBuilder::new("b/Grove", Some("java/lang/Object"))
        .signature("Ljava/lang/Object;Ljava/util/function/Supplier<La/Tree;>;")
        .annotation("La/Marker;")
        .method_with_local("plant", "()V", "tree", "La/Tree;")
        .build();

    let remapped = ClassRemapper::new(&table, &index)
        .remap(&bytes)
        .expect("remap");
    let class = ClassFile::parse(&remapped.bytes).expect("valid output");

    let attribute_value = |name: &str, offset: usize| -> String {
        let attribute = class
            .attributes
            .iter()
            .find(|attribute| class.attribute_name(attribute).expect("name") == name)
            .expect("attribute present");
        let bytes = attribute.data.get(offset..offset + 2).expect("index bytes");
        let index = u16::from_be_bytes([bytes[0], bytes[1]]);
        class.pool.utf8(index).expect("utf8").into_owned()
    };
    assert_eq!(
        attribute_value("Signature", 0),
        "Ljava/lang/Object;Ljava/util/function/Supplier<Lnet/minecraft/class_1;>;"
    );
    assert_eq!(
        attribute_value("RuntimeVisibleAnnotations", 2),
        "Lnet/minecraft/class_4;"
    );

    let method = class.methods.first().expect("method");
    let code = method.attributes.first().expect("code");
    // max_stack, max_locals, code_length, one opcode, handler count,
    // attribute count, LVT header, then start_pc, length and name.
    let offset = 2 + 2 + 4 + 1 + 2 + 2 + 6 + 2 + 2 + 2 + 2;
    let bytes = code.data.get(offset..offset + 2).expect("descriptor index");
    let descriptor = class
        .pool
        .utf8(u16::from_be_bytes([bytes[0], bytes[1]]))
        .expect("utf8");
    assert_eq!(descriptor, "Lnet/minecraft/class_1;");
}

#[rstest]
fn rewrites_type_annotations(table: MappingTable, index: ClassIndex) {
    let bytes = ClassBuilder::new("b/User", Some("java/lang/Object"))
        .extends_type_annotation("La/Marker;")
        .build();

    let remapped = ClassRemapper::new(&table, &index)
        .remap(&bytes)
        .expect("remap");
    let class = ClassFile::parse(&remapped.bytes).expect("valid output");
    let attribute = class
        .attributes
        .iter()
        .find(|attribute| {
            class.attribute_name(attribute).expect("name") == "RuntimeVisibleTypeAnnotations"
        })
        .expect("type annotations");
    // count, target_type, supertype_index, type_path length.
    let offset = 2 + 1 + 2 + 1;
    let bytes = attribute.data.get(offset..offset + 2).expect("type index");
    let descriptor = class
        .pool
        .utf8(u16::from_be_bytes([bytes[0], bytes[1]]))
        .expect("utf8");
    assert_eq!(descriptor, "Lnet/minecraft/class_4;");
}

#[rstest]
fn unknown_type_annotation_targets_are_malformed(table: MappingTable, index: ClassIndex) {
    let mut class = ClassFile::parse(
        &ClassBuilder::new("b/User", Some("java/lang/Object"))
            .extends_type_annotation("La/Marker;")
            .build(),
    )
    .expect("valid class");
    let attribute = class.attributes.last_mut().expect("type annotations");
    if let Some(target_type) = attribute.data.get_mut(2) {
        *target_type = 0x30;
    }
    let bytes = class.to_bytes().expect("encodable");

    let err = ClassRemapper::new(&table, &index)
        .remap(&bytes)
        .expect_err("unknown target");
    assert!(matches!(
        err,
        ClassRemapError::Attribute { ref attribute, .. } if attribute == "RuntimeVisibleTypeAnnotations"
    ));
}

#[rstest]
fn renames_lambda_implementations_through_the_interface(table: MappingTable, index: ClassIndex) {
    let bytes = ClassBuilder::new("b/Grove", Some("java/lang/Object"))
        .lambda("a/Action", "run", "()V")
        .build();

    let remapped = ClassRemapper::new(&table, &index)
        .remap(&bytes)
        .expect("remap");
    let class = ClassFile::parse(&remapped.bytes).expect("valid output");
    let call_site = class
        .pool
        .iter()
        .find_map(|(_, constant)| match constant {
            Constant::InvokeDynamic { name_and_type, .. } => Some(*name_and_type),
            _ => None,
        })
        .expect("call site");
    let (name, descriptor) = class.pool.name_and_type(call_site).expect("nat");
    assert_eq!(name, "method_11");
    assert_eq!(descriptor, "()La/Action;");
}

#[rstest]
fn renames_inner_class_simple_names(table: MappingTable, index: ClassIndex) {
    let bytes = ClassBuilder::new("a/Outer", Some("java/lang/Object"))
        .inner_class("a/Outer$Inner", "a/Outer", "Inner")
        .build();

    let remapped = ClassRemapper::new(&table, &index)
        .remap(&bytes)
        .expect("remap");
    let class = ClassFile::parse(&remapped.bytes).expect("valid output");
    let attribute = class.attributes.first().expect("InnerClasses");
    let bytes = attribute.data.get(6..8).expect("simple name index");
    let simple = class
        .pool
        .utf8(u16::from_be_bytes([bytes[0], bytes[1]]))
        .expect("utf8");
    assert_eq!(simple, "class_3");
}

#[rstest]
fn identity_tables_leave_classes_unchanged(index: ClassIndex) {
    let bytes = ClassBuilder::new("a/Tree", Some("java/lang/Object"))
        .method("fall", "()V")
        .method_ref("a/Tree", "fall", "()V")
        .build();
    let identity = MappingTable::identity("named");
    let remapped = ClassRemapper::new(&identity, &index)
        .remap(&bytes)
        .expect("remap");
    assert_eq!(remapped.bytes, bytes);
}

#[rstest]
#[case("x/O$In", Some("x/O"), "In")]
#[case("x/Foo$Bar", None, "Bar")]
#[case("x/Renamed", Some("y/Other"), "Renamed")]
fn derives_simple_names(#[case] inner: &str, #[case] outer: Option<&str>, #[case] expected: &str) {
    assert_eq!(simple_name(inner, outer), expected);
}
