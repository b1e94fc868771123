use std::sync::Arc;

use classdex_classfile::ImplicitKind;
use classdex_core::flags::{
    ACC_ENUM, ACC_FINAL, ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC, ACC_SUPER,
};
use classdex_core::{DotName, NameTable};
use classdex_index::{parse, parse_with, ClassKind, ErrorKind, Indexer, IndexerConfig, NestingType};
use classdex_test_utils::{
    capture_logs, AnnotationSpec, AttributeSpec, ClassFileBuilder, InnerClassSpec, MemberSpec,
    RecordComponentSpec,
};
use classdex_types::Type;
use pretty_assertions::assert_eq;

fn name(value: &str) -> DotName {
    DotName::simple(value)
}

fn outer_with_member(flags: u16) -> AttributeSpec {
    AttributeSpec::InnerClasses(vec![InnerClassSpec::member(
        "com/example/Outer$Inner",
        "com/example/Outer",
        "Inner",
        flags,
    )])
}

#[test]
fn members_keep_class_file_order() {
    let mut builder = ClassFileBuilder::new("com/example/Wide");
    for i in (0..257).rev() {
        builder = builder.field(MemberSpec::new(ACC_PRIVATE, &format!("f{i:03}"), "I"));
    }
    let record = parse(&builder.build()).unwrap();
    let info = &record.info;

    assert_eq!(info.fields.len(), 257);
    assert_eq!(info.fields[0].name, "f256");
    assert_eq!(info.fields[256].name, "f000");

    let sorted = info.fields_sorted();
    assert_eq!(sorted[0].name, "f000");
    assert_eq!(sorted[128].name, "f128");
    assert_eq!(sorted[256].name, "f256");
    assert_eq!(info.field("f100").map(|f| f.ty.to_string()).as_deref(), Some("int"));
}

#[test]
fn repeated_member_entries_are_listed_once_in_declared_order() {
    let member = |simple: &str| {
        InnerClassSpec::member(
            &format!("com/example/Outer${simple}"),
            "com/example/Outer",
            simple,
            ACC_PUBLIC | ACC_STATIC,
        )
    };
    let outer = parse(
        &ClassFileBuilder::new("com/example/Outer")
            .attribute(AttributeSpec::InnerClasses(vec![
                member("Zeta"),
                member("Alpha"),
                member("Zeta"),
                member("Alpha"),
            ]))
            .build(),
    )
    .unwrap()
    .info;

    assert_eq!(
        outer.member_classes,
        vec![name("com.example.Outer$Zeta"), name("com.example.Outer$Alpha")]
    );
}

#[test]
fn nesting_is_classified() {
    let outer = parse(
        &ClassFileBuilder::new("com/example/Outer")
            .attribute(outer_with_member(ACC_PUBLIC | ACC_STATIC))
            .build(),
    )
    .unwrap()
    .info;
    assert_eq!(outer.nesting, NestingType::TopLevel);
    assert_eq!(outer.simple_name.as_deref(), Some("Outer"));
    assert_eq!(outer.member_classes, vec![name("com.example.Outer$Inner")]);

    let member = parse(
        &ClassFileBuilder::new("com/example/Outer$Inner")
            .access(ACC_SUPER)
            .attribute(outer_with_member(ACC_PUBLIC | ACC_STATIC))
            .build(),
    )
    .unwrap()
    .info;
    assert_eq!(member.nesting, NestingType::Inner);
    assert_eq!(member.simple_name.as_deref(), Some("Inner"));
    assert_eq!(member.enclosing_class, Some(name("com.example.Outer")));
    // The InnerClasses entry carries the source-level modifiers.
    assert_eq!(member.flags, ACC_PUBLIC | ACC_STATIC);

    let local = parse(
        &ClassFileBuilder::new("com/example/Outer$1Helper")
            .attribute(AttributeSpec::InnerClasses(vec![InnerClassSpec::local(
                "com/example/Outer$1Helper",
                "Helper",
                0,
            )]))
            .attribute(AttributeSpec::EnclosingMethod {
                class: "com/example/Outer".to_string(),
                method: Some(("run".to_string(), "(Ljava/lang/String;I)V".to_string())),
            })
            .build(),
    )
    .unwrap()
    .info;
    assert_eq!(local.nesting, NestingType::Local);
    assert_eq!(local.simple_name.as_deref(), Some("Helper"));
    assert_eq!(local.enclosing_class, Some(name("com.example.Outer")));
    let enclosing = local.enclosing_method.as_ref().unwrap();
    assert_eq!(enclosing.name, "run");
    let parameters: Vec<String> = enclosing.parameter_types().iter().map(Type::to_string).collect();
    assert_eq!(parameters, vec!["java.lang.String", "int"]);

    let anonymous = parse(
        &ClassFileBuilder::new("com/example/Outer$1")
            .attribute(AttributeSpec::InnerClasses(vec![InnerClassSpec::anonymous(
                "com/example/Outer$1",
                0,
            )]))
            .attribute(AttributeSpec::EnclosingMethod {
                class: "com/example/Outer".to_string(),
                method: None,
            })
            .build(),
    )
    .unwrap()
    .info;
    assert_eq!(anonymous.nesting, NestingType::Anonymous);
    assert_eq!(anonymous.simple_name, None);
    assert_eq!(anonymous.enclosing_class, Some(name("com.example.Outer")));
    assert!(anonymous.enclosing_method.is_none());
}

#[test]
fn binary_names_find_nested_classes() {
    let mut indexer = Indexer::new();
    indexer
        .index_bytes(
            &ClassFileBuilder::new("com/example/Outer$Inner")
                .attribute(outer_with_member(ACC_PUBLIC | ACC_STATIC))
                .build(),
        )
        .unwrap();
    let index = indexer.complete();

    let inner = index.get_class_by_binary_name("com.example.Outer$Inner").unwrap();
    assert_eq!(inner.simple_name.as_deref(), Some("Inner"));
    assert!(index.get_class_by_binary_name("com.example.Outer").is_none());
}

fn color_enum() -> Vec<u8> {
    ClassFileBuilder::new("com/example/Color")
        .access(ACC_PUBLIC | ACC_FINAL | ACC_SUPER | ACC_ENUM)
        .super_class(Some("java/lang/Enum"))
        .signature("Ljava/lang/Enum<Lcom/example/Color;>;")
        .field(MemberSpec::new(
            ACC_PUBLIC | ACC_STATIC | ACC_FINAL | ACC_ENUM,
            "RED",
            "Lcom/example/Color;",
        ))
        .build()
}

#[test]
fn enums_get_their_implicit_methods() {
    let info = parse(&color_enum()).unwrap().info;
    assert_eq!(info.kind(), ClassKind::Enum);
    assert_eq!(
        info.super_class_type.as_ref().map(Type::to_string).as_deref(),
        Some("java.lang.Enum<com.example.Color>")
    );
    assert!(info.field("RED").unwrap().is_enum_constant());

    let values = info.first_method("values").unwrap();
    assert!(values.synthesized);
    assert_eq!(values.implicit, Some(ImplicitKind::EnumValues));
    assert_eq!(values.return_type.to_string(), "com.example.Color[]");
    assert!(values.receiver_type.is_none());

    let value_of = info.first_method("valueOf").unwrap();
    assert_eq!(value_of.implicit, Some(ImplicitKind::EnumValueOf));
    assert_eq!(value_of.parameter_name(0), Some("name"));
    assert_eq!(value_of.parameter_types[0].to_string(), "java.lang.String");
}

#[test]
fn implicit_members_can_be_left_out() {
    let config = IndexerConfig {
        synthesize_implicit_members: false,
        ..IndexerConfig::default()
    };
    let record = parse_with(&color_enum(), &config, &mut NameTable::new()).unwrap();
    assert!(record.info.methods.is_empty());
}

#[test]
fn records_get_accessors_and_a_canonical_constructor() {
    let bytes = ClassFileBuilder::new("com/example/Point")
        .access(ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .super_class(Some("java/lang/Record"))
        .field(MemberSpec::new(ACC_PRIVATE | ACC_FINAL, "x", "I"))
        .field(MemberSpec::new(ACC_PRIVATE | ACC_FINAL, "y", "I"))
        .attribute(AttributeSpec::Record(vec![
            RecordComponentSpec::new("x", "I"),
            RecordComponentSpec::new("y", "I"),
        ]))
        .build();
    let info = parse(&bytes).unwrap().info;
    assert_eq!(info.kind(), ClassKind::Record);

    let x = info.record_component("x").unwrap();
    assert_eq!(x.ty.to_string(), "int");
    assert_eq!(x.field(&info).map(|f| f.flags), Some(ACC_PRIVATE | ACC_FINAL));
    let accessor = x.accessor(&info).unwrap();
    assert_eq!(accessor.implicit, Some(ImplicitKind::RecordAccessor));
    assert_eq!(accessor.return_type.to_string(), "int");

    let ctor = info.method("<init>", "(II)V").unwrap();
    assert_eq!(ctor.implicit, Some(ImplicitKind::RecordCanonicalConstructor));
    assert_eq!(ctor.flags, ACC_PUBLIC);
    assert_eq!(ctor.parameter_name(0), Some("x"));
    assert_eq!(ctor.parameter_name(1), Some("y"));
    assert!(!info.has_no_args_constructor());
}

#[test]
fn recursive_bounds_point_back_at_their_declaration() {
    let bytes = ClassFileBuilder::new("com/example/Box")
        .signature("<T::Ljava/lang/Comparable<TT;>;>Ljava/lang/Object;")
        .field(MemberSpec::new(ACC_PRIVATE, "value", "Ljava/lang/Comparable;").signature("TT;"))
        .build();
    let info = parse(&bytes).unwrap().info;
    let t = &info.type_parameters[0];

    assert_eq!(t.identifier, "T");
    assert_eq!(t.bounds[0].to_string(), "java.lang.Comparable<T>");
    let Type::Parameterized(bound) = &t.bounds[0] else { panic!("{:?}", t.bounds[0]) };
    let back = bound.arguments[0].as_type_variable().unwrap();
    assert!(Arc::ptr_eq(&back, t));

    let field = info.field("value").unwrap();
    assert!(Arc::ptr_eq(&field.ty.as_type_variable().unwrap(), t));
}

#[test]
fn inner_classes_see_type_variables_of_their_outer_class() {
    let inner = ClassFileBuilder::new("com/example/Outer$Inner")
        .access(ACC_SUPER)
        .attribute(outer_with_member(0))
        .field(MemberSpec::new(0, "value", "Ljava/lang/Object;").signature("TT;"))
        .build();
    let outer = ClassFileBuilder::new("com/example/Outer")
        .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
        .attribute(outer_with_member(0))
        .build();

    let alone = parse(&inner).unwrap().info;
    assert!(matches!(alone.fields[0].ty, Type::UnresolvedTypeVariable(_)));

    let mut indexer = Indexer::new();
    indexer.index_bytes(&inner).unwrap();
    indexer.index_bytes(&outer).unwrap();
    let index = indexer.complete();

    let outer = index.get(&name("com.example.Outer")).unwrap();
    let inner = index.get(&name("com.example.Outer$Inner")).unwrap();
    let resolved = inner.field("value").unwrap().ty.as_type_variable().unwrap();
    assert!(Arc::ptr_eq(&resolved, &outer.type_parameters[0]));
}

#[test]
fn local_classes_see_type_variables_of_their_method() {
    let host = ClassFileBuilder::new("com/example/Host")
        .method(
            MemberSpec::new(ACC_PUBLIC, "run", "(Ljava/lang/Object;)V").signature("<M:Ljava/lang/Object;>(TM;)V"),
        )
        .build();
    let local = ClassFileBuilder::new("com/example/Host$1Local")
        .access(ACC_SUPER)
        .attribute(AttributeSpec::InnerClasses(vec![InnerClassSpec::local(
            "com/example/Host$1Local",
            "Local",
            0,
        )]))
        .attribute(AttributeSpec::EnclosingMethod {
            class: "com/example/Host".to_string(),
            method: Some(("run".to_string(), "(Ljava/lang/Object;)V".to_string())),
        })
        .field(MemberSpec::new(0, "item", "Ljava/lang/Object;").signature("TM;"))
        .build();

    let mut indexer = Indexer::new();
    indexer.index_bytes(&host).unwrap();
    indexer.index_bytes(&local).unwrap();
    let index = indexer.complete();

    let run = index
        .get(&name("com.example.Host"))
        .and_then(|host| host.method("run", "(Ljava/lang/Object;)V"))
        .unwrap();
    let local = index.get(&name("com.example.Host$1Local")).unwrap();
    let item = local.field("item").unwrap().ty.as_type_variable().unwrap();
    assert!(Arc::ptr_eq(&item, &run.type_parameters[0]));
}

#[test]
fn enclosing_type_variables_can_stay_unresolved() {
    let inner = ClassFileBuilder::new("com/example/Outer$Inner")
        .attribute(outer_with_member(0))
        .field(MemberSpec::new(0, "value", "Ljava/lang/Object;").signature("TT;"))
        .build();
    let outer = ClassFileBuilder::new("com/example/Outer")
        .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
        .build();

    let mut indexer = Indexer::with_config(IndexerConfig {
        resolve_enclosing_type_variables: false,
        ..IndexerConfig::default()
    });
    indexer.index_bytes(&inner).unwrap();
    indexer.index_bytes(&outer).unwrap();
    let index = indexer.complete();

    let field = &index.get(&name("com.example.Outer$Inner")).unwrap().fields[0];
    assert!(matches!(field.ty, Type::UnresolvedTypeVariable(_)));
    assert_eq!(field.ty.to_string(), "T");
}

#[test]
fn invisible_annotations_are_optional() {
    let bytes = ClassFileBuilder::new("com/example/Marked")
        .annotation(AnnotationSpec::new("Lcom/example/Shown;"))
        .invisible_annotation(AnnotationSpec::new("Lcom/example/Hidden;"))
        .build();

    let info = parse(&bytes).unwrap().info;
    let hidden = info.declared_annotation(&name("com.example.Hidden")).unwrap();
    assert!(!hidden.runtime_visible);
    assert!(info.declared_annotation(&name("com.example.Shown")).unwrap().runtime_visible);

    let mut indexer = Indexer::with_config(IndexerConfig {
        invisible_annotations: false,
        ..IndexerConfig::default()
    });
    indexer.index_bytes(&bytes).unwrap();
    let index = indexer.complete();
    let marked = index.get(&name("com.example.Marked")).unwrap();
    assert_eq!(marked.declared_annotations().count(), 1);
    assert!(index.get_annotations(&name("com.example.Hidden")).is_empty());
}

#[test]
fn broken_input_is_reported() {
    let bytes = ClassFileBuilder::new("com/example/Cut")
        .field(MemberSpec::new(ACC_PRIVATE, "count", "I"))
        .build();
    let err = parse(&bytes[..bytes.len() / 2]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);

    let future = ClassFileBuilder::new("com/example/Future").version(70, 0).build();
    assert_eq!(parse(&future).unwrap_err().kind(), ErrorKind::UnsupportedVersion);

    let mut indexer = Indexer::new();
    assert!(indexer.index_bytes(&future).is_err());
    assert!(indexer.is_empty());
}

#[test]
fn unparseable_signatures_are_logged() {
    let bytes = ClassFileBuilder::new("com/example/Broken")
        .field(MemberSpec::new(ACC_PRIVATE, "items", "Ljava/util/List;").signature("Ljava/util/List<"))
        .build();
    let (record, logs) = capture_logs(|| parse(&bytes).unwrap());

    assert_eq!(record.info.fields[0].ty.to_string(), "java.util.List");
    assert!(logs.contains("classdex.index"), "{logs}");
    assert!(logs.contains("unparseable signature, using the descriptor"), "{logs}");
}
