use classdex_core::flags::{ACC_PRIVATE, ACC_PUBLIC};
use classdex_core::DotName;
use classdex_index::parse;
use classdex_test_utils::{
    capture_logs, AnnotationSpec, AttributeSpec, ClassFileBuilder, InnerClassSpec, MemberSpec,
    TypeAnnotationSpec,
};
use classdex_types::{AnnotationTarget, Type, TypeUsage};
use pretty_assertions::assert_eq;

fn ann(simple: &str) -> AnnotationSpec {
    AnnotationSpec::new(&format!("Lcom/example/{simple};"))
}

fn names(ty: &Type) -> Vec<String> {
    ty.annotations().iter().map(|a| a.name.to_string()).collect()
}

#[test]
fn array_dimensions_take_their_own_annotations() {
    let bytes = ClassFileBuilder::new("com/example/Grid")
        .field(
            MemberSpec::new(ACC_PRIVATE, "cells", "[[[[I")
                .type_annotation(TypeAnnotationSpec::field(ann("A")).array()),
        )
        .build();
    let info = parse(&bytes).unwrap().info;
    let cells = info.field("cells").unwrap();

    assert_eq!(cells.ty.to_string(), "int[] @com.example.A [][][]");
    assert_eq!(cells.ty.to_plain_string(), "int[][][][]");
    assert_eq!(cells.annotations.len(), 1);
    assert!(matches!(
        &cells.annotations[0].target,
        Some(AnnotationTarget::Type { usage: TypeUsage::Field, .. })
    ));
}

#[test]
fn declaration_and_type_annotations_are_told_apart() {
    let bytes = ClassFileBuilder::new("com/example/Person")
        .field(
            MemberSpec::new(ACC_PRIVATE, "name", "Ljava/lang/String;")
                .annotation(ann("Column"))
                .type_annotation(TypeAnnotationSpec::field(ann("NonEmpty"))),
        )
        .build();
    let info = parse(&bytes).unwrap().info;
    let name = info.field("name").unwrap();

    assert_eq!(name.annotations.len(), 2);
    let declared: Vec<String> = name.declared_annotations().map(|a| a.name.to_string()).collect();
    assert_eq!(declared, vec!["com.example.Column"]);
    assert_eq!(names(&name.ty), vec!["com.example.NonEmpty"]);
}

#[test]
fn paths_reach_into_nested_type_arguments() {
    let bytes = ClassFileBuilder::new("com/example/Queues")
        .field(
            MemberSpec::new(ACC_PRIVATE, "queues", "Ljava/util/List;")
                .signature(
                    "Ljava/util/List<Ljava/util/Queue<Ljava/util/Map<Ljava/lang/String;+Ljava/lang/Number;>;>;>;",
                )
                .type_annotation(
                    TypeAnnotationSpec::field(ann("W"))
                        .type_argument(0)
                        .type_argument(0)
                        .type_argument(1)
                        .wildcard(),
                ),
        )
        .build();
    let info = parse(&bytes).unwrap().info;

    assert_eq!(
        info.field("queues").unwrap().ty.to_string(),
        "java.util.List<java.util.Queue<java.util.Map<java.lang.String, ? extends @com.example.W java.lang.Number>>>"
    );
}

#[test]
fn method_type_parameters_and_bounds() {
    let bytes = ClassFileBuilder::new("com/example/Picker")
        .method(
            MemberSpec::new(ACC_PUBLIC, "pick", "(Ljava/lang/Comparable;)Ljava/lang/Comparable;")
                .signature("<T::Ljava/lang/Comparable<TT;>;>(TT;)TT;")
                .type_annotation(TypeAnnotationSpec::method_type_parameter(0, ann("P")))
                .type_annotation(TypeAnnotationSpec::method_type_parameter_bound(0, 1, ann("B"))),
        )
        .build();
    let info = parse(&bytes).unwrap().info;
    let pick = info.first_method("pick").unwrap();
    let t = &pick.type_parameters[0];

    let on_declaration: Vec<String> = t.annotations.iter().map(|a| a.name.to_string()).collect();
    assert_eq!(on_declaration, vec!["com.example.P"]);
    assert_eq!(t.bounds[0].to_string(), "@com.example.B java.lang.Comparable<T>");
    assert_eq!(pick.annotations.len(), 2);
    assert!(pick.annotations.iter().any(|a| matches!(
        &a.target,
        Some(AnnotationTarget::Type {
            usage: TypeUsage::TypeParameterBound { position: 0, bound: 1 },
            ..
        })
    )));
}

#[test]
fn method_types_take_their_annotations() {
    let bytes = ClassFileBuilder::new("com/example/Service")
        .method(
            MemberSpec::new(ACC_PUBLIC, "call", "(Ljava/util/List;)Ljava/lang/String;")
                .signature("(Ljava/util/List<Ljava/lang/String;>;)Ljava/lang/String;")
                .attribute(AttributeSpec::Exceptions(vec!["java/io/IOException".to_string()]))
                .type_annotation(TypeAnnotationSpec::formal_parameter(0, ann("F")).type_argument(0))
                .type_annotation(TypeAnnotationSpec::return_type(ann("R")))
                .type_annotation(TypeAnnotationSpec::receiver(ann("Rc")))
                .type_annotation(TypeAnnotationSpec::throws(0, ann("X"))),
        )
        .build();
    let info = parse(&bytes).unwrap().info;
    let call = info.first_method("call").unwrap();

    assert_eq!(
        call.parameter_types[0].to_string(),
        "java.util.List<@com.example.F java.lang.String>"
    );
    assert_eq!(call.return_type.to_string(), "@com.example.R java.lang.String");
    assert_eq!(
        call.receiver_type.as_ref().map(Type::to_string).as_deref(),
        Some("@com.example.Rc com.example.Service")
    );
    assert_eq!(call.exceptions[0].to_string(), "@com.example.X java.io.IOException");

    let parameter = &call.parameters()[0];
    assert_eq!(parameter.annotations.len(), 1);
    assert_eq!(parameter.annotations[0].name, DotName::simple("com.example.F"));
}

#[test]
fn nested_steps_walk_from_the_outer_class() {
    let bytes = ClassFileBuilder::new("com/example/Holder")
        .attribute(AttributeSpec::InnerClasses(vec![InnerClassSpec::member(
            "com/example/Outer$Inner",
            "com/example/Outer",
            "Inner",
            0,
        )]))
        .field(
            MemberSpec::new(ACC_PRIVATE, "inner", "Lcom/example/Outer$Inner;")
                .type_annotation(TypeAnnotationSpec::field(ann("OnOuter")))
                .type_annotation(TypeAnnotationSpec::field(ann("OnInner")).nested()),
        )
        .build();
    let info = parse(&bytes).unwrap().info;

    assert_eq!(
        info.field("inner").unwrap().ty.to_string(),
        "@com.example.OnOuter com.example.Outer.@com.example.OnInner Inner"
    );
}

#[test]
fn annotations_that_do_not_fit_are_dropped() {
    let bytes = ClassFileBuilder::new("com/example/Counter")
        .field(
            MemberSpec::new(ACC_PRIVATE, "count", "I")
                .type_annotation(TypeAnnotationSpec::field(ann("A")).type_argument(0)),
        )
        .build();
    let (record, logs) = capture_logs(|| parse(&bytes).unwrap());
    let count = record.info.field("count").unwrap();

    assert!(count.annotations.is_empty());
    assert!(count.ty.annotations().is_empty());
    assert!(logs.contains("does not fit"), "{logs}");
}

#[test]
fn class_header_types_take_their_annotations() {
    let bytes = ClassFileBuilder::new("com/example/Impl")
        .super_class(Some("com/example/Base"))
        .interface("java/lang/Runnable")
        .signature("<T:Ljava/lang/Object;>Lcom/example/Base;Ljava/lang/Runnable;")
        .type_annotation(TypeAnnotationSpec::supertype(u16::MAX, ann("S")))
        .type_annotation(TypeAnnotationSpec::supertype(0, ann("I")))
        .type_annotation(TypeAnnotationSpec::class_type_parameter(0, ann("TP")))
        .build();
    let info = parse(&bytes).unwrap().info;

    assert_eq!(
        info.super_class_type.as_ref().map(Type::to_string).as_deref(),
        Some("@com.example.S com.example.Base")
    );
    assert_eq!(info.interface_types[0].to_string(), "@com.example.I java.lang.Runnable");
    let on_t: Vec<String> = info.type_parameters[0].annotations.iter().map(|a| a.name.to_string()).collect();
    assert_eq!(on_t, vec!["com.example.TP"]);

    let mut usages: Vec<String> = info
        .annotations
        .iter()
        .filter_map(|a| match &a.target {
            Some(AnnotationTarget::Type { usage, .. }) => Some(format!("{usage:?}")),
            _ => None,
        })
        .collect();
    usages.sort();
    assert_eq!(
        usages,
        vec![
            "Extends { position: 0 }",
            "Extends { position: 65535 }",
            "TypeParameter { position: 0 }",
        ]
    );
    assert_eq!(info.declared_annotations().count(), 0);
}

#[test]
fn old_class_files_have_no_type_annotations() {
    let bytes = ClassFileBuilder::new("com/example/Legacy")
        .version(51, 0)
        .field(
            MemberSpec::new(ACC_PRIVATE, "name", "Ljava/lang/String;")
                .type_annotation(TypeAnnotationSpec::field(ann("A"))),
        )
        .build();
    let info = parse(&bytes).unwrap().info;
    let name = info.field("name").unwrap();

    assert!(name.annotations.is_empty());
    assert_eq!(name.ty.to_string(), "java.lang.String");
}

#[test]
fn invisible_type_annotations_are_marked() {
    let bytes = ClassFileBuilder::new("com/example/Quiet")
        .field(
            MemberSpec::new(ACC_PRIVATE, "name", "Ljava/lang/String;")
                .invisible_type_annotation(TypeAnnotationSpec::field(ann("Checked"))),
        )
        .build();
    let info = parse(&bytes).unwrap().info;
    let name = info.field("name").unwrap();

    assert_eq!(names(&name.ty), vec!["com.example.Checked"]);
    assert!(!name.annotations[0].runtime_visible);
}
