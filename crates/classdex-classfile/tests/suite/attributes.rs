use classdex_classfile::{
    ClassFile, ConstValue, ElementValue, EnclosingMethod, InnerClassInfo, MethodParameter,
    TypeAnnotationTarget, TypePathKind,
};
use classdex_test_utils::{
    AnnotationSpec, AttributeSpec, ClassFileBuilder, ElementSpec, InnerClassSpec, MemberSpec,
    RecordComponentSpec, TypeAnnotationSpec,
};
use pretty_assertions::assert_eq;

#[test]
fn element_values_of_every_kind() {
    let annotation = AnnotationSpec::new("Lcom/example/Everything;")
        .with("b", ElementSpec::Byte(-3))
        .with("c", ElementSpec::Char(0xD800))
        .with("s", ElementSpec::Short(300))
        .with("i", ElementSpec::Int(7))
        .with("j", ElementSpec::Long(1 << 40))
        .with("f", ElementSpec::Float(1.5))
        .with("d", ElementSpec::Double(2.25))
        .with("z", ElementSpec::Boolean(true))
        .with("str", ElementSpec::String("hi\0there".to_string()))
        .with(
            "e",
            ElementSpec::Enum {
                type_descriptor: "Ljava/lang/annotation/RetentionPolicy;".to_string(),
                const_name: "RUNTIME".to_string(),
            },
        )
        .with("cls", ElementSpec::Class("[I".to_string()))
        .with(
            "nested",
            ElementSpec::Annotation(AnnotationSpec::new("Lcom/example/Inner;")),
        )
        .with(
            "arr",
            ElementSpec::Array(vec![ElementSpec::Int(1), ElementSpec::Int(2)]),
        );

    let bytes = ClassFileBuilder::new("com/example/Foo")
        .annotation(annotation)
        .build();
    let class = ClassFile::parse(&bytes).unwrap();

    let parsed = &class.runtime_visible_annotations[0];
    assert_eq!(parsed.type_internal_name(), Some("com/example/Everything"));
    let values: Vec<&ElementValue> = parsed.elements.iter().map(|(_, v)| v).collect();
    assert_eq!(values[0], &ElementValue::Const(ConstValue::Byte(-3)));
    assert_eq!(values[1], &ElementValue::Const(ConstValue::Char(0xD800)));
    assert_eq!(values[2], &ElementValue::Const(ConstValue::Short(300)));
    assert_eq!(values[4], &ElementValue::Const(ConstValue::Long(1 << 40)));
    assert_eq!(values[7], &ElementValue::Const(ConstValue::Boolean(true)));
    assert_eq!(
        values[8],
        &ElementValue::Const(ConstValue::String("hi\0there".to_string()))
    );
    assert_eq!(values[10], &ElementValue::Class("[I".to_string()));
    assert!(matches!(values[11], ElementValue::Annotation(inner) if inner.elements.is_empty()));
    assert_eq!(
        values[12],
        &ElementValue::Array(vec![
            ElementValue::Const(ConstValue::Int(1)),
            ElementValue::Const(ConstValue::Int(2)),
        ])
    );
}

#[test]
fn nesting_metadata() {
    let bytes = ClassFileBuilder::new("com/example/Outer$1Local")
        .attribute(AttributeSpec::InnerClasses(vec![
            InnerClassSpec::local("com/example/Outer$1Local", "Local", 0),
            InnerClassSpec::member("com/example/Outer$Member", "com/example/Outer", "Member", 0x0009),
        ]))
        .attribute(AttributeSpec::EnclosingMethod {
            class: "com/example/Outer".to_string(),
            method: Some(("run".to_string(), "()V".to_string())),
        })
        .attribute(AttributeSpec::SourceFile("Outer.java".to_string()))
        .build();
    let class = ClassFile::parse(&bytes).unwrap();

    assert_eq!(
        class.own_inner_class_entry(),
        Some(&InnerClassInfo {
            inner_class: "com/example/Outer$1Local".to_string(),
            outer_class: None,
            inner_name: Some("Local".to_string()),
            access_flags: 0,
        })
    );
    assert_eq!(class.inner_classes.len(), 2);
    assert_eq!(
        class.enclosing_method,
        Some(EnclosingMethod {
            class: "com/example/Outer".to_string(),
            method: Some(("run".to_string(), "()V".to_string())),
        })
    );
    assert_eq!(class.source_file.as_deref(), Some("Outer.java"));
}

#[test]
fn method_attributes() {
    let method = MemberSpec::new(0x0001, "call", "(ILjava/lang/String;)V")
        .signature("<T:Ljava/lang/Object;>(ITT;)V")
        .attribute(AttributeSpec::Exceptions(vec!["java/io/IOException".to_string()]))
        .attribute(AttributeSpec::MethodParameters(vec![
            (Some("count".to_string()), 0x0010),
            (None, 0x1000),
        ]))
        .attribute(AttributeSpec::ParameterAnnotations {
            visible: true,
            parameters: vec![vec![], vec![AnnotationSpec::new("Lcom/example/NotNull;")]],
        });
    let default = MemberSpec::new(0x0401, "value", "()I")
        .attribute(AttributeSpec::AnnotationDefault(ElementSpec::Int(42)));

    let bytes = ClassFileBuilder::new("com/example/Foo")
        .method(method)
        .method(default)
        .build();
    let class = ClassFile::parse(&bytes).unwrap();

    let call = &class.methods[0];
    assert_eq!(call.signature.as_deref(), Some("<T:Ljava/lang/Object;>(ITT;)V"));
    assert_eq!(call.exceptions, vec!["java/io/IOException"]);
    assert_eq!(
        call.method_parameters,
        Some(vec![
            MethodParameter {
                name: Some("count".to_string()),
                access_flags: 0x0010,
            },
            MethodParameter {
                name: None,
                access_flags: 0x1000,
            },
        ])
    );
    assert_eq!(call.runtime_visible_parameter_annotations.len(), 2);
    assert_eq!(
        call.runtime_visible_parameter_annotations[1][0].type_descriptor,
        "Lcom/example/NotNull;"
    );

    assert_eq!(
        class.methods[1].annotation_default,
        Some(ElementValue::Const(ConstValue::Int(42)))
    );
}

#[test]
fn type_annotations_keep_target_and_path_and_drop_code_targets() {
    let ann = || AnnotationSpec::new("Lcom/example/TA;");
    let field = MemberSpec::new(0x0001, "f", "[[I")
        .type_annotation(TypeAnnotationSpec::field(ann()).array())
        .type_annotation(TypeAnnotationSpec::local_variable(ann()))
        .invisible_type_annotation(
            TypeAnnotationSpec::field(ann()).type_argument(1).wildcard().nested(),
        );
    let bytes = ClassFileBuilder::new("com/example/Foo")
        .field(field)
        .type_annotation(TypeAnnotationSpec::supertype(0xFFFF, ann()))
        .build();
    let class = ClassFile::parse(&bytes).unwrap();

    let f = &class.fields[0];
    assert_eq!(f.runtime_visible_type_annotations.len(), 1);
    assert_eq!(f.runtime_visible_type_annotations[0].target, TypeAnnotationTarget::Field);
    assert_eq!(f.runtime_visible_type_annotations[0].path, vec![TypePathKind::Array]);
    assert_eq!(
        f.runtime_invisible_type_annotations[0].path,
        vec![
            TypePathKind::TypeArgument(1),
            TypePathKind::WildcardBound,
            TypePathKind::Nested,
        ]
    );
    assert_eq!(
        class.runtime_visible_type_annotations[0].target,
        TypeAnnotationTarget::Supertype { index: 0xFFFF }
    );
}

#[test]
fn type_annotations_before_java8_are_not_surfaced() {
    let field = MemberSpec::new(0x0001, "f", "I")
        .type_annotation(TypeAnnotationSpec::field(AnnotationSpec::new("Lcom/example/TA;")))
        .annotation(AnnotationSpec::new("Lcom/example/Decl;"));
    let bytes = ClassFileBuilder::new("com/example/Foo")
        .version(51, 0)
        .field(field)
        .build();
    let class = ClassFile::parse(&bytes).unwrap();

    assert!(class.fields[0].runtime_visible_type_annotations.is_empty());
    assert_eq!(class.fields[0].runtime_visible_annotations.len(), 1);
}

#[test]
fn record_and_permitted_subclasses_are_version_gated() {
    let build = |major: u16, minor: u16| {
        ClassFileBuilder::new("com/example/Point")
            .super_class(Some("java/lang/Record"))
            .version(major, minor)
            .attribute(AttributeSpec::Record(vec![RecordComponentSpec::new("x", "I")]))
            .attribute(AttributeSpec::PermittedSubclasses(vec![
                "com/example/Sub".to_string(),
            ]))
            .build()
    };

    let modern = ClassFile::parse(&build(61, 0)).unwrap();
    assert!(modern.is_record());
    assert_eq!(modern.permitted_subclasses, vec!["com/example/Sub"]);

    let preview = ClassFile::parse(&build(59, 0xFFFF)).unwrap();
    assert!(preview.is_record());
    assert_eq!(preview.permitted_subclasses, vec!["com/example/Sub"]);

    let java16 = ClassFile::parse(&build(60, 0)).unwrap();
    assert!(java16.is_record());
    assert!(java16.permitted_subclasses.is_empty());

    let java14 = ClassFile::parse(&build(58, 0)).unwrap();
    assert!(!java14.is_record());
}

#[test]
fn record_component_attributes() {
    let component = RecordComponentSpec::new("items", "Ljava/util/List;")
        .attribute(AttributeSpec::Signature("Ljava/util/List<Ljava/lang/String;>;".to_string()))
        .attribute(AttributeSpec::Annotations {
            visible: true,
            annotations: vec![AnnotationSpec::new("Lcom/example/Component;")],
        });
    let bytes = ClassFileBuilder::new("com/example/Bag")
        .super_class(Some("java/lang/Record"))
        .attribute(AttributeSpec::Record(vec![component]))
        .build();
    let class = ClassFile::parse(&bytes).unwrap();

    let components = class.record_components.as_ref().unwrap();
    assert_eq!(components[0].name, "items");
    assert_eq!(
        components[0].signature.as_deref(),
        Some("Ljava/util/List<Ljava/lang/String;>;")
    );
    assert_eq!(components[0].runtime_visible_annotations.len(), 1);
}

#[test]
fn constant_pool_class_references_reduce_arrays_to_elements() {
    let bytes = ClassFileBuilder::new("com/example/Foo")
        .class_reference("[[Ljava/util/Map;")
        .class_reference("[I")
        .class_reference("java/util/List")
        .build();
    let class = ClassFile::parse(&bytes).unwrap();

    let refs: Vec<&str> = class.constant_pool.class_references().collect();
    assert!(refs.contains(&"java/util/Map"));
    assert!(refs.contains(&"java/util/List"));
    assert!(refs.contains(&"com/example/Foo"));
    assert!(!refs.iter().any(|r| r.starts_with('[')));
}
