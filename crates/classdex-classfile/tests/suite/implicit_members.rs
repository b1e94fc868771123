use classdex_classfile::{ClassFile, ImplicitKind};
use classdex_core::flags::{ACC_ENUM, ACC_FINAL, ACC_MANDATED, ACC_PUBLIC, ACC_STATIC, ACC_SUPER};
use classdex_test_utils::{AttributeSpec, ClassFileBuilder, InnerClassSpec, MemberSpec, RecordComponentSpec};

fn kinds(class: &ClassFile) -> Vec<(String, Option<ImplicitKind>, bool)> {
    class
        .methods
        .iter()
        .map(|m| (m.name.clone(), m.implicit, m.synthesized))
        .collect()
}

#[test]
fn default_constructor_is_recognized_from_bytecode() {
    let bytes = ClassFileBuilder::new("com/example/Plain")
        .method(
            MemberSpec::new(ACC_PUBLIC, "<init>", "()V")
                .attribute(AttributeSpec::default_constructor_code("java/lang/Object")),
        )
        .method(
            MemberSpec::new(ACC_PUBLIC, "<init>", "()V")
                .attribute(AttributeSpec::default_constructor_code("java/lang/String")),
        )
        .build();
    let class = ClassFile::parse(&bytes).unwrap();

    assert_eq!(class.methods[0].implicit, Some(ImplicitKind::DefaultConstructor));
    // Calls a constructor of some other class.
    assert_eq!(class.methods[1].implicit, None);
}

#[test]
fn inner_class_default_constructor_stores_the_outer_instance() {
    let bytes = ClassFileBuilder::new("com/example/Outer$Inner")
        .attribute(AttributeSpec::InnerClasses(vec![InnerClassSpec::member(
            "com/example/Outer$Inner",
            "com/example/Outer",
            "Inner",
            0,
        )]))
        .method(
            MemberSpec::new(0, "<init>", "(Lcom/example/Outer;)V").attribute(AttributeSpec::Code {
                bytecode: vec![0x2A, 0x2B, 0xB5, 0, 9, 0x2A, 0xB7, 0, 0, 0xB1],
                method_refs: vec![(
                    7,
                    "java/lang/Object".to_string(),
                    "<init>".to_string(),
                    "()V".to_string(),
                )],
            }),
        )
        .build();
    let class = ClassFile::parse(&bytes).unwrap();
    assert_eq!(class.methods[0].implicit, Some(ImplicitKind::DefaultConstructor));
}

#[test]
fn enum_members_are_detected_and_missing_ones_synthesized() {
    let this = "com/example/Color";
    let bytes = ClassFileBuilder::new(this)
        .access(ACC_PUBLIC | ACC_FINAL | ACC_SUPER | ACC_ENUM)
        .super_class(Some("java/lang/Enum"))
        .method(MemberSpec::new(
            ACC_PUBLIC | ACC_STATIC,
            "values",
            "()[Lcom/example/Color;",
        ))
        .method(
            MemberSpec::new(0x0002, "<init>", "(Ljava/lang/String;I)V").attribute(
                AttributeSpec::Code {
                    bytecode: vec![0x2A, 0x2B, 0x1C, 0xB7, 0, 0, 0xB1],
                    method_refs: vec![(
                        4,
                        "java/lang/Enum".to_string(),
                        "<init>".to_string(),
                        "(Ljava/lang/String;I)V".to_string(),
                    )],
                },
            ),
        )
        .build();

    let mut class = ClassFile::parse(&bytes).unwrap();
    assert_eq!(
        kinds(&class),
        vec![
            ("values".to_string(), Some(ImplicitKind::EnumValues), false),
            ("<init>".to_string(), Some(ImplicitKind::DefaultConstructor), false),
        ]
    );

    class.synthesize_implicit_members();
    let value_of = &class.methods[2];
    assert_eq!(value_of.name, "valueOf");
    assert_eq!(value_of.descriptor, "(Ljava/lang/String;)Lcom/example/Color;");
    assert_eq!(value_of.access_flags, ACC_PUBLIC | ACC_STATIC);
    assert_eq!(value_of.implicit, Some(ImplicitKind::EnumValueOf));
    assert!(value_of.synthesized);
    assert_eq!(class.methods.len(), 3);
}

fn point_record(methods: Vec<MemberSpec>) -> ClassFile {
    let mut builder = ClassFileBuilder::new("com/example/Point")
        .access(ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .super_class(Some("java/lang/Record"))
        .attribute(AttributeSpec::Record(vec![
            RecordComponentSpec::new("x", "I"),
            RecordComponentSpec::new("tags", "Ljava/util/List;")
                .attribute(AttributeSpec::Signature("Ljava/util/List<Ljava/lang/String;>;".to_string())),
        ]));
    for method in methods {
        builder = builder.method(method);
    }
    ClassFile::parse(&builder.build()).unwrap()
}

#[test]
fn record_members_are_classified() {
    let compact = MemberSpec::new(ACC_PUBLIC, "<init>", "(ILjava/util/List;)V").attribute(
        AttributeSpec::MethodParameters(vec![
            (Some("x".to_string()), ACC_MANDATED),
            (Some("tags".to_string()), ACC_MANDATED),
        ]),
    );
    let class = point_record(vec![
        compact,
        MemberSpec::new(ACC_PUBLIC, "x", "()I"),
        MemberSpec::new(ACC_PUBLIC | ACC_STATIC, "x", "()I"),
    ]);

    assert_eq!(
        kinds(&class),
        vec![
            ("<init>".to_string(), Some(ImplicitKind::RecordCompactConstructor), false),
            ("x".to_string(), Some(ImplicitKind::RecordAccessor), false),
            ("x".to_string(), None, false),
        ]
    );
}

#[test]
fn explicit_canonical_constructor_is_not_compact() {
    let canonical = MemberSpec::new(ACC_PUBLIC, "<init>", "(ILjava/util/List;)V").attribute(
        AttributeSpec::MethodParameters(vec![(Some("x".to_string()), 0), (Some("tags".to_string()), 0)]),
    );
    let class = point_record(vec![canonical]);
    assert_eq!(class.methods[0].implicit, Some(ImplicitKind::RecordCanonicalConstructor));
}

#[test]
fn missing_record_members_are_synthesized() {
    let mut class = point_record(vec![MemberSpec::new(ACC_PUBLIC, "x", "()I")]);
    class.synthesize_implicit_members();

    assert_eq!(
        kinds(&class),
        vec![
            ("x".to_string(), Some(ImplicitKind::RecordAccessor), false),
            ("tags".to_string(), Some(ImplicitKind::RecordAccessor), true),
            ("<init>".to_string(), Some(ImplicitKind::RecordCanonicalConstructor), true),
        ]
    );

    let tags = &class.methods[1];
    assert_eq!(tags.descriptor, "()Ljava/util/List;");
    assert_eq!(tags.signature.as_deref(), Some("()Ljava/util/List<Ljava/lang/String;>;"));
    assert_eq!(tags.access_flags, ACC_PUBLIC);

    let init = &class.methods[2];
    assert_eq!(init.descriptor, "(ILjava/util/List;)V");
    assert_eq!(init.signature.as_deref(), Some("(ILjava/util/List<Ljava/lang/String;>;)V"));
    assert_eq!(init.access_flags, ACC_PUBLIC);
    let names: Vec<_> = init
        .method_parameters
        .as_ref()
        .unwrap()
        .iter()
        .map(|p| p.name.clone().unwrap())
        .collect();
    assert_eq!(names, vec!["x", "tags"]);
}
