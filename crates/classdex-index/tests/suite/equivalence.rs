use std::collections::HashSet;

use classdex_core::flags::{ACC_FINAL, ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC, ACC_SUPER};
use classdex_index::{key_of, parse, ClassInfo, Declaration, EquivalenceKey};
use classdex_test_utils::{
    AnnotationSpec, AttributeSpec, ClassFileBuilder, MemberSpec, RecordComponentSpec, TypeAnnotationSpec,
};
use pretty_assertions::assert_eq;

const MAX_DESCRIPTOR: &str = "(Ljava/util/Collection;)Ljava/lang/Object;";
const MAX_SIGNATURE: &str = "<T:Ljava/lang/Object;:Ljava/lang/Comparable<-TT;>;>(Ljava/util/Collection<+TT;>;)TT;";

fn max_method() -> MemberSpec {
    MemberSpec::new(ACC_PUBLIC | ACC_STATIC, "max", MAX_DESCRIPTOR).signature(MAX_SIGNATURE)
}

fn cache_field() -> MemberSpec {
    MemberSpec::new(ACC_PRIVATE | ACC_FINAL, "cache", "Ljava/util/Map;")
        .signature("Ljava/util/Map<Ljava/lang/String;Ljava/lang/Integer;>;")
}

fn util(class: &str, method: MemberSpec, field: MemberSpec) -> ClassInfo {
    let bytes = ClassFileBuilder::new(class).method(method).field(field).build();
    parse(&bytes).unwrap().info
}

#[test]
fn keys_ignore_annotations() {
    let plain = util("com/example/Util", max_method(), cache_field());
    let annotated = util(
        "com/example/Util",
        max_method()
            .annotation(AnnotationSpec::new("Ljava/lang/Deprecated;"))
            .type_annotation(TypeAnnotationSpec::return_type(AnnotationSpec::new("Lcom/example/NonNull;"))),
        cache_field().type_annotation(TypeAnnotationSpec::field(AnnotationSpec::new("Lcom/example/Shared;"))),
    );

    assert_eq!(plain.equivalence_key(), annotated.equivalence_key());
    assert_eq!(key_of(&plain.methods[0]), key_of(&annotated.methods[0]));
    assert_eq!(key_of(&plain.fields[0]), key_of(&annotated.fields[0]));
    assert_eq!(
        key_of(&plain.methods[0].parameters()[0]),
        key_of(&annotated.methods[0].parameters()[0])
    );

    let keys: HashSet<EquivalenceKey> = [&plain, &annotated]
        .iter()
        .flat_map(|class| class.methods.iter().map(key_of))
        .collect();
    assert_eq!(keys.len(), 1);
}

#[test]
fn keys_render_as_declarations() {
    let info = util("com/example/Util", max_method(), cache_field());

    assert_eq!(
        key_of(&info).to_string(),
        "class public com.example.Util extends java.lang.Object"
    );
    assert_eq!(
        key_of(&info.methods[0]).to_string(),
        "method public static com.example.Util#max(java.util.Collection<? extends T>) -> T \
         where T extends java.lang.Object & java.lang.Comparable<? super T>"
    );
    assert_eq!(
        key_of(&info.fields[0]).to_string(),
        "field private final com.example.Util#cache: java.util.Map<java.lang.String, java.lang.Integer>"
    );
    assert_eq!(
        key_of(&info.methods[0].parameters()[0]).to_string(),
        format!("parameter com.example.Util#max{MAX_DESCRIPTOR} [0]: java.util.Collection<? extends T>")
    );
}

#[test]
fn record_component_keys() {
    let bytes = ClassFileBuilder::new("com/example/Point")
        .access(ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .super_class(Some("java/lang/Record"))
        .attribute(AttributeSpec::Record(vec![RecordComponentSpec::new("x", "I")]))
        .build();
    let info = parse(&bytes).unwrap().info;
    let x = info.record_component("x").unwrap();

    assert_eq!(key_of(x).to_string(), "record component com.example.Point#x: int");
}

#[test]
fn structural_differences_change_the_key() {
    let base = util("com/example/Util", max_method(), cache_field());
    let other_owner = util("com/example/Other", max_method(), cache_field());
    let other_bound = util(
        "com/example/Util",
        MemberSpec::new(ACC_PUBLIC | ACC_STATIC, "max", "(Ljava/util/Collection;)Ljava/lang/Number;")
            .signature("<T:Ljava/lang/Number;>(Ljava/util/Collection<+TT;>;)TT;"),
        cache_field(),
    );
    let other_flags = util(
        "com/example/Util",
        MemberSpec::new(ACC_PUBLIC, "max", MAX_DESCRIPTOR).signature(MAX_SIGNATURE),
        MemberSpec::new(ACC_PRIVATE, "cache", "Ljava/util/Map;"),
    );

    let method = key_of(&base.methods[0]);
    assert_ne!(method, key_of(&other_owner.methods[0]));
    assert_ne!(method, key_of(&other_bound.methods[0]));
    assert_ne!(method, key_of(&other_flags.methods[0]));
    assert_ne!(key_of(&base.fields[0]), key_of(&other_flags.fields[0]));
    assert_ne!(key_of(&base), key_of(&other_owner));

    // Keys of different kinds never collide.
    assert_ne!(key_of(&base.fields[0]), key_of(&base.methods[0]));
}
