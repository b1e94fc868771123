use std::sync::Arc;

use classdex_classfile::ImplicitKind;
use classdex_core::DotName;
use classdex_storage::FormatVersion;
use classdex_types::Type;
use pretty_assertions::assert_eq;

use super::fixture::{catalog, keys, round_trip};

fn name(value: &str) -> DotName {
    DotName::simple(value)
}

#[test]
fn every_version_reads_back_equivalent_declarations() {
    let original = catalog();

    for version in FormatVersion::ALL {
        let read = round_trip(&original, version);
        let with_components = version >= FormatVersion::V2;
        assert_eq!(read.len(), original.len(), "{version}");
        assert_eq!(
            keys(&read, with_components),
            keys(&original, with_components),
            "{version}"
        );
    }
}

#[test]
fn declared_member_order_survives_from_v2() {
    let original = catalog();
    let box_name = name("com.example.Box");

    let field_names = |version| -> Vec<String> {
        let read = round_trip(&original, version);
        let class = read.get(&box_name).unwrap();
        class.fields.iter().map(|f| f.name.to_string()).collect()
    };
    let method_names = |version| -> Vec<String> {
        let read = round_trip(&original, version);
        let class = read.get(&box_name).unwrap();
        class.methods.iter().map(|m| m.name.to_string()).collect()
    };

    assert_eq!(field_names(FormatVersion::V3), vec!["value", "count"]);
    assert_eq!(field_names(FormatVersion::V2), vec!["value", "count"]);
    assert_eq!(method_names(FormatVersion::V3), vec!["map", "get"]);

    // Without positions only the sorted order is left.
    assert_eq!(field_names(FormatVersion::V1), vec!["count", "value"]);
    assert_eq!(method_names(FormatVersion::V1), vec!["get", "map"]);
}

#[test]
fn recursive_bounds_point_back_at_their_declaration() {
    let read = round_trip(&catalog(), FormatVersion::V3);
    let boxed = read.get(&name("com.example.Box")).unwrap();
    let t = &boxed.type_parameters[0];

    assert!(t.implicit_object_bound);
    assert_eq!(t.bounds[0].to_string(), "java.lang.Comparable<T>");
    let Type::Parameterized(bound) = &t.bounds[0] else { panic!("{:?}", t.bounds[0]) };
    let Type::TypeVariableReference(reference) = &bound.arguments[0] else {
        panic!("{:?}", bound.arguments[0])
    };
    assert_eq!(reference.position(), 0);
    assert!(Arc::ptr_eq(&reference.follow().unwrap(), t));

    let get = boxed.first_method("get").unwrap();
    assert!(Arc::ptr_eq(&get.return_type.as_type_variable().unwrap(), t));

    // An annotated occurrence is its own copy of the declaration.
    let value = boxed.field("value").unwrap().ty.as_type_variable().unwrap();
    assert!(!Arc::ptr_eq(&value, t));
    assert_eq!(value.bounds, t.bounds);

    let map = boxed.first_method("map").unwrap();
    let r = &map.type_parameters[0];
    assert_eq!(
        map.parameter_types[0].to_string(),
        "java.util.function.Function<? super T, ? extends R>"
    );
    assert_eq!(map.return_type.to_string(), "com.example.Box<R>");
    let Type::Parameterized(returned) = &map.return_type else { panic!("{:?}", map.return_type) };
    assert!(Arc::ptr_eq(&returned.arguments[0].as_type_variable().unwrap(), r));
    assert_eq!(map.parameter_name(0), Some("mapper"));
}

#[test]
fn enclosing_type_variables_come_back_as_copies() {
    let read = round_trip(&catalog(), FormatVersion::V3);
    let boxed = read.get(&name("com.example.Box")).unwrap();
    let entry = read.get(&name("com.example.Box$Entry")).unwrap();

    let item = entry.field("item").unwrap();
    let t = item.ty.as_type_variable().unwrap();
    assert_eq!(t.identifier, "T");
    assert_eq!(t.bounds[0].to_string(), "java.lang.Comparable<T>");
    assert!(!Arc::ptr_eq(&t, &boxed.type_parameters[0]));
}

#[test]
fn annotations_and_their_values_survive() {
    let original = catalog();
    let read = round_trip(&original, FormatVersion::V3);

    for class in ["com.example.Tagged", "com.example.Box"] {
        let before = original.get(&name(class)).unwrap();
        let after = read.get(&name(class)).unwrap();
        assert_eq!(after.annotations, before.annotations, "{class}");
    }

    let before = original.get(&name("com.example.Box")).unwrap().field("value").unwrap();
    let after = read.get(&name("com.example.Box")).unwrap().field("value").unwrap();
    assert_eq!(after.annotations, before.annotations);
    assert_eq!(after.annotations.len(), 3);
    assert_eq!(after.ty.annotations(), before.ty.annotations());
    assert_eq!(after.ty.to_string(), "@com.example.NonNull T");

    let meta = read.get_annotations(&name("com.example.Meta"));
    assert_eq!(meta.len(), 1);
    assert_eq!(meta[0].values.len(), 11);
    assert_eq!(meta[0].value("label").and_then(|v| v.as_str()), Some("hello"));
    assert_eq!(read.get_annotations(&name("com.example.Internal")).len(), 1);
}

#[test]
fn implicit_members_and_record_components_survive() {
    let read = round_trip(&catalog(), FormatVersion::V3);

    let color = read.get(&name("com.example.Color")).unwrap();
    let value_of = color.first_method("valueOf").unwrap();
    assert_eq!(value_of.implicit, Some(ImplicitKind::EnumValueOf));
    assert!(value_of.synthesized);
    assert_eq!(value_of.parameter_name(0), Some("name"));
    assert_eq!(
        color.first_method("values").unwrap().return_type.to_string(),
        "com.example.Color[]"
    );

    let point = read.get(&name("com.example.Point")).unwrap();
    let x = point.record_component("x").unwrap();
    assert_eq!(x.ty.to_string(), "int");
    assert_eq!(x.annotations.len(), 1);
    assert_eq!(read.get_annotations(&name("com.example.Min")).len(), 1);
    let accessor = x.accessor(point).unwrap();
    assert_eq!(accessor.implicit, Some(ImplicitKind::RecordAccessor));
}

#[test]
fn class_users_survive() {
    let read = round_trip(&catalog(), FormatVersion::V3);
    let users: Vec<String> = read
        .known_users(&name("com.example.Box"))
        .iter()
        .map(|class| class.name.to_string())
        .collect();
    assert!(users.contains(&"com.example.Tagged".to_string()), "{users:?}");
}

#[test]
fn hierarchy_is_rebuilt_on_read() {
    let read = round_trip(&catalog(), FormatVersion::V1);
    let subclasses: Vec<String> = read
        .known_direct_subclasses(&name("java.lang.Enum"))
        .iter()
        .map(|class| class.name.to_string())
        .collect();
    assert_eq!(subclasses, vec!["com.example.Color"]);
}
