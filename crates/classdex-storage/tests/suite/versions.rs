use std::sync::Arc;

use classdex_core::DotName;
use classdex_index::Indexer;
use classdex_storage::{Feature, FormatVersion, IndexReader, IndexWriter, WriteOptions};
use classdex_test_utils::ClassFileBuilder;
use classdex_types::Type;
use pretty_assertions::assert_eq;

use super::fixture::{catalog, round_trip};

fn name(value: &str) -> DotName {
    DotName::simple(value)
}

fn annotation_names(annotations: &[classdex_types::AnnotationInstance]) -> Vec<String> {
    annotations.iter().map(|a| a.name.to_string()).collect()
}

#[test]
fn the_latest_version_is_written_by_default() {
    let bytes = IndexWriter::new().write(&catalog()).unwrap();
    let header = IndexReader::header(&bytes).unwrap();
    assert_eq!(header.version, FormatVersion::LATEST);
    assert_eq!(header.payload_len as usize, bytes.len() - classdex_storage::HEADER_LEN);
}

#[test]
fn requested_versions_are_recorded_in_the_header() {
    let index = catalog();
    for version in FormatVersion::ALL {
        let bytes = IndexWriter::with_options(WriteOptions::version(version))
            .write(&index)
            .unwrap();
        assert_eq!(IndexReader::header(&bytes).unwrap().version, version);
    }
}

#[test]
fn invisible_annotations_are_dropped_before_v3() {
    assert!(!FormatVersion::V2.supports(Feature::InvisibleAnnotations));
    let read = round_trip(&catalog(), FormatVersion::V2);

    let tagged = read.get(&name("com.example.Tagged")).unwrap();
    assert_eq!(annotation_names(&tagged.annotations), vec!["com.example.Meta"]);
    assert!(read.get_annotations(&name("com.example.Internal")).is_empty());

    let value = read.get(&name("com.example.Box")).unwrap().field("value").unwrap();
    assert_eq!(
        annotation_names(&value.annotations),
        vec!["com.example.Column", "com.example.NonNull"]
    );
}

#[test]
fn self_references_read_back_unresolved_before_v3() {
    let read = round_trip(&catalog(), FormatVersion::V2);
    let t = &read.get(&name("com.example.Box")).unwrap().type_parameters[0];

    assert_eq!(t.bounds[0].to_string(), "java.lang.Comparable<T>");
    let Type::Parameterized(bound) = &t.bounds[0] else { panic!("{:?}", t.bounds[0]) };
    assert!(matches!(bound.arguments[0], Type::UnresolvedTypeVariable(_)));
}

#[test]
fn earlier_sibling_bounds_keep_their_erasure_in_every_version() {
    let mut indexer = Indexer::new();
    indexer
        .index_bytes(
            &ClassFileBuilder::new("com/example/Pair")
                .signature("<A:Ljava/lang/Number;B:TA;>Ljava/lang/Object;")
                .build(),
        )
        .unwrap();
    let index = indexer.complete();

    for version in FormatVersion::ALL {
        let read = round_trip(&index, version);
        let pair = read.get(&name("com.example.Pair")).unwrap();
        let b = &pair.type_parameters[1];

        assert_eq!(b.erased_name(), name("java.lang.Number"), "{version}");
        let sibling = b.bounds[0].as_type_variable().unwrap();
        assert_eq!(sibling.identifier.as_str(), "A", "{version}");
        assert_eq!(sibling.bounds[0].to_string(), "java.lang.Number", "{version}");
        if version.supports(Feature::TypeVariableReferences) {
            assert!(Arc::ptr_eq(&sibling, &pair.type_parameters[0]), "{version}");
        }
    }
}

#[test]
fn v1_has_no_record_components_or_users() {
    let read = round_trip(&catalog(), FormatVersion::V1);

    let point = read.get(&name("com.example.Point")).unwrap();
    assert!(point.record_components.is_none());
    assert!(read.users().is_empty());
    assert!(read.known_users(&name("com.example.Box")).is_empty());

    // Members themselves are kept.
    assert!(point.field("x").is_some());
    assert!(point.first_method("x").is_some());
}

#[test]
fn older_streams_can_be_upgraded() {
    let v2 = round_trip(&catalog(), FormatVersion::V2);
    let v3 = round_trip(&v2, FormatVersion::V3);

    let names: Vec<String> = v3
        .get(&name("com.example.Box"))
        .unwrap()
        .fields
        .iter()
        .map(|f| f.name.to_string())
        .collect();
    assert_eq!(names, vec!["value", "count"]);
    assert!(v3.get(&name("com.example.Point")).unwrap().record_components.is_some());
}
