use classdex_core::flags::{ACC_ABSTRACT, ACC_ANNOTATION, ACC_INTERFACE, ACC_PUBLIC};
use classdex_core::DotName;
use classdex_index::{ClassInfo, Index, Indexer};
use classdex_test_utils::{AnnotationSpec, ClassFileBuilder, ElementSpec};
use classdex_types::{AnnotationInstance, AnnotationTarget};
use pretty_assertions::assert_eq;

const INTERFACE: u16 = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;

fn name(value: &str) -> DotName {
    DotName::simple(value)
}

fn names(classes: Vec<&ClassInfo>) -> Vec<String> {
    classes.iter().map(|class| class.name.to_string()).collect()
}

fn index_of(classes: &[Vec<u8>]) -> Index {
    let mut indexer = Indexer::new();
    for bytes in classes {
        indexer.index_bytes(bytes).unwrap();
    }
    indexer.complete()
}

fn shapes() -> Index {
    index_of(&[
        ClassFileBuilder::new("com/example/Shape").access(INTERFACE).build(),
        ClassFileBuilder::new("com/example/Polygon")
            .access(INTERFACE)
            .interface("com/example/Shape")
            .build(),
        ClassFileBuilder::new("com/example/Circle")
            .interface("com/example/Shape")
            .annotation(AnnotationSpec::new("Lcom/example/Round;"))
            .build(),
        ClassFileBuilder::new("com/example/Square")
            .interface("com/example/Polygon")
            .build(),
        ClassFileBuilder::new("com/example/ColoredSquare")
            .super_class(Some("com/example/Square"))
            .build(),
        ClassFileBuilder::new("com/example/app/Main")
            .class_reference("com/example/Circle")
            .build(),
    ])
}

#[test]
fn hierarchy_queries() {
    let index = shapes();
    let shape = name("com.example.Shape");

    assert_eq!(index.len(), 6);
    assert_eq!(
        names(index.known_direct_implementors(&shape)),
        vec!["com.example.Circle", "com.example.Polygon"]
    );
    assert_eq!(names(index.known_direct_implementations(&shape)), vec!["com.example.Circle"]);
    assert_eq!(names(index.known_direct_subinterfaces(&shape)), vec!["com.example.Polygon"]);
    assert_eq!(names(index.all_known_subinterfaces(&shape)), vec!["com.example.Polygon"]);
    assert_eq!(
        names(index.all_known_implementations(&shape)),
        vec!["com.example.Circle", "com.example.ColoredSquare", "com.example.Square"]
    );
    assert_eq!(
        names(index.known_direct_subclasses(&name("com.example.Square"))),
        vec!["com.example.ColoredSquare"]
    );
    assert_eq!(
        names(index.all_known_subclasses(&name("com.example.Square"))),
        vec!["com.example.ColoredSquare"]
    );
    assert!(index.all_known_subclasses(&name("com.example.Circle")).is_empty());
}

#[test]
fn users_and_annotations() {
    let index = shapes();

    assert_eq!(
        names(index.known_users(&name("com.example.Circle"))),
        vec!["com.example.app.Main"]
    );
    assert_eq!(
        names(index.known_users(&name("com.example.Shape"))),
        vec!["com.example.Circle", "com.example.Polygon"]
    );

    let round = index.get_annotations(&name("com.example.Round"));
    assert_eq!(round.len(), 1);
    assert_eq!(round[0].target, Some(AnnotationTarget::Class(name("com.example.Circle"))));
    assert!(index.annotation_names().any(|n| *n == name("com.example.Round")));
    assert!(index.get_annotations(&name("com.example.Missing")).is_empty());
}

#[test]
fn packages() {
    let index = shapes();

    assert_eq!(
        names(index.classes_in_package(&name("com.example.app"))),
        vec!["com.example.app.Main"]
    );
    assert_eq!(index.classes_in_package(&name("com.example")).len(), 5);

    let below_com: Vec<String> = index.subpackages(&name("com")).iter().map(ToString::to_string).collect();
    assert_eq!(below_com, vec!["com.example"]);
    let below_example: Vec<String> = index
        .subpackages(&name("com.example"))
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(below_example, vec!["com.example.app"]);
}

#[test]
fn repeatable_annotations_are_unpacked_from_their_container() {
    let tag = |value: &str| {
        AnnotationSpec::new("Lcom/example/Tag;").with("value", ElementSpec::String(value.to_string()))
    };
    let annotation_type = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT | ACC_ANNOTATION;

    let index = index_of(&[
        ClassFileBuilder::new("com/example/Tag")
            .access(annotation_type)
            .interface("java/lang/annotation/Annotation")
            .annotation(
                AnnotationSpec::new("Ljava/lang/annotation/Repeatable;")
                    .with("value", ElementSpec::Class("Lcom/example/Tags;".to_string())),
            )
            .build(),
        ClassFileBuilder::new("com/example/Tags")
            .access(annotation_type)
            .interface("java/lang/annotation/Annotation")
            .build(),
        ClassFileBuilder::new("com/example/Once").annotation(tag("a")).build(),
        ClassFileBuilder::new("com/example/Twice")
            .annotation(AnnotationSpec::new("Lcom/example/Tags;").with(
                "value",
                ElementSpec::Array(vec![
                    ElementSpec::Annotation(tag("b")),
                    ElementSpec::Annotation(tag("c")),
                ]),
            ))
            .build(),
    ]);

    let tag_name = name("com.example.Tag");
    assert_eq!(index.get_annotations(&tag_name).len(), 1);

    let all = index.get_annotations_with_repeatable(&tag_name);
    let values: Vec<&str> = all
        .iter()
        .filter_map(|instance| instance.value("value").and_then(|value| value.as_str()))
        .collect();
    assert_eq!(values, vec!["a", "b", "c"]);
    assert_eq!(all[2].target, Some(AnnotationTarget::Class(name("com.example.Twice"))));
}

#[test]
fn merge_keeps_the_first_class_of_each_name() {
    let first = index_of(&[ClassFileBuilder::new("com/example/Task")
        .interface("java/lang/Runnable")
        .build()]);
    let second = index_of(&[
        ClassFileBuilder::new("com/example/Task")
            .class_reference("com/example/OnlyInSecond")
            .build(),
        ClassFileBuilder::new("com/example/Worker")
            .class_reference("com/example/Pool")
            .build(),
    ]);

    let merged = first.merge(&second);
    assert_eq!(merged.len(), 2);
    assert_eq!(
        names(merged.known_direct_implementors(&name("java.lang.Runnable"))),
        vec!["com.example.Task"]
    );
    assert_eq!(
        names(merged.known_users(&name("com.example.Pool"))),
        vec!["com.example.Worker"]
    );
    assert!(merged.known_users(&name("com.example.OnlyInSecond")).is_empty());

    // Neither input changes.
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 2);
}

#[test]
fn replacing_a_class_leaves_the_original_index_alone() {
    let index = shapes();
    let circle_name = name("com.example.Circle");
    let marker = name("com.example.Marker");

    let edited = index.get(&circle_name).unwrap().rebuild_with(|circle| {
        circle.annotations.push(AnnotationInstance::new(
            marker.clone(),
            Some(AnnotationTarget::Class(circle_name.clone())),
            Vec::new(),
        ));
    });
    let replaced = index.with_class_replaced(edited);

    assert_eq!(replaced.get_annotations(&marker).len(), 1);
    assert!(index.get_annotations(&marker).is_empty());
    assert_eq!(replaced.len(), index.len());
    assert_eq!(
        names(replaced.known_direct_implementations(&name("com.example.Shape"))),
        vec!["com.example.Circle"]
    );
}
