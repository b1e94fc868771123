use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use classdex_core::DotName;
use classdex_types::{AnnotationInstance, Value};

use crate::info::ClassInfo;

type Relation = BTreeMap<DotName, BTreeSet<DotName>>;

const REPEATABLE: &str = "java.lang.annotation.Repeatable";

/// An immutable catalog of indexed classes.
///
/// Classes are shared behind `Arc`, so cloning, merging and replacing a
/// class never copies the others.
#[derive(Debug, Clone, Default)]
pub struct Index {
    classes: BTreeMap<DotName, Arc<ClassInfo>>,
    annotations: BTreeMap<DotName, Vec<AnnotationInstance>>,
    /// Superclass name to its direct subclasses.
    subclasses: Relation,
    /// Interface name to every class or interface listing it directly.
    implementors: Relation,
    /// Class name to the classes whose constant pool refers to it.
    users: Relation,
}

impl Index {
    /// An index over `classes`; the first class of each name wins.
    pub fn from_classes(classes: impl IntoIterator<Item = ClassInfo>, users: Relation) -> Index {
        let mut by_name = BTreeMap::new();
        for class in classes {
            by_name
                .entry(class.name.clone())
                .or_insert_with(|| Arc::new(class));
        }
        let (subclasses, implementors) = relations(&by_name);
        Index::from_parts(by_name, subclasses, implementors, users)
    }

    pub(crate) fn from_parts(
        classes: BTreeMap<DotName, Arc<ClassInfo>>,
        subclasses: Relation,
        implementors: Relation,
        users: Relation,
    ) -> Index {
        let mut annotations: BTreeMap<DotName, Vec<AnnotationInstance>> = BTreeMap::new();
        for class in classes.values() {
            for annotation in class.all_annotations() {
                annotations
                    .entry(annotation.name.clone())
                    .or_default()
                    .push(annotation.clone());
            }
        }
        Index {
            classes,
            annotations,
            subclasses,
            implementors,
            users,
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// All classes, ordered by name.
    pub fn known_classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values().map(Arc::as_ref)
    }

    pub fn get(&self, name: &DotName) -> Option<&ClassInfo> {
        self.classes.get(name).map(Arc::as_ref)
    }

    pub fn get_class_by_name(&self, name: &DotName) -> Option<&ClassInfo> {
        self.get(name)
    }

    /// Looks a class up by its binary name, e.g. `java.util.Map$Entry`.
    pub fn get_class_by_binary_name(&self, name: &str) -> Option<&ClassInfo> {
        self.get(&DotName::simple(name))
    }

    /// Every instance of annotation `name`, wherever it was declared.
    pub fn get_annotations(&self, name: &DotName) -> &[AnnotationInstance] {
        self.annotations.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Like [`Index::get_annotations`], also unpacking the container
    /// annotation when `name` is `@Repeatable` and its declaration is indexed.
    ///
    /// Unpacked instances take the target of their container.
    pub fn get_annotations_with_repeatable(&self, name: &DotName) -> Vec<AnnotationInstance> {
        let mut out = self.get_annotations(name).to_vec();
        let container = self
            .get(name)
            .and_then(|declaration| declaration.declared_annotation(&DotName::simple(REPEATABLE)))
            .and_then(|repeatable| match repeatable.value("value") {
                Some(Value::Class(container)) => Some(container.name()),
                _ => None,
            });
        let Some(container) = container else {
            return out;
        };

        for instance in self.get_annotations(&container) {
            let Some(Value::Array(elements)) = instance.value("value") else {
                continue;
            };
            for element in elements {
                if let Value::Nested(nested) = &element.value {
                    if nested.name == *name {
                        let mut unpacked = nested.as_ref().clone();
                        unpacked.target = instance.target.clone();
                        unpacked.runtime_visible = instance.runtime_visible;
                        out.push(unpacked);
                    }
                }
            }
        }
        out
    }

    /// Names of all annotations that occur in the index.
    pub fn annotation_names(&self) -> impl Iterator<Item = &DotName> {
        self.annotations.keys()
    }

    pub fn known_direct_subclasses(&self, name: &DotName) -> Vec<&ClassInfo> {
        self.lookup(self.subclasses.get(name))
    }

    pub fn all_known_subclasses(&self, name: &DotName) -> Vec<&ClassInfo> {
        let names = self.closure(name, |current| {
            self.subclasses.get(current).into_iter().flatten().cloned().collect()
        });
        self.lookup(Some(&names))
    }

    /// Interfaces that directly extend interface `name`.
    pub fn known_direct_subinterfaces(&self, name: &DotName) -> Vec<&ClassInfo> {
        self.direct_implementors(name)
            .filter(|class| class.is_interface())
            .collect()
    }

    pub fn all_known_subinterfaces(&self, name: &DotName) -> Vec<&ClassInfo> {
        let names = self.closure(name, |current| {
            self.direct_implementors(current)
                .filter(|class| class.is_interface())
                .map(|class| class.name.clone())
                .collect()
        });
        self.lookup(Some(&names))
    }

    /// Classes and interfaces listing `name` among their interfaces.
    pub fn known_direct_implementors(&self, name: &DotName) -> Vec<&ClassInfo> {
        self.direct_implementors(name).collect()
    }

    /// Non-interface classes listing `name` among their interfaces.
    pub fn known_direct_implementations(&self, name: &DotName) -> Vec<&ClassInfo> {
        self.direct_implementors(name)
            .filter(|class| !class.is_interface())
            .collect()
    }

    /// Every non-interface class implementing `name`, through subinterfaces
    /// and superclasses included.
    pub fn all_known_implementations(&self, name: &DotName) -> Vec<&ClassInfo> {
        let interfaces = self.closure(name, |current| {
            self.direct_implementors(current)
                .filter(|class| class.is_interface())
                .map(|class| class.name.clone())
                .collect()
        });

        let mut found = BTreeSet::new();
        for interface in std::iter::once(name).chain(&interfaces) {
            for class in self.direct_implementors(interface) {
                if class.is_interface() || !found.insert(class.name.clone()) {
                    continue;
                }
                found.extend(
                    self.all_known_subclasses(&class.name)
                        .into_iter()
                        .map(|sub| sub.name.clone()),
                );
            }
        }
        self.lookup(Some(&found))
    }

    /// Classes whose constant pool refers to `name`.
    pub fn known_users(&self, name: &DotName) -> Vec<&ClassInfo> {
        self.lookup(self.users.get(name))
    }

    pub fn users(&self) -> &BTreeMap<DotName, BTreeSet<DotName>> {
        &self.users
    }

    pub fn classes_in_package(&self, package: &DotName) -> Vec<&ClassInfo> {
        self.known_classes()
            .filter(|class| class.name.package_prefix().as_ref() == Some(package))
            .collect()
    }

    /// Packages directly below `package` that contain indexed classes,
    /// at any depth.
    pub fn subpackages(&self, package: &DotName) -> BTreeSet<DotName> {
        let mut out = BTreeSet::new();
        for class in self.known_classes() {
            let mut current = class.name.package_prefix();
            while let Some(candidate) = current {
                let parent = candidate.package_prefix();
                if parent.as_ref() == Some(package) {
                    out.insert(candidate);
                    break;
                }
                current = parent;
            }
        }
        out
    }

    /// Both indexes in one; on a name clash the class from `self` is kept,
    /// along with the user edges it contributes.
    pub fn merge(&self, other: &Index) -> Index {
        let mut classes = self.classes.clone();
        for (name, class) in &other.classes {
            if classes.contains_key(name) {
                tracing::debug!(target: "classdex.index", class = %name, "duplicate class in merge, keeping the first");
                continue;
            }
            classes.insert(name.clone(), class.clone());
        }

        let mut users = self.users.clone();
        for (used, by) in &other.users {
            let kept = by.iter().filter(|user| !self.classes.contains_key(*user)).cloned();
            users.entry(used.clone()).or_default().extend(kept);
        }
        users.retain(|_, by| !by.is_empty());

        let (subclasses, implementors) = relations(&classes);
        Index::from_parts(classes, subclasses, implementors, users)
    }

    /// A copy of this index where `class` takes the place of the class with
    /// the same name.
    pub fn with_class_replaced(&self, class: ClassInfo) -> Index {
        let mut classes = self.classes.clone();
        classes.insert(class.name.clone(), Arc::new(class));
        let (subclasses, implementors) = relations(&classes);
        Index::from_parts(classes, subclasses, implementors, self.users.clone())
    }

    fn direct_implementors<'a>(&'a self, name: &DotName) -> impl Iterator<Item = &'a ClassInfo> + 'a {
        self.implementors
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|implementor| self.get(implementor))
    }

    fn lookup(&self, names: Option<&BTreeSet<DotName>>) -> Vec<&ClassInfo> {
        names
            .into_iter()
            .flatten()
            .filter_map(|name| self.get(name))
            .collect()
    }

    /// Transitive closure of `step` starting below `start`.
    fn closure(&self, start: &DotName, step: impl Fn(&DotName) -> Vec<DotName>) -> BTreeSet<DotName> {
        let mut seen = BTreeSet::new();
        let mut work = vec![start.clone()];
        while let Some(current) = work.pop() {
            for next in step(&current) {
                if next != *start && seen.insert(next.clone()) {
                    work.push(next);
                }
            }
        }
        seen
    }
}

fn relations(classes: &BTreeMap<DotName, Arc<ClassInfo>>) -> (Relation, Relation) {
    let mut subclasses = Relation::new();
    let mut implementors = Relation::new();
    for (name, class) in classes {
        if let Some(super_class) = &class.super_class {
            subclasses
                .entry(super_class.clone())
                .or_default()
                .insert(name.clone());
        }
        for interface in class.interface_names() {
            implementors.entry(interface).or_default().insert(name.clone());
        }
    }
    (subclasses, implementors)
}
