//! Placing type annotations on the node their type path selects.
//!
//! A path is read from the outermost type inwards (JVMS 4.7.20.2): `Array`
//! steps into an array component, `Nested` steps from an enclosing class to
//! its non-static member class, `WildcardBound` into a wildcard's bound and
//! `TypeArgument(i)` into the i-th type argument. Only the selected node is
//! changed; when the node is part of a larger structure that needs a new
//! shape (an inner array dimension, an implicit owner type), the structure
//! is split instead of annotating a neighbour.

use std::collections::HashMap;
use std::sync::Arc;

use classdex_classfile::TypePathKind;
use classdex_core::DotName;

use crate::annotation::AnnotationInstance;
use crate::params::TypeParametersBuilder;
use crate::ty::{ArrayType, ClassType, ParameterizedType, Type, TypeVariable, WildcardBound};

const MAX_NESTING: usize = 256;

/// Which classes are non-static members of another class.
pub trait NestingInfo {
    /// The class whose instance encloses instances of `class`, if any.
    fn enclosing_instance_class(&self, class: &DotName) -> Option<DotName>;

    /// Number of enclosing instance classes around `class`.
    fn nesting_depth(&self, class: &DotName) -> usize {
        let mut depth = 0;
        let mut current = class.clone();
        while let Some(outer) = self.enclosing_instance_class(&current) {
            depth += 1;
            if depth == MAX_NESTING {
                break;
            }
            current = outer;
        }
        depth
    }
}

impl NestingInfo for HashMap<DotName, DotName> {
    fn enclosing_instance_class(&self, class: &DotName) -> Option<DotName> {
        self.get(class).cloned()
    }
}

/// No class has an enclosing instance.
pub struct NoNesting;

impl NestingInfo for NoNesting {
    fn enclosing_instance_class(&self, _class: &DotName) -> Option<DotName> {
        None
    }
}

/// Attaches `annotation` to the node of `ty` selected by `path`.
///
/// Returns `false` when the path does not fit the type. The annotation is
/// then dropped, though an implicit owner type may already have been added.
pub fn attach_to_type(
    ty: &mut Type,
    path: &[TypePathKind],
    annotation: AnnotationInstance,
    nesting: &dyn NestingInfo,
) -> bool {
    match ty {
        Type::Array(_) => attach_to_array(ty, path, annotation, nesting),
        Type::Class(_) | Type::Parameterized(_) => {
            let depth = nesting.nesting_depth(&ty.name());
            attach_to_class(ty, depth, path, annotation, nesting)
        }
        Type::Wildcard(wildcard) => match path.split_first() {
            None => annotate(ty, annotation),
            Some((TypePathKind::WildcardBound, rest)) => match &mut wildcard.bound {
                WildcardBound::Extends(bound) | WildcardBound::Super(bound) => {
                    attach_to_type(bound, rest, annotation, nesting)
                }
                WildcardBound::Unbounded => false,
            },
            Some(_) => false,
        },
        _ if path.is_empty() => annotate(ty, annotation),
        _ => false,
    }
}

/// Annotates the declaration of the type parameter at `index`.
pub fn attach_to_type_parameter(
    params: &mut TypeParametersBuilder,
    index: usize,
    path: &[TypePathKind],
    annotation: AnnotationInstance,
) -> bool {
    if !path.is_empty() {
        return false;
    }
    match params.variable_mut(index) {
        Some(variable) => {
            variable.annotations.push(annotation);
            true
        }
        None => false,
    }
}

/// Annotates a bound of a type parameter.
///
/// `bound` counts the class bound as 0 even when it was omitted, as the
/// class file does.
pub fn attach_to_type_parameter_bound(
    params: &mut TypeParametersBuilder,
    index: usize,
    bound: usize,
    path: &[TypePathKind],
    annotation: AnnotationInstance,
    nesting: &dyn NestingInfo,
) -> bool {
    let Some(variable) = params.variable_mut(index) else {
        return false;
    };
    let position = if variable.implicit_object_bound {
        match bound.checked_sub(1) {
            Some(position) => position,
            None => return false,
        }
    } else {
        bound
    };
    match variable.bounds.get_mut(position) {
        Some(ty) => attach_to_type(ty, path, annotation, nesting),
        None => false,
    }
}

fn annotate(ty: &mut Type, annotation: AnnotationInstance) -> bool {
    if let Type::TypeVariable(shared) = ty {
        let mut occurrence = TypeVariable::clone(shared);
        occurrence.annotations.push(annotation);
        *ty = Type::TypeVariable(Arc::new(occurrence));
        return true;
    }
    match ty.annotations_mut() {
        Some(annotations) => {
            annotations.push(annotation);
            true
        }
        None => false,
    }
}

fn attach_to_array(
    ty: &mut Type,
    path: &[TypePathKind],
    annotation: AnnotationInstance,
    nesting: &dyn NestingInfo,
) -> bool {
    let Type::Array(array) = ty else {
        return false;
    };
    let steps = path.iter().take_while(|step| **step == TypePathKind::Array).count();
    let dimensions = array.dimensions as usize;

    if steps == 0 {
        return path.is_empty() && annotate(ty, annotation);
    }
    if steps >= dimensions {
        return attach_to_type(&mut array.component, &path[dimensions..], annotation, nesting);
    }
    if steps < path.len() {
        return false;
    }

    // Split off the annotated inner dimensions.
    let component = std::mem::replace(&mut array.component, Box::new(Type::Void));
    array.component = Box::new(Type::Array(ArrayType {
        component,
        dimensions: (dimensions - steps) as u32,
        annotations: vec![annotation],
    }));
    array.dimensions = steps as u32;
    true
}

/// `depth` is the nesting depth of `ty`; the path's leading `Nested` steps
/// select the level counted from the outermost enclosing class.
fn attach_to_class(
    ty: &mut Type,
    depth: usize,
    path: &[TypePathKind],
    annotation: AnnotationInstance,
    nesting: &dyn NestingInfo,
) -> bool {
    let steps = path.iter().take_while(|step| **step == TypePathKind::Nested).count();
    if steps > depth {
        return false;
    }

    if steps < depth {
        if !ensure_owner(ty, nesting) {
            return false;
        }
        let Type::Parameterized(parameterized) = ty else {
            return false;
        };
        return match parameterized.owner.as_deref_mut() {
            Some(owner) => attach_to_class(owner, depth - 1, path, annotation, nesting),
            None => false,
        };
    }

    match path[steps..].split_first() {
        None => annotate(ty, annotation),
        Some((TypePathKind::TypeArgument(index), rest)) => match ty {
            Type::Parameterized(parameterized) => match parameterized.arguments.get_mut(*index as usize) {
                Some(argument) => attach_to_type(argument, rest, annotation, nesting),
                None => false,
            },
            _ => false,
        },
        Some(_) => false,
    }
}

/// Gives `ty` an explicit owner type so an enclosing class can carry
/// annotations of its own.
fn ensure_owner(ty: &mut Type, nesting: &dyn NestingInfo) -> bool {
    match ty {
        Type::Parameterized(parameterized) if parameterized.owner.is_some() => true,
        Type::Parameterized(parameterized) => match nesting.enclosing_instance_class(&parameterized.name) {
            Some(outer) => {
                parameterized.owner = Some(Box::new(Type::class(outer)));
                true
            }
            None => false,
        },
        Type::Class(class) => match nesting.enclosing_instance_class(&class.name) {
            Some(outer) => {
                let ClassType { name, annotations } = class.clone();
                *ty = Type::Parameterized(ParameterizedType {
                    name,
                    arguments: Vec::new(),
                    owner: Some(Box::new(Type::class(outer))),
                    annotations,
                });
                true
            }
            None => false,
        },
        _ => false,
    }
}
