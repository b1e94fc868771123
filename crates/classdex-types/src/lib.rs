//! The classdex type model.
//!
//! [`Type`] describes a Java type as written in a declaration, including
//! generic arguments, type variables and type-use annotations. Types are
//! built from descriptors ([`field_type_to_type`]) or from generic
//! signatures ([`parse_class_signature`] and friends), and type annotations
//! are grafted onto them with [`attach_to_type`].
//!
//! Type variables that refer to themselves or to a later sibling in their
//! own parameter list (`<T extends Comparable<T>>`) are represented as
//! [`Type::TypeVariableReference`], a weak link to the finished
//! declaration. Following such a link never walks the graph, so recursive
//! bounds cannot loop.

#![forbid(unsafe_code)]

mod annotation;
mod attach;
mod descriptor;
mod params;
mod render;
mod signature;
mod ty;

pub use crate::annotation::{AnnotationInstance, AnnotationTarget, AnnotationValue, TypeUsage, Value};
pub use crate::attach::{
    attach_to_type, attach_to_type_parameter, attach_to_type_parameter_bound, NestingInfo, NoNesting,
};
pub use crate::descriptor::{field_type_to_type, method_descriptor_types, return_type_to_type};
pub use crate::params::{TypeParametersBuilder, TypeVarScope};
pub use crate::render::{
    class_signature, field_signature, method_signature, no_substitution, substitute_signature, Substitution,
};
pub use crate::signature::{
    parse_class_signature, parse_field_signature, parse_method_signature, ClassSignature, MethodSignature,
    SignatureError,
};
pub use crate::ty::{
    ArrayType, ClassType, ParameterizedType, PrimitiveType, Type, TypeKind, TypeVariable, TypeVariableReference,
    UnresolvedTypeVariable, WildcardBound, WildcardType,
};
