//! Decoding of JVM class files into a flat, pre-resolution form.
//!
//! [`ClassFile::parse`] reads the constant pool, members and the attributes
//! classdex cares about. Generic signatures and type annotations are kept raw;
//! turning them into types is left to `classdex-types`.

#![forbid(unsafe_code)]

mod annotation;
mod classfile;
mod constant_pool;
mod descriptor;
mod error;
mod implicit;
mod reader;
mod type_annotation;

pub use crate::annotation::{descriptor_to_internal_name, Annotation, ConstValue, ElementValue};
pub use crate::classfile::{
    ClassFile, ClassMember, EnclosingMethod, InnerClassInfo, MethodParameter, RecordComponent,
};
pub use crate::constant_pool::{ConstantPool, CpInfo, MemberRef};
pub use crate::descriptor::{
    parse_field_descriptor, parse_method_descriptor, parse_return_descriptor, BaseType, FieldType,
    MethodDescriptor, ReturnType,
};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::implicit::ImplicitKind;
pub use crate::type_annotation::{TypeAnnotation, TypeAnnotationTarget, TypePathKind};
