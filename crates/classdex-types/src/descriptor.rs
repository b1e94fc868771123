use classdex_classfile::{FieldType, MethodDescriptor, ReturnType};
use classdex_core::NameTable;

use crate::ty::Type;

/// The type a raw field descriptor denotes.
pub fn field_type_to_type(ty: &FieldType, names: &mut NameTable) -> Type {
    match ty {
        FieldType::Base(base) => Type::primitive(*base),
        FieldType::Object(internal) => Type::class(names.from_internal(internal)),
        FieldType::Array(component) => Type::array(field_type_to_type(component, names), 1),
    }
}

pub fn return_type_to_type(ty: &ReturnType, names: &mut NameTable) -> Type {
    match ty {
        ReturnType::Void => Type::Void,
        ReturnType::Type(ty) => field_type_to_type(ty, names),
    }
}

/// Parameter and return types of a method descriptor.
pub fn method_descriptor_types(descriptor: &MethodDescriptor, names: &mut NameTable) -> (Vec<Type>, Type) {
    let params = descriptor
        .params
        .iter()
        .map(|param| field_type_to_type(param, names))
        .collect();
    (params, return_type_to_type(&descriptor.return_type, names))
}
