//! Structural identity of declarations.
//!
//! Keys ignore annotations entirely: two parses of the same declaration
//! compare equal even when an overlay added or removed annotations on one
//! of them. Types are compared in their rendered, annotation-free form.

use std::fmt;
use std::sync::Arc;

use classdex_core::flags::modifiers_to_string;
use classdex_core::DotName;
use classdex_types::{Type, TypeVariable};
use smol_str::SmolStr;

use crate::info::{ClassInfo, FieldInfo, MethodInfo, MethodParameterInfo, RecordComponentInfo};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeParameterKey {
    pub identifier: SmolStr,
    pub bounds: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EquivalenceKey {
    Class {
        name: DotName,
        flags: u16,
        type_parameters: Vec<TypeParameterKey>,
        super_class: Option<String>,
        interfaces: Vec<String>,
    },
    Field {
        owner: DotName,
        name: SmolStr,
        flags: u16,
        ty: String,
    },
    Method {
        owner: DotName,
        name: SmolStr,
        flags: u16,
        type_parameters: Vec<TypeParameterKey>,
        parameters: Vec<String>,
        return_type: String,
    },
    MethodParameter {
        owner: DotName,
        method: SmolStr,
        descriptor: SmolStr,
        position: u16,
        ty: String,
    },
    RecordComponent {
        owner: DotName,
        name: SmolStr,
        ty: String,
    },
}

/// Anything that has an [`EquivalenceKey`].
pub trait Declaration {
    fn equivalence_key(&self) -> EquivalenceKey;
}

pub fn key_of(declaration: &impl Declaration) -> EquivalenceKey {
    declaration.equivalence_key()
}

impl Declaration for ClassInfo {
    fn equivalence_key(&self) -> EquivalenceKey {
        EquivalenceKey::Class {
            name: self.name.clone(),
            flags: self.flags,
            type_parameters: type_parameter_keys(&self.type_parameters),
            super_class: self.super_class_type.as_ref().map(Type::to_plain_string),
            interfaces: plain(&self.interface_types),
        }
    }
}

impl Declaration for FieldInfo {
    fn equivalence_key(&self) -> EquivalenceKey {
        EquivalenceKey::Field {
            owner: self.owner.clone(),
            name: self.name.clone(),
            flags: self.flags,
            ty: self.ty.to_plain_string(),
        }
    }
}

impl Declaration for MethodInfo {
    fn equivalence_key(&self) -> EquivalenceKey {
        EquivalenceKey::Method {
            owner: self.owner.clone(),
            name: self.name.clone(),
            flags: self.flags,
            type_parameters: type_parameter_keys(&self.type_parameters),
            parameters: plain(&self.parameter_types),
            return_type: self.return_type.to_plain_string(),
        }
    }
}

impl Declaration for MethodParameterInfo {
    fn equivalence_key(&self) -> EquivalenceKey {
        EquivalenceKey::MethodParameter {
            owner: self.owner.clone(),
            method: self.method.clone(),
            descriptor: self.descriptor.clone(),
            position: self.position,
            ty: self.ty.to_plain_string(),
        }
    }
}

impl Declaration for RecordComponentInfo {
    fn equivalence_key(&self) -> EquivalenceKey {
        EquivalenceKey::RecordComponent {
            owner: self.owner.clone(),
            name: self.name.clone(),
            ty: self.ty.to_plain_string(),
        }
    }
}

fn plain(types: &[Type]) -> Vec<String> {
    types.iter().map(Type::to_plain_string).collect()
}

fn type_parameter_keys(variables: &[Arc<TypeVariable>]) -> Vec<TypeParameterKey> {
    variables
        .iter()
        .map(|variable| TypeParameterKey {
            identifier: variable.identifier.clone(),
            bounds: plain(&variable.bounds),
        })
        .collect()
}

fn write_modifiers(f: &mut fmt::Formatter<'_>, flags: u16, is_method: bool) -> fmt::Result {
    let modifiers = modifiers_to_string(flags, is_method);
    if modifiers.is_empty() {
        Ok(())
    } else {
        write!(f, "{modifiers} ")
    }
}

fn write_where(f: &mut fmt::Formatter<'_>, type_parameters: &[TypeParameterKey]) -> fmt::Result {
    for (i, parameter) in type_parameters.iter().enumerate() {
        f.write_str(if i == 0 { " where " } else { ", " })?;
        f.write_str(&parameter.identifier)?;
        if !parameter.bounds.is_empty() {
            write!(f, " extends {}", parameter.bounds.join(" & "))?;
        }
    }
    Ok(())
}

impl fmt::Display for EquivalenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EquivalenceKey::Class {
                name,
                flags,
                type_parameters,
                super_class,
                interfaces,
            } => {
                f.write_str("class ")?;
                write_modifiers(f, *flags, false)?;
                write!(f, "{name}")?;
                if let Some(super_class) = super_class {
                    write!(f, " extends {super_class}")?;
                }
                if !interfaces.is_empty() {
                    write!(f, " implements {}", interfaces.join(", "))?;
                }
                write_where(f, type_parameters)
            }
            EquivalenceKey::Field { owner, name, flags, ty } => {
                f.write_str("field ")?;
                write_modifiers(f, *flags, false)?;
                write!(f, "{owner}#{name}: {ty}")
            }
            EquivalenceKey::Method {
                owner,
                name,
                flags,
                type_parameters,
                parameters,
                return_type,
            } => {
                f.write_str("method ")?;
                write_modifiers(f, *flags, true)?;
                write!(f, "{owner}#{name}({}) -> {return_type}", parameters.join(", "))?;
                write_where(f, type_parameters)
            }
            EquivalenceKey::MethodParameter {
                owner,
                method,
                descriptor,
                position,
                ty,
            } => write!(f, "parameter {owner}#{method}{descriptor} [{position}]: {ty}"),
            EquivalenceKey::RecordComponent { owner, name, ty } => {
                write!(f, "record component {owner}#{name}: {ty}")
            }
        }
    }
}
