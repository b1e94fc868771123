//! Rendering types back into the `Signature` attribute grammar.
//!
//! Every renderer takes a substitution: a type variable whose identifier it
//! maps to a type is written as that type, and its declaration is left out
//! of the type parameter list. Substitution is purely structural; bounds are
//! not checked.

use std::sync::Arc;

use classdex_core::NameTable;

use crate::params::TypeVarScope;
use crate::signature::{parse_class_signature, parse_field_signature, parse_method_signature, Result};
use crate::ty::{Type, TypeVariable, WildcardBound};

pub type Substitution<'a> = &'a dyn Fn(&str) -> Option<Type>;

/// A substitution that keeps every variable.
pub fn no_substitution(_identifier: &str) -> Option<Type> {
    None
}

pub fn class_signature(
    type_parameters: &[Arc<TypeVariable>],
    superclass: Option<&Type>,
    interfaces: &[Type],
    subst: Substitution<'_>,
) -> String {
    let mut out = String::new();
    write_type_parameters(&mut out, type_parameters, subst);
    match superclass {
        Some(superclass) => write_type(&mut out, superclass, subst),
        None => out.push_str("Ljava/lang/Object;"),
    }
    for interface in interfaces {
        write_type(&mut out, interface, subst);
    }
    out
}

/// The `throws` clause is only written when it carries generic information.
pub fn method_signature(
    type_parameters: &[Arc<TypeVariable>],
    parameters: &[Type],
    return_type: &Type,
    exceptions: &[Type],
    subst: Substitution<'_>,
) -> String {
    let mut out = String::new();
    write_type_parameters(&mut out, type_parameters, subst);
    out.push('(');
    for parameter in parameters {
        write_type(&mut out, parameter, subst);
    }
    out.push(')');
    write_type(&mut out, return_type, subst);
    if exceptions.iter().any(|exception| !matches!(exception, Type::Class(_))) {
        for exception in exceptions {
            out.push('^');
            write_type(&mut out, exception, subst);
        }
    }
    out
}

pub fn field_signature(ty: &Type, subst: Substitution<'_>) -> String {
    let mut out = String::new();
    write_type(&mut out, ty, subst);
    out
}

/// Rewrites a class, method or field signature as if the type variables
/// `subst` maps were bound to the given types.
pub fn substitute_signature(signature: &str, subst: Substitution<'_>) -> Result<String> {
    let mut names = NameTable::new();
    let scope = TypeVarScope::new();

    if signature.contains('(') {
        let method = parse_method_signature(signature, &mut names, &scope, |_| {})?;
        return Ok(method_signature(
            &method.type_parameters,
            &method.parameters,
            &method.return_type,
            &method.exceptions,
            subst,
        ));
    }
    if !signature.starts_with('<') {
        if let Ok(ty) = parse_field_signature(signature, &mut names, &scope) {
            return Ok(field_signature(&ty, subst));
        }
    }
    let class = parse_class_signature(signature, &mut names, &scope, |_| {})?;
    Ok(class_signature(
        &class.type_parameters,
        Some(&class.superclass),
        &class.interfaces,
        subst,
    ))
}

fn write_type_parameters(out: &mut String, type_parameters: &[Arc<TypeVariable>], subst: Substitution<'_>) {
    let kept: Vec<_> = type_parameters
        .iter()
        .filter(|variable| subst(&variable.identifier).is_none())
        .collect();
    if kept.is_empty() {
        return;
    }

    out.push('<');
    for variable in kept {
        out.push_str(&variable.identifier);
        out.push(':');
        if variable.implicit_object_bound {
            out.push(':');
        }
        if variable.bounds.is_empty() {
            out.push_str("Ljava/lang/Object;");
        }
        for (i, bound) in variable.bounds.iter().enumerate() {
            if i > 0 {
                out.push(':');
            }
            write_type(out, bound, subst);
        }
    }
    out.push('>');
}

pub(crate) fn write_type(out: &mut String, ty: &Type, subst: Substitution<'_>) {
    match ty {
        Type::Void => out.push('V'),
        Type::Primitive(t) => out.push(t.primitive.descriptor()),
        Type::Array(t) => {
            for _ in 0..t.dimensions {
                out.push('[');
            }
            write_type(out, &t.component, subst);
        }
        Type::Class(_) | Type::Parameterized(_) => {
            out.push('L');
            write_class_body(out, ty, subst);
            out.push(';');
        }
        Type::TypeVariable(_) | Type::TypeVariableReference(_) | Type::UnresolvedTypeVariable(_) => {
            let identifier = ty.identifier().unwrap_or_default();
            match subst(identifier) {
                Some(replacement) => write_type(out, &replacement, &no_substitution),
                None => {
                    out.push('T');
                    out.push_str(identifier);
                    out.push(';');
                }
            }
        }
        Type::Wildcard(t) => match &t.bound {
            WildcardBound::Unbounded => out.push('*'),
            WildcardBound::Extends(bound) => {
                out.push('+');
                write_type(out, bound, subst);
            }
            WildcardBound::Super(bound) => {
                out.push('-');
                write_type(out, bound, subst);
            }
        },
    }
}

/// Class type without the leading `L` and trailing `;`.
fn write_class_body(out: &mut String, ty: &Type, subst: Substitution<'_>) {
    let internal = ty.name().to_string_with('/');
    let Type::Parameterized(parameterized) = ty else {
        out.push_str(&internal);
        return;
    };

    match parameterized.owner.as_deref() {
        Some(owner @ Type::Parameterized(outer)) if outer.has_arguments_in_chain() => {
            write_class_body(out, owner, subst);
            out.push('.');
            let outer_internal = owner.name().to_string_with('/');
            let simple = internal
                .strip_prefix(&outer_internal)
                .and_then(|rest| rest.strip_prefix('$'))
                .unwrap_or(&internal);
            out.push_str(simple);
        }
        _ => out.push_str(&internal),
    }

    if !parameterized.arguments.is_empty() {
        out.push('<');
        for argument in &parameterized.arguments {
            write_type(out, argument, subst);
        }
        out.push('>');
    }
}
