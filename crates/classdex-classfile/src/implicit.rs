//! Detection and synthesis of members the language declares implicitly.
//!
//! Compilers disagree on whether these members carry `MethodParameters`,
//! which flags they get and whether some are emitted at all, so detection
//! looks at names, descriptors and (for default constructors) the bytecode.

use classdex_core::flags::{
    has, ACC_ENUM, ACC_MANDATED, ACC_PRIVATE, ACC_PROTECTED, ACC_PUBLIC, ACC_STATIC,
};

use crate::classfile::{ClassFile, ClassMember, MethodParameter, RecordComponent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImplicitKind {
    /// `static E[] values()` of an enum.
    EnumValues,
    /// `static E valueOf(String)` of an enum.
    EnumValueOf,
    /// Canonical record constructor written in full or generated.
    RecordCanonicalConstructor,
    /// Canonical record constructor written in compact form.
    RecordCompactConstructor,
    /// Accessor method of a record component.
    RecordAccessor,
    /// The no-argument constructor added to a class without constructors.
    DefaultConstructor,
}

const INVOKESPECIAL: u8 = 0xB7;
const ALOAD_0: u8 = 0x2A;
const ALOAD_1: u8 = 0x2B;
const ILOAD_2: u8 = 0x1C;
const PUTFIELD: u8 = 0xB5;
const RETURN: u8 = 0xB1;

pub(crate) fn classify(class: &ClassFile, method: &ClassMember) -> Option<ImplicitKind> {
    let is_static = has(method.access_flags, ACC_STATIC);

    if has(class.access_flags, ACC_ENUM) && is_static {
        if method.name == "values" && method.descriptor == values_descriptor(&class.this_class) {
            return Some(ImplicitKind::EnumValues);
        }
        if method.name == "valueOf" && method.descriptor == value_of_descriptor(&class.this_class)
        {
            return Some(ImplicitKind::EnumValueOf);
        }
    }

    if let Some(components) = &class.record_components {
        if method.name == "<init>" && method.descriptor == canonical_descriptor(components) {
            let compact = method.method_parameters.as_ref().is_some_and(|params| {
                !params.is_empty() && params.iter().all(|p| has(p.access_flags, ACC_MANDATED))
            });
            return Some(if compact {
                ImplicitKind::RecordCompactConstructor
            } else {
                ImplicitKind::RecordCanonicalConstructor
            });
        }
        if !is_static
            && components
                .iter()
                .any(|c| c.name == method.name && method.descriptor == accessor_descriptor(c))
        {
            return Some(ImplicitKind::RecordAccessor);
        }
    }

    if method.name == "<init>" && is_default_constructor(class, method) {
        return Some(ImplicitKind::DefaultConstructor);
    }
    None
}

/// Recognizes the bytecode a compiler emits for a constructor nobody wrote:
/// a bare `super(...)` call forwarding only what the language passes implicitly.
fn is_default_constructor(class: &ClassFile, method: &ClassMember) -> bool {
    let (Some(code), Some(super_class)) = (&method.code, class.super_class.as_deref()) else {
        return false;
    };

    match code.as_slice() {
        [ALOAD_0, INVOKESPECIAL, hi, lo, RETURN] => {
            method.descriptor == "()V" && invokes_super_init(class, super_class, [*hi, *lo], "()V")
        }
        [ALOAD_0, ALOAD_1, ILOAD_2, INVOKESPECIAL, hi, lo, RETURN] => {
            let descriptor = "(Ljava/lang/String;I)V";
            has(class.access_flags, ACC_ENUM)
                && method.descriptor == descriptor
                && invokes_super_init(class, super_class, [*hi, *lo], descriptor)
        }
        [ALOAD_0, ALOAD_1, PUTFIELD, _, _, ALOAD_0, INVOKESPECIAL, hi, lo, RETURN] => {
            let Some(outer) = class
                .own_inner_class_entry()
                .and_then(|entry| entry.outer_class.as_deref())
            else {
                return false;
            };
            method.descriptor == format!("(L{outer};)V")
                && invokes_super_init(class, super_class, [*hi, *lo], "()V")
        }
        _ => false,
    }
}

fn invokes_super_init(class: &ClassFile, super_class: &str, index: [u8; 2], descriptor: &str) -> bool {
    class
        .constant_pool
        .get_member_ref(u16::from_be_bytes(index))
        .is_ok_and(|target| {
            target.class_name == super_class
                && target.name == "<init>"
                && target.descriptor == descriptor
        })
}

pub(crate) fn synthesize(class: &mut ClassFile) {
    let mut added = Vec::new();

    if has(class.access_flags, ACC_ENUM) {
        if !declares(class, ImplicitKind::EnumValues) {
            added.push(implicit_method(
                "values",
                values_descriptor(&class.this_class),
                ACC_PUBLIC | ACC_STATIC,
                ImplicitKind::EnumValues,
            ));
        }
        if !declares(class, ImplicitKind::EnumValueOf) {
            let mut value_of = implicit_method(
                "valueOf",
                value_of_descriptor(&class.this_class),
                ACC_PUBLIC | ACC_STATIC,
                ImplicitKind::EnumValueOf,
            );
            value_of.method_parameters = Some(vec![MethodParameter {
                name: Some("name".to_string()),
                access_flags: ACC_MANDATED,
            }]);
            added.push(value_of);
        }
    }

    if let Some(components) = &class.record_components {
        for component in components {
            let descriptor = accessor_descriptor(component);
            let present = class
                .methods
                .iter()
                .any(|m| m.name == component.name && m.descriptor == descriptor);
            if !present {
                let mut accessor = implicit_method(
                    &component.name,
                    descriptor,
                    ACC_PUBLIC,
                    ImplicitKind::RecordAccessor,
                );
                accessor.signature = component.signature.as_ref().map(|sig| format!("(){sig}"));
                added.push(accessor);
            }
        }

        let has_canonical = declares(class, ImplicitKind::RecordCanonicalConstructor)
            || declares(class, ImplicitKind::RecordCompactConstructor);
        if !has_canonical {
            let visibility = class
                .own_inner_class_entry()
                .map_or(class.access_flags, |entry| entry.access_flags)
                & (ACC_PUBLIC | ACC_PROTECTED | ACC_PRIVATE);
            let mut init = implicit_method(
                "<init>",
                canonical_descriptor(components),
                visibility,
                ImplicitKind::RecordCanonicalConstructor,
            );
            if components.iter().any(|c| c.signature.is_some()) {
                let params: String = components
                    .iter()
                    .map(|c| c.signature.as_deref().unwrap_or(&c.descriptor))
                    .collect();
                init.signature = Some(format!("({params})V"));
            }
            init.method_parameters = Some(
                components
                    .iter()
                    .map(|c| MethodParameter {
                        name: Some(c.name.clone()),
                        access_flags: 0,
                    })
                    .collect(),
            );
            added.push(init);
        }
    }

    class.methods.extend(added);
}

fn declares(class: &ClassFile, kind: ImplicitKind) -> bool {
    class.methods.iter().any(|m| m.implicit == Some(kind))
}

fn implicit_method(name: &str, descriptor: String, access_flags: u16, kind: ImplicitKind) -> ClassMember {
    ClassMember {
        access_flags,
        name: name.to_string(),
        descriptor,
        implicit: Some(kind),
        synthesized: true,
        ..ClassMember::default()
    }
}

fn values_descriptor(this_class: &str) -> String {
    format!("()[L{this_class};")
}

fn value_of_descriptor(this_class: &str) -> String {
    format!("(Ljava/lang/String;)L{this_class};")
}

fn accessor_descriptor(component: &RecordComponent) -> String {
    format!("(){}", component.descriptor)
}

fn canonical_descriptor(components: &[RecordComponent]) -> String {
    let params: String = components.iter().map(|c| c.descriptor.as_str()).collect();
    format!("({params})V")
}
