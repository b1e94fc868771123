use classdex_classfile::{
    descriptor_to_internal_name, parse_return_descriptor, Annotation, ConstValue, ElementValue,
};
use classdex_core::{DotName, NameTable};
use smol_str::SmolStr;

use crate::descriptor::return_type_to_type;
use crate::ty::Type;

/// An annotation with resolved names, attached to some declaration or type.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationInstance {
    pub name: DotName,
    pub target: Option<AnnotationTarget>,
    pub values: Vec<AnnotationValue>,
    /// `false` for annotations read from a `RuntimeInvisible*` attribute.
    pub runtime_visible: bool,
}

/// A named annotation member. Array elements have an empty name.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationValue {
    pub name: SmolStr,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(u16),
    String(String),
    Class(Type),
    Enum { type_name: DotName, constant: SmolStr },
    Nested(Box<AnnotationInstance>),
    Array(Vec<AnnotationValue>),
}

/// The declaration an annotation was found on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnnotationTarget {
    Class(DotName),
    Field {
        class: DotName,
        name: SmolStr,
    },
    Method {
        class: DotName,
        name: SmolStr,
        descriptor: SmolStr,
    },
    MethodParameter {
        class: DotName,
        method: SmolStr,
        descriptor: SmolStr,
        position: u16,
    },
    RecordComponent {
        class: DotName,
        name: SmolStr,
    },
    /// A type-use annotation somewhere inside the type of `enclosing`.
    Type {
        enclosing: Box<AnnotationTarget>,
        usage: TypeUsage,
    },
}

/// Which type of the enclosing declaration a type annotation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeUsage {
    Field,
    RecordComponent,
    Return,
    Receiver,
    /// `position` 0xFFFF is the superclass, otherwise an interface index.
    Extends { position: u16 },
    MethodParameter { position: u16 },
    TypeParameter { position: u8 },
    TypeParameterBound { position: u8, bound: u8 },
    Throws { position: u16 },
}

impl AnnotationInstance {
    pub fn new(name: DotName, target: Option<AnnotationTarget>, values: Vec<AnnotationValue>) -> Self {
        Self {
            name,
            target,
            values,
            runtime_visible: true,
        }
    }

    /// Resolves a raw class-file annotation.
    ///
    /// Returns `None` when the annotation type is not a class descriptor.
    pub fn from_classfile(
        raw: &Annotation,
        target: Option<AnnotationTarget>,
        runtime_visible: bool,
        names: &mut NameTable,
    ) -> Option<Self> {
        let name = names.from_internal(raw.type_internal_name()?);
        let values = raw
            .elements
            .iter()
            .filter_map(|(member, value)| {
                Some(AnnotationValue {
                    name: SmolStr::new(member),
                    value: Value::from_classfile(value, names)?,
                })
            })
            .collect();
        Some(Self {
            name,
            target,
            values,
            runtime_visible,
        })
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|v| v.name == name).map(|v| &v.value)
    }

    /// The same annotation with a different target.
    pub fn retarget(&self, target: AnnotationTarget) -> Self {
        Self {
            target: Some(target),
            ..self.clone()
        }
    }

    pub fn is_type_annotation(&self) -> bool {
        matches!(self.target, Some(AnnotationTarget::Type { .. }))
    }
}

impl Value {
    /// Resolves a raw element value, e.g. an `AnnotationDefault`.
    pub fn from_classfile(value: &ElementValue, names: &mut NameTable) -> Option<Value> {
        Some(match value {
            ElementValue::Const(constant) => match constant {
                ConstValue::Byte(v) => Value::Byte(*v),
                ConstValue::Char(v) => Value::Char(*v),
                ConstValue::Short(v) => Value::Short(*v),
                ConstValue::Int(v) => Value::Int(*v),
                ConstValue::Long(v) => Value::Long(*v),
                ConstValue::Float(v) => Value::Float(*v),
                ConstValue::Double(v) => Value::Double(*v),
                ConstValue::Boolean(v) => Value::Boolean(*v),
                ConstValue::String(v) => Value::String(v.clone()),
            },
            ElementValue::Enum {
                type_descriptor,
                const_name,
            } => Value::Enum {
                type_name: names.from_internal(descriptor_to_internal_name(type_descriptor)?),
                constant: SmolStr::new(const_name),
            },
            ElementValue::Class(descriptor) => {
                let ty = parse_return_descriptor(descriptor).ok()?;
                Value::Class(return_type_to_type(&ty, names))
            }
            ElementValue::Annotation(nested) => Value::Nested(Box::new(
                AnnotationInstance::from_classfile(nested, None, true, names)?,
            )),
            ElementValue::Array(elements) => Value::Array(
                elements
                    .iter()
                    .filter_map(|element| {
                        Some(AnnotationValue {
                            name: SmolStr::default(),
                            value: Value::from_classfile(element, names)?,
                        })
                    })
                    .collect(),
            ),
        })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Class(_) => "class",
            Value::Enum { .. } => "enum",
            Value::Nested(_) => "nested",
            Value::Array(_) => "array",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl AnnotationTarget {
    /// The declaration a type-use target belongs to.
    pub fn declaration(&self) -> &AnnotationTarget {
        match self {
            AnnotationTarget::Type { enclosing, .. } => enclosing.declaration(),
            other => other,
        }
    }

    pub fn class_name(&self) -> &DotName {
        match self {
            AnnotationTarget::Class(class)
            | AnnotationTarget::Field { class, .. }
            | AnnotationTarget::Method { class, .. }
            | AnnotationTarget::MethodParameter { class, .. }
            | AnnotationTarget::RecordComponent { class, .. } => class,
            AnnotationTarget::Type { enclosing, .. } => enclosing.class_name(),
        }
    }
}
