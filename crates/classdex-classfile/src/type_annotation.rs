use crate::annotation::Annotation;
use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};
use crate::reader::Reader;

/// Where in a declaration's signature a type annotation applies.
///
/// Only targets that can appear on classes, fields, methods and record
/// components are kept; targets inside method bodies are skipped while
/// decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeAnnotationTarget {
    /// `0x00` / `0x01`: a class or method type parameter declaration.
    TypeParameter { method: bool, index: u8 },
    /// `0x10`: `extends` (`index == 0xFFFF`) or the `index`-th `implements` type.
    Supertype { index: u16 },
    /// `0x11` / `0x12`: bound `bound` of a class or method type parameter.
    TypeParameterBound { method: bool, index: u8, bound: u8 },
    /// `0x13`: the type of a field or record component.
    Field,
    /// `0x14`: a method return type, or the type of a constructed object.
    Return,
    /// `0x15`: the receiver type of an instance method.
    Receiver,
    /// `0x16`: a formal parameter, indexed over the logical parameters.
    FormalParameter { index: u8 },
    /// `0x17`: the `index`-th type in the `throws` clause.
    Throws { index: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypePathKind {
    /// Deeper into an array type.
    Array,
    /// Deeper into a nested type.
    Nested,
    /// Onto the bound of a wildcard type argument.
    WildcardBound,
    /// Onto the given type argument of a parameterized type.
    TypeArgument(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnnotation {
    pub target: TypeAnnotationTarget,
    pub path: Vec<TypePathKind>,
    pub annotation: Annotation,
}

impl TypeAnnotation {
    /// Parses a `Runtime(In)VisibleTypeAnnotations` body.
    ///
    /// Entries targeting code (local variables, casts, `new`, ...) are decoded
    /// and dropped.
    pub(crate) fn parse_list(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Vec<Self>> {
        let num = reader.read_u2()? as usize;
        let mut out = Vec::with_capacity(num);
        for _ in 0..num {
            if let Some(annotation) = Self::parse(reader, cp)? {
                out.push(annotation);
            }
        }
        Ok(out)
    }

    fn parse(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Option<Self>> {
        let target_type = reader.read_u1()?;
        let target = match target_type {
            0x00 | 0x01 => Some(TypeAnnotationTarget::TypeParameter {
                method: target_type == 0x01,
                index: reader.read_u1()?,
            }),
            0x10 => Some(TypeAnnotationTarget::Supertype {
                index: reader.read_u2()?,
            }),
            0x11 | 0x12 => Some(TypeAnnotationTarget::TypeParameterBound {
                method: target_type == 0x12,
                index: reader.read_u1()?,
                bound: reader.read_u1()?,
            }),
            0x13 => Some(TypeAnnotationTarget::Field),
            0x14 => Some(TypeAnnotationTarget::Return),
            0x15 => Some(TypeAnnotationTarget::Receiver),
            0x16 => Some(TypeAnnotationTarget::FormalParameter {
                index: reader.read_u1()?,
            }),
            0x17 => Some(TypeAnnotationTarget::Throws {
                index: reader.read_u2()?,
            }),
            0x40 | 0x41 => {
                let table_length = reader.read_u2()? as usize;
                reader.read_bytes(table_length * 6)?;
                None
            }
            0x42..=0x46 => {
                reader.read_u2()?;
                None
            }
            0x47..=0x4B => {
                reader.read_u2()?;
                reader.read_u1()?;
                None
            }
            _ => return Err(Error::MalformedAttribute("type_annotation target_type")),
        };

        let path_length = reader.read_u1()? as usize;
        let mut path = Vec::with_capacity(path_length);
        for _ in 0..path_length {
            let kind = reader.read_u1()?;
            let argument = reader.read_u1()?;
            path.push(match kind {
                0 => TypePathKind::Array,
                1 => TypePathKind::Nested,
                2 => TypePathKind::WildcardBound,
                3 => TypePathKind::TypeArgument(argument),
                _ => return Err(Error::MalformedAttribute("type_path")),
            });
        }

        let annotation = Annotation::parse(reader, cp)?;
        Ok(target.map(|target| TypeAnnotation {
            target,
            path,
            annotation,
        }))
    }
}
