use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt};
use classdex_classfile::{BaseType, ImplicitKind};
use classdex_core::{DotName, NameTable};
use classdex_index::{
    ClassInfo, EnclosingMethodInfo, FieldInfo, Index, MethodInfo, NestingType, RecordComponentInfo,
};
use classdex_types::{
    AnnotationInstance, AnnotationTarget, AnnotationValue, ArrayType, Type, TypeParametersBuilder, TypeUsage,
    TypeVariable, Value, WildcardBound,
};
use smol_str::SmolStr;

use crate::error::{Result, StorageError};
use crate::format::{content_hash, tag, Feature, FormatVersion, Header, HEADER_LEN, MAX_DEPTH, NO_STRING};

/// Deserializes indexes written by any supported format version.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexReader;

impl IndexReader {
    /// Checks the header and the payload hash, then rebuilds the index.
    pub fn read(bytes: &[u8]) -> Result<Index> {
        let header = Header::decode(bytes)?;
        let payload = payload(bytes, &header)?;

        let found = content_hash(payload);
        if found != header.content_hash {
            return Err(StorageError::HashMismatch {
                expected: header.content_hash,
                found,
            });
        }

        let index = Decoder::new(header.version, payload)?.index()?;
        tracing::debug!(
            target: "classdex.storage",
            version = %header.version,
            classes = index.len(),
            bytes = bytes.len(),
            "read index"
        );
        Ok(index)
    }

    pub fn read_from<R: Read>(mut input: R) -> Result<Index> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        IndexReader::read(&bytes)
    }

    /// The header alone, without verifying the payload.
    pub fn header(bytes: &[u8]) -> Result<Header> {
        Header::decode(bytes)
    }
}

pub fn read_from_path(path: &Path) -> Result<Index> {
    let bytes = fs::read(path)?;
    IndexReader::read(&bytes)
}

fn payload<'a>(bytes: &'a [u8], header: &Header) -> Result<&'a [u8]> {
    let expected = usize::try_from(header.payload_len)
        .ok()
        .and_then(|len| len.checked_add(HEADER_LEN))
        .ok_or(StorageError::Malformed {
            offset: 8,
            message: "payload length overflow",
        })?;
    if bytes.len() < expected {
        return Err(StorageError::Truncated {
            expected,
            found: bytes.len(),
        });
    }
    if bytes.len() > expected {
        return Err(StorageError::Malformed {
            offset: expected,
            message: "trailing bytes after payload",
        });
    }
    Ok(&bytes[HEADER_LEN..])
}

/// Type variables visible while decoding a type.
#[derive(Clone, Default)]
struct Scope<'s> {
    levels: Vec<&'s [Arc<TypeVariable>]>,
    building: Option<&'s TypeParametersBuilder>,
}

impl<'s> Scope<'s> {
    fn with_level(&self, level: &'s [Arc<TypeVariable>]) -> Scope<'s> {
        let mut levels = self.levels.clone();
        levels.push(level);
        Scope { levels, building: None }
    }
}

struct Decoder<'a> {
    version: FormatVersion,
    cursor: Cursor<&'a [u8]>,
    strings: Vec<SmolStr>,
    names: Vec<Option<DotName>>,
    table: NameTable,
}

impl<'a> Decoder<'a> {
    fn new(version: FormatVersion, payload: &'a [u8]) -> Result<Self> {
        let mut decoder = Decoder {
            version,
            cursor: Cursor::new(payload),
            strings: Vec::new(),
            names: Vec::new(),
            table: NameTable::new(),
        };

        let count = decoder.u32()? as usize;
        let mut strings = Vec::with_capacity(count.min(decoder.remaining() / 4));
        for _ in 0..count {
            let len = decoder.u32()? as usize;
            let bytes = decoder.bytes(len)?;
            let string = std::str::from_utf8(bytes)
                .map_err(|_| decoder.malformed("string is not valid UTF-8"))?;
            strings.push(SmolStr::new(string));
        }
        decoder.names = vec![None; strings.len()];
        decoder.strings = strings;
        Ok(decoder)
    }

    fn supports(&self, feature: Feature) -> bool {
        self.version.supports(feature)
    }

    fn index(mut self) -> Result<Index> {
        let count = self.u32()? as usize;
        let mut classes = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            classes.push(self.class()?);
        }

        let mut users: BTreeMap<DotName, BTreeSet<DotName>> = BTreeMap::new();
        if self.supports(Feature::Users) {
            let count = self.u32()?;
            for _ in 0..count {
                let used = self.name()?;
                let by = self.u32()?;
                let entry = users.entry(used).or_default();
                for _ in 0..by {
                    entry.insert(self.name()?);
                }
            }
        }

        if self.remaining() != 0 {
            return Err(self.malformed("trailing bytes in payload"));
        }
        Ok(Index::from_classes(classes, users))
    }

    fn class(&mut self) -> Result<ClassInfo> {
        let name = self.name()?;
        let flags = self.u16()?;
        let nesting = match self.u8()? {
            0 => NestingType::TopLevel,
            1 => NestingType::Inner,
            2 => NestingType::Local,
            3 => NestingType::Anonymous,
            _ => return Err(self.malformed("unknown nesting type")),
        };
        let simple_name = self.opt_str()?;
        let enclosing_class = self.opt_name()?;
        let enclosing_method = match self.flag()? {
            true => Some(EnclosingMethodInfo {
                class: self.name()?,
                name: self.str()?,
                descriptor: self.str()?,
            }),
            false => None,
        };
        let member_classes = self.names()?;
        let permitted_subclasses = self.names()?;
        let source_file = self.opt_str()?;

        let outer = Scope::default();
        let type_parameters = self.type_parameters(&outer)?;
        let scope = outer.with_level(&type_parameters);

        let super_class = self.opt_name()?;
        let super_class_type = self.opt_type(&scope)?;
        let interface_types = self.types(&scope, 0)?;

        let fields = self.members(|decoder| decoder.field(&name, &scope))?;
        let methods = self.members(|decoder| decoder.method(&name, &scope))?;

        let record_components = if self.supports(Feature::RecordComponents) && self.flag()? {
            let count = self.u16()?;
            let mut components = Vec::with_capacity(usize::from(count));
            for _ in 0..count {
                components.push(RecordComponentInfo {
                    owner: name.clone(),
                    name: self.str()?,
                    ty: self.ty(&scope, 0)?,
                    annotations: self.annotations(0)?,
                });
            }
            Some(components)
        } else {
            None
        };

        let annotations = self.annotations(0)?;

        Ok(ClassInfo {
            name,
            flags,
            nesting,
            simple_name,
            enclosing_class,
            enclosing_method,
            member_classes,
            permitted_subclasses,
            source_file,
            type_parameters,
            super_class,
            super_class_type,
            interface_types,
            fields,
            methods,
            record_components,
            annotations,
        })
    }

    /// Members are stored sorted by name. With positions they go back to
    /// their declared order; without, sorted order is all there is.
    fn members<T>(&mut self, mut read: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let count = self.u32()? as usize;
        if count > self.remaining() {
            return Err(self.malformed("member count exceeds the payload"));
        }
        if !self.supports(Feature::MemberPositions) {
            let mut members = Vec::with_capacity(count);
            for _ in 0..count {
                members.push(read(self)?);
            }
            return Ok(members);
        }

        let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(count).collect();
        for _ in 0..count {
            let position = self.u32()? as usize;
            let member = read(self)?;
            let Some(slot) = slots.get_mut(position) else {
                return Err(self.malformed("member position out of range"));
            };
            if slot.is_some() {
                return Err(self.malformed("duplicate member position"));
            }
            *slot = Some(member);
        }
        Ok(slots.into_iter().flatten().collect())
    }

    fn field(&mut self, owner: &DotName, scope: &Scope<'_>) -> Result<FieldInfo> {
        Ok(FieldInfo {
            owner: owner.clone(),
            name: self.str()?,
            flags: self.u16()?,
            ty: self.ty(scope, 0)?,
            annotations: self.annotations(0)?,
        })
    }

    fn method(&mut self, owner: &DotName, class_scope: &Scope<'_>) -> Result<MethodInfo> {
        let name = self.str()?;
        let flags = self.u16()?;
        let descriptor = self.str()?;

        let type_parameters = self.type_parameters(class_scope)?;
        let scope = class_scope.with_level(&type_parameters);

        let return_type = self.ty(&scope, 0)?;
        let receiver_type = self.opt_type(&scope)?;
        let parameter_types = self.types(&scope, 0)?;
        let descriptor_parameter_types = self.types(&scope, 0)?;

        let count = self.u16()?;
        let mut parameter_positions = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            parameter_positions.push(self.u16()?);
        }
        let count = self.u16()?;
        let mut parameter_names = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            parameter_names.push(self.opt_str()?);
        }

        let exceptions = self.types(&scope, 0)?;
        let default_value = match self.flag()? {
            true => Some(self.value(0)?),
            false => None,
        };
        let implicit = match self.u8()? {
            0 => None,
            1 => Some(ImplicitKind::EnumValues),
            2 => Some(ImplicitKind::EnumValueOf),
            3 => Some(ImplicitKind::RecordCanonicalConstructor),
            4 => Some(ImplicitKind::RecordCompactConstructor),
            5 => Some(ImplicitKind::RecordAccessor),
            6 => Some(ImplicitKind::DefaultConstructor),
            _ => return Err(self.malformed("unknown implicit member kind")),
        };
        let synthesized = self.flag()?;
        let annotations = self.annotations(0)?;

        Ok(MethodInfo {
            owner: owner.clone(),
            name,
            flags,
            descriptor,
            type_parameters,
            return_type,
            receiver_type,
            parameter_types,
            descriptor_parameter_types,
            parameter_positions,
            parameter_names,
            exceptions,
            default_value,
            implicit,
            synthesized,
            annotations,
        })
    }

    fn type_parameters(&mut self, outer: &Scope<'_>) -> Result<Vec<Arc<TypeVariable>>> {
        let count = self.u16()?;
        let mut identifiers = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            identifiers.push(self.str()?);
        }

        let mut builder = TypeParametersBuilder::new(identifiers);
        let mut declarations = Vec::with_capacity(builder.len());
        {
            let scope = Scope {
                levels: outer.levels.clone(),
                building: Some(&builder),
            };
            for _ in 0..builder.len() {
                let implicit_object_bound = self.flag()?;
                let annotations = self.annotations(0)?;
                let bounds = self.types(&scope, 0)?;
                declarations.push((implicit_object_bound, annotations, bounds));
            }
        }

        for (position, (implicit_object_bound, annotations, bounds)) in declarations.into_iter().enumerate() {
            if let Some(variable) = builder.variable_mut(position) {
                variable.annotations = annotations;
            }
            builder.set_bounds(position, bounds, implicit_object_bound);
        }
        Ok(builder.finish())
    }

    fn types(&mut self, scope: &Scope<'_>, depth: usize) -> Result<Vec<Type>> {
        let count = self.u16()?;
        let mut types = Vec::with_capacity(usize::from(count).min(self.remaining()));
        for _ in 0..count {
            types.push(self.ty(scope, depth)?);
        }
        Ok(types)
    }

    fn opt_type(&mut self, scope: &Scope<'_>) -> Result<Option<Type>> {
        match self.flag()? {
            true => Ok(Some(self.ty(scope, 0)?)),
            false => Ok(None),
        }
    }

    fn ty(&mut self, scope: &Scope<'_>, depth: usize) -> Result<Type> {
        if depth > MAX_DEPTH {
            return Err(self.malformed("types nest too deeply"));
        }

        let mut ty = match self.u8()? {
            tag::VOID => return Ok(Type::Void),
            tag::PRIMITIVE => {
                let primitive = BaseType::from_descriptor(self.u8()?)
                    .ok_or_else(|| self.malformed("unknown primitive type"))?;
                Type::primitive(primitive)
            }
            tag::CLASS => Type::class(self.name()?),
            tag::ARRAY => {
                let dimensions = self.u32()?;
                if dimensions == 0 {
                    return Err(self.malformed("array without dimensions"));
                }
                let component = self.ty(scope, depth + 1)?;
                Type::Array(ArrayType {
                    component: Box::new(component),
                    dimensions,
                    annotations: Vec::new(),
                })
            }
            tag::PARAMETERIZED => {
                let name = self.name()?;
                let owner = match self.flag()? {
                    true => Some(self.ty(scope, depth + 1)?),
                    false => None,
                };
                let arguments = self.types(scope, depth + 1)?;
                Type::parameterized(name, arguments, owner)
            }
            tag::TYPE_VARIABLE => {
                let level = usize::from(self.u8()?);
                let index = usize::from(self.u16()?);
                let variable = scope
                    .levels
                    .get(level)
                    .and_then(|list| list.get(index))
                    .cloned()
                    .ok_or_else(|| self.malformed("type variable outside its scope"))?;
                let extras = self.annotations(depth + 1)?;
                return Ok(Type::TypeVariable(with_extras(variable, extras)));
            }
            tag::REFERENCE => {
                if !self.supports(Feature::TypeVariableReferences) {
                    return Err(self.malformed("type variable reference in an old format"));
                }
                let position = usize::from(self.u16()?);
                let annotations = self.annotations(depth + 1)?;
                return scope
                    .building
                    .and_then(|builder| builder.reference(position, annotations))
                    .ok_or_else(|| self.malformed("type variable reference outside a bound"));
            }
            tag::UNRESOLVED => Type::unresolved(self.str()?),
            tag::WILDCARD => {
                let bound = match self.u8()? {
                    tag::WILDCARD_UNBOUNDED => WildcardBound::Unbounded,
                    tag::WILDCARD_EXTENDS => WildcardBound::Extends(Box::new(self.ty(scope, depth + 1)?)),
                    tag::WILDCARD_SUPER => WildcardBound::Super(Box::new(self.ty(scope, depth + 1)?)),
                    _ => return Err(self.malformed("unknown wildcard bound")),
                };
                Type::wildcard(bound)
            }
            tag::FOREIGN => {
                let mut variable = TypeVariable::new(self.str()?);
                variable.implicit_object_bound = self.flag()?;
                variable.bounds = self.types(&Scope::default(), depth + 1)?;
                variable.annotations = self.annotations(depth + 1)?;
                return Ok(Type::TypeVariable(Arc::new(variable)));
            }
            _ => return Err(self.malformed("unknown type tag")),
        };

        let annotations = self.annotations(depth + 1)?;
        match &mut ty {
            Type::Primitive(inner) => inner.annotations = annotations,
            Type::Class(inner) => inner.annotations = annotations,
            Type::Array(inner) => inner.annotations = annotations,
            Type::Parameterized(inner) => inner.annotations = annotations,
            Type::UnresolvedTypeVariable(inner) => inner.annotations = annotations,
            Type::Wildcard(inner) => inner.annotations = annotations,
            Type::Void | Type::TypeVariable(_) | Type::TypeVariableReference(_) => {}
        }
        Ok(ty)
    }

    fn annotations(&mut self, depth: usize) -> Result<Vec<AnnotationInstance>> {
        let count = self.u16()?;
        let mut annotations = Vec::with_capacity(usize::from(count).min(self.remaining()));
        for _ in 0..count {
            annotations.push(self.annotation(depth)?);
        }
        Ok(annotations)
    }

    fn annotation(&mut self, depth: usize) -> Result<AnnotationInstance> {
        if depth > MAX_DEPTH {
            return Err(self.malformed("annotations nest too deeply"));
        }
        let name = self.name()?;
        let runtime_visible = self.flag()?;
        let target = self.target(depth + 1)?;
        let count = self.u16()?;
        let mut values = Vec::with_capacity(usize::from(count).min(self.remaining()));
        for _ in 0..count {
            values.push(AnnotationValue {
                name: self.str()?,
                value: self.value(depth + 1)?,
            });
        }
        let mut annotation = AnnotationInstance::new(name, target, values);
        annotation.runtime_visible = runtime_visible;
        Ok(annotation)
    }

    fn target(&mut self, depth: usize) -> Result<Option<AnnotationTarget>> {
        if depth > MAX_DEPTH {
            return Err(self.malformed("annotation targets nest too deeply"));
        }
        let target = match self.u8()? {
            tag::TARGET_NONE => return Ok(None),
            tag::TARGET_CLASS => AnnotationTarget::Class(self.name()?),
            tag::TARGET_FIELD => AnnotationTarget::Field {
                class: self.name()?,
                name: self.str()?,
            },
            tag::TARGET_METHOD => AnnotationTarget::Method {
                class: self.name()?,
                name: self.str()?,
                descriptor: self.str()?,
            },
            tag::TARGET_PARAMETER => AnnotationTarget::MethodParameter {
                class: self.name()?,
                method: self.str()?,
                descriptor: self.str()?,
                position: self.u16()?,
            },
            tag::TARGET_RECORD_COMPONENT => AnnotationTarget::RecordComponent {
                class: self.name()?,
                name: self.str()?,
            },
            tag::TARGET_TYPE => {
                let enclosing = self
                    .target(depth + 1)?
                    .ok_or_else(|| self.malformed("type annotation without enclosing target"))?;
                AnnotationTarget::Type {
                    enclosing: Box::new(enclosing),
                    usage: self.usage()?,
                }
            }
            _ => return Err(self.malformed("unknown annotation target")),
        };
        Ok(Some(target))
    }

    fn usage(&mut self) -> Result<TypeUsage> {
        Ok(match self.u8()? {
            tag::USAGE_FIELD => TypeUsage::Field,
            tag::USAGE_RECORD_COMPONENT => TypeUsage::RecordComponent,
            tag::USAGE_RETURN => TypeUsage::Return,
            tag::USAGE_RECEIVER => TypeUsage::Receiver,
            tag::USAGE_EXTENDS => TypeUsage::Extends { position: self.u16()? },
            tag::USAGE_PARAMETER => TypeUsage::MethodParameter { position: self.u16()? },
            tag::USAGE_TYPE_PARAMETER => TypeUsage::TypeParameter { position: self.u8()? },
            tag::USAGE_TYPE_PARAMETER_BOUND => TypeUsage::TypeParameterBound {
                position: self.u8()?,
                bound: self.u8()?,
            },
            tag::USAGE_THROWS => TypeUsage::Throws { position: self.u16()? },
            _ => return Err(self.malformed("unknown type usage")),
        })
    }

    fn value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(self.malformed("annotation values nest too deeply"));
        }
        let offset = self.offset();
        let eof = |_: std::io::Error| eof_at(offset);
        Ok(match self.u8()? {
            tag::VALUE_BOOLEAN => Value::Boolean(self.flag()?),
            tag::VALUE_BYTE => Value::Byte(self.cursor.read_i8().map_err(eof)?),
            tag::VALUE_SHORT => Value::Short(self.cursor.read_i16::<LittleEndian>().map_err(eof)?),
            tag::VALUE_INT => Value::Int(self.cursor.read_i32::<LittleEndian>().map_err(eof)?),
            tag::VALUE_LONG => Value::Long(self.cursor.read_i64::<LittleEndian>().map_err(eof)?),
            tag::VALUE_FLOAT => Value::Float(self.cursor.read_f32::<LittleEndian>().map_err(eof)?),
            tag::VALUE_DOUBLE => Value::Double(self.cursor.read_f64::<LittleEndian>().map_err(eof)?),
            tag::VALUE_CHAR => Value::Char(self.u16()?),
            tag::VALUE_STRING => Value::String(self.str()?.to_string()),
            tag::VALUE_CLASS => Value::Class(self.ty(&Scope::default(), depth + 1)?),
            tag::VALUE_ENUM => Value::Enum {
                type_name: self.name()?,
                constant: self.str()?,
            },
            tag::VALUE_NESTED => Value::Nested(Box::new(self.annotation(depth + 1)?)),
            tag::VALUE_ARRAY => {
                let count = self.u16()?;
                let mut elements = Vec::with_capacity(usize::from(count).min(self.remaining()));
                for _ in 0..count {
                    elements.push(AnnotationValue {
                        name: self.str()?,
                        value: self.value(depth + 1)?,
                    });
                }
                Value::Array(elements)
            }
            _ => return Err(self.malformed("unknown annotation value tag")),
        })
    }

    fn names(&mut self) -> Result<Vec<DotName>> {
        let count = self.u32()? as usize;
        let mut names = Vec::with_capacity(count.min(self.remaining() / 4));
        for _ in 0..count {
            names.push(self.name()?);
        }
        Ok(names)
    }

    fn name(&mut self) -> Result<DotName> {
        self.opt_name()?
            .ok_or_else(|| self.malformed("missing name"))
    }

    fn opt_name(&mut self) -> Result<Option<DotName>> {
        let index = self.u32()?;
        if index == NO_STRING {
            return Ok(None);
        }
        let index = index as usize;
        if let Some(Some(name)) = self.names.get(index) {
            return Ok(Some(name.clone()));
        }
        let string = self
            .strings
            .get(index)
            .ok_or_else(|| self.malformed("string index out of range"))?;
        let name = self.table.from_binary(string);
        self.names[index] = Some(name.clone());
        Ok(Some(name))
    }

    fn str(&mut self) -> Result<SmolStr> {
        self.opt_str()?
            .ok_or_else(|| self.malformed("missing string"))
    }

    fn opt_str(&mut self) -> Result<Option<SmolStr>> {
        let index = self.u32()?;
        if index == NO_STRING {
            return Ok(None);
        }
        self.strings
            .get(index as usize)
            .cloned()
            .map(Some)
            .ok_or_else(|| self.malformed("string index out of range"))
    }

    fn flag(&mut self) -> Result<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(self.malformed("invalid flag byte")),
        }
    }

    fn u8(&mut self) -> Result<u8> {
        let offset = self.offset();
        self.cursor.read_u8().map_err(|_| eof_at(offset))
    }

    fn u16(&mut self) -> Result<u16> {
        let offset = self.offset();
        self.cursor.read_u16::<LittleEndian>().map_err(|_| eof_at(offset))
    }

    fn u32(&mut self) -> Result<u32> {
        let offset = self.offset();
        self.cursor.read_u32::<LittleEndian>().map_err(|_| eof_at(offset))
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let offset = self.offset();
        if len > self.remaining() {
            return Err(eof_at(offset));
        }
        let data: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((offset + len) as u64);
        Ok(&data[offset..offset + len])
    }

    fn offset(&self) -> usize {
        self.cursor.position() as usize
    }

    fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.offset())
    }

    fn malformed(&self, message: &'static str) -> StorageError {
        StorageError::Malformed {
            offset: HEADER_LEN + self.offset(),
            message,
        }
    }
}

fn eof_at(offset: usize) -> StorageError {
    StorageError::Malformed {
        offset: HEADER_LEN + offset,
        message: "unexpected end of payload",
    }
}

/// An occurrence of `variable` carrying annotations beyond its declaration's.
fn with_extras(variable: Arc<TypeVariable>, extras: Vec<AnnotationInstance>) -> Arc<TypeVariable> {
    if extras.is_empty() {
        return variable;
    }
    let mut annotated = TypeVariable::clone(&variable);
    annotated.annotations.extend(extras);
    Arc::new(annotated)
}
