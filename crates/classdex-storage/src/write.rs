use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use byteorder::{LittleEndian, WriteBytesExt};
use classdex_classfile::ImplicitKind;
use classdex_core::DotName;
use classdex_index::{ClassInfo, FieldInfo, Index, MethodInfo, NestingType, RecordComponentInfo};
use classdex_types::{
    AnnotationInstance, AnnotationTarget, Type, TypeUsage, TypeVariable, Value, WildcardBound,
};

use crate::error::{Result, StorageError};
use crate::format::{content_hash, tag, Feature, FormatVersion, Header, HEADER_LEN, NO_STRING};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Nesting of standalone variable copies beyond which a variable is stored
/// by identifier only.
const MAX_FOREIGN_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub version: FormatVersion,
}

impl WriteOptions {
    pub fn version(version: FormatVersion) -> Self {
        Self { version }
    }
}

/// Serializes an [`Index`] into the stored format.
#[derive(Debug, Clone, Default)]
pub struct IndexWriter {
    options: WriteOptions,
}

impl IndexWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// The complete stored form of `index`, header included.
    pub fn write(&self, index: &Index) -> Result<Vec<u8>> {
        let payload = self.encode_payload(index)?;
        let header = Header {
            version: self.options.version,
            payload_len: payload.len() as u64,
            content_hash: content_hash(&payload),
        };

        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.extend_from_slice(&header.encode());
        out.extend_from_slice(&payload);

        tracing::debug!(
            target: "classdex.storage",
            version = %self.options.version,
            classes = index.len(),
            bytes = out.len(),
            "wrote index"
        );
        Ok(out)
    }

    /// Writes the stored form of `index` to `out` and returns the number of
    /// bytes written.
    pub fn write_to<W: Write>(&self, index: &Index, mut out: W) -> Result<u64> {
        let bytes = self.write(index)?;
        out.write_all(&bytes)?;
        Ok(bytes.len() as u64)
    }

    fn encode_payload(&self, index: &Index) -> Result<Vec<u8>> {
        let mut encoder = Encoder::new(self.options.version);
        encoder.index(index)?;
        encoder.finish()
    }
}

/// Writes `index` to `path` through a temporary file in the same directory,
/// so readers never observe a partially written index.
pub fn write_to_path(path: &Path, index: &Index, options: WriteOptions) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let bytes = IndexWriter::with_options(options).write(index)?;
    let (tmp_path, file) = open_unique_tmp_file(path, parent)?;

    let result = (|| -> Result<()> {
        let mut file = file;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);
        rename_overwrite(&tmp_path, path).map_err(StorageError::from)
    })();

    if let Err(err) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    Ok(())
}

fn rename_overwrite(tmp_path: &Path, dest: &Path) -> io::Result<()> {
    const MAX_RENAME_ATTEMPTS: usize = 1024;
    let mut attempts = 0usize;

    loop {
        match fs::rename(tmp_path, dest) {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists || dest.exists() => {
                // `rename` does not replace an existing file everywhere; concurrent
                // writers can race on `remove + rename`, so retry until one wins.
                let _ = fs::remove_file(dest);

                attempts += 1;
                if attempts >= MAX_RENAME_ATTEMPTS {
                    return Err(err);
                }
            }
            Err(err) => return Err(err),
        }
    }
}

fn open_unique_tmp_file(dest: &Path, parent: &Path) -> io::Result<(PathBuf, fs::File)> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination path has no file name"))?;
    let pid = std::process::id();

    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(format!(".tmp.{pid}.{counter}"));
        let tmp_path = parent.join(tmp_name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}

/// Type variables visible while encoding a type.
#[derive(Clone, Default)]
struct Scope<'s> {
    /// Finished parameter lists, outermost first.
    levels: Vec<&'s [Arc<TypeVariable>]>,
    /// The list whose bounds are being written.
    building: Option<&'s [Arc<TypeVariable>]>,
    /// Position in `building` of the variable whose bounds are being written.
    bounding: usize,
}

impl<'s> Scope<'s> {
    fn with_level(&self, level: &'s [Arc<TypeVariable>]) -> Scope<'s> {
        let mut levels = self.levels.clone();
        levels.push(level);
        Scope {
            levels,
            building: None,
            bounding: 0,
        }
    }

    fn building(&self, list: &'s [Arc<TypeVariable>], bounding: usize) -> Scope<'s> {
        Scope {
            levels: self.levels.clone(),
            building: Some(list),
            bounding,
        }
    }

    fn locate(&self, var: &Arc<TypeVariable>) -> Option<(Slot, &'s Arc<TypeVariable>)> {
        let lists = || {
            self.building
                .map(|list| (None, list))
                .into_iter()
                .chain(self.levels.iter().enumerate().rev().map(|(level, list)| (Some(level), *list)))
        };
        let slot = |level: Option<usize>, index: usize| match level {
            None => Slot::Building(index),
            Some(level) => Slot::Level(level, index),
        };

        for (level, list) in lists() {
            if let Some(index) = list.iter().position(|decl| Arc::ptr_eq(decl, var)) {
                return Some((slot(level, index), &list[index]));
            }
        }
        // Annotated occurrences are copies; the innermost declaration with the
        // same identifier is the one they name.
        for (level, list) in lists() {
            if let Some(index) = list.iter().position(|decl| decl.identifier == var.identifier) {
                return Some((slot(level, index), &list[index]));
            }
        }
        None
    }
}

enum Slot {
    Building(usize),
    Level(usize, usize),
}

struct Encoder {
    version: FormatVersion,
    strings: HashMap<String, u32>,
    table: Vec<String>,
    body: Vec<u8>,
    foreign_depth: usize,
}

impl Encoder {
    fn new(version: FormatVersion) -> Self {
        Self {
            version,
            strings: HashMap::new(),
            table: Vec::new(),
            body: Vec::new(),
            foreign_depth: 0,
        }
    }

    fn finish(self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.body.len() + self.table.len() * 16);
        out.write_u32::<LittleEndian>(len_u32(self.table.len())?)?;
        for string in &self.table {
            out.write_u32::<LittleEndian>(len_u32(string.len())?)?;
            out.extend_from_slice(string.as_bytes());
        }
        out.extend_from_slice(&self.body);
        Ok(out)
    }

    fn supports(&self, feature: Feature) -> bool {
        self.version.supports(feature)
    }

    fn index(&mut self, index: &Index) -> Result<()> {
        self.u32(len_u32(index.len())?)?;
        for class in index.known_classes() {
            self.class(class)?;
        }

        if self.supports(Feature::Users) {
            let users = index.users();
            self.u32(len_u32(users.len())?)?;
            for (used, by) in users {
                self.name(used)?;
                self.u32(len_u32(by.len())?)?;
                for user in by {
                    self.name(user)?;
                }
            }
        }
        Ok(())
    }

    fn class(&mut self, class: &ClassInfo) -> Result<()> {
        self.name(&class.name)?;
        self.u16(class.flags)?;
        self.u8(match class.nesting {
            NestingType::TopLevel => 0,
            NestingType::Inner => 1,
            NestingType::Local => 2,
            NestingType::Anonymous => 3,
        })?;
        self.opt_str(class.simple_name.as_deref())?;
        self.opt_name(class.enclosing_class.as_ref())?;
        match &class.enclosing_method {
            Some(method) => {
                self.u8(1)?;
                self.name(&method.class)?;
                self.str(&method.name)?;
                self.str(&method.descriptor)?;
            }
            None => self.u8(0)?,
        }
        self.names(&class.member_classes)?;
        self.names(&class.permitted_subclasses)?;
        self.opt_str(class.source_file.as_deref())?;

        let outer = Scope::default();
        self.type_parameters(&class.type_parameters, &outer)?;
        let scope = outer.with_level(&class.type_parameters);

        self.opt_name(class.super_class.as_ref())?;
        self.opt_type(class.super_class_type.as_ref(), &scope)?;
        self.types(&class.interface_types, &scope)?;

        let mut fields: Vec<(usize, &FieldInfo)> = class.fields.iter().enumerate().collect();
        fields.sort_by(|(_, a), (_, b)| a.name.cmp(&b.name));
        self.u32(len_u32(fields.len())?)?;
        for (position, field) in fields {
            self.position(position)?;
            self.field(field, &scope)?;
        }

        let mut methods: Vec<(usize, &MethodInfo)> = class.methods.iter().enumerate().collect();
        methods.sort_by(|(_, a), (_, b)| (&a.name, &a.descriptor).cmp(&(&b.name, &b.descriptor)));
        self.u32(len_u32(methods.len())?)?;
        for (position, method) in methods {
            self.position(position)?;
            self.method(method, &scope)?;
        }

        if self.supports(Feature::RecordComponents) {
            match &class.record_components {
                Some(components) => {
                    self.u8(1)?;
                    self.u16(len_u16(components.len())?)?;
                    for component in components {
                        self.record_component(component, &scope)?;
                    }
                }
                None => self.u8(0)?,
            }
        }

        self.annotations(&class.annotations)
    }

    fn position(&mut self, position: usize) -> Result<()> {
        if self.supports(Feature::MemberPositions) {
            self.u32(len_u32(position)?)?;
        }
        Ok(())
    }

    fn field(&mut self, field: &FieldInfo, scope: &Scope<'_>) -> Result<()> {
        self.str(&field.name)?;
        self.u16(field.flags)?;
        self.ty(&field.ty, scope)?;
        self.annotations(&field.annotations)
    }

    fn method<'s>(&mut self, method: &'s MethodInfo, class_scope: &Scope<'s>) -> Result<()> {
        self.str(&method.name)?;
        self.u16(method.flags)?;
        self.str(&method.descriptor)?;

        self.type_parameters(&method.type_parameters, class_scope)?;
        let scope = class_scope.with_level(&method.type_parameters);

        self.ty(&method.return_type, &scope)?;
        self.opt_type(method.receiver_type.as_ref(), &scope)?;
        self.types(&method.parameter_types, &scope)?;
        self.types(&method.descriptor_parameter_types, &scope)?;

        self.u16(len_u16(method.parameter_positions.len())?)?;
        for position in &method.parameter_positions {
            self.u16(*position)?;
        }
        self.u16(len_u16(method.parameter_names.len())?)?;
        for name in &method.parameter_names {
            self.opt_str(name.as_deref())?;
        }

        self.types(&method.exceptions, &scope)?;
        match &method.default_value {
            Some(value) => {
                self.u8(1)?;
                self.value(value)?;
            }
            None => self.u8(0)?,
        }
        self.u8(implicit_tag(method.implicit))?;
        self.u8(u8::from(method.synthesized))?;
        self.annotations(&method.annotations)
    }

    fn record_component(&mut self, component: &RecordComponentInfo, scope: &Scope<'_>) -> Result<()> {
        self.str(&component.name)?;
        self.ty(&component.ty, scope)?;
        self.annotations(&component.annotations)
    }

    /// Identifiers first, so that every bound can name any variable of the list.
    fn type_parameters<'s>(&mut self, list: &'s [Arc<TypeVariable>], outer: &Scope<'s>) -> Result<()> {
        self.u16(len_u16(list.len())?)?;
        for variable in list {
            self.str(&variable.identifier)?;
        }

        for (position, variable) in list.iter().enumerate() {
            let scope = outer.building(list, position);
            self.u8(u8::from(variable.implicit_object_bound))?;
            self.annotations(&variable.annotations)?;
            self.types(&variable.bounds, &scope)?;
        }
        Ok(())
    }

    fn types(&mut self, types: &[Type], scope: &Scope<'_>) -> Result<()> {
        self.u16(len_u16(types.len())?)?;
        for ty in types {
            self.ty(ty, scope)?;
        }
        Ok(())
    }

    fn opt_type(&mut self, ty: Option<&Type>, scope: &Scope<'_>) -> Result<()> {
        match ty {
            Some(ty) => {
                self.u8(1)?;
                self.ty(ty, scope)
            }
            None => self.u8(0),
        }
    }

    fn ty(&mut self, ty: &Type, scope: &Scope<'_>) -> Result<()> {
        let annotations: &[AnnotationInstance] = match ty {
            Type::Void => return self.u8(tag::VOID),
            Type::Primitive(primitive) => {
                self.u8(tag::PRIMITIVE)?;
                self.u8(primitive.primitive.descriptor() as u8)?;
                &primitive.annotations
            }
            Type::Class(class) => {
                self.u8(tag::CLASS)?;
                self.name(&class.name)?;
                &class.annotations
            }
            Type::Array(array) => {
                self.u8(tag::ARRAY)?;
                self.u32(array.dimensions)?;
                self.ty(&array.component, scope)?;
                &array.annotations
            }
            Type::Parameterized(parameterized) => {
                self.u8(tag::PARAMETERIZED)?;
                self.name(&parameterized.name)?;
                self.opt_type(parameterized.owner.as_deref(), scope)?;
                self.types(&parameterized.arguments, scope)?;
                &parameterized.annotations
            }
            Type::TypeVariable(variable) => return self.type_variable(variable, scope),
            Type::TypeVariableReference(reference) => {
                let in_list = scope.building.is_some_and(|list| {
                    list.get(reference.position())
                        .is_some_and(|decl| decl.identifier == reference.identifier())
                });
                if in_list && self.supports(Feature::TypeVariableReferences) {
                    self.u8(tag::REFERENCE)?;
                    self.u16(len_u16(reference.position())?)?;
                } else {
                    self.u8(tag::UNRESOLVED)?;
                    self.str(reference.identifier())?;
                }
                &reference.annotations
            }
            Type::UnresolvedTypeVariable(unresolved) => {
                self.u8(tag::UNRESOLVED)?;
                self.str(&unresolved.identifier)?;
                &unresolved.annotations
            }
            Type::Wildcard(wildcard) => {
                self.u8(tag::WILDCARD)?;
                match &wildcard.bound {
                    WildcardBound::Unbounded => self.u8(tag::WILDCARD_UNBOUNDED)?,
                    WildcardBound::Extends(bound) => {
                        self.u8(tag::WILDCARD_EXTENDS)?;
                        self.ty(bound, scope)?;
                    }
                    WildcardBound::Super(bound) => {
                        self.u8(tag::WILDCARD_SUPER)?;
                        self.ty(bound, scope)?;
                    }
                }
                &wildcard.annotations
            }
        };
        self.annotations(annotations)
    }

    fn type_variable(&mut self, variable: &Arc<TypeVariable>, scope: &Scope<'_>) -> Result<()> {
        let Some((slot, decl)) = scope.locate(variable) else {
            return self.foreign(variable);
        };

        let extras: &[AnnotationInstance] = if Arc::ptr_eq(decl, variable) {
            &[]
        } else {
            variable
                .annotations
                .strip_prefix(decl.annotations.as_slice())
                .unwrap_or(variable.annotations.as_slice())
        };

        match slot {
            Slot::Level(level, index) => {
                self.u8(tag::TYPE_VARIABLE)?;
                self.u8(u8::try_from(level).map_err(|_| too_large())?)?;
                self.u16(len_u16(index)?)?;
            }
            Slot::Building(index) if self.supports(Feature::TypeVariableReferences) => {
                self.u8(tag::REFERENCE)?;
                self.u16(len_u16(index)?)?;
            }
            // Earlier siblings are finished declarations; only self and
            // forward references need the newer format.
            Slot::Building(index) if index < scope.bounding => return self.foreign(variable),
            Slot::Building(_) => {
                self.u8(tag::UNRESOLVED)?;
                self.str(&variable.identifier)?;
            }
        }
        self.annotations(extras)
    }

    /// Stores a variable declared outside the stored scope as a standalone
    /// copy. Identity with the enclosing declaration does not survive a
    /// round trip.
    fn foreign(&mut self, variable: &TypeVariable) -> Result<()> {
        if self.foreign_depth >= MAX_FOREIGN_DEPTH {
            self.u8(tag::UNRESOLVED)?;
            self.str(&variable.identifier)?;
            return self.annotations(&variable.annotations);
        }

        self.u8(tag::FOREIGN)?;
        self.str(&variable.identifier)?;
        self.u8(u8::from(variable.implicit_object_bound))?;
        self.foreign_depth += 1;
        let bounds = self.types(&variable.bounds, &Scope::default());
        self.foreign_depth -= 1;
        bounds?;
        self.annotations(&variable.annotations)
    }

    fn annotations(&mut self, annotations: &[AnnotationInstance]) -> Result<()> {
        let keep_invisible = self.supports(Feature::InvisibleAnnotations);
        let kept: Vec<&AnnotationInstance> = annotations
            .iter()
            .filter(|annotation| keep_invisible || annotation.runtime_visible)
            .collect();
        self.u16(len_u16(kept.len())?)?;
        for annotation in kept {
            self.annotation(annotation)?;
        }
        Ok(())
    }

    fn annotation(&mut self, annotation: &AnnotationInstance) -> Result<()> {
        self.name(&annotation.name)?;
        self.u8(u8::from(annotation.runtime_visible))?;
        self.target(annotation.target.as_ref())?;
        self.u16(len_u16(annotation.values.len())?)?;
        for member in &annotation.values {
            self.str(&member.name)?;
            self.value(&member.value)?;
        }
        Ok(())
    }

    fn target(&mut self, target: Option<&AnnotationTarget>) -> Result<()> {
        let Some(target) = target else {
            return self.u8(tag::TARGET_NONE);
        };
        match target {
            AnnotationTarget::Class(class) => {
                self.u8(tag::TARGET_CLASS)?;
                self.name(class)
            }
            AnnotationTarget::Field { class, name } => {
                self.u8(tag::TARGET_FIELD)?;
                self.name(class)?;
                self.str(name)
            }
            AnnotationTarget::Method { class, name, descriptor } => {
                self.u8(tag::TARGET_METHOD)?;
                self.name(class)?;
                self.str(name)?;
                self.str(descriptor)
            }
            AnnotationTarget::MethodParameter {
                class,
                method,
                descriptor,
                position,
            } => {
                self.u8(tag::TARGET_PARAMETER)?;
                self.name(class)?;
                self.str(method)?;
                self.str(descriptor)?;
                self.u16(*position)
            }
            AnnotationTarget::RecordComponent { class, name } => {
                self.u8(tag::TARGET_RECORD_COMPONENT)?;
                self.name(class)?;
                self.str(name)
            }
            AnnotationTarget::Type { enclosing, usage } => {
                self.u8(tag::TARGET_TYPE)?;
                self.target(Some(enclosing.as_ref()))?;
                self.usage(*usage)
            }
        }
    }

    fn usage(&mut self, usage: TypeUsage) -> Result<()> {
        match usage {
            TypeUsage::Field => self.u8(tag::USAGE_FIELD),
            TypeUsage::RecordComponent => self.u8(tag::USAGE_RECORD_COMPONENT),
            TypeUsage::Return => self.u8(tag::USAGE_RETURN),
            TypeUsage::Receiver => self.u8(tag::USAGE_RECEIVER),
            TypeUsage::Extends { position } => {
                self.u8(tag::USAGE_EXTENDS)?;
                self.u16(position)
            }
            TypeUsage::MethodParameter { position } => {
                self.u8(tag::USAGE_PARAMETER)?;
                self.u16(position)
            }
            TypeUsage::TypeParameter { position } => {
                self.u8(tag::USAGE_TYPE_PARAMETER)?;
                self.u8(position)
            }
            TypeUsage::TypeParameterBound { position, bound } => {
                self.u8(tag::USAGE_TYPE_PARAMETER_BOUND)?;
                self.u8(position)?;
                self.u8(bound)
            }
            TypeUsage::Throws { position } => {
                self.u8(tag::USAGE_THROWS)?;
                self.u16(position)
            }
        }
    }

    fn value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Boolean(v) => {
                self.u8(tag::VALUE_BOOLEAN)?;
                self.u8(u8::from(*v))
            }
            Value::Byte(v) => {
                self.u8(tag::VALUE_BYTE)?;
                Ok(self.body.write_i8(*v)?)
            }
            Value::Short(v) => {
                self.u8(tag::VALUE_SHORT)?;
                Ok(self.body.write_i16::<LittleEndian>(*v)?)
            }
            Value::Int(v) => {
                self.u8(tag::VALUE_INT)?;
                Ok(self.body.write_i32::<LittleEndian>(*v)?)
            }
            Value::Long(v) => {
                self.u8(tag::VALUE_LONG)?;
                Ok(self.body.write_i64::<LittleEndian>(*v)?)
            }
            Value::Float(v) => {
                self.u8(tag::VALUE_FLOAT)?;
                Ok(self.body.write_f32::<LittleEndian>(*v)?)
            }
            Value::Double(v) => {
                self.u8(tag::VALUE_DOUBLE)?;
                Ok(self.body.write_f64::<LittleEndian>(*v)?)
            }
            Value::Char(v) => {
                self.u8(tag::VALUE_CHAR)?;
                self.u16(*v)
            }
            Value::String(v) => {
                self.u8(tag::VALUE_STRING)?;
                self.str(v)
            }
            Value::Class(ty) => {
                self.u8(tag::VALUE_CLASS)?;
                self.ty(ty, &Scope::default())
            }
            Value::Enum { type_name, constant } => {
                self.u8(tag::VALUE_ENUM)?;
                self.name(type_name)?;
                self.str(constant)
            }
            Value::Nested(annotation) => {
                self.u8(tag::VALUE_NESTED)?;
                self.annotation(annotation)
            }
            Value::Array(elements) => {
                self.u8(tag::VALUE_ARRAY)?;
                self.u16(len_u16(elements.len())?)?;
                for element in elements {
                    self.str(&element.name)?;
                    self.value(&element.value)?;
                }
                Ok(())
            }
        }
    }

    fn names(&mut self, names: &[DotName]) -> Result<()> {
        self.u32(len_u32(names.len())?)?;
        for name in names {
            self.name(name)?;
        }
        Ok(())
    }

    fn name(&mut self, name: &DotName) -> Result<()> {
        self.str(&name.to_string())
    }

    fn opt_name(&mut self, name: Option<&DotName>) -> Result<()> {
        match name {
            Some(name) => self.name(name),
            None => self.u32(NO_STRING),
        }
    }

    fn str(&mut self, value: &str) -> Result<()> {
        let index = match self.strings.get(value) {
            Some(index) => *index,
            None => {
                let index = len_u32(self.table.len())?;
                if index == NO_STRING {
                    return Err(too_large());
                }
                self.table.push(value.to_string());
                self.strings.insert(value.to_string(), index);
                index
            }
        };
        self.u32(index)
    }

    fn opt_str(&mut self, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => self.str(value),
            None => self.u32(NO_STRING),
        }
    }

    fn u8(&mut self, value: u8) -> Result<()> {
        Ok(self.body.write_u8(value)?)
    }

    fn u16(&mut self, value: u16) -> Result<()> {
        Ok(self.body.write_u16::<LittleEndian>(value)?)
    }

    fn u32(&mut self, value: u32) -> Result<()> {
        Ok(self.body.write_u32::<LittleEndian>(value)?)
    }
}

pub(crate) fn implicit_tag(kind: Option<ImplicitKind>) -> u8 {
    match kind {
        None => 0,
        Some(ImplicitKind::EnumValues) => 1,
        Some(ImplicitKind::EnumValueOf) => 2,
        Some(ImplicitKind::RecordCanonicalConstructor) => 3,
        Some(ImplicitKind::RecordCompactConstructor) => 4,
        Some(ImplicitKind::RecordAccessor) => 5,
        Some(ImplicitKind::DefaultConstructor) => 6,
    }
}

fn too_large() -> StorageError {
    StorageError::InvalidArgument("collection exceeds the format limit")
}

fn len_u16(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| too_large())
}

fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| too_large())
}
