use crate::annotation::{Annotation, ElementValue};
use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};
use crate::implicit::{self, ImplicitKind};
use crate::reader::Reader;
use crate::type_annotation::TypeAnnotation;

const MAGIC: u32 = 0xCAFE_BABE;
const MIN_MAJOR: u16 = 45;
/// Java 25.
const MAX_MAJOR: u16 = 69;
const PREVIEW_MINOR: u16 = 0xFFFF;

/// One class file decoded into its pre-resolution form.
///
/// Names are in internal form (`java/util/Map$Entry`); descriptors and
/// signatures are kept as the raw strings found in the file.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<ClassMember>,
    pub methods: Vec<ClassMember>,
    pub signature: Option<String>,
    pub source_file: Option<String>,
    pub runtime_visible_annotations: Vec<Annotation>,
    pub runtime_invisible_annotations: Vec<Annotation>,
    pub runtime_visible_type_annotations: Vec<TypeAnnotation>,
    pub runtime_invisible_type_annotations: Vec<TypeAnnotation>,
    pub inner_classes: Vec<InnerClassInfo>,
    pub enclosing_method: Option<EnclosingMethod>,
    /// `Some` exactly when the class carries a `Record` attribute.
    pub record_components: Option<Vec<RecordComponent>>,
    pub permitted_subclasses: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ClassMember {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub runtime_visible_annotations: Vec<Annotation>,
    pub runtime_invisible_annotations: Vec<Annotation>,
    pub runtime_visible_parameter_annotations: Vec<Vec<Annotation>>,
    pub runtime_invisible_parameter_annotations: Vec<Vec<Annotation>>,
    pub runtime_visible_type_annotations: Vec<TypeAnnotation>,
    pub runtime_invisible_type_annotations: Vec<TypeAnnotation>,
    pub annotation_default: Option<ElementValue>,
    pub exceptions: Vec<String>,
    pub method_parameters: Option<Vec<MethodParameter>>,
    /// Bytecode of the `Code` attribute; the rest of the attribute is dropped.
    pub code: Option<Vec<u8>>,
    pub implicit: Option<ImplicitKind>,
    /// Added by [`ClassFile::synthesize_implicit_members`], not present in the file.
    pub synthesized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassInfo {
    pub inner_class: String,
    pub outer_class: Option<String>,
    pub inner_name: Option<String>,
    pub access_flags: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclosingMethod {
    pub class: String,
    /// `(name, descriptor)`; absent for classes declared in initializers.
    pub method: Option<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodParameter {
    pub name: Option<String>,
    pub access_flags: u16,
}

#[derive(Debug, Clone, Default)]
pub struct RecordComponent {
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub runtime_visible_annotations: Vec<Annotation>,
    pub runtime_invisible_annotations: Vec<Annotation>,
    pub runtime_visible_type_annotations: Vec<TypeAnnotation>,
    pub runtime_invisible_type_annotations: Vec<TypeAnnotation>,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidArgument("empty class file"));
        }

        let mut reader = Reader::new(bytes);
        let magic = reader.read_u4()?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let minor_version = reader.read_u2()?;
        let major_version = reader.read_u2()?;
        if !(MIN_MAJOR..=MAX_MAJOR).contains(&major_version) {
            return Err(Error::UnsupportedVersion {
                major: major_version,
                minor: minor_version,
            });
        }
        let version = Version {
            major: major_version,
            minor: minor_version,
        };

        let constant_pool = ConstantPool::parse(&mut reader)?;
        let cp = &constant_pool;

        let access_flags = reader.read_u2()?;
        let this_class = cp.get_class_name(reader.read_u2()?)?.to_string();
        let super_class_idx = reader.read_u2()?;
        let super_class = if super_class_idx == 0 {
            None
        } else {
            Some(cp.get_class_name(super_class_idx)?.to_string())
        };

        let interfaces_count = reader.read_u2()? as usize;
        let mut interfaces = Vec::with_capacity(interfaces_count);
        for _ in 0..interfaces_count {
            interfaces.push(cp.get_class_name(reader.read_u2()?)?.to_string());
        }

        let fields_count = reader.read_u2()? as usize;
        let mut fields = Vec::with_capacity(fields_count);
        for _ in 0..fields_count {
            fields.push(parse_member(&mut reader, cp, version, Target::Field)?);
        }

        let methods_count = reader.read_u2()? as usize;
        let mut methods = Vec::with_capacity(methods_count);
        for _ in 0..methods_count {
            methods.push(parse_member(&mut reader, cp, version, Target::Method)?);
        }

        let attrs = parse_attributes(&mut reader, cp, version, Target::Class)?;
        reader.ensure_empty()?;

        let mut class = Self {
            minor_version,
            major_version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            signature: attrs.signature,
            source_file: attrs.source_file,
            runtime_visible_annotations: attrs.runtime_visible_annotations,
            runtime_invisible_annotations: attrs.runtime_invisible_annotations,
            runtime_visible_type_annotations: attrs.runtime_visible_type_annotations,
            runtime_invisible_type_annotations: attrs.runtime_invisible_type_annotations,
            inner_classes: attrs.inner_classes,
            enclosing_method: attrs.enclosing_method,
            record_components: attrs.record_components,
            permitted_subclasses: attrs.permitted_subclasses,
            constant_pool,
        };

        let kinds: Vec<_> = class
            .methods
            .iter()
            .map(|method| implicit::classify(&class, method))
            .collect();
        for (method, kind) in class.methods.iter_mut().zip(kinds) {
            method.implicit = kind;
        }

        Ok(class)
    }

    /// Adds the implicit enum and record members a compiler left out.
    pub fn synthesize_implicit_members(&mut self) {
        implicit::synthesize(self);
    }

    pub fn is_record(&self) -> bool {
        self.record_components.is_some()
    }

    /// The `InnerClasses` entry describing this class itself, if any.
    pub fn own_inner_class_entry(&self) -> Option<&InnerClassInfo> {
        self.inner_classes
            .iter()
            .find(|entry| entry.inner_class == self.this_class)
    }
}

#[derive(Clone, Copy)]
struct Version {
    major: u16,
    minor: u16,
}

impl Version {
    fn is_preview_of(self, majors: &[u16]) -> bool {
        self.minor == PREVIEW_MINOR && majors.contains(&self.major)
    }

    /// Earliest class-file version that gives the attribute any meaning.
    fn supports(self, attribute: &str) -> bool {
        match attribute {
            "RuntimeVisibleAnnotations"
            | "RuntimeInvisibleAnnotations"
            | "RuntimeVisibleParameterAnnotations"
            | "RuntimeInvisibleParameterAnnotations"
            | "AnnotationDefault" => self.major >= 49,
            "RuntimeVisibleTypeAnnotations"
            | "RuntimeInvisibleTypeAnnotations"
            | "MethodParameters" => self.major >= 52,
            "Record" => self.major >= 60 || self.is_preview_of(&[58, 59]),
            "PermittedSubclasses" => self.major >= 61 || self.is_preview_of(&[59, 60]),
            _ => true,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Target {
    Class,
    Field,
    Method,
    RecordComponent,
}

impl Target {
    fn accepts(self, attribute: &str) -> bool {
        match attribute {
            "Signature"
            | "RuntimeVisibleAnnotations"
            | "RuntimeInvisibleAnnotations"
            | "RuntimeVisibleTypeAnnotations"
            | "RuntimeInvisibleTypeAnnotations" => true,
            "InnerClasses" | "EnclosingMethod" | "Record" | "PermittedSubclasses"
            | "SourceFile" => self == Target::Class,
            "RuntimeVisibleParameterAnnotations"
            | "RuntimeInvisibleParameterAnnotations"
            | "AnnotationDefault"
            | "MethodParameters"
            | "Exceptions"
            | "Code" => self == Target::Method,
            _ => false,
        }
    }
}

const KNOWN_ATTRIBUTES: &[&str] = &[
    "Signature",
    "SourceFile",
    "RuntimeVisibleAnnotations",
    "RuntimeInvisibleAnnotations",
    "RuntimeVisibleParameterAnnotations",
    "RuntimeInvisibleParameterAnnotations",
    "RuntimeVisibleTypeAnnotations",
    "RuntimeInvisibleTypeAnnotations",
    "AnnotationDefault",
    "InnerClasses",
    "EnclosingMethod",
    "MethodParameters",
    "Exceptions",
    "Record",
    "PermittedSubclasses",
    "Code",
];

fn parse_member(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    version: Version,
    target: Target,
) -> Result<ClassMember> {
    let access_flags = reader.read_u2()?;
    let name = cp.get_utf8(reader.read_u2()?)?.to_string();
    let descriptor = cp.get_utf8(reader.read_u2()?)?.to_string();

    let attrs = parse_attributes(reader, cp, version, target)?;
    Ok(ClassMember {
        access_flags,
        name,
        descriptor,
        signature: attrs.signature,
        runtime_visible_annotations: attrs.runtime_visible_annotations,
        runtime_invisible_annotations: attrs.runtime_invisible_annotations,
        runtime_visible_parameter_annotations: attrs.runtime_visible_parameter_annotations,
        runtime_invisible_parameter_annotations: attrs.runtime_invisible_parameter_annotations,
        runtime_visible_type_annotations: attrs.runtime_visible_type_annotations,
        runtime_invisible_type_annotations: attrs.runtime_invisible_type_annotations,
        annotation_default: attrs.annotation_default,
        exceptions: attrs.exceptions,
        method_parameters: attrs.method_parameters,
        code: attrs.code,
        implicit: None,
        synthesized: false,
    })
}

#[derive(Default)]
struct ParsedAttributes {
    signature: Option<String>,
    source_file: Option<String>,
    runtime_visible_annotations: Vec<Annotation>,
    runtime_invisible_annotations: Vec<Annotation>,
    runtime_visible_parameter_annotations: Vec<Vec<Annotation>>,
    runtime_invisible_parameter_annotations: Vec<Vec<Annotation>>,
    runtime_visible_type_annotations: Vec<TypeAnnotation>,
    runtime_invisible_type_annotations: Vec<TypeAnnotation>,
    annotation_default: Option<ElementValue>,
    inner_classes: Vec<InnerClassInfo>,
    enclosing_method: Option<EnclosingMethod>,
    method_parameters: Option<Vec<MethodParameter>>,
    exceptions: Vec<String>,
    record_components: Option<Vec<RecordComponent>>,
    permitted_subclasses: Vec<String>,
    code: Option<Vec<u8>>,
}

fn parse_attributes(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    version: Version,
    target: Target,
) -> Result<ParsedAttributes> {
    let attributes_count = reader.read_u2()? as usize;
    let mut parsed = ParsedAttributes::default();
    for _ in 0..attributes_count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let offset = reader.offset();
        let info = reader.read_bytes(length)?;
        let name = cp.get_utf8(name_index)?;

        // Unknown attributes and attributes on the wrong kind of structure are skipped.
        let Some(section) = KNOWN_ATTRIBUTES.iter().copied().find(|known| *known == name) else {
            continue;
        };
        if !target.accepts(section) {
            continue;
        }
        if !version.supports(section) {
            tracing::debug!(
                target: "classdex.classfile",
                attribute = section,
                major = version.major,
                minor = version.minor,
                "ignoring attribute not defined for this class file version"
            );
            continue;
        }

        let mut sub = Reader::sub(info, offset);
        parse_attribute(section, &mut sub, cp, version, &mut parsed)
            .map_err(|err| err.in_attribute(section, offset))?;
    }
    Ok(parsed)
}

fn parse_attribute(
    section: &'static str,
    sub: &mut Reader<'_>,
    cp: &ConstantPool,
    version: Version,
    parsed: &mut ParsedAttributes,
) -> Result<()> {
    match section {
        "Signature" => {
            parsed.signature = Some(cp.get_utf8(sub.read_u2()?)?.to_string());
        }
        "SourceFile" => {
            parsed.source_file = Some(cp.get_utf8(sub.read_u2()?)?.to_string());
        }
        "RuntimeVisibleAnnotations" => {
            parsed
                .runtime_visible_annotations
                .extend(Annotation::parse_list(sub, cp)?);
        }
        "RuntimeInvisibleAnnotations" => {
            parsed
                .runtime_invisible_annotations
                .extend(Annotation::parse_list(sub, cp)?);
        }
        "RuntimeVisibleParameterAnnotations" => {
            parsed.runtime_visible_parameter_annotations = Annotation::parse_parameter_lists(sub, cp)?;
        }
        "RuntimeInvisibleParameterAnnotations" => {
            parsed.runtime_invisible_parameter_annotations =
                Annotation::parse_parameter_lists(sub, cp)?;
        }
        "RuntimeVisibleTypeAnnotations" => {
            parsed
                .runtime_visible_type_annotations
                .extend(TypeAnnotation::parse_list(sub, cp)?);
        }
        "RuntimeInvisibleTypeAnnotations" => {
            parsed
                .runtime_invisible_type_annotations
                .extend(TypeAnnotation::parse_list(sub, cp)?);
        }
        "AnnotationDefault" => {
            parsed.annotation_default = Some(ElementValue::parse(sub, cp)?);
        }
        "InnerClasses" => {
            let num = sub.read_u2()? as usize;
            let mut inners = Vec::with_capacity(num);
            for _ in 0..num {
                let inner_class_info_index = sub.read_u2()?;
                let outer_class_info_index = sub.read_u2()?;
                let inner_name_index = sub.read_u2()?;
                let access_flags = sub.read_u2()?;

                let inner_class = cp.get_class_name(inner_class_info_index)?.to_string();
                let outer_class = if outer_class_info_index == 0 {
                    None
                } else {
                    Some(cp.get_class_name(outer_class_info_index)?.to_string())
                };
                let inner_name = if inner_name_index == 0 {
                    None
                } else {
                    Some(cp.get_utf8(inner_name_index)?.to_string())
                };

                inners.push(InnerClassInfo {
                    inner_class,
                    outer_class,
                    inner_name,
                    access_flags,
                });
            }
            parsed.inner_classes.extend(inners);
        }
        "EnclosingMethod" => {
            let class = cp.get_class_name(sub.read_u2()?)?.to_string();
            let method_index = sub.read_u2()?;
            let method = if method_index == 0 {
                None
            } else {
                let (name, descriptor) = cp.get_name_and_type(method_index)?;
                Some((name.to_string(), descriptor.to_string()))
            };
            parsed.enclosing_method = Some(EnclosingMethod { class, method });
        }
        "MethodParameters" => {
            let count = sub.read_u1()? as usize;
            let mut params = Vec::with_capacity(count);
            for _ in 0..count {
                let name_index = sub.read_u2()?;
                let access_flags = sub.read_u2()?;
                let name = if name_index == 0 {
                    None
                } else {
                    Some(cp.get_utf8(name_index)?.to_string())
                };
                params.push(MethodParameter { name, access_flags });
            }
            parsed.method_parameters = Some(params);
        }
        "Exceptions" => {
            let count = sub.read_u2()? as usize;
            for _ in 0..count {
                parsed
                    .exceptions
                    .push(cp.get_class_name(sub.read_u2()?)?.to_string());
            }
        }
        "Record" => {
            let count = sub.read_u2()? as usize;
            let mut components = Vec::with_capacity(count);
            for _ in 0..count {
                let name = cp.get_utf8(sub.read_u2()?)?.to_string();
                let descriptor = cp.get_utf8(sub.read_u2()?)?.to_string();
                let attrs = parse_attributes(sub, cp, version, Target::RecordComponent)?;
                components.push(RecordComponent {
                    name,
                    descriptor,
                    signature: attrs.signature,
                    runtime_visible_annotations: attrs.runtime_visible_annotations,
                    runtime_invisible_annotations: attrs.runtime_invisible_annotations,
                    runtime_visible_type_annotations: attrs.runtime_visible_type_annotations,
                    runtime_invisible_type_annotations: attrs.runtime_invisible_type_annotations,
                });
            }
            parsed.record_components = Some(components);
        }
        "PermittedSubclasses" => {
            let count = sub.read_u2()? as usize;
            for _ in 0..count {
                parsed
                    .permitted_subclasses
                    .push(cp.get_class_name(sub.read_u2()?)?.to_string());
            }
        }
        "Code" => {
            let _max_stack = sub.read_u2()?;
            let _max_locals = sub.read_u2()?;
            let code_length = sub.read_u4()? as usize;
            parsed.code = Some(sub.read_bytes(code_length)?.to_vec());
            // Exception table and nested attributes are not needed.
            return Ok(());
        }
        _ => return Ok(()),
    }
    sub.ensure_empty()
}
