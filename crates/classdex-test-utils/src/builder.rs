use crate::constant_pool::ConstantPoolBuilder;

const ACC_PUBLIC_SUPER: u16 = 0x0021;
const JAVA_17: u16 = 61;

/// An annotation value as it is written into an `element_value` structure.
#[derive(Debug, Clone)]
pub enum ElementSpec {
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    Enum {
        type_descriptor: String,
        const_name: String,
    },
    /// Return descriptor of the class literal.
    Class(String),
    Annotation(AnnotationSpec),
    Array(Vec<ElementSpec>),
}

#[derive(Debug, Clone)]
pub struct AnnotationSpec {
    pub descriptor: String,
    pub elements: Vec<(String, ElementSpec)>,
}

impl AnnotationSpec {
    /// `descriptor` is a field descriptor such as `Ljava/lang/Deprecated;`.
    pub fn new(descriptor: &str) -> Self {
        Self {
            descriptor: descriptor.to_string(),
            elements: Vec::new(),
        }
    }

    pub fn with(mut self, name: &str, value: ElementSpec) -> Self {
        self.elements.push((name.to_string(), value));
        self
    }
}

#[derive(Debug, Clone)]
pub struct TypeAnnotationSpec {
    pub target_type: u8,
    pub target_info: Vec<u8>,
    pub path: Vec<(u8, u8)>,
    pub annotation: AnnotationSpec,
}

impl TypeAnnotationSpec {
    pub fn new(target_type: u8, target_info: Vec<u8>, annotation: AnnotationSpec) -> Self {
        Self {
            target_type,
            target_info,
            path: Vec::new(),
            annotation,
        }
    }

    pub fn class_type_parameter(index: u8, annotation: AnnotationSpec) -> Self {
        Self::new(0x00, vec![index], annotation)
    }

    pub fn method_type_parameter(index: u8, annotation: AnnotationSpec) -> Self {
        Self::new(0x01, vec![index], annotation)
    }

    /// `index` 65535 targets the superclass.
    pub fn supertype(index: u16, annotation: AnnotationSpec) -> Self {
        Self::new(0x10, index.to_be_bytes().to_vec(), annotation)
    }

    pub fn class_type_parameter_bound(index: u8, bound: u8, annotation: AnnotationSpec) -> Self {
        Self::new(0x11, vec![index, bound], annotation)
    }

    pub fn method_type_parameter_bound(index: u8, bound: u8, annotation: AnnotationSpec) -> Self {
        Self::new(0x12, vec![index, bound], annotation)
    }

    pub fn field(annotation: AnnotationSpec) -> Self {
        Self::new(0x13, Vec::new(), annotation)
    }

    pub fn return_type(annotation: AnnotationSpec) -> Self {
        Self::new(0x14, Vec::new(), annotation)
    }

    pub fn receiver(annotation: AnnotationSpec) -> Self {
        Self::new(0x15, Vec::new(), annotation)
    }

    pub fn formal_parameter(index: u8, annotation: AnnotationSpec) -> Self {
        Self::new(0x16, vec![index], annotation)
    }

    pub fn throws(index: u16, annotation: AnnotationSpec) -> Self {
        Self::new(0x17, index.to_be_bytes().to_vec(), annotation)
    }

    /// A `localvar` target; only legal inside `Code`, used to test skipping.
    pub fn local_variable(annotation: AnnotationSpec) -> Self {
        Self::new(0x40, vec![0, 1, 0, 0, 0, 4, 0, 1], annotation)
    }

    pub fn array(mut self) -> Self {
        self.path.push((0, 0));
        self
    }

    pub fn nested(mut self) -> Self {
        self.path.push((1, 0));
        self
    }

    pub fn wildcard(mut self) -> Self {
        self.path.push((2, 0));
        self
    }

    pub fn type_argument(mut self, index: u8) -> Self {
        self.path.push((3, index));
        self
    }
}

#[derive(Debug, Clone)]
pub struct InnerClassSpec {
    pub inner: String,
    pub outer: Option<String>,
    pub simple_name: Option<String>,
    pub access_flags: u16,
}

impl InnerClassSpec {
    pub fn member(inner: &str, outer: &str, simple_name: &str, access_flags: u16) -> Self {
        Self {
            inner: inner.to_string(),
            outer: Some(outer.to_string()),
            simple_name: Some(simple_name.to_string()),
            access_flags,
        }
    }

    pub fn local(inner: &str, simple_name: &str, access_flags: u16) -> Self {
        Self {
            inner: inner.to_string(),
            outer: None,
            simple_name: Some(simple_name.to_string()),
            access_flags,
        }
    }

    pub fn anonymous(inner: &str, access_flags: u16) -> Self {
        Self {
            inner: inner.to_string(),
            outer: None,
            simple_name: None,
            access_flags,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordComponentSpec {
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<AttributeSpec>,
}

impl RecordComponentSpec {
    pub fn new(name: &str, descriptor: &str) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(mut self, attribute: AttributeSpec) -> Self {
        self.attributes.push(attribute);
        self
    }
}

#[derive(Debug, Clone)]
pub enum AttributeSpec {
    Signature(String),
    SourceFile(String),
    Annotations {
        visible: bool,
        annotations: Vec<AnnotationSpec>,
    },
    ParameterAnnotations {
        visible: bool,
        parameters: Vec<Vec<AnnotationSpec>>,
    },
    TypeAnnotations {
        visible: bool,
        annotations: Vec<TypeAnnotationSpec>,
    },
    AnnotationDefault(ElementSpec),
    InnerClasses(Vec<InnerClassSpec>),
    EnclosingMethod {
        class: String,
        method: Option<(String, String)>,
    },
    MethodParameters(Vec<(Option<String>, u16)>),
    Exceptions(Vec<String>),
    Record(Vec<RecordComponentSpec>),
    PermittedSubclasses(Vec<String>),
    /// Bytecode with `Methodref` indices patched in at the given offsets.
    Code {
        bytecode: Vec<u8>,
        method_refs: Vec<(usize, String, String, String)>,
    },
    Raw {
        name: String,
        bytes: Vec<u8>,
    },
}

impl AttributeSpec {
    /// `aload_0; invokespecial super.<init>()V; return`.
    pub fn default_constructor_code(super_class: &str) -> Self {
        AttributeSpec::Code {
            bytecode: vec![0x2A, 0xB7, 0, 0, 0xB1],
            method_refs: vec![(
                2,
                super_class.to_string(),
                "<init>".to_string(),
                "()V".to_string(),
            )],
        }
    }

    fn encode(&self, cp: &mut ConstantPoolBuilder, out: &mut Vec<u8>) {
        let mut body = Vec::new();
        let name = match self {
            AttributeSpec::Signature(signature) => {
                push_u16(&mut body, cp.utf8(signature));
                "Signature"
            }
            AttributeSpec::SourceFile(file) => {
                push_u16(&mut body, cp.utf8(file));
                "SourceFile"
            }
            AttributeSpec::Annotations {
                visible,
                annotations,
            } => {
                encode_annotation_list(annotations, cp, &mut body);
                if *visible {
                    "RuntimeVisibleAnnotations"
                } else {
                    "RuntimeInvisibleAnnotations"
                }
            }
            AttributeSpec::ParameterAnnotations {
                visible,
                parameters,
            } => {
                body.push(parameters.len() as u8);
                for annotations in parameters {
                    encode_annotation_list(annotations, cp, &mut body);
                }
                if *visible {
                    "RuntimeVisibleParameterAnnotations"
                } else {
                    "RuntimeInvisibleParameterAnnotations"
                }
            }
            AttributeSpec::TypeAnnotations {
                visible,
                annotations,
            } => {
                push_u16(&mut body, annotations.len() as u16);
                for annotation in annotations {
                    body.push(annotation.target_type);
                    body.extend_from_slice(&annotation.target_info);
                    body.push(annotation.path.len() as u8);
                    for (kind, argument) in &annotation.path {
                        body.push(*kind);
                        body.push(*argument);
                    }
                    encode_annotation(&annotation.annotation, cp, &mut body);
                }
                if *visible {
                    "RuntimeVisibleTypeAnnotations"
                } else {
                    "RuntimeInvisibleTypeAnnotations"
                }
            }
            AttributeSpec::AnnotationDefault(value) => {
                encode_element(value, cp, &mut body);
                "AnnotationDefault"
            }
            AttributeSpec::InnerClasses(entries) => {
                push_u16(&mut body, entries.len() as u16);
                for entry in entries {
                    push_u16(&mut body, cp.class(&entry.inner));
                    let outer = entry.outer.as_deref().map_or(0, |outer| cp.class(outer));
                    push_u16(&mut body, outer);
                    let simple = entry.simple_name.as_deref().map_or(0, |name| cp.utf8(name));
                    push_u16(&mut body, simple);
                    push_u16(&mut body, entry.access_flags);
                }
                "InnerClasses"
            }
            AttributeSpec::EnclosingMethod { class, method } => {
                push_u16(&mut body, cp.class(class));
                let method = method
                    .as_ref()
                    .map_or(0, |(name, descriptor)| cp.name_and_type(name, descriptor));
                push_u16(&mut body, method);
                "EnclosingMethod"
            }
            AttributeSpec::MethodParameters(params) => {
                body.push(params.len() as u8);
                for (name, flags) in params {
                    push_u16(&mut body, name.as_deref().map_or(0, |name| cp.utf8(name)));
                    push_u16(&mut body, *flags);
                }
                "MethodParameters"
            }
            AttributeSpec::Exceptions(classes) => {
                push_u16(&mut body, classes.len() as u16);
                for class in classes {
                    push_u16(&mut body, cp.class(class));
                }
                "Exceptions"
            }
            AttributeSpec::Record(components) => {
                push_u16(&mut body, components.len() as u16);
                for component in components {
                    push_u16(&mut body, cp.utf8(&component.name));
                    push_u16(&mut body, cp.utf8(&component.descriptor));
                    encode_attributes(&component.attributes, cp, &mut body);
                }
                "Record"
            }
            AttributeSpec::PermittedSubclasses(classes) => {
                push_u16(&mut body, classes.len() as u16);
                for class in classes {
                    push_u16(&mut body, cp.class(class));
                }
                "PermittedSubclasses"
            }
            AttributeSpec::Code {
                bytecode,
                method_refs,
            } => {
                let mut code = bytecode.clone();
                for (offset, class, name, descriptor) in method_refs {
                    let index = cp.method_ref(class, name, descriptor).to_be_bytes();
                    code[*offset] = index[0];
                    code[*offset + 1] = index[1];
                }
                push_u16(&mut body, 2); // max_stack
                push_u16(&mut body, 3); // max_locals
                push_u32(&mut body, code.len() as u32);
                body.extend_from_slice(&code);
                push_u16(&mut body, 0); // exception_table_length
                push_u16(&mut body, 0); // attributes_count
                "Code"
            }
            AttributeSpec::Raw { name, bytes } => {
                push_u16(out, cp.utf8(name));
                push_u32(out, bytes.len() as u32);
                out.extend_from_slice(bytes);
                return;
            }
        };
        push_u16(out, cp.utf8(name));
        push_u32(out, body.len() as u32);
        out.extend_from_slice(&body);
    }
}

#[derive(Debug, Clone)]
pub struct MemberSpec {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<AttributeSpec>,
}

impl MemberSpec {
    pub fn new(access_flags: u16, name: &str, descriptor: &str) -> Self {
        Self {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn signature(self, signature: &str) -> Self {
        self.attribute(AttributeSpec::Signature(signature.to_string()))
    }

    pub fn annotation(mut self, annotation: AnnotationSpec) -> Self {
        push_annotation(&mut self.attributes, true, annotation);
        self
    }

    pub fn invisible_annotation(mut self, annotation: AnnotationSpec) -> Self {
        push_annotation(&mut self.attributes, false, annotation);
        self
    }

    pub fn type_annotation(mut self, annotation: TypeAnnotationSpec) -> Self {
        push_type_annotation(&mut self.attributes, true, annotation);
        self
    }

    pub fn invisible_type_annotation(mut self, annotation: TypeAnnotationSpec) -> Self {
        push_type_annotation(&mut self.attributes, false, annotation);
        self
    }

    pub fn attribute(mut self, attribute: AttributeSpec) -> Self {
        self.attributes.push(attribute);
        self
    }

    fn encode(&self, cp: &mut ConstantPoolBuilder, out: &mut Vec<u8>) {
        push_u16(out, self.access_flags);
        push_u16(out, cp.utf8(&self.name));
        push_u16(out, cp.utf8(&self.descriptor));
        encode_attributes(&self.attributes, cp, out);
    }
}

/// Builds a class file in memory.
///
/// Defaults to a `public` class extending `java/lang/Object`, version 61.0.
#[derive(Debug, Clone)]
pub struct ClassFileBuilder {
    major: u16,
    minor: u16,
    access_flags: u16,
    this_class: String,
    super_class: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<MemberSpec>,
    methods: Vec<MemberSpec>,
    attributes: Vec<AttributeSpec>,
    extra_class_refs: Vec<String>,
}

impl ClassFileBuilder {
    /// `this_class` is an internal name such as `com/example/Foo`.
    pub fn new(this_class: &str) -> Self {
        Self {
            major: JAVA_17,
            minor: 0,
            access_flags: ACC_PUBLIC_SUPER,
            this_class: this_class.to_string(),
            super_class: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            extra_class_refs: Vec::new(),
        }
    }

    pub fn version(mut self, major: u16, minor: u16) -> Self {
        self.major = major;
        self.minor = minor;
        self
    }

    pub fn access(mut self, access_flags: u16) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn super_class(mut self, super_class: Option<&str>) -> Self {
        self.super_class = super_class.map(str::to_string);
        self
    }

    pub fn interface(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    pub fn field(mut self, field: MemberSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MemberSpec) -> Self {
        self.methods.push(method);
        self
    }

    pub fn signature(self, signature: &str) -> Self {
        self.attribute(AttributeSpec::Signature(signature.to_string()))
    }

    pub fn annotation(mut self, annotation: AnnotationSpec) -> Self {
        push_annotation(&mut self.attributes, true, annotation);
        self
    }

    pub fn invisible_annotation(mut self, annotation: AnnotationSpec) -> Self {
        push_annotation(&mut self.attributes, false, annotation);
        self
    }

    pub fn type_annotation(mut self, annotation: TypeAnnotationSpec) -> Self {
        push_type_annotation(&mut self.attributes, true, annotation);
        self
    }

    pub fn attribute(mut self, attribute: AttributeSpec) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Adds a `CONSTANT_Class` entry nothing else in the file refers to.
    pub fn class_reference(mut self, internal_name: &str) -> Self {
        self.extra_class_refs.push(internal_name.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut cp = ConstantPoolBuilder::new();
        let mut body = Vec::new();

        push_u16(&mut body, self.access_flags);
        push_u16(&mut body, cp.class(&self.this_class));
        let super_index = self.super_class.as_deref().map_or(0, |name| cp.class(name));
        push_u16(&mut body, super_index);
        push_u16(&mut body, self.interfaces.len() as u16);
        for interface in &self.interfaces {
            push_u16(&mut body, cp.class(interface));
        }
        for class in &self.extra_class_refs {
            cp.class(class);
        }

        push_u16(&mut body, self.fields.len() as u16);
        for field in &self.fields {
            field.encode(&mut cp, &mut body);
        }
        push_u16(&mut body, self.methods.len() as u16);
        for method in &self.methods {
            method.encode(&mut cp, &mut body);
        }
        encode_attributes(&self.attributes, &mut cp, &mut body);

        let mut out = Vec::with_capacity(10 + cp.bytes().len() + body.len());
        push_u32(&mut out, 0xCAFE_BABE);
        push_u16(&mut out, self.minor);
        push_u16(&mut out, self.major);
        push_u16(&mut out, cp.count());
        out.extend_from_slice(cp.bytes());
        out.extend_from_slice(&body);
        out
    }
}

fn push_annotation(attributes: &mut Vec<AttributeSpec>, visible: bool, annotation: AnnotationSpec) {
    for attribute in attributes.iter_mut() {
        if let AttributeSpec::Annotations {
            visible: v,
            annotations,
        } = attribute
        {
            if *v == visible {
                annotations.push(annotation);
                return;
            }
        }
    }
    attributes.push(AttributeSpec::Annotations {
        visible,
        annotations: vec![annotation],
    });
}

fn push_type_annotation(
    attributes: &mut Vec<AttributeSpec>,
    visible: bool,
    annotation: TypeAnnotationSpec,
) {
    for attribute in attributes.iter_mut() {
        if let AttributeSpec::TypeAnnotations {
            visible: v,
            annotations,
        } = attribute
        {
            if *v == visible {
                annotations.push(annotation);
                return;
            }
        }
    }
    attributes.push(AttributeSpec::TypeAnnotations {
        visible,
        annotations: vec![annotation],
    });
}

fn encode_attributes(attributes: &[AttributeSpec], cp: &mut ConstantPoolBuilder, out: &mut Vec<u8>) {
    push_u16(out, attributes.len() as u16);
    for attribute in attributes {
        attribute.encode(cp, out);
    }
}

fn encode_annotation_list(annotations: &[AnnotationSpec], cp: &mut ConstantPoolBuilder, out: &mut Vec<u8>) {
    push_u16(out, annotations.len() as u16);
    for annotation in annotations {
        encode_annotation(annotation, cp, out);
    }
}

fn encode_annotation(annotation: &AnnotationSpec, cp: &mut ConstantPoolBuilder, out: &mut Vec<u8>) {
    push_u16(out, cp.utf8(&annotation.descriptor));
    push_u16(out, annotation.elements.len() as u16);
    for (name, value) in &annotation.elements {
        push_u16(out, cp.utf8(name));
        encode_element(value, cp, out);
    }
}

fn encode_element(value: &ElementSpec, cp: &mut ConstantPoolBuilder, out: &mut Vec<u8>) {
    let (tag, index) = match value {
        ElementSpec::Byte(v) => (b'B', cp.integer(*v as i32)),
        ElementSpec::Char(v) => (b'C', cp.integer(*v as i32)),
        ElementSpec::Short(v) => (b'S', cp.integer(*v as i32)),
        ElementSpec::Int(v) => (b'I', cp.integer(*v)),
        ElementSpec::Boolean(v) => (b'Z', cp.integer(*v as i32)),
        ElementSpec::Long(v) => (b'J', cp.long(*v)),
        ElementSpec::Float(v) => (b'F', cp.float(*v)),
        ElementSpec::Double(v) => (b'D', cp.double(*v)),
        ElementSpec::String(v) => (b's', cp.utf8(v)),
        ElementSpec::Class(v) => (b'c', cp.utf8(v)),
        ElementSpec::Enum {
            type_descriptor,
            const_name,
        } => {
            out.push(b'e');
            push_u16(out, cp.utf8(type_descriptor));
            push_u16(out, cp.utf8(const_name));
            return;
        }
        ElementSpec::Annotation(annotation) => {
            out.push(b'@');
            encode_annotation(annotation, cp, out);
            return;
        }
        ElementSpec::Array(values) => {
            out.push(b'[');
            push_u16(out, values.len() as u16);
            for value in values {
                encode_element(value, cp, out);
            }
            return;
        }
    };
    out.push(tag);
    push_u16(out, index);
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}
