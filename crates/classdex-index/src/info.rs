use std::sync::Arc;

use classdex_classfile::{parse_method_descriptor, ImplicitKind};
use classdex_core::flags::{
    has, ACC_ABSTRACT, ACC_ANNOTATION, ACC_BRIDGE, ACC_ENUM, ACC_INTERFACE, ACC_MODULE, ACC_STATIC,
    ACC_SYNTHETIC, ACC_VARARGS,
};
use classdex_core::{DotName, NameTable};
use classdex_types::{
    method_descriptor_types, AnnotationInstance, AnnotationTarget, Type, TypeVariable, Value,
};
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
    Module,
}

/// Where a class is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NestingType {
    TopLevel,
    /// A member of another class, static or not.
    Inner,
    Local,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclosingMethodInfo {
    pub class: DotName,
    pub name: SmolStr,
    pub descriptor: SmolStr,
}

impl EnclosingMethodInfo {
    pub fn parameter_types(&self) -> Vec<Type> {
        match parse_method_descriptor(&self.descriptor) {
            Ok(descriptor) => method_descriptor_types(&descriptor, &mut NameTable::new()).0,
            Err(_) => Vec::new(),
        }
    }
}

/// One indexed class, interface, enum, record, annotation or module.
///
/// Members keep the order of the class file; the `*_sorted` accessors give
/// the by-name view.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: DotName,
    pub flags: u16,
    pub nesting: NestingType,
    pub simple_name: Option<SmolStr>,
    pub enclosing_class: Option<DotName>,
    pub enclosing_method: Option<EnclosingMethodInfo>,
    pub member_classes: Vec<DotName>,
    pub permitted_subclasses: Vec<DotName>,
    pub source_file: Option<SmolStr>,
    pub type_parameters: Vec<Arc<TypeVariable>>,
    pub super_class: Option<DotName>,
    pub super_class_type: Option<Type>,
    pub interface_types: Vec<Type>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    /// `Some` for records.
    pub record_components: Option<Vec<RecordComponentInfo>>,
    /// Annotations on the class declaration and on the types in its header.
    pub annotations: Vec<AnnotationInstance>,
}

impl ClassInfo {
    pub fn kind(&self) -> ClassKind {
        if has(self.flags, ACC_MODULE) {
            ClassKind::Module
        } else if has(self.flags, ACC_ANNOTATION) {
            ClassKind::Annotation
        } else if has(self.flags, ACC_INTERFACE) {
            ClassKind::Interface
        } else if has(self.flags, ACC_ENUM) {
            ClassKind::Enum
        } else if self.record_components.is_some() {
            ClassKind::Record
        } else {
            ClassKind::Class
        }
    }

    pub fn is_interface(&self) -> bool {
        has(self.flags, ACC_INTERFACE)
    }

    pub fn interface_names(&self) -> impl Iterator<Item = DotName> + '_ {
        self.interface_types.iter().map(Type::name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn fields_sorted(&self) -> Vec<&FieldInfo> {
        let mut fields: Vec<_> = self.fields.iter().collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        fields
    }

    /// First method called `name`, in declaration order.
    pub fn first_method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|method| method.name == name)
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.descriptor == descriptor)
    }

    pub fn methods_sorted(&self) -> Vec<&MethodInfo> {
        let mut methods: Vec<_> = self.methods.iter().collect();
        methods.sort_by(|a, b| (&a.name, &a.descriptor).cmp(&(&b.name, &b.descriptor)));
        methods
    }

    pub fn constructors(&self) -> impl Iterator<Item = &MethodInfo> {
        self.methods.iter().filter(|method| method.is_constructor())
    }

    pub fn has_no_args_constructor(&self) -> bool {
        self.constructors().any(|ctor| ctor.parameter_types.is_empty())
    }

    pub fn record_component(&self, name: &str) -> Option<&RecordComponentInfo> {
        self.record_components
            .as_deref()?
            .iter()
            .find(|component| component.name == name)
    }

    /// Annotations on the class declaration itself.
    pub fn declared_annotations(&self) -> impl Iterator<Item = &AnnotationInstance> {
        self.annotations
            .iter()
            .filter(|annotation| matches!(annotation.target, Some(AnnotationTarget::Class(_))))
    }

    pub fn declared_annotation(&self, name: &DotName) -> Option<&AnnotationInstance> {
        self.declared_annotations()
            .find(|annotation| &annotation.name == name)
    }

    /// Every annotation in this class: on the class, its members, their
    /// parameters and any type inside them.
    pub fn all_annotations(&self) -> impl Iterator<Item = &AnnotationInstance> {
        let components = self.record_components.as_deref().unwrap_or_default();
        self.annotations
            .iter()
            .chain(self.fields.iter().flat_map(|field| &field.annotations))
            .chain(self.methods.iter().flat_map(|method| &method.annotations))
            .chain(components.iter().flat_map(|component| &component.annotations))
    }

    /// A copy of this class with `edit` applied.
    ///
    /// Indexed classes are shared and never change; annotation overlays go
    /// through here and then [`Index::with_class_replaced`](crate::Index::with_class_replaced).
    pub fn rebuild_with(&self, edit: impl FnOnce(&mut ClassInfo)) -> ClassInfo {
        let mut copy = self.clone();
        edit(&mut copy);
        copy
    }
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub owner: DotName,
    pub name: SmolStr,
    pub flags: u16,
    pub ty: Type,
    /// Declaration annotations and type annotations on `ty`.
    pub annotations: Vec<AnnotationInstance>,
}

impl FieldInfo {
    pub fn is_enum_constant(&self) -> bool {
        has(self.flags, ACC_ENUM)
    }

    pub fn declared_annotations(&self) -> impl Iterator<Item = &AnnotationInstance> {
        self.annotations
            .iter()
            .filter(|annotation| !annotation.is_type_annotation())
    }
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub owner: DotName,
    pub name: SmolStr,
    pub flags: u16,
    pub descriptor: SmolStr,
    pub type_parameters: Vec<Arc<TypeVariable>>,
    pub return_type: Type,
    /// Type of `this`; `None` for static methods and constructors of
    /// classes without an enclosing instance.
    pub receiver_type: Option<Type>,
    /// Parameters as declared in source.
    pub parameter_types: Vec<Type>,
    /// Parameters as encoded in the descriptor, including synthetic and
    /// mandated ones.
    pub descriptor_parameter_types: Vec<Type>,
    /// Descriptor index of every entry of `parameter_types`.
    pub parameter_positions: Vec<u16>,
    pub parameter_names: Vec<Option<SmolStr>>,
    pub exceptions: Vec<Type>,
    pub default_value: Option<Value>,
    pub implicit: Option<ImplicitKind>,
    /// Not present in the class file; added for an implicitly declared member.
    pub synthesized: bool,
    /// Declaration, parameter and type annotations.
    pub annotations: Vec<AnnotationInstance>,
}

impl MethodInfo {
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    pub fn is_static_initializer(&self) -> bool {
        self.name == "<clinit>"
    }

    pub fn is_static(&self) -> bool {
        has(self.flags, ACC_STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        has(self.flags, ACC_ABSTRACT)
    }

    pub fn is_synthetic(&self) -> bool {
        has(self.flags, ACC_SYNTHETIC)
    }

    pub fn is_bridge(&self) -> bool {
        has(self.flags, ACC_BRIDGE)
    }

    pub fn is_varargs(&self) -> bool {
        has(self.flags, ACC_VARARGS)
    }

    pub fn parameter_name(&self, position: usize) -> Option<&str> {
        self.parameter_names.get(position)?.as_deref()
    }

    pub fn declared_annotations(&self) -> impl Iterator<Item = &AnnotationInstance> {
        self.annotations
            .iter()
            .filter(|annotation| matches!(annotation.target, Some(AnnotationTarget::Method { .. })))
    }

    /// The source-level parameters with their own annotations.
    pub fn parameters(&self) -> Vec<MethodParameterInfo> {
        self.parameter_types
            .iter()
            .enumerate()
            .map(|(position, ty)| {
                let position = position as u16;
                let annotations = self
                    .annotations
                    .iter()
                    .filter(|annotation| {
                        annotation
                            .target
                            .as_ref()
                            .is_some_and(|target| parameter_position(target) == Some(position))
                    })
                    .cloned()
                    .collect();
                MethodParameterInfo {
                    owner: self.owner.clone(),
                    method: self.name.clone(),
                    descriptor: self.descriptor.clone(),
                    position,
                    name: self.parameter_names.get(position as usize).cloned().flatten(),
                    ty: ty.clone(),
                    annotations,
                }
            })
            .collect()
    }
}

fn parameter_position(target: &AnnotationTarget) -> Option<u16> {
    match target {
        AnnotationTarget::MethodParameter { position, .. } => Some(*position),
        AnnotationTarget::Type {
            usage: classdex_types::TypeUsage::MethodParameter { position },
            ..
        } => Some(*position),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct MethodParameterInfo {
    pub owner: DotName,
    pub method: SmolStr,
    pub descriptor: SmolStr,
    pub position: u16,
    pub name: Option<SmolStr>,
    pub ty: Type,
    pub annotations: Vec<AnnotationInstance>,
}

#[derive(Debug, Clone)]
pub struct RecordComponentInfo {
    pub owner: DotName,
    pub name: SmolStr,
    pub ty: Type,
    pub annotations: Vec<AnnotationInstance>,
}

impl RecordComponentInfo {
    pub fn field<'a>(&self, class: &'a ClassInfo) -> Option<&'a FieldInfo> {
        class.field(&self.name)
    }

    pub fn accessor<'a>(&self, class: &'a ClassInfo) -> Option<&'a MethodInfo> {
        class
            .methods
            .iter()
            .find(|method| method.name == self.name && method.parameter_types.is_empty() && !method.is_static())
    }
}
