//! Turning one decoded class file into its [`ClassInfo`].
//!
//! Generic signatures are preferred over descriptors wherever they parse;
//! a member whose signature is broken keeps its erased descriptor types.
//! Type annotations on type parameters and their bounds are placed while the
//! parameters are still being built, every other type annotation after.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use classdex_classfile::{
    parse_field_descriptor, parse_method_descriptor, Annotation, ClassFile, ClassMember, InnerClassInfo,
    TypeAnnotation, TypeAnnotationTarget, TypePathKind,
};
use classdex_core::flags::{has, ACC_ENUM, ACC_INTERFACE, ACC_MANDATED, ACC_STATIC, ACC_SYNTHETIC};
use classdex_core::{DotName, NameTable};
use classdex_types::{
    attach_to_type, attach_to_type_parameter, attach_to_type_parameter_bound, field_type_to_type,
    method_descriptor_types, parse_class_signature, parse_field_signature, parse_method_signature,
    AnnotationInstance, AnnotationTarget, Type, TypeParametersBuilder, TypeUsage, TypeVarScope, TypeVariable,
    Value,
};
use smol_str::SmolStr;

use crate::config::IndexerConfig;
use crate::error::{Error, Result};
use crate::info::{
    ClassInfo, EnclosingMethodInfo, FieldInfo, MethodInfo, NestingType, RecordComponentInfo,
};

/// One parsed class, ready to be handed to an [`Indexer`](crate::Indexer).
#[derive(Debug, Clone)]
pub struct ClassRecord {
    pub info: ClassInfo,
    /// Every other class the constant pool refers to.
    pub references: Vec<DotName>,
    pub(crate) raw: ClassFile,
}

impl ClassRecord {
    pub fn name(&self) -> &DotName {
        &self.info.name
    }
}

/// Parses one class file with the default configuration.
pub fn parse(bytes: &[u8]) -> Result<ClassRecord> {
    parse_with(bytes, &IndexerConfig::default(), &mut NameTable::new())
}

pub fn parse_with(bytes: &[u8], config: &IndexerConfig, names: &mut NameTable) -> Result<ClassRecord> {
    let mut raw = ClassFile::parse(bytes)?;
    if config.synthesize_implicit_members {
        raw.synthesize_implicit_members();
    }

    let info = build_class(&raw, config, names, &TypeVarScope::new())?;
    let mut references: Vec<DotName> = raw
        .constant_pool
        .class_references()
        .filter(|name| *name != raw.this_class)
        .map(|name| names.from_internal(name))
        .collect();
    references.sort();
    references.dedup();

    tracing::trace!(
        target: "classdex.index",
        class = %info.name,
        fields = info.fields.len(),
        methods = info.methods.len(),
        "parsed class"
    );
    Ok(ClassRecord { info, references, raw })
}

/// Builds the declarations of `raw`; `outer` holds the type variables of
/// the enclosing classes and method, when known.
pub(crate) fn build_class(
    raw: &ClassFile,
    config: &IndexerConfig,
    names: &mut NameTable,
    outer: &TypeVarScope,
) -> Result<ClassInfo> {
    let name = names.from_internal(&raw.this_class);
    let nesting = enclosing_instances(&raw.inner_classes, names);
    ClassBuilder {
        raw,
        config,
        names,
        name,
        nesting,
    }
    .build(outer)
}

/// Member classes that have an enclosing instance, mapped to the class of
/// that instance.
fn enclosing_instances(entries: &[InnerClassInfo], names: &mut NameTable) -> HashMap<DotName, DotName> {
    entries
        .iter()
        .filter(|entry| !has(entry.access_flags, ACC_STATIC | ACC_INTERFACE | ACC_ENUM))
        .filter_map(|entry| {
            let outer = entry.outer_class.as_deref()?;
            Some((names.from_internal(&entry.inner_class), names.from_internal(outer)))
        })
        .collect()
}

/// A type annotation with its resolved instance, waiting for its type.
struct Site {
    target: TypeAnnotationTarget,
    path: Vec<TypePathKind>,
    instance: AnnotationInstance,
}

impl Site {
    fn on_type_parameter(&self, of_method: bool) -> bool {
        match self.target {
            TypeAnnotationTarget::TypeParameter { method, .. }
            | TypeAnnotationTarget::TypeParameterBound { method, .. } => method == of_method,
            _ => false,
        }
    }
}

struct ClassBuilder<'a> {
    raw: &'a ClassFile,
    config: &'a IndexerConfig,
    names: &'a mut NameTable,
    name: DotName,
    nesting: HashMap<DotName, DotName>,
}

impl ClassBuilder<'_> {
    fn build(mut self, outer: &TypeVarScope) -> Result<ClassInfo> {
        let raw = self.raw;
        let class_target = AnnotationTarget::Class(self.name.clone());
        let mut annotations = self.annotations(
            &raw.runtime_visible_annotations,
            &raw.runtime_invisible_annotations,
            &class_target,
        );
        let (parameter_sites, sites): (Vec<_>, Vec<_>) = self
            .type_annotation_sites(
                &raw.runtime_visible_type_annotations,
                &raw.runtime_invisible_type_annotations,
                &class_target,
                TypeUsage::Field,
            )
            .into_iter()
            .partition(|site| site.on_type_parameter(false));

        let super_class = raw.super_class.as_deref().map(|name| self.names.from_internal(name));
        let mut header = None;
        if let Some(signature) = raw.signature.as_deref() {
            let nesting = &self.nesting;
            let mut placed = Vec::new();
            let parsed = parse_class_signature(signature, self.names, outer, |params| {
                place_on_type_parameters(params, &parameter_sites, nesting, &mut placed)
            });
            match parsed {
                Ok(parsed) => {
                    annotations.append(&mut placed);
                    header = Some(parsed);
                }
                Err(err) => self.signature_fallback(None, &err),
            }
        }
        if header.is_none() {
            self.drop_unplaced(&parameter_sites);
        }

        let (type_parameters, mut super_class_type, mut interface_types) = match header {
            Some(header) => (
                header.type_parameters,
                super_class.as_ref().map(|_| header.superclass),
                header.interfaces,
            ),
            None => (
                Vec::new(),
                super_class.clone().map(Type::class),
                raw.interfaces
                    .iter()
                    .map(|name| Type::class(self.names.from_internal(name)))
                    .collect(),
            ),
        };
        for site in sites {
            let slot = match site.target {
                TypeAnnotationTarget::Supertype { index: u16::MAX } => super_class_type.as_mut(),
                TypeAnnotationTarget::Supertype { index } => interface_types.get_mut(usize::from(index)),
                _ => None,
            };
            self.place(slot, site, &mut annotations);
        }

        let scope = outer.with(&type_parameters);
        let this_type = this_type(&self.name, &type_parameters);

        let mut fields = Vec::with_capacity(raw.fields.len());
        for field in &raw.fields {
            fields.push(self.field(field, &scope)?);
        }
        let mut methods = Vec::with_capacity(raw.methods.len());
        for method in &raw.methods {
            methods.push(self.method(method, &scope, &this_type)?);
        }
        let record_components = match &raw.record_components {
            Some(components) => {
                let mut out = Vec::with_capacity(components.len());
                for component in components {
                    out.push(self.record_component(component, &scope)?);
                }
                Some(out)
            }
            None => None,
        };

        let (nesting, simple_name, enclosing_class, enclosing_method) = self.nesting_info();
        // Declaration order, first occurrence of each member.
        let mut seen = HashSet::new();
        let member_classes: Vec<DotName> = raw
            .inner_classes
            .iter()
            .filter(|entry| entry.outer_class.as_deref() == Some(raw.this_class.as_str()))
            .filter(|entry| seen.insert(entry.inner_class.as_str()))
            .map(|entry| self.names.from_internal(&entry.inner_class))
            .collect();
        let permitted_subclasses = raw
            .permitted_subclasses
            .iter()
            .map(|name| self.names.from_internal(name))
            .collect();
        let flags = raw
            .own_inner_class_entry()
            .map_or(raw.access_flags, |entry| entry.access_flags);

        Ok(ClassInfo {
            name: self.name,
            flags,
            nesting,
            simple_name,
            enclosing_class,
            enclosing_method,
            member_classes,
            permitted_subclasses,
            source_file: raw.source_file.as_deref().map(SmolStr::new),
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

    fn nesting_info(
        &mut self,
    ) -> (NestingType, Option<SmolStr>, Option<DotName>, Option<EnclosingMethodInfo>) {
        let raw = self.raw;
        let enclosing_method = raw.enclosing_method.as_ref().and_then(|enclosing| {
            let (name, descriptor) = enclosing.method.as_ref()?;
            Some(EnclosingMethodInfo {
                class: self.names.from_internal(&enclosing.class),
                name: SmolStr::new(name),
                descriptor: SmolStr::new(descriptor),
            })
        });
        let enclosing_scope = raw
            .enclosing_method
            .as_ref()
            .map(|enclosing| self.names.from_internal(&enclosing.class));

        match raw.own_inner_class_entry() {
            Some(entry) => match &entry.outer_class {
                Some(outer) => (
                    NestingType::Inner,
                    entry.inner_name.as_deref().map(SmolStr::new),
                    Some(self.names.from_internal(outer)),
                    None,
                ),
                None if entry.inner_name.is_none() => {
                    (NestingType::Anonymous, None, enclosing_scope, enclosing_method)
                }
                None => (
                    NestingType::Local,
                    entry.inner_name.as_deref().map(SmolStr::new),
                    enclosing_scope,
                    enclosing_method,
                ),
            },
            None if raw.enclosing_method.is_some() => (
                NestingType::Local,
                Some(SmolStr::new(self.name.local())),
                enclosing_scope,
                enclosing_method,
            ),
            None => (
                NestingType::TopLevel,
                Some(SmolStr::new(self.name.local())),
                None,
                None,
            ),
        }
    }

    fn field(&mut self, field: &ClassMember, scope: &TypeVarScope) -> Result<FieldInfo> {
        let target = AnnotationTarget::Field {
            class: self.name.clone(),
            name: SmolStr::new(&field.name),
        };
        let mut ty = self.member_type(&field.name, field.signature.as_deref(), &field.descriptor, scope)?;
        let mut annotations = self.annotations(
            &field.runtime_visible_annotations,
            &field.runtime_invisible_annotations,
            &target,
        );
        let sites = self.type_annotation_sites(
            &field.runtime_visible_type_annotations,
            &field.runtime_invisible_type_annotations,
            &target,
            TypeUsage::Field,
        );
        for site in sites {
            let slot = matches!(site.target, TypeAnnotationTarget::Field).then_some(&mut ty);
            self.place(slot, site, &mut annotations);
        }

        Ok(FieldInfo {
            owner: self.name.clone(),
            name: SmolStr::new(&field.name),
            flags: field.access_flags,
            ty,
            annotations,
        })
    }

    fn record_component(
        &mut self,
        component: &classdex_classfile::RecordComponent,
        scope: &TypeVarScope,
    ) -> Result<RecordComponentInfo> {
        let target = AnnotationTarget::RecordComponent {
            class: self.name.clone(),
            name: SmolStr::new(&component.name),
        };
        let mut ty = self.member_type(
            &component.name,
            component.signature.as_deref(),
            &component.descriptor,
            scope,
        )?;
        let mut annotations = self.annotations(
            &component.runtime_visible_annotations,
            &component.runtime_invisible_annotations,
            &target,
        );
        let sites = self.type_annotation_sites(
            &component.runtime_visible_type_annotations,
            &component.runtime_invisible_type_annotations,
            &target,
            TypeUsage::RecordComponent,
        );
        for site in sites {
            let slot = matches!(site.target, TypeAnnotationTarget::Field).then_some(&mut ty);
            self.place(slot, site, &mut annotations);
        }

        Ok(RecordComponentInfo {
            owner: self.name.clone(),
            name: SmolStr::new(&component.name),
            ty,
            annotations,
        })
    }

    fn method(&mut self, method: &ClassMember, scope: &TypeVarScope, this_type: &Type) -> Result<MethodInfo> {
        let name = SmolStr::new(&method.name);
        let descriptor = SmolStr::new(&method.descriptor);
        let target = AnnotationTarget::Method {
            class: self.name.clone(),
            name: name.clone(),
            descriptor: descriptor.clone(),
        };

        let erased = parse_method_descriptor(&method.descriptor)
            .map_err(|_| self.invalid_descriptor(&method.name, &method.descriptor))?;
        let (descriptor_parameter_types, descriptor_return) = method_descriptor_types(&erased, self.names);
        let descriptor_len = descriptor_parameter_types.len();

        let mut annotations = self.annotations(
            &method.runtime_visible_annotations,
            &method.runtime_invisible_annotations,
            &target,
        );
        let (parameter_sites, sites): (Vec<_>, Vec<_>) = self
            .type_annotation_sites(
                &method.runtime_visible_type_annotations,
                &method.runtime_invisible_type_annotations,
                &target,
                TypeUsage::Field,
            )
            .into_iter()
            .partition(|site| site.on_type_parameter(true));

        let mut generic = None;
        if let Some(signature) = method.signature.as_deref() {
            let nesting = &self.nesting;
            let mut placed = Vec::new();
            let parsed = parse_method_signature(signature, self.names, scope, |params| {
                place_on_type_parameters(params, &parameter_sites, nesting, &mut placed)
            });
            match parsed {
                Ok(parsed) if parsed.parameters.len() <= descriptor_len => {
                    annotations.append(&mut placed);
                    generic = Some(parsed);
                }
                Ok(_) => tracing::debug!(
                    target: "classdex.index",
                    class = %self.name,
                    member = %method.name,
                    "signature declares more parameters than the descriptor, using the descriptor"
                ),
                Err(err) => self.signature_fallback(Some(&method.name), &err),
            }
        }
        if generic.is_none() {
            self.drop_unplaced(&parameter_sites);
        }

        let positions = self.logical_positions(
            method,
            descriptor_len,
            generic.as_ref().map(|generic| generic.parameters.len()),
        );
        let (type_parameters, mut parameter_types, mut return_type, exceptions) = match generic {
            Some(generic) => (
                generic.type_parameters,
                generic.parameters,
                generic.return_type,
                generic.exceptions,
            ),
            None => (
                Vec::new(),
                positions
                    .iter()
                    .filter_map(|&position| descriptor_parameter_types.get(usize::from(position)).cloned())
                    .collect(),
                descriptor_return,
                Vec::new(),
            ),
        };
        let mut exceptions = if exceptions.is_empty() {
            method
                .exceptions
                .iter()
                .map(|name| Type::class(self.names.from_internal(name)))
                .collect()
        } else {
            exceptions
        };
        let mut receiver_type = if has(method.access_flags, ACC_STATIC) || method.name == "<clinit>" {
            None
        } else if method.name == "<init>" {
            self.nesting.get(&self.name).cloned().map(Type::class)
        } else {
            Some(this_type.clone())
        };

        for site in sites {
            let slot = match site.target {
                TypeAnnotationTarget::Return => Some(&mut return_type),
                TypeAnnotationTarget::Receiver => receiver_type.as_mut(),
                TypeAnnotationTarget::FormalParameter { index } => parameter_types.get_mut(usize::from(index)),
                TypeAnnotationTarget::Throws { index } => exceptions.get_mut(usize::from(index)),
                _ => None,
            };
            self.place(slot, site, &mut annotations);
        }

        let parameter_names = match &method.method_parameters {
            Some(params) if params.len() == descriptor_len => positions
                .iter()
                .map(|&position| params.get(usize::from(position)).and_then(|p| p.name.as_deref()).map(SmolStr::new))
                .collect(),
            Some(params) if params.len() == positions.len() => params
                .iter()
                .map(|param| param.name.as_deref().map(SmolStr::new))
                .collect(),
            _ => vec![None; positions.len()],
        };

        let parameter_lists = [
            (true, &method.runtime_visible_parameter_annotations),
            (false, &method.runtime_invisible_parameter_annotations),
        ];
        for (visible, lists) in parameter_lists {
            if !visible && !self.config.invisible_annotations {
                continue;
            }
            let by_descriptor = lists.len() == descriptor_len && lists.len() != positions.len();
            for (logical, &position) in positions.iter().enumerate() {
                let list = if by_descriptor {
                    lists.get(usize::from(position))
                } else {
                    lists.get(logical)
                };
                let target = AnnotationTarget::MethodParameter {
                    class: self.name.clone(),
                    method: name.clone(),
                    descriptor: descriptor.clone(),
                    position: logical as u16,
                };
                for raw in list.map(Vec::as_slice).unwrap_or_default() {
                    if let Some(instance) =
                        AnnotationInstance::from_classfile(raw, Some(target.clone()), visible, self.names)
                    {
                        annotations.push(instance);
                    }
                }
            }
        }

        let default_value = method
            .annotation_default
            .as_ref()
            .and_then(|value| Value::from_classfile(value, self.names));

        Ok(MethodInfo {
            owner: self.name.clone(),
            name,
            flags: method.access_flags,
            descriptor,
            type_parameters,
            return_type,
            receiver_type,
            parameter_types,
            descriptor_parameter_types,
            parameter_positions: positions,
            parameter_names,
            exceptions,
            default_value,
            implicit: method.implicit,
            synthesized: method.synthesized,
            annotations,
        })
    }

    /// Descriptor indexes of the parameters a source declaration has.
    ///
    /// `MethodParameters` flags decide when present and consistent with the
    /// signature; otherwise the enum name/ordinal pair and the outer instance
    /// of inner class constructors are taken to lead, and captured values to
    /// trail.
    fn logical_positions(&self, method: &ClassMember, descriptor_len: usize, signature_len: Option<usize>) -> Vec<u16> {
        let outer_instance = method.name == "<init>" && self.nesting.contains_key(&self.name);
        let from_flags = method
            .method_parameters
            .as_ref()
            .filter(|params| params.len() == descriptor_len)
            .map(|params| {
                params
                    .iter()
                    .enumerate()
                    .filter(|(index, param)| {
                        let implicit_outer = outer_instance && *index == 0 && has(param.access_flags, ACC_MANDATED);
                        !has(param.access_flags, ACC_SYNTHETIC) && !implicit_outer
                    })
                    .map(|(index, _)| index as u16)
                    .collect::<Vec<_>>()
            });

        let leading = if method.name != "<init>" {
            0
        } else if has(self.raw.access_flags, ACC_ENUM) {
            2
        } else if outer_instance {
            1
        } else {
            0
        };
        match (from_flags, signature_len) {
            (Some(positions), None) => positions,
            (Some(positions), Some(len)) if positions.len() == len => positions,
            (_, Some(len)) => {
                let start = leading.min(descriptor_len - len);
                (start..start + len).map(|index| index as u16).collect()
            }
            (None, None) => (leading.min(descriptor_len)..descriptor_len)
                .map(|index| index as u16)
                .collect(),
        }
    }

    fn member_type(
        &mut self,
        member: &str,
        signature: Option<&str>,
        descriptor: &str,
        scope: &TypeVarScope,
    ) -> Result<Type> {
        let erased = parse_field_descriptor(descriptor).map_err(|_| self.invalid_descriptor(member, descriptor))?;
        if let Some(signature) = signature {
            match parse_field_signature(signature, self.names, scope) {
                Ok(ty) => return Ok(ty),
                Err(err) => self.signature_fallback(Some(member), &err),
            }
        }
        Ok(field_type_to_type(&erased, self.names))
    }

    fn annotations(
        &mut self,
        visible: &[Annotation],
        invisible: &[Annotation],
        target: &AnnotationTarget,
    ) -> Vec<AnnotationInstance> {
        let invisible = if self.config.invisible_annotations {
            invisible
        } else {
            &[]
        };
        visible
            .iter()
            .map(|raw| (raw, true))
            .chain(invisible.iter().map(|raw| (raw, false)))
            .filter_map(|(raw, visible)| {
                AnnotationInstance::from_classfile(raw, Some(target.clone()), visible, self.names)
            })
            .collect()
    }

    fn type_annotation_sites(
        &mut self,
        visible: &[TypeAnnotation],
        invisible: &[TypeAnnotation],
        enclosing: &AnnotationTarget,
        field_usage: TypeUsage,
    ) -> Vec<Site> {
        let invisible = if self.config.invisible_annotations {
            invisible
        } else {
            &[]
        };
        visible
            .iter()
            .map(|raw| (raw, true))
            .chain(invisible.iter().map(|raw| (raw, false)))
            .filter_map(|(raw, visible)| {
                let target = AnnotationTarget::Type {
                    enclosing: Box::new(enclosing.clone()),
                    usage: type_usage(raw.target, field_usage),
                };
                let instance =
                    AnnotationInstance::from_classfile(&raw.annotation, Some(target), visible, self.names)?;
                Some(Site {
                    target: raw.target,
                    path: raw.path.clone(),
                    instance,
                })
            })
            .collect()
    }

    fn place(&self, slot: Option<&mut Type>, site: Site, out: &mut Vec<AnnotationInstance>) {
        let attached = match slot {
            Some(ty) => attach_to_type(ty, &site.path, site.instance.clone(), &self.nesting),
            None => false,
        };
        if attached {
            out.push(site.instance);
        } else {
            tracing::debug!(
                target: "classdex.index",
                class = %self.name,
                annotation = %site.instance.name,
                target_type = ?site.target,
                "type annotation does not fit its type, dropped"
            );
        }
    }

    fn drop_unplaced(&self, sites: &[Site]) {
        for site in sites {
            tracing::debug!(
                target: "classdex.index",
                class = %self.name,
                annotation = %site.instance.name,
                "type parameter annotation without a generic signature, dropped"
            );
        }
    }

    fn signature_fallback(&self, member: Option<&str>, err: &classdex_types::SignatureError) {
        tracing::debug!(
            target: "classdex.index",
            class = %self.name,
            member = member.unwrap_or("<class>"),
            error = %err,
            "unparseable signature, using the descriptor"
        );
    }

    fn invalid_descriptor(&self, member: &str, descriptor: &str) -> Error {
        Error::InvalidDescriptor {
            owner: self.name.to_string(),
            member: member.to_string(),
            descriptor: descriptor.to_string(),
        }
    }
}

fn place_on_type_parameters(
    params: &mut TypeParametersBuilder,
    sites: &[Site],
    nesting: &HashMap<DotName, DotName>,
    placed: &mut Vec<AnnotationInstance>,
) {
    for site in sites {
        let attached = match site.target {
            TypeAnnotationTarget::TypeParameter { index, .. } => {
                attach_to_type_parameter(params, usize::from(index), &site.path, site.instance.clone())
            }
            TypeAnnotationTarget::TypeParameterBound { index, bound, .. } => attach_to_type_parameter_bound(
                params,
                usize::from(index),
                usize::from(bound),
                &site.path,
                site.instance.clone(),
                nesting,
            ),
            _ => false,
        };
        if attached {
            placed.push(site.instance.clone());
        } else {
            tracing::debug!(
                target: "classdex.index",
                annotation = %site.instance.name,
                target_type = ?site.target,
                "type parameter annotation does not fit, dropped"
            );
        }
    }
}

fn type_usage(target: TypeAnnotationTarget, field_usage: TypeUsage) -> TypeUsage {
    match target {
        TypeAnnotationTarget::TypeParameter { index, .. } => TypeUsage::TypeParameter { position: index },
        TypeAnnotationTarget::Supertype { index } => TypeUsage::Extends { position: index },
        TypeAnnotationTarget::TypeParameterBound { index, bound, .. } => TypeUsage::TypeParameterBound {
            position: index,
            bound,
        },
        TypeAnnotationTarget::Field => field_usage,
        TypeAnnotationTarget::Return => TypeUsage::Return,
        TypeAnnotationTarget::Receiver => TypeUsage::Receiver,
        TypeAnnotationTarget::FormalParameter { index } => TypeUsage::MethodParameter {
            position: u16::from(index),
        },
        TypeAnnotationTarget::Throws { index } => TypeUsage::Throws { position: index },
    }
}

/// The type of `this` inside a class declaring `type_parameters`.
fn this_type(name: &DotName, type_parameters: &[Arc<TypeVariable>]) -> Type {
    if type_parameters.is_empty() {
        return Type::class(name.clone());
    }
    let arguments = type_parameters
        .iter()
        .map(|variable| Type::TypeVariable(variable.clone()))
        .collect();
    Type::parameterized(name.clone(), arguments, None)
}
