use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use classdex_classfile::BaseType;
use classdex_core::DotName;
use smol_str::SmolStr;

use crate::annotation::AnnotationInstance;

/// A Java type as it appears in a declaration.
///
/// Every variant except [`Type::Void`] carries its own type-use annotations.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Void,
    Primitive(PrimitiveType),
    Class(ClassType),
    Array(ArrayType),
    Parameterized(ParameterizedType),
    /// A type variable with its bounds. Occurrences share the declaration
    /// unless an occurrence carries annotations of its own.
    TypeVariable(Arc<TypeVariable>),
    /// An occurrence of a type variable inside the bounds of its own type
    /// parameter list that points at the variable itself or a later sibling.
    TypeVariableReference(TypeVariableReference),
    /// A type variable whose declaring scope is not known.
    UnresolvedTypeVariable(UnresolvedTypeVariable),
    Wildcard(WildcardType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Primitive,
    Class,
    Array,
    ParameterizedType,
    TypeVariable,
    TypeVariableReference,
    UnresolvedTypeVariable,
    WildcardType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveType {
    pub primitive: BaseType,
    pub annotations: Vec<AnnotationInstance>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassType {
    pub name: DotName,
    pub annotations: Vec<AnnotationInstance>,
}

/// `dimensions` levels of array around `component`.
///
/// The annotations belong to the outermost dimension. An annotation on an
/// inner dimension splits the array so that the annotated dimension starts
/// its own `ArrayType`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub component: Box<Type>,
    pub dimensions: u32,
    pub annotations: Vec<AnnotationInstance>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterizedType {
    pub name: DotName,
    pub arguments: Vec<Type>,
    /// Enclosing type of a non-static member class, e.g. `Outer<T>` in
    /// `Outer<T>.Inner<U>`.
    pub owner: Option<Box<Type>>,
    pub annotations: Vec<AnnotationInstance>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeVariable {
    pub identifier: SmolStr,
    pub bounds: Vec<Type>,
    /// The declaration had no class bound (`T::Ljava/lang/Runnable;`), so the
    /// first bound is an interface and `Object` is implied.
    pub implicit_object_bound: bool,
    pub annotations: Vec<AnnotationInstance>,
}

#[derive(Clone)]
pub struct TypeVariableReference {
    slot: Arc<TypeVariableSlot>,
    pub annotations: Vec<AnnotationInstance>,
}

/// One entry of a type parameter list, filled once the list is finished.
pub struct TypeVariableSlot {
    identifier: SmolStr,
    position: usize,
    target: OnceLock<Weak<TypeVariable>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedTypeVariable {
    pub identifier: SmolStr,
    pub annotations: Vec<AnnotationInstance>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WildcardType {
    pub bound: WildcardBound,
    pub annotations: Vec<AnnotationInstance>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WildcardBound {
    Unbounded,
    Extends(Box<Type>),
    Super(Box<Type>),
}

impl Type {
    pub fn primitive(primitive: BaseType) -> Type {
        Type::Primitive(PrimitiveType {
            primitive,
            annotations: Vec::new(),
        })
    }

    pub fn class(name: DotName) -> Type {
        Type::Class(ClassType {
            name,
            annotations: Vec::new(),
        })
    }

    /// Wraps `component` in `dimensions` array levels, merging with an
    /// unannotated array component.
    pub fn array(component: Type, dimensions: u32) -> Type {
        if dimensions == 0 {
            return component;
        }
        match component {
            Type::Array(inner) if inner.annotations.is_empty() => Type::Array(ArrayType {
                component: inner.component,
                dimensions: inner.dimensions + dimensions,
                annotations: Vec::new(),
            }),
            component => Type::Array(ArrayType {
                component: Box::new(component),
                dimensions,
                annotations: Vec::new(),
            }),
        }
    }

    pub fn parameterized(name: DotName, arguments: Vec<Type>, owner: Option<Type>) -> Type {
        Type::Parameterized(ParameterizedType {
            name,
            arguments,
            owner: owner.map(Box::new),
            annotations: Vec::new(),
        })
    }

    pub fn unresolved(identifier: impl Into<SmolStr>) -> Type {
        Type::UnresolvedTypeVariable(UnresolvedTypeVariable {
            identifier: identifier.into(),
            annotations: Vec::new(),
        })
    }

    pub fn wildcard(bound: WildcardBound) -> Type {
        Type::Wildcard(WildcardType {
            bound,
            annotations: Vec::new(),
        })
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            Type::Void => TypeKind::Void,
            Type::Primitive(_) => TypeKind::Primitive,
            Type::Class(_) => TypeKind::Class,
            Type::Array(_) => TypeKind::Array,
            Type::Parameterized(_) => TypeKind::ParameterizedType,
            Type::TypeVariable(_) => TypeKind::TypeVariable,
            Type::TypeVariableReference(_) => TypeKind::TypeVariableReference,
            Type::UnresolvedTypeVariable(_) => TypeKind::UnresolvedTypeVariable,
            Type::Wildcard(_) => TypeKind::WildcardType,
        }
    }

    pub fn annotations(&self) -> &[AnnotationInstance] {
        match self {
            Type::Void => &[],
            Type::Primitive(t) => &t.annotations,
            Type::Class(t) => &t.annotations,
            Type::Array(t) => &t.annotations,
            Type::Parameterized(t) => &t.annotations,
            Type::TypeVariable(t) => &t.annotations,
            Type::TypeVariableReference(t) => &t.annotations,
            Type::UnresolvedTypeVariable(t) => &t.annotations,
            Type::Wildcard(t) => &t.annotations,
        }
    }

    /// Annotation list of this node, if it can be changed in place.
    ///
    /// `Void` cannot be annotated and shared type variables must be copied
    /// first, so both return `None`.
    pub(crate) fn annotations_mut(&mut self) -> Option<&mut Vec<AnnotationInstance>> {
        match self {
            Type::Void | Type::TypeVariable(_) => None,
            Type::Primitive(t) => Some(&mut t.annotations),
            Type::Class(t) => Some(&mut t.annotations),
            Type::Array(t) => Some(&mut t.annotations),
            Type::Parameterized(t) => Some(&mut t.annotations),
            Type::TypeVariableReference(t) => Some(&mut t.annotations),
            Type::UnresolvedTypeVariable(t) => Some(&mut t.annotations),
            Type::Wildcard(t) => Some(&mut t.annotations),
        }
    }

    /// Identifier of a type variable of any flavour.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Type::TypeVariable(t) => Some(&t.identifier),
            Type::TypeVariableReference(t) => Some(t.identifier()),
            Type::UnresolvedTypeVariable(t) => Some(&t.identifier),
            _ => None,
        }
    }

    /// The declared type variable this type denotes, following references.
    pub fn as_type_variable(&self) -> Option<Arc<TypeVariable>> {
        match self {
            Type::TypeVariable(t) => Some(t.clone()),
            Type::TypeVariableReference(t) => t.follow(),
            _ => None,
        }
    }

    /// The erased name of this type.
    ///
    /// Type variables erase to their first bound, arrays use their descriptor
    /// form with dots (`[Ljava.lang.String;`).
    pub fn name(&self) -> DotName {
        match self {
            Type::Void => DotName::simple("void"),
            Type::Primitive(t) => DotName::simple(t.primitive.java_name()),
            Type::Class(t) => t.name.clone(),
            Type::Parameterized(t) => t.name.clone(),
            Type::Array(_) => {
                let mut out = String::new();
                self.push_erased_descriptor(&mut out);
                DotName::simple(out.replace('/', "."))
            }
            Type::TypeVariable(t) => t.erased_name(),
            Type::TypeVariableReference(t) => {
                t.follow().map_or_else(object_name, |target| target.erased_name())
            }
            Type::UnresolvedTypeVariable(_) => object_name(),
            Type::Wildcard(t) => match &t.bound {
                WildcardBound::Extends(bound) => bound.name(),
                _ => object_name(),
            },
        }
    }

    /// Appends the descriptor of the erasure of this type.
    pub fn push_erased_descriptor(&self, out: &mut String) {
        match self {
            Type::Void => out.push('V'),
            Type::Primitive(t) => out.push(t.primitive.descriptor()),
            Type::Array(t) => {
                for _ in 0..t.dimensions {
                    out.push('[');
                }
                t.component.push_erased_descriptor(out);
            }
            other => {
                out.push('L');
                out.push_str(&other.name().to_string_with('/'));
                out.push(';');
            }
        }
    }

    pub fn erased_descriptor(&self) -> String {
        let mut out = String::new();
        self.push_erased_descriptor(&mut out);
        out
    }

    /// Renders the type the way Java source would, without annotations.
    pub fn to_plain_string(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_java(&mut out, false);
        out
    }

    fn write_java(&self, out: &mut impl fmt::Write, annotated: bool) -> fmt::Result {
        let write_annotations = |out: &mut dyn fmt::Write, annotations: &[AnnotationInstance]| {
            if annotated {
                for annotation in annotations {
                    write!(out, "@{} ", annotation.name)?;
                }
            }
            Ok::<(), fmt::Error>(())
        };
        match self {
            Type::Void => out.write_str("void"),
            Type::Primitive(t) => {
                write_annotations(out, &t.annotations)?;
                out.write_str(t.primitive.java_name())
            }
            Type::Class(t) => {
                write_annotations(out, &t.annotations)?;
                write!(out, "{}", t.name)
            }
            Type::Array(t) => {
                // Java writes the outermost dimension first: `int @A [] @B []`.
                let mut levels = vec![t];
                let mut element = t.component.as_ref();
                while let Type::Array(inner) = element {
                    levels.push(inner);
                    element = inner.component.as_ref();
                }
                element.write_java(out, annotated)?;
                for level in levels {
                    if annotated && !level.annotations.is_empty() {
                        out.write_char(' ')?;
                        write_annotations(out, &level.annotations)?;
                    }
                    for _ in 0..level.dimensions {
                        out.write_str("[]")?;
                    }
                }
                Ok(())
            }
            Type::Parameterized(t) => {
                match t.owner.as_deref() {
                    Some(owner) if annotated || t.has_arguments_in_chain() => {
                        owner.write_java(out, annotated)?;
                        out.write_char('.')?;
                        write_annotations(out, &t.annotations)?;
                        out.write_str(simple_name(&t.name))?;
                    }
                    _ => {
                        write_annotations(out, &t.annotations)?;
                        write!(out, "{}", t.name)?;
                    }
                }
                if !t.arguments.is_empty() {
                    out.write_char('<')?;
                    for (i, argument) in t.arguments.iter().enumerate() {
                        if i > 0 {
                            out.write_str(", ")?;
                        }
                        argument.write_java(out, annotated)?;
                    }
                    out.write_char('>')?;
                }
                Ok(())
            }
            Type::TypeVariable(t) => {
                write_annotations(out, &t.annotations)?;
                out.write_str(&t.identifier)
            }
            Type::TypeVariableReference(t) => {
                write_annotations(out, &t.annotations)?;
                out.write_str(t.identifier())
            }
            Type::UnresolvedTypeVariable(t) => {
                write_annotations(out, &t.annotations)?;
                out.write_str(&t.identifier)
            }
            Type::Wildcard(t) => {
                write_annotations(out, &t.annotations)?;
                match &t.bound {
                    WildcardBound::Unbounded => out.write_char('?'),
                    WildcardBound::Extends(bound) => {
                        out.write_str("? extends ")?;
                        bound.write_java(out, annotated)
                    }
                    WildcardBound::Super(bound) => {
                        out.write_str("? super ")?;
                        bound.write_java(out, annotated)
                    }
                }
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_java(f, true)
    }
}

impl ArrayType {
    /// The innermost non-array type.
    pub fn element_type(&self) -> &Type {
        let mut component = self.component.as_ref();
        while let Type::Array(inner) = component {
            component = inner.component.as_ref();
        }
        component
    }

    /// Dimensions including those of split-off inner arrays.
    pub fn total_dimensions(&self) -> u32 {
        let mut dimensions = self.dimensions;
        let mut component = self.component.as_ref();
        while let Type::Array(inner) = component {
            dimensions += inner.dimensions;
            component = inner.component.as_ref();
        }
        dimensions
    }
}

impl ParameterizedType {
    /// Whether this type or any owner has type arguments. Without any, the
    /// owner chain only exists to carry annotations.
    pub fn has_arguments_in_chain(&self) -> bool {
        if !self.arguments.is_empty() {
            return true;
        }
        match self.owner.as_deref() {
            Some(Type::Parameterized(owner)) => owner.has_arguments_in_chain(),
            _ => false,
        }
    }
}

impl TypeVariable {
    pub fn new(identifier: impl Into<SmolStr>) -> Self {
        Self {
            identifier: identifier.into(),
            bounds: Vec::new(),
            implicit_object_bound: false,
            annotations: Vec::new(),
        }
    }

    /// Name of the first bound, `java.lang.Object` when there is none.
    pub fn erased_name(&self) -> DotName {
        self.erased_name_within(MAX_ERASURE_HOPS)
    }

    fn erased_name_within(&self, hops: usize) -> DotName {
        if self.implicit_object_bound {
            return object_name();
        }
        match self.bounds.first() {
            None => object_name(),
            // Malformed input may bound variables on each other in a cycle.
            Some(Type::TypeVariableReference(_)) if hops == 0 => object_name(),
            Some(Type::TypeVariableReference(reference)) => reference
                .follow()
                .map_or_else(object_name, |target| target.erased_name_within(hops - 1)),
            Some(Type::TypeVariable(target)) if hops > 0 => target.erased_name_within(hops - 1),
            Some(Type::TypeVariable(_)) => object_name(),
            Some(bound) => bound.name(),
        }
    }
}

impl TypeVariableReference {
    pub(crate) fn new(slot: Arc<TypeVariableSlot>, annotations: Vec<AnnotationInstance>) -> Self {
        Self { slot, annotations }
    }

    pub fn identifier(&self) -> &str {
        &self.slot.identifier
    }

    /// Index of the referenced variable in its type parameter list.
    pub fn position(&self) -> usize {
        self.slot.position
    }

    /// The referenced declaration. `None` before the parameter list is
    /// finished or after the declaring structure was dropped.
    ///
    /// The link is weak: the declaration owns its bounds, so a strong link
    /// back from a bound would be a reference cycle. A reference cloned out
    /// of an index therefore only resolves while the `ClassInfo` or
    /// `MethodInfo` declaring the variable is alive. Keep an
    /// `Arc<TypeVariable>` from [`follow`](Self::follow) to hold the
    /// declaration past that point. [`identifier`](Self::identifier) and
    /// [`position`](Self::position) stay available either way.
    pub fn follow(&self) -> Option<Arc<TypeVariable>> {
        self.slot.target.get().and_then(Weak::upgrade)
    }

    pub(crate) fn slot(&self) -> &Arc<TypeVariableSlot> {
        &self.slot
    }
}

impl PartialEq for TypeVariableReference {
    fn eq(&self, other: &Self) -> bool {
        self.identifier() == other.identifier()
            && self.position() == other.position()
            && self.annotations == other.annotations
    }
}

impl fmt::Debug for TypeVariableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeVariableReference")
            .field("identifier", &self.identifier())
            .field("position", &self.position())
            .field("annotations", &self.annotations)
            .finish()
    }
}

impl TypeVariableSlot {
    pub(crate) fn new(identifier: SmolStr, position: usize) -> Self {
        Self {
            identifier,
            position,
            target: OnceLock::new(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub(crate) fn fill(&self, target: &Arc<TypeVariable>) {
        // A slot is filled once, by the list that created it.
        let _ = self.target.set(Arc::downgrade(target));
    }
}

const MAX_ERASURE_HOPS: usize = 256;

fn object_name() -> DotName {
    DotName::simple("java.lang.Object")
}

/// `Inner` for `Outer$Inner`, whatever the representation.
fn simple_name(name: &DotName) -> &str {
    if name.is_inner() {
        return name.local();
    }
    let local = name.local();
    let local = local.rsplit_once('.').map_or(local, |(_, tail)| tail);
    local.rsplit_once('$').map_or(local, |(_, tail)| tail)
}
