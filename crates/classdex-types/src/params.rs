use std::sync::Arc;

use smol_str::SmolStr;

use crate::annotation::AnnotationInstance;
use crate::ty::{Type, TypeVariable, TypeVariableReference, TypeVariableSlot, WildcardBound};

/// A type parameter list under construction.
///
/// Every identifier gets a slot before any bound is built, so bounds can
/// refer to their own variable or to any sibling. [`finish`] freezes the
/// variables in declaration order:
///
/// * references to an earlier sibling become that sibling's finished
///   [`Type::TypeVariable`],
/// * references to the variable itself or a later sibling stay
///   [`Type::TypeVariableReference`] and resolve through the slot.
///
/// No step walks a reference, so finishing is linear in the size of the
/// bounds even for mutually recursive declarations.
///
/// [`finish`]: TypeParametersBuilder::finish
pub struct TypeParametersBuilder {
    variables: Vec<TypeVariable>,
    slots: Vec<Arc<TypeVariableSlot>>,
}

impl TypeParametersBuilder {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        let mut variables = Vec::new();
        let mut slots = Vec::new();
        for (position, identifier) in identifiers.into_iter().enumerate() {
            let identifier = identifier.into();
            slots.push(Arc::new(TypeVariableSlot::new(identifier.clone(), position)));
            variables.push(TypeVariable::new(identifier));
        }
        Self { variables, slots }
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn position(&self, identifier: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.identifier() == identifier)
    }

    pub(crate) fn slots(&self) -> &[Arc<TypeVariableSlot>] {
        &self.slots
    }

    /// A reference to the variable at `position`, usable inside any bound
    /// of this list.
    pub fn reference(&self, position: usize, annotations: Vec<AnnotationInstance>) -> Option<Type> {
        let slot = self.slots.get(position)?;
        Some(Type::TypeVariableReference(TypeVariableReference::new(
            slot.clone(),
            annotations,
        )))
    }

    pub fn variable(&self, position: usize) -> Option<&TypeVariable> {
        self.variables.get(position)
    }

    pub fn variable_mut(&mut self, position: usize) -> Option<&mut TypeVariable> {
        self.variables.get_mut(position)
    }

    pub fn set_bounds(&mut self, position: usize, bounds: Vec<Type>, implicit_object_bound: bool) {
        if let Some(variable) = self.variables.get_mut(position) {
            variable.bounds = bounds;
            variable.implicit_object_bound = implicit_object_bound;
        }
    }

    pub fn finish(self) -> Vec<Arc<TypeVariable>> {
        let mut finished: Vec<Arc<TypeVariable>> = Vec::with_capacity(self.variables.len());
        for (mut variable, slot) in self.variables.into_iter().zip(&self.slots) {
            variable.bounds = variable
                .bounds
                .into_iter()
                .map(|bound| link_earlier(bound, &self.slots, &finished))
                .collect();
            let variable = Arc::new(variable);
            slot.fill(&variable);
            finished.push(variable);
        }
        finished
    }
}

fn link_earlier(ty: Type, slots: &[Arc<TypeVariableSlot>], finished: &[Arc<TypeVariable>]) -> Type {
    match ty {
        Type::TypeVariableReference(reference) => {
            let position = reference.position();
            let ours = slots
                .get(position)
                .is_some_and(|slot| Arc::ptr_eq(slot, reference.slot()));
            match finished.get(position) {
                Some(target) if ours => {
                    if reference.annotations.is_empty() {
                        Type::TypeVariable(target.clone())
                    } else {
                        let mut annotated = TypeVariable::clone(target);
                        annotated.annotations.extend(reference.annotations);
                        Type::TypeVariable(Arc::new(annotated))
                    }
                }
                _ => Type::TypeVariableReference(reference),
            }
        }
        Type::Parameterized(mut parameterized) => {
            parameterized.arguments = parameterized
                .arguments
                .into_iter()
                .map(|argument| link_earlier(argument, slots, finished))
                .collect();
            parameterized.owner = parameterized
                .owner
                .map(|owner| Box::new(link_earlier(*owner, slots, finished)));
            Type::Parameterized(parameterized)
        }
        Type::Array(mut array) => {
            array.component = Box::new(link_earlier(*array.component, slots, finished));
            Type::Array(array)
        }
        Type::Wildcard(mut wildcard) => {
            wildcard.bound = match wildcard.bound {
                WildcardBound::Extends(bound) => {
                    WildcardBound::Extends(Box::new(link_earlier(*bound, slots, finished)))
                }
                WildcardBound::Super(bound) => {
                    WildcardBound::Super(Box::new(link_earlier(*bound, slots, finished)))
                }
                WildcardBound::Unbounded => WildcardBound::Unbounded,
            };
            Type::Wildcard(wildcard)
        }
        other => other,
    }
}

/// Type variables visible at some point of a signature, innermost last.
#[derive(Debug, Clone, Default)]
pub struct TypeVarScope {
    levels: Vec<Vec<Arc<TypeVariable>>>,
}

impl TypeVarScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope where `variables` shadow everything already visible.
    pub fn with(&self, variables: &[Arc<TypeVariable>]) -> Self {
        let mut scope = self.clone();
        scope.push(variables.to_vec());
        scope
    }

    pub fn push(&mut self, variables: Vec<Arc<TypeVariable>>) {
        self.levels.push(variables);
    }

    /// Scope for an enclosed declaration: `outer` stays visible behind `self`.
    pub fn enclosed_by(&self, outer: &TypeVarScope) -> Self {
        let mut levels = outer.levels.clone();
        levels.extend(self.levels.iter().cloned());
        Self { levels }
    }

    pub fn lookup(&self, identifier: &str) -> Option<&Arc<TypeVariable>> {
        self.levels
            .iter()
            .rev()
            .find_map(|level| level.iter().find(|var| var.identifier == identifier))
    }

    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(Vec::is_empty)
    }
}
