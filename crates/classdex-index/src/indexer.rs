use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use classdex_core::{DotName, NameTable};
use classdex_types::{Type, TypeVarScope, TypeVariable, WildcardBound};

use crate::build::{build_class, parse_with, ClassRecord};
use crate::config::IndexerConfig;
use crate::error::Result;
use crate::index::Index;
use crate::info::ClassInfo;

/// Accumulates parsed classes into an [`Index`].
///
/// Not meant to be shared between threads: ingest in parallel by giving each
/// worker its own `Indexer` and [`Index::merge`] the results. When the same
/// class name is indexed twice the first one is kept.
#[derive(Debug, Default)]
pub struct Indexer {
    config: IndexerConfig,
    names: NameTable,
    classes: HashMap<DotName, ClassRecord>,
    subclasses: BTreeMap<DotName, BTreeSet<DotName>>,
    implementors: BTreeMap<DotName, BTreeSet<DotName>>,
    users: BTreeMap<DotName, BTreeSet<DotName>>,
}

impl Indexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: IndexerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Parses `bytes` and indexes the class, returning its name.
    ///
    /// A malformed class file is reported and leaves the indexer untouched.
    pub fn index_bytes(&mut self, bytes: &[u8]) -> Result<DotName> {
        let record = parse_with(bytes, &self.config, &mut self.names)?;
        let name = record.name().clone();
        self.index(record);
        Ok(name)
    }

    /// Adds one class. Returns `false` if a class with the same name was
    /// already indexed; the new one is then discarded.
    pub fn index(&mut self, record: ClassRecord) -> bool {
        let name = record.name().clone();
        if self.classes.contains_key(&name) {
            tracing::debug!(target: "classdex.index", class = %name, "duplicate class, keeping the first");
            return false;
        }

        if let Some(super_class) = &record.info.super_class {
            self.subclasses
                .entry(super_class.clone())
                .or_default()
                .insert(name.clone());
        }
        for interface in record.info.interface_names() {
            self.implementors.entry(interface).or_default().insert(name.clone());
        }
        if self.config.track_users {
            for used in &record.references {
                self.users.entry(used.clone()).or_default().insert(name.clone());
            }
        }

        tracing::trace!(target: "classdex.index", class = %name, "indexed class");
        self.classes.insert(name, record);
        true
    }

    /// Freezes everything indexed so far.
    pub fn complete(mut self) -> Index {
        if self.config.resolve_enclosing_type_variables {
            self.resolve_enclosing_type_variables();
        }

        let count = self.classes.len();
        let classes = self
            .classes
            .into_iter()
            .map(|(name, record)| (name, Arc::new(record.info)))
            .collect();
        let index = Index::from_parts(classes, self.subclasses, self.implementors, self.users);
        tracing::debug!(
            target: "classdex.index",
            classes = count,
            annotations = index.annotation_names().count(),
            "index complete"
        );
        index
    }

    /// Rebuilds classes whose signatures mention type variables of an
    /// enclosing class or method, now that those may have been indexed.
    fn resolve_enclosing_type_variables(&mut self) {
        let mut pending: Vec<(usize, DotName)> = self
            .classes
            .values()
            .filter(|record| has_unresolved(&record.info))
            .map(|record| (self.enclosing_chain(&record.info).len(), record.info.name.clone()))
            .collect();
        // Outer classes first, so inner ones see their resolved variables.
        pending.sort();

        for (_, name) in pending {
            let Some(record) = self.classes.get(&name) else {
                continue;
            };
            let scope = self.enclosing_scope(&record.info);
            if scope.is_empty() {
                continue;
            }
            match build_class(&record.raw, &self.config, &mut self.names, &scope) {
                Ok(info) => {
                    if let Some(record) = self.classes.get_mut(&name) {
                        record.info = info;
                    }
                }
                Err(err) => tracing::debug!(
                    target: "classdex.index",
                    class = %name,
                    error = %err,
                    "could not rebuild class with enclosing type variables"
                ),
            }
        }
    }

    /// Indexed classes around `info`, innermost first.
    fn enclosing_chain<'a>(&'a self, info: &'a ClassInfo) -> Vec<&'a ClassInfo> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = info;
        while let Some(outer) = current.enclosing_class.as_ref() {
            if !seen.insert(outer) {
                break;
            }
            let Some(record) = self.classes.get(outer) else {
                break;
            };
            chain.push(&record.info);
            current = &record.info;
        }
        chain
    }

    fn enclosing_scope(&self, info: &ClassInfo) -> TypeVarScope {
        let mut levels = Vec::new();
        let mut inner = info;
        for outer in self.enclosing_chain(info) {
            let method = inner
                .enclosing_method
                .as_ref()
                .and_then(|enclosing| outer.method(&enclosing.name, &enclosing.descriptor));
            if let Some(method) = method {
                levels.push(method.type_parameters.clone());
            }
            levels.push(outer.type_parameters.clone());
            inner = outer;
        }

        let mut scope = TypeVarScope::new();
        for level in levels.into_iter().rev() {
            scope.push(level);
        }
        scope
    }
}

fn has_unresolved(info: &ClassInfo) -> bool {
    let components = info.record_components.as_deref().unwrap_or_default();
    declares_unresolved(&info.type_parameters)
        || info.super_class_type.iter().any(mentions_unresolved)
        || info.interface_types.iter().any(mentions_unresolved)
        || info.fields.iter().any(|field| mentions_unresolved(&field.ty))
        || components.iter().any(|component| mentions_unresolved(&component.ty))
        || info.methods.iter().any(|method| {
            declares_unresolved(&method.type_parameters)
                || mentions_unresolved(&method.return_type)
                || method.parameter_types.iter().any(mentions_unresolved)
                || method.exceptions.iter().any(mentions_unresolved)
        })
}

fn declares_unresolved(variables: &[Arc<TypeVariable>]) -> bool {
    variables
        .iter()
        .any(|variable| variable.bounds.iter().any(mentions_unresolved))
}

fn mentions_unresolved(ty: &Type) -> bool {
    match ty {
        Type::UnresolvedTypeVariable(_) => true,
        Type::Array(array) => mentions_unresolved(&array.component),
        Type::Parameterized(parameterized) => {
            parameterized.arguments.iter().any(mentions_unresolved)
                || parameterized.owner.as_deref().is_some_and(mentions_unresolved)
        }
        Type::Wildcard(wildcard) => match &wildcard.bound {
            WildcardBound::Extends(bound) | WildcardBound::Super(bound) => mentions_unresolved(bound),
            WildcardBound::Unbounded => false,
        },
        _ => false,
    }
}
