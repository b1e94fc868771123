//! The classdex catalog.
//!
//! [`parse`] turns one class file into a [`ClassRecord`]; an [`Indexer`]
//! collects records and [`Indexer::complete`] freezes them into an
//! [`Index`] that answers structural queries (annotations, subclasses,
//! implementors, users). [`EquivalenceKey`] identifies declarations
//! independently of their annotations.

#![forbid(unsafe_code)]

mod build;
mod config;
mod error;
mod index;
mod indexer;
mod info;
mod key;

pub use classdex_classfile::ErrorKind;

pub use crate::build::{parse, parse_with, ClassRecord};
pub use crate::config::IndexerConfig;
pub use crate::error::{Error, Result};
pub use crate::index::Index;
pub use crate::indexer::Indexer;
pub use crate::info::{
    ClassInfo, ClassKind, EnclosingMethodInfo, FieldInfo, MethodInfo, MethodParameterInfo, NestingType,
    RecordComponentInfo,
};
pub use crate::key::{key_of, Declaration, EquivalenceKey, TypeParameterKey};
