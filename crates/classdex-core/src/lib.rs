//! Core shared types for classdex.
//!
//! This crate is intentionally small: hierarchical names, the name interning
//! table and the class-file access flag constants.

#![forbid(unsafe_code)]

pub mod flags;
mod name;
mod table;

pub use crate::name::{DotName, NESTED_DELIMITER, PACKAGE_DELIMITER};
pub use crate::table::NameTable;
