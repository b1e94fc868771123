//! Persisted form of a classdex [`Index`](classdex_index::Index).
//!
//! ## Format
//! A stored index is a small little-endian header (magic, format version,
//! payload length, blake3 payload hash) followed by a payload holding a
//! string table, the classes and the class user relation. See
//! [`format`] for the exact layout.
//!
//! ## Versions
//! Every [`FormatVersion`] can be read and written. Writing an older version
//! drops what it cannot express instead of failing; [`Feature`] lists what
//! each version carries.
//!
//! Type variables are stored by position in the parameter list that
//! declares them, so recursive bounds such as `<T extends Comparable<T>>`
//! never require walking the type graph. Variables declared by an enclosing
//! class or method are stored as standalone copies and lose their identity
//! with the enclosing declaration.

#![forbid(unsafe_code)]

mod error;
pub mod format;
mod read;
mod write;

pub use crate::error::{Result, StorageError};
pub use crate::format::{Feature, FormatVersion, Header, HEADER_LEN, MAGIC};
pub use crate::read::{read_from_path, IndexReader};
pub use crate::write::{write_to_path, IndexWriter, WriteOptions};
