//! Utilities shared by classdex tests.
//!
//! [`ClassFileBuilder`] fabricates class files byte by byte so reader and
//! indexer features can be tested without a Java compiler on the machine.
//! [`capture_logs`] records the `tracing` output of a closure.

mod builder;
mod constant_pool;
mod logs;

pub use builder::{
    AnnotationSpec, AttributeSpec, ClassFileBuilder, ElementSpec, InnerClassSpec, MemberSpec,
    RecordComponentSpec, TypeAnnotationSpec,
};
pub use constant_pool::{encode_modified_utf8, ConstantPoolBuilder};
pub use logs::capture_logs;
