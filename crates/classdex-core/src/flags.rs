//! Access and property flags as encoded in class files.
//!
//! Several bits are reused with a different meaning depending on whether they
//! appear on a class, a field, a method or a parameter.

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
/// Class: treat superclass methods specially when invoked by `invokespecial`.
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_SYNCHRONIZED: u16 = 0x0020;
pub const ACC_VOLATILE: u16 = 0x0040;
pub const ACC_BRIDGE: u16 = 0x0040;
pub const ACC_TRANSIENT: u16 = 0x0080;
pub const ACC_VARARGS: u16 = 0x0080;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_STRICT: u16 = 0x0800;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_ANNOTATION: u16 = 0x2000;
pub const ACC_ENUM: u16 = 0x4000;
pub const ACC_MODULE: u16 = 0x8000;
pub const ACC_MANDATED: u16 = 0x8000;

#[inline]
pub const fn has(flags: u16, flag: u16) -> bool {
    flags & flag != 0
}

/// Renders the Java modifiers of a method or field, in source order.
///
/// Only used for diagnostics; bits without a source keyword are omitted.
pub fn modifiers_to_string(flags: u16, is_method: bool) -> String {
    let mut words: Vec<&str> = Vec::new();
    if has(flags, ACC_PUBLIC) {
        words.push("public");
    }
    if has(flags, ACC_PROTECTED) {
        words.push("protected");
    }
    if has(flags, ACC_PRIVATE) {
        words.push("private");
    }
    if has(flags, ACC_ABSTRACT) {
        words.push("abstract");
    }
    if has(flags, ACC_STATIC) {
        words.push("static");
    }
    if has(flags, ACC_FINAL) {
        words.push("final");
    }
    if is_method {
        if has(flags, ACC_SYNCHRONIZED) {
            words.push("synchronized");
        }
        if has(flags, ACC_NATIVE) {
            words.push("native");
        }
    } else {
        if has(flags, ACC_TRANSIENT) {
            words.push("transient");
        }
        if has(flags, ACC_VOLATILE) {
            words.push("volatile");
        }
    }
    words.join(" ")
}
