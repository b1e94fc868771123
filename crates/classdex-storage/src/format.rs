//! Wire-level constants shared by the reader and the writer.
//!
//! ## Layout
//! A stored index is a fixed 24-byte little-endian header followed by the
//! payload:
//!
//! | offset | size | field |
//! |---|---|---|
//! | 0 | 4 | magic `CDXI` |
//! | 4 | 2 | format version |
//! | 6 | 2 | reserved, zero |
//! | 8 | 8 | payload length |
//! | 16 | 8 | first 8 bytes of the payload's blake3 hash |
//!
//! The payload starts with a string table. Everything after it refers to
//! strings by their `u32` position in that table, and to class names by
//! the binary (`$`-separated) string of the name.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, StorageError};

pub const MAGIC: [u8; 4] = *b"CDXI";
pub const HEADER_LEN: usize = 24;

/// A historical version of the stored format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormatVersion {
    V1 = 1,
    V2 = 2,
    V3 = 3,
}

impl FormatVersion {
    pub const LATEST: FormatVersion = FormatVersion::V3;
    pub const ALL: [FormatVersion; 3] = [FormatVersion::V1, FormatVersion::V2, FormatVersion::V3];

    pub fn from_u16(value: u16) -> Option<Self> {
        FormatVersion::ALL
            .into_iter()
            .find(|version| version.as_u16() == value)
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn supports(self, feature: Feature) -> bool {
        self >= feature.introduced_in()
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        FormatVersion::LATEST
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_u16())
    }
}

/// Data that only some format versions carry. Writing an older version
/// drops the data silently; reading an older version yields the documented
/// fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Members are stored sorted with their declared position. Without it
    /// the sorted order is all that survives.
    MemberPositions,
    /// Record components. Without them `record_components` reads back as `None`.
    RecordComponents,
    /// The class user relation. Without it no users are known.
    Users,
    /// `RuntimeInvisible*` annotations. Without them only visible ones survive.
    InvisibleAnnotations,
    /// Self and forward references inside type parameter bounds. Without
    /// them such occurrences read back as unresolved type variables.
    TypeVariableReferences,
}

impl Feature {
    pub const fn introduced_in(self) -> FormatVersion {
        match self {
            Feature::MemberPositions | Feature::RecordComponents | Feature::Users => FormatVersion::V2,
            Feature::InvisibleAnnotations | Feature::TypeVariableReferences => FormatVersion::V3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: FormatVersion,
    pub payload_len: u64,
    pub content_hash: u64,
}

impl Header {
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..4].copy_from_slice(&MAGIC);
        LittleEndian::write_u16(&mut out[4..6], self.version.as_u16());
        LittleEndian::write_u64(&mut out[8..16], self.payload_len);
        LittleEndian::write_u64(&mut out[16..24], self.content_hash);
        out
    }

    /// Decodes the header at the start of `bytes`. The magic is checked
    /// before the length so that arbitrary short input is told apart from a
    /// cut-off index.
    pub fn decode(bytes: &[u8]) -> Result<Header> {
        if bytes.is_empty() {
            return Err(StorageError::InvalidArgument("empty index stream"));
        }
        let magic_len = bytes.len().min(MAGIC.len());
        if bytes[..magic_len] != MAGIC[..magic_len] {
            let mut found = [0u8; 4];
            found[..magic_len].copy_from_slice(&bytes[..magic_len]);
            return Err(StorageError::BadMagic { found });
        }
        if bytes.len() < HEADER_LEN {
            return Err(StorageError::Truncated {
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }

        let raw_version = LittleEndian::read_u16(&bytes[4..6]);
        let version = FormatVersion::from_u16(raw_version).ok_or(StorageError::UnsupportedVersion {
            found: raw_version,
            latest: FormatVersion::LATEST.as_u16(),
        })?;
        Ok(Header {
            version,
            payload_len: LittleEndian::read_u64(&bytes[8..16]),
            content_hash: LittleEndian::read_u64(&bytes[16..24]),
        })
    }
}

pub(crate) fn content_hash(payload: &[u8]) -> u64 {
    let hash = blake3::hash(payload);
    LittleEndian::read_u64(&hash.as_bytes()[..8])
}

pub(crate) mod tag {
    pub const VOID: u8 = 0;
    pub const PRIMITIVE: u8 = 1;
    pub const CLASS: u8 = 2;
    pub const ARRAY: u8 = 3;
    pub const PARAMETERIZED: u8 = 4;
    /// A variable of an enclosing parameter list in scope: level and index.
    pub const TYPE_VARIABLE: u8 = 5;
    /// A variable of the parameter list whose bounds are being read.
    pub const REFERENCE: u8 = 6;
    pub const UNRESOLVED: u8 = 7;
    pub const WILDCARD: u8 = 8;
    /// A standalone copy of a variable declared outside the stored scope.
    pub const FOREIGN: u8 = 9;

    pub const WILDCARD_UNBOUNDED: u8 = 0;
    pub const WILDCARD_EXTENDS: u8 = 1;
    pub const WILDCARD_SUPER: u8 = 2;

    pub const TARGET_NONE: u8 = 0;
    pub const TARGET_CLASS: u8 = 1;
    pub const TARGET_FIELD: u8 = 2;
    pub const TARGET_METHOD: u8 = 3;
    pub const TARGET_PARAMETER: u8 = 4;
    pub const TARGET_RECORD_COMPONENT: u8 = 5;
    pub const TARGET_TYPE: u8 = 6;

    pub const USAGE_FIELD: u8 = 0;
    pub const USAGE_RECORD_COMPONENT: u8 = 1;
    pub const USAGE_RETURN: u8 = 2;
    pub const USAGE_RECEIVER: u8 = 3;
    pub const USAGE_EXTENDS: u8 = 4;
    pub const USAGE_PARAMETER: u8 = 5;
    pub const USAGE_TYPE_PARAMETER: u8 = 6;
    pub const USAGE_TYPE_PARAMETER_BOUND: u8 = 7;
    pub const USAGE_THROWS: u8 = 8;

    pub const VALUE_BOOLEAN: u8 = 0;
    pub const VALUE_BYTE: u8 = 1;
    pub const VALUE_SHORT: u8 = 2;
    pub const VALUE_INT: u8 = 3;
    pub const VALUE_LONG: u8 = 4;
    pub const VALUE_FLOAT: u8 = 5;
    pub const VALUE_DOUBLE: u8 = 6;
    pub const VALUE_CHAR: u8 = 7;
    pub const VALUE_STRING: u8 = 8;
    pub const VALUE_CLASS: u8 = 9;
    pub const VALUE_ENUM: u8 = 10;
    pub const VALUE_NESTED: u8 = 11;
    pub const VALUE_ARRAY: u8 = 12;
}

/// Bound on type and value nesting accepted from a stream.
pub(crate) const MAX_DEPTH: usize = 256;

/// Sentinel for "no string" in optional string slots.
pub(crate) const NO_STRING: u32 = u32::MAX;
