use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error categories shared by every classdex crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Truncated or corrupt class file, attribute or signature.
    MalformedInput,
    /// A class file or serialized index newer than this revision understands.
    UnsupportedVersion,
    /// A required input was missing or empty.
    InvalidArgument,
    /// A serialized index with a bad marker or checksum.
    CorruptIndexStream,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("unexpected end of input at byte {offset}")]
    UnexpectedEof { offset: usize },
    #[error("{count} trailing bytes at byte {offset}")]
    TrailingBytes { offset: usize, count: usize },
    #[error("invalid classfile magic: 0x{0:08x}")]
    InvalidMagic(u32),
    #[error("unsupported classfile version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("invalid constant pool index: {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("invalid constant pool tag {tag} at index {index}")]
    InvalidConstantPoolTag { index: u16, tag: u8 },
    #[error("constant pool type mismatch at index {index}: expected {expected}, found {found}")]
    ConstantPoolTypeMismatch {
        index: u16,
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid modified UTF-8 constant")]
    InvalidModifiedUtf8,
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("malformed {name} attribute at byte {offset}: {source}")]
    Attribute {
        name: &'static str,
        offset: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("malformed {0} attribute")]
    MalformedAttribute(&'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Attribute { source, .. } => source.kind(),
            _ => ErrorKind::MalformedInput,
        }
    }

    pub(crate) fn in_attribute(self, name: &'static str, offset: usize) -> Error {
        match self {
            already @ Error::Attribute { .. } => already,
            other => Error::Attribute {
                name,
                offset,
                source: Box::new(other),
            },
        }
    }
}
