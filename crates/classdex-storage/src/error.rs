use classdex_classfile::ErrorKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a classdex index: magic {found:02x?}")]
    BadMagic { found: [u8; 4] },
    #[error("unsupported index format version {found} (latest is {latest})")]
    UnsupportedVersion { found: u16, latest: u16 },
    #[error("truncated index: expected at least {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("payload hash mismatch: expected {expected:016x}, found {found:016x}")]
    HashMismatch { expected: u64, found: u64 },
    #[error("malformed index at byte {offset}: {message}")]
    Malformed { offset: usize, message: &'static str },
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::BadMagic { .. } | StorageError::HashMismatch { .. } => {
                ErrorKind::CorruptIndexStream
            }
            StorageError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            StorageError::Truncated { .. } | StorageError::Malformed { .. } => {
                ErrorKind::MalformedInput
            }
            StorageError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StorageError::Io(err) => match err.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::InvalidInput => {
                    ErrorKind::InvalidArgument
                }
                _ => ErrorKind::MalformedInput,
            },
        }
    }
}
