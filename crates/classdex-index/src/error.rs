use classdex_classfile::ErrorKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    ClassFile(#[from] classdex_classfile::Error),
    #[error("invalid descriptor `{descriptor}` on {owner}.{member}")]
    InvalidDescriptor {
        owner: String,
        member: String,
        descriptor: String,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ClassFile(err) => err.kind(),
            Error::InvalidDescriptor { .. } => ErrorKind::MalformedInput,
        }
    }
}
