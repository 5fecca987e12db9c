use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, FixtureError>;

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Matrix must have at least one row and one column")]
    EmptyMatrix,

    #[error("Row {row} has {actual} columns, expected {expected}")]
    RaggedRows { row: usize, expected: usize, actual: usize },

    #[error("Kernel {kernel:?} does not fit inside input {input:?}")]
    KernelTooLarge { kernel: (usize, usize), input: (usize, usize) },

    #[error("Not an npy file, magic was {0:?}")]
    InvalidMagic(Vec<u8>),

    #[error("Unsupported npy version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("Invalid npy header: {0}")]
    InvalidHeader(String),

    #[error("Unsupported npy dtype {0}")]
    UnsupportedDescr(String),

    #[error("Fortran ordered arrays are not supported")]
    FortranOrder,

    #[error("{file}: {detail}")]
    Mismatch { file: String, detail: String },
}

impl FixtureError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> FixtureError {
        let path = path.into();
        move |source| FixtureError::Io { path, source }
    }
}
