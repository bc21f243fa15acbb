use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("graph file too small: {0} bytes")]
    FileTooSmall(u64),
    #[error("bad magic in graph file")]
    BadMagic,
    #[error("unsupported graph format version {0}")]
    UnsupportedVersion(u32),
    #[error("graph file truncated: {0}")]
    Truncated(String),
    #[error("unknown node id {0}")]
    UnknownNodeId(i64),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
