use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal failures. Recoverable findings (bad magic numbers, checksum
/// mismatches, surplus bytes) are reported as [`Warning`](crate::Warning)s
/// instead, because repairing broken images is a primary use case.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} header truncated")]
    TruncatedHeader(&'static str),

    #[error("bad {format} magic: {found:#010x}")]
    BadMagic { format: &'static str, found: u32 },

    #[error("LZMA decompression failed")]
    DecompressionFailed,

    #[error("no entry with uid {0}")]
    UnknownUid(u32),

    #[error("no such regular file in RomFS: {0}")]
    PathNotFound(String),

    #[error("only regular file content can be replaced: {0}")]
    AttemptedDirectoryModify(String),

    #[error("LZMA encoder failed: {status}")]
    EncoderFailed { status: std::process::ExitStatus },

    #[error("big-endian RomFS images are not supported")]
    BigEndianUnsupported,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
