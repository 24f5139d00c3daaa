//! Error taxonomy for the ZIM engine.
//!
//! Every fallible engine operation returns [`Result<T>`]; nothing in this
//! crate panics on a well-formed read of a malformed archive.

/// All ways an engine operation can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid magic number: expected 0x{expected:08X}, got 0x{found:08X}")]
    BadMagic { expected: u32, found: u32 },

    #[error("unsupported ZIM version: major {major} (minimum supported is 6)")]
    UnsupportedVersion { major: u16 },

    #[error("deprecated directory entry mime type: 0x{0:04X}")]
    DeprecatedEntry(u16),

    #[error("invalid UTF-8 in directory entry string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("directory entry string exceeds the maximum reread length")]
    StringTooLong,

    #[error("unknown cluster compression code: {0}")]
    UnsupportedCompression(u8),

    #[error("cluster offset table is malformed")]
    MalformedCluster,

    #[error("LZMA2 stream decode failed: {0}")]
    Lzma2Decode(String),

    #[error("Zstd stream decode failed: {0}")]
    ZstdDecode(String),

    #[error("{what} index {index} out of range (len {len})")]
    OutOfRange {
        what: &'static str,
        index: u64,
        len: u64,
    },

    #[error("blob {index} out of range (cluster has {count} blobs)")]
    BlobOutOfRange { index: u32, count: u64 },

    #[error("no entry found for {0}")]
    NotFound(String),

    #[error("archive has no main page")]
    NoMainPage,

    #[error("maximum redirect depth ({0}) exceeded")]
    MaxRedirectsExceeded(u8),

    #[error("redirect target index is the sentinel (0xFFFFFFFF)")]
    InvalidRedirectTarget,

    #[error("search query was empty")]
    EmptyQuery,

    #[error("no title index (v0 or v1) available in this archive")]
    IndexUnavailable,

    #[error("invalid title index payload size: {0} bytes (must be a multiple of 4)")]
    InvalidIndexSize(usize),

    #[error("could not find {0} distinct random article(s) within the retry budget")]
    RandomExhausted(&'static str),

    #[error("archive {0:?} not found in catalog")]
    ArchiveNotFound(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
