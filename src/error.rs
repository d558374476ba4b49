//! Error types for persistence and mapping.
//!
//! Query operations never fail: out-of-range arguments are caller bugs and
//! are checked with debug assertions only. The errors below come from the
//! boundary where structures are written to, or read back from, bytes.

use thiserror::Error;

/// Errors raised while freezing or mapping a structure.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error from the underlying writer or file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The mapped region ended before the traversal did.
    #[error("truncated data: need {needed} bytes at offset {offset}, region is {len} bytes")]
    Truncated {
        /// Cursor position where the read was attempted.
        offset: usize,
        /// Number of bytes the field required.
        needed: usize,
        /// Total length of the mapped region.
        len: usize,
    },

    /// A vector length in the region does not fit in the address space.
    #[error("vector '{field}' declares {count} elements, which overflows the address space")]
    LengthOverflow {
        /// Field name from the structure's visit order.
        field: &'static str,
        /// Element count read from the region.
        count: u64,
    },

    /// A mapped field disagrees with the fields it is derived from, for
    /// example a region holding a different kind of structure.
    #[error("field '{field}' is inconsistent with the rest of the structure")]
    Corrupt {
        /// Field name from the structure's visit order.
        field: &'static str,
    },
}

/// Result type for persistence operations.
pub type Result<T> = std::result::Result<T, Error>;
