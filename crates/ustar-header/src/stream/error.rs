//! Error types for archive scanning.

use thiserror::Error;

use crate::HeaderError;

/// Why a block was judged malformed.
#[derive(Debug, Error)]
pub enum Corruption {
    /// The block failed header validation.
    #[error(transparent)]
    Header(#[from] HeaderError),

    /// A zero block was followed by a block with non-zero content.
    #[error("lone zero block before non-zero data")]
    LoneZeroBlock,
}

/// Errors that can occur while scanning an archive.
///
/// Three kinds of failure are kept apart: malformed blocks
/// ([`ScanError::Corrupt`], [`ScanError::InvalidSize`]), input that stops
/// short ([`ScanError::UnexpectedEof`] and the end-of-archive variants), and
/// failures of the underlying reader ([`ScanError::Io`]).
#[derive(Debug, Error)]
pub enum ScanError {
    /// I/O error from the underlying reader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The block at `pos` is not a valid header or sentinel block.
    #[error("corrupt archive at offset {pos}: {source}")]
    Corrupt {
        /// Offset of the offending block.
        pos: u64,
        /// What was wrong with it.
        source: Corruption,
    },

    /// EOF inside a block or inside entry data.
    #[error("unexpected EOF at position {pos}")]
    UnexpectedEof {
        /// Position in the stream where EOF occurred.
        pos: u64,
    },

    /// The stream ended where a header or the sentinel was expected.
    #[error("archive ends at {pos} without end-of-archive marker")]
    MissingEndOfArchive {
        /// Position in the stream where EOF occurred.
        pos: u64,
    },

    /// The stream ended after only one of the two sentinel blocks.
    #[error("archive ends at {pos} after a single zero block")]
    TruncatedEndOfArchive {
        /// Position in the stream where EOF occurred.
        pos: u64,
    },

    /// Entry size in header is invalid (overflow when computing padded size).
    #[error("invalid entry size: {0}")]
    InvalidSize(u64),
}

impl ScanError {
    /// Returns true if a block in the archive is malformed.
    ///
    /// Short input is not corruption; see [`ScanError::is_truncation`].
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, ScanError::Corrupt { .. } | ScanError::InvalidSize(_))
    }

    /// Returns true if the input ended before the archive did.
    #[must_use]
    pub fn is_truncation(&self) -> bool {
        matches!(
            self,
            ScanError::UnexpectedEof { .. }
                | ScanError::MissingEndOfArchive { .. }
                | ScanError::TruncatedEndOfArchive { .. }
        )
    }
}

/// Result type for scanning operations.
pub type Result<T> = std::result::Result<T, ScanError>;
