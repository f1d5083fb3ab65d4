//! Error types for building archives.
//!
//! # Error Categories
//!
//! - **Path errors**: [`PathTooLong`]
//! - **Metadata errors**: [`UnsupportedType`], [`LinkReadFailed`],
//!   [`IdentityLookupFailed`], [`SizeChanged`]
//! - **Traversal errors**: [`DirectoryUnreadable`]
//! - **Encoding errors**: [`Header`]
//! - **System errors**: [`Io`], [`Write`]
//!
//! [`PathTooLong`]: ArchiveError::PathTooLong
//! [`UnsupportedType`]: ArchiveError::UnsupportedType
//! [`LinkReadFailed`]: ArchiveError::LinkReadFailed
//! [`IdentityLookupFailed`]: ArchiveError::IdentityLookupFailed
//! [`SizeChanged`]: ArchiveError::SizeChanged
//! [`DirectoryUnreadable`]: ArchiveError::DirectoryUnreadable
//! [`Header`]: ArchiveError::Header
//! [`Io`]: ArchiveError::Io
//! [`Write`]: ArchiveError::Write

use std::fmt;
use std::path::PathBuf;

use rustix::fs::FileType;
use ustar_header::HeaderError;

/// Result type alias for operations that may return an ArchiveError.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Which identity database a lookup went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// The user database.
    User,
    /// The group database.
    Group,
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdKind::User => "uid",
            IdKind::Group => "gid",
        })
    }
}

/// Error types for archive creation.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The archive path does not fit a header.
    #[error("{}: archive path is {len} bytes, limit is {limit}", .path.display())]
    PathTooLong {
        /// Filesystem path of the entry.
        path: PathBuf,
        /// Length of the archive path.
        len: usize,
        /// Format limit.
        limit: usize,
    },

    /// The header codec refused the entry's metadata.
    #[error("{}: {source}", .path.display())]
    Header {
        /// Filesystem path of the entry.
        path: PathBuf,
        /// Codec error.
        source: HeaderError,
    },

    /// The object is not a regular file, symlink or directory.
    #[error("{}: unsupported file type {file_type:?}", .path.display())]
    UnsupportedType {
        /// Filesystem path of the entry.
        path: PathBuf,
        /// What was found instead.
        file_type: FileType,
    },

    /// The target of a symlink could not be read.
    #[error("{}: cannot read link target: {source}", .path.display())]
    LinkReadFailed {
        /// Filesystem path of the symlink.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A uid or gid has no name in the identity database.
    #[error("no name for {kind} {id}")]
    IdentityLookupFailed {
        /// User or group.
        kind: IdKind,
        /// The id that was looked up.
        id: u32,
    },

    /// Reading filesystem metadata or content failed.
    #[error("{}: {source}", .path.display())]
    Io {
        /// Filesystem path involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A directory could not be opened or listed; its subtree was skipped.
    #[error("{}: cannot read directory: {source}", .path.display())]
    DirectoryUnreadable {
        /// Filesystem path of the directory.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A file's content length differs from the size it was stat'ed with.
    #[error("{}: size changed while archiving (expected {expected}, read {actual})", .path.display())]
    SizeChanged {
        /// Filesystem path of the file.
        path: PathBuf,
        /// Size recorded in the header.
        expected: u64,
        /// Bytes actually available.
        actual: u64,
    },

    /// Writing the archive output failed.
    #[error("writing archive: {0}")]
    Write(#[source] std::io::Error),
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: impl Into<std::io::Error>) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source: source.into(),
        }
    }
}
