//! Streaming USTAR archive scanner.
//!
//! This module re-reads an archive produced by the header codec (or any
//! other USTAR writer) and yields one [`ScannedEntry`] per header, skipping
//! data blocks and detecting the end-of-archive sentinel.
//!
//! # Overview
//!
//! An archive is a sequence of `(header, data padded to 512 bytes)` pairs
//! followed by two all-zero blocks. The [`ArchiveScanner`] walks it as a
//! small state machine:
//!
//! - [`ScanState::ExpectHeader`]: the next block is a header or the first
//!   sentinel block
//! - [`ScanState::FirstZeroBlock`]: one zero block has been seen, the next
//!   must be zero too
//! - [`ScanState::Terminal`]: the sentinel was read, the scan is complete
//! - [`ScanState::Corrupt`]: a block is malformed
//! - [`ScanState::Truncated`]: the input stopped before the sentinel
//! - [`ScanState::Failed`]: the reader returned an I/O error
//!
//! There is no resynchronisation after corruption.
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use ustar_header::stream::{ArchiveScanner, ScanOptions, Selection};
//!
//! let file = File::open("archive.tar").unwrap();
//! let scanner = ArchiveScanner::new(BufReader::new(file), ScanOptions::default());
//! let selection = Selection::new(["docs"]);
//!
//! for entry in selection.filter(scanner) {
//!     let entry = entry.unwrap();
//!     println!("{} ({} bytes)", entry.path_lossy(), entry.size);
//! }
//! ```

mod entry;
mod error;
mod options;
mod scanner;
mod select;

pub use entry::ScannedEntry;
pub use error::{Corruption, Result, ScanError};
pub use options::ScanOptions;
pub use scanner::{ArchiveScanner, ScanState};
pub use select::{Selected, Selection};

#[cfg(test)]
mod tests;
