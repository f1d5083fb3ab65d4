//! Build USTAR archives from filesystem trees.
//!
//! Archiving happens in two steps. [`walk`] traverses the given roots and
//! returns the [`FsEntry`] list in archive order; [`ArchiveWriter`] then
//! stats every entry again, encodes its header with [`ustar_header`] and
//! streams file content into the output.
//!
//! ```no_run
//! use std::fs::File;
//! use ustar_archive::{walk, write_archive, WriteOptions};
//!
//! let tree = walk(["src"]);
//! for skipped in &tree.skipped {
//!     eprintln!("skipped: {skipped}");
//! }
//! let out = File::create("src.tar").unwrap();
//! write_archive(out, &tree.entries, WriteOptions::default()).unwrap();
//! ```

mod error;
mod identity;
mod metadata;
mod walk;
mod writer;

pub use error::{ArchiveError, IdKind, Result};
pub use identity::{IdentityLookup, StaticIdentities, SystemIdentities};
pub use metadata::{read_metadata, IdentityPolicy};
pub use walk::{walk, walk_in, FsEntry, FsEntryKind, Walk};
pub use writer::{write_archive, ArchiveWriter, WriteOptions};
