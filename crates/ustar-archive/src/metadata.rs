//! Collect header metadata for filesystem objects.

use std::path::Path;

use log::{debug, warn};
use rustix::fs::{readlinkat, statat, AtFlags, FileType, Stat, CWD};
use ustar_header::{EntryMetadata, EntryType};

use crate::error::{ArchiveError, IdKind, Result};
use crate::identity::IdentityLookup;
use crate::walk::FsEntry;

/// What to do when a uid or gid has no name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentityPolicy {
    /// Fail with [`ArchiveError::IdentityLookupFailed`].
    #[default]
    Require,
    /// Log a warning and leave the name field empty.
    Lenient,
}

/// Map a file type to the header entry type, if it can be archived.
fn entry_type_for(file_type: FileType) -> Option<EntryType> {
    match file_type {
        FileType::RegularFile => Some(EntryType::Regular),
        FileType::Directory => Some(EntryType::Directory),
        FileType::Symlink => Some(EntryType::Symlink),
        _ => None,
    }
}

/// Stat an entry (without following symlinks) and build its header metadata.
///
/// The archive path is taken from the entry unchanged; symlinks get their
/// target, and owner names come from `ids`.
///
/// # Errors
///
/// [`ArchiveError::Io`] if the object cannot be stat'ed,
/// [`ArchiveError::UnsupportedType`] if it is not a regular file, symlink
/// or directory, [`ArchiveError::LinkReadFailed`] if a symlink target cannot
/// be read, and [`ArchiveError::IdentityLookupFailed`] under
/// [`IdentityPolicy::Require`].
pub fn read_metadata(
    entry: &FsEntry,
    ids: &impl IdentityLookup,
    policy: IdentityPolicy,
) -> Result<EntryMetadata> {
    let path = entry.fs_path.as_path();
    let st = statat(CWD, path, AtFlags::SYMLINK_NOFOLLOW)
        .map_err(|e| ArchiveError::io(path, e))?;

    let file_type = FileType::from_raw_mode(st.st_mode as _);
    let entry_type = entry_type_for(file_type).ok_or_else(|| ArchiveError::UnsupportedType {
        path: path.to_path_buf(),
        file_type,
    })?;

    let link_target = if entry_type.is_symlink() {
        readlinkat(CWD, path, Vec::new())
            .map_err(|e| ArchiveError::LinkReadFailed {
                path: path.to_path_buf(),
                source: e.into(),
            })?
            .into_bytes()
    } else {
        Vec::new()
    };

    let uid = st.st_uid as u32;
    let gid = st.st_gid as u32;
    let uname = resolve_name(IdKind::User, uid, ids.user_name(uid), policy)?;
    let gname = resolve_name(IdKind::Group, gid, ids.group_name(gid), policy)?;

    let (mtime, mtime_nsec) = modification_time(path, &st);

    Ok(EntryMetadata {
        path: entry.archive_path.clone(),
        entry_type,
        mode: st.st_mode as u32,
        uid,
        gid,
        size: if entry_type.is_file() {
            st.st_size as u64
        } else {
            0
        },
        mtime,
        mtime_nsec,
        uname,
        gname,
        link_target,
        device: None,
    })
}

fn resolve_name(
    kind: IdKind,
    id: u32,
    name: Option<Vec<u8>>,
    policy: IdentityPolicy,
) -> Result<Vec<u8>> {
    match (name, policy) {
        (Some(name), _) => Ok(name),
        (None, IdentityPolicy::Require) => Err(ArchiveError::IdentityLookupFailed { kind, id }),
        (None, IdentityPolicy::Lenient) => {
            warn!("no name for {kind} {id}, leaving it empty");
            Ok(Vec::new())
        }
    }
}

/// Seconds and nanoseconds of the modification time. Times before the epoch
/// cannot be stored and are clamped to zero.
fn modification_time(path: &Path, st: &Stat) -> (u64, u32) {
    let secs = st.st_mtime as i64;
    match u64::try_from(secs) {
        Ok(secs) => (secs, st.st_mtime_nsec as u32),
        Err(_) => {
            debug!("{}: mtime {secs} is before the epoch, storing 0", path.display());
            (0, 0)
        }
    }
}
