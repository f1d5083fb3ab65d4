//! Depth-first traversal of the paths to archive.
//!
//! Directories are read through file descriptors opened relative to an
//! explicit base path, so the walk never changes the process working
//! directory. Each directory is listed completely and its descriptor closed
//! before any child is visited, which keeps at most one directory open at a
//! time.

use std::ffi::OsString;
use std::io;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

use log::{debug, trace, warn};
use rustix::fs::{openat, statat, AtFlags, Dir, FileType, Mode, OFlags, CWD};
use ustar_header::MAX_PATH_LEN;

use crate::error::ArchiveError;

/// The kinds of object the walker yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEntryKind {
    /// A regular file; its content follows the header.
    Regular,
    /// A symbolic link, archived as a link and never followed.
    Symlink,
    /// A directory, archived before its children.
    Directory,
}

impl FsEntryKind {
    fn from_file_type(file_type: FileType) -> Option<Self> {
        match file_type {
            FileType::RegularFile => Some(FsEntryKind::Regular),
            FileType::Symlink => Some(FsEntryKind::Symlink),
            FileType::Directory => Some(FsEntryKind::Directory),
            _ => None,
        }
    }
}

/// One object to archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    /// Where the object lives: the walk base joined with the archive path.
    pub fs_path: PathBuf,
    /// Path recorded in the archive; directories end in `/`.
    pub archive_path: Vec<u8>,
    /// Object kind as seen during the walk.
    pub kind: FsEntryKind,
}

impl FsEntry {
    /// Archive path as a lossy UTF-8 string.
    pub fn archive_path_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.archive_path)
    }
}

/// Result of walking one or more roots.
#[derive(Debug, Default)]
pub struct Walk {
    /// Entries in archive order.
    pub entries: Vec<FsEntry>,
    /// Everything that was left out because of an error.
    pub skipped: Vec<ArchiveError>,
}

impl Walk {
    fn skip(&mut self, err: ArchiveError) {
        warn!("skipping {err}");
        self.skipped.push(err);
    }
}

/// Walk each root in order and collect the entries to archive.
///
/// Every directory is yielded before its children, with a `/` appended to its
/// archive path. Children come in the order the directory lists them.
/// Symlinks are never followed. Objects that are not regular files,
/// symlinks or directories are left out without an error.
///
/// Failures do not stop the walk: an object that cannot be stat'ed, a path
/// longer than a header can hold or a directory that cannot be listed is
/// recorded in [`Walk::skipped`] and the walk moves on to the next sibling.
pub fn walk<I, P>(roots: I) -> Walk
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    walk_in(Path::new(""), roots)
}

/// Like [`walk`], but roots are looked up below `base`.
///
/// Archive paths are the roots as given, so `walk_in("/srv", ["www"])`
/// archives `/srv/www` as `www/`.
pub fn walk_in<B, I, P>(base: B, roots: I) -> Walk
where
    B: AsRef<Path>,
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let base = base.as_ref();
    let mut out = Walk::default();
    for root in roots {
        let root = root.as_ref();
        let fs_path = base.join(root);
        let file_type = match statat(CWD, &fs_path, AtFlags::SYMLINK_NOFOLLOW) {
            Ok(st) => FileType::from_raw_mode(st.st_mode as _),
            Err(e) => {
                out.skip(ArchiveError::io(fs_path, e));
                continue;
            }
        };
        let archive_path = root.as_os_str().as_bytes().to_vec();
        visit(fs_path, archive_path, file_type, &mut out);
    }
    out
}

fn visit(fs_path: PathBuf, mut archive_path: Vec<u8>, file_type: FileType, out: &mut Walk) {
    let Some(kind) = FsEntryKind::from_file_type(file_type) else {
        debug!("{}: ignoring {file_type:?}", fs_path.display());
        return;
    };

    if kind == FsEntryKind::Directory && !archive_path.ends_with(b"/") {
        archive_path.push(b'/');
    }
    if archive_path.len() > MAX_PATH_LEN {
        out.skip(ArchiveError::PathTooLong {
            path: fs_path,
            len: archive_path.len(),
            limit: MAX_PATH_LEN,
        });
        return;
    }

    trace!("walk {:?}", String::from_utf8_lossy(&archive_path));
    out.entries.push(FsEntry {
        fs_path: fs_path.clone(),
        archive_path: archive_path.clone(),
        kind,
    });
    if kind != FsEntryKind::Directory {
        return;
    }

    let children = match read_children(&fs_path) {
        Ok(children) => children,
        Err(source) => {
            out.skip(ArchiveError::DirectoryUnreadable {
                path: fs_path,
                source,
            });
            return;
        }
    };

    for (name, file_type) in children {
        let child_path = fs_path.join(&name);
        let mut child_archive = archive_path.clone();
        child_archive.extend_from_slice(name.as_bytes());
        match file_type {
            Ok(file_type) => visit(child_path, child_archive, file_type, out),
            Err(e) => out.skip(ArchiveError::io(child_path, e)),
        }
    }
}

/// List a directory, returning each child's name and file type.
fn read_children(dir: &Path) -> io::Result<Vec<(OsString, io::Result<FileType>)>> {
    let fd = openat(
        CWD,
        dir,
        OFlags::RDONLY | OFlags::DIRECTORY | OFlags::NOFOLLOW | OFlags::CLOEXEC,
        Mode::empty(),
    )?;

    let mut children = Vec::new();
    for item in Dir::read_from(&fd)? {
        let entry = item?;
        let name = entry.file_name().to_bytes();
        if name == b"." || name == b".." {
            continue;
        }

        // Some filesystems do not report the type in the directory listing.
        let file_type = match entry.file_type() {
            FileType::Unknown => statat(&fd, entry.file_name(), AtFlags::SYMLINK_NOFOLLOW)
                .map(|st| FileType::from_raw_mode(st.st_mode as _))
                .map_err(io::Error::from),
            known => Ok(known),
        };
        children.push((OsString::from_vec(name.to_vec()), file_type));
    }
    Ok(children)
}
