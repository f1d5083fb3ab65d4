//! Decoded archive entry.

use std::borrow::Cow;

use crate::{EntryType, Header, HeaderError, BLOCK_SIZE};

/// One archive entry as decoded by the scanner.
///
/// The entry owns its data, so it stays valid after the scanner moves on.
#[derive(Debug, Clone)]
pub struct ScannedEntry {
    /// Copy of the 512-byte header block.
    pub header: Header,

    /// Stream offset of the header block.
    pub offset: u64,

    /// The entry type (Regular, Directory, Symlink, etc.).
    pub entry_type: EntryType,

    /// Full archive path (`prefix` followed by `name`).
    pub path: Vec<u8>,

    /// Link target for symlinks and hard links, `None` for other types.
    pub link_target: Option<Vec<u8>>,

    /// Permission bits.
    pub mode: u32,

    /// Owner UID.
    pub uid: u64,

    /// Owner GID.
    pub gid: u64,

    /// Modification time as Unix timestamp.
    pub mtime: u64,

    /// Value of the size field.
    ///
    /// Directories and symlinks carry no data whatever this says; use
    /// [`ScannedEntry::data_len`] for the number of content bytes.
    pub size: u64,

    /// User name.
    pub uname: Vec<u8>,

    /// Group name.
    pub gname: Vec<u8>,

    /// Device major number (for block/char devices).
    pub dev_major: Option<u32>,

    /// Device minor number (for block/char devices).
    pub dev_minor: Option<u32>,
}

impl ScannedEntry {
    /// Decode the fields of an already validated header.
    pub(crate) fn from_header(header: &Header, offset: u64) -> Result<Self, HeaderError> {
        let entry_type = header.entry_type();
        let link_target = matches!(entry_type, EntryType::Symlink | EntryType::Link)
            .then(|| header.link_name_bytes().to_vec());
        let (dev_major, dev_minor) = if matches!(entry_type, EntryType::Char | EntryType::Block)
        {
            (Some(header.device_major()?), Some(header.device_minor()?))
        } else {
            (None, None)
        };

        Ok(Self {
            header: *header,
            offset,
            entry_type,
            path: header.path().into_owned(),
            link_target,
            mode: header.mode()?,
            uid: header.uid()?,
            gid: header.gid()?,
            mtime: header.mtime()?,
            size: header.entry_size()?,
            uname: header.username().to_vec(),
            gname: header.groupname().to_vec(),
            dev_major,
            dev_minor,
        })
    }

    /// Get the path as a lossy UTF-8 string.
    ///
    /// Invalid UTF-8 sequences are replaced with the Unicode replacement character.
    #[must_use]
    pub fn path_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.path)
    }

    /// Get the link target as a lossy UTF-8 string, if present.
    #[must_use]
    pub fn link_target_lossy(&self) -> Option<Cow<'_, str>> {
        self.link_target
            .as_ref()
            .map(|t| String::from_utf8_lossy(t))
    }

    /// Check if this is a regular file entry.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.entry_type.is_file()
    }

    /// Check if this is a directory entry.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.entry_type.is_dir()
    }

    /// Check if this is a symbolic link entry.
    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.entry_type.is_symlink()
    }

    /// Number of content bytes following the header.
    #[must_use]
    pub fn data_len(&self) -> u64 {
        if self.entry_type.has_data() {
            self.size
        } else {
            0
        }
    }

    /// Number of 512-byte data blocks following the header.
    #[must_use]
    pub fn data_blocks(&self) -> u64 {
        self.data_len().div_ceil(BLOCK_SIZE)
    }

    /// Get the padded data size (rounded up to 512-byte boundary).
    ///
    /// This is the number of bytes between this header and the next one.
    #[must_use]
    pub fn padded_size(&self) -> u64 {
        self.data_blocks() * BLOCK_SIZE
    }
}
