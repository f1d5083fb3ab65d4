//! Zerocopy-based USTAR header codec.
//!
//! This crate encodes filesystem entry metadata into fixed 512-byte USTAR
//! header blocks and decodes/validates such blocks again. All header structs
//! use the [`zerocopy`] crate so a block read from disk can be viewed in place
//! without copying.
//!
//! # Header Field Layout
//!
//! | Offset | Size | Field     | Description                                   |
//! |--------|------|-----------|-----------------------------------------------|
//! | 0      | 100  | name      | Trailing 100 bytes of the path                |
//! | 100    | 8    | mode      | Permission bits in octal ASCII                |
//! | 108    | 8    | uid       | Owner id, octal ASCII or GNU base-256         |
//! | 116    | 8    | gid       | Group id in octal ASCII                       |
//! | 124    | 12   | size      | Content size, octal ASCII or GNU base-256     |
//! | 136    | 12   | mtime     | Modification time (Unix seconds, octal)       |
//! | 148    | 8    | checksum  | Header checksum in octal ASCII                |
//! | 156    | 1    | typeflag  | Entry type (see [`EntryType`])                |
//! | 157    | 100  | linkname  | Symlink target                                |
//! | 257    | 6    | magic     | "ustar\0"                                     |
//! | 263    | 2    | version   | "00"                                          |
//! | 265    | 32   | uname     | Owner user name                               |
//! | 297    | 32   | gname     | Owner group name                              |
//! | 329    | 8    | devmajor  | Device major number                           |
//! | 337    | 8    | devminor  | Device minor number                           |
//! | 345    | 155  | prefix    | Leading bytes of paths longer than 100 bytes  |
//! | 500    | 12   | pad       | Zero padding                                  |
//!
//! Paths longer than 100 bytes are split bluntly: the first `len - 100`
//! bytes go to `prefix` and the last 100 bytes to `name`, so reading a path
//! back is a plain concatenation of the two fields. Existing archives depend
//! on this layout, so it is not replaced by a component-aware split.
//!
//! # Example
//!
//! ```
//! use ustar_header::{Conformance, EntryMetadata, EntryType, Header};
//!
//! let meta = EntryMetadata::new(b"docs/readme.txt".to_vec(), EntryType::Regular);
//! let header = Header::encode(&meta, Conformance::Lenient).unwrap();
//!
//! let decoded = Header::decode(header.as_bytes(), Conformance::Strict).unwrap();
//! assert_eq!(decoded.path().as_ref(), b"docs/readme.txt");
//! ```
//!
//! # Streaming
//!
//! For scanning complete archives (end-of-archive detection, data block
//! skipping, path selection), see the [`stream`] module.

pub mod stream;

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

use thiserror::Error;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Size of a header block in bytes.
pub const HEADER_SIZE: usize = 512;

/// Size of an archive block in bytes; entry data is padded to a multiple of it.
pub const BLOCK_SIZE: u64 = 512;

/// Magic string written into every header ("ustar\0").
pub const USTAR_MAGIC: &[u8; 6] = b"ustar\0";

/// The part of the magic field every valid header must carry.
pub const USTAR_TAG: &[u8; 5] = b"ustar";

/// Version field written into every header ("00").
pub const USTAR_VERSION: &[u8; 2] = b"00";

/// Width of the `name` field.
pub const NAME_LEN: usize = 100;

/// Width of the `prefix` field.
pub const PREFIX_LEN: usize = 155;

/// Longest archive path a header can hold (`prefix` + `name`).
pub const MAX_PATH_LEN: usize = NAME_LEN + PREFIX_LEN;

/// Largest owner/group id that fits the 8-byte octal fields.
pub const MAX_OCTAL_ID: u64 = 0o7777777;

/// Largest entry size that fits the 12-byte octal field.
pub const MAX_OCTAL_SIZE: u64 = 0o77777777777;

/// Permission, set-id and sticky bits; everything else is dropped on encode.
pub const MODE_MASK: u32 = 0o7777;

const CHECKSUM_RANGE: Range<usize> = 148..156;

/// Marker bit for the GNU base-256 numeric escape.
const BASE256_FLAG: u8 = 0x80;

/// How closely a header must follow the USTAR layout.
///
/// `Strict` refuses the GNU base-256 escape for owner ids both when writing
/// and when reading, and additionally checks the magic terminator and the
/// version field on read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Conformance {
    /// Accept and produce GNU-compatible extensions.
    #[default]
    Lenient,
    /// Only plain USTAR.
    Strict,
}

impl Conformance {
    /// Returns true for [`Conformance::Strict`].
    #[must_use]
    pub fn is_strict(self) -> bool {
        self == Conformance::Strict
    }
}

/// Errors that can occur when encoding or validating headers.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The provided data is too short to contain a header.
    #[error("insufficient data: expected 512 bytes, got {0}")]
    InsufficientData(usize),

    /// An octal field contains invalid characters.
    #[error("invalid octal field: {0:?}")]
    InvalidOctal(Vec<u8>),

    /// The header checksum does not match the computed value.
    #[error("checksum mismatch: expected {expected}, computed {computed}")]
    ChecksumMismatch {
        /// The checksum value stored in the header.
        expected: u64,
        /// The checksum computed from the header bytes.
        computed: u64,
    },

    /// The magic field does not start with "ustar".
    #[error("bad magic: {0:?}")]
    BadMagic([u8; 6]),

    /// The header uses an extension refused in strict mode.
    #[error("nonconforming header: {0}")]
    Nonconforming(&'static str),

    /// The archive path does not fit `prefix` + `name`.
    #[error("path too long: {len} bytes > {limit} bytes")]
    PathTooLong {
        /// Actual path length.
        len: usize,
        /// Format limit.
        limit: usize,
    },

    /// The owner id needs the base-256 escape but strict mode forbids it.
    #[error("uid {0} does not fit a conforming header")]
    NonconformingId(u64),

    /// The entry size does not fit 11 octal digits.
    #[error("entry size {0} is too large")]
    SizeTooLarge(u64),

    /// A numeric field has no room for the value.
    #[error("{field} value {value} does not fit its field")]
    FieldOverflow {
        /// Field name.
        field: &'static str,
        /// Value that was rejected.
        value: u64,
    },

    /// A string field has no room for the value.
    #[error("{field} is {len} bytes, limit is {limit}")]
    FieldTooLong {
        /// Field name.
        field: &'static str,
        /// Actual length.
        len: usize,
        /// Field width.
        limit: usize,
    },

    /// Only regular files, symlinks and directories can be encoded.
    #[error("unsupported entry type {0:?}")]
    UnsupportedType(EntryType),
}

/// Result type for header operations.
pub type Result<T> = std::result::Result<T, HeaderError>;

// ============================================================================
// Raw Header Structs
// ============================================================================

/// Raw 512-byte header block.
///
/// Use [`Header`] for a higher-level interface with accessor methods.
#[derive(Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct RawHeader {
    /// The raw header bytes.
    pub bytes: [u8; 512],
}

impl Default for RawHeader {
    fn default() -> Self {
        Self { bytes: [0u8; 512] }
    }
}

impl fmt::Debug for RawHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawHeader")
            .field("name", &truncate_null(&self.bytes[0..100]))
            .finish_non_exhaustive()
    }
}

/// USTAR header with named fields.
///
/// See the crate documentation for the layout table.
#[derive(Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct UstarHeader {
    /// Trailing part of the path (null-terminated if shorter than 100 bytes).
    pub name: [u8; 100],
    /// Permission bits in octal ASCII.
    pub mode: [u8; 8],
    /// Owner user ID, octal ASCII or base-256.
    pub uid: [u8; 8],
    /// Owner group ID in octal ASCII.
    pub gid: [u8; 8],
    /// Content size, octal ASCII or base-256.
    pub size: [u8; 12],
    /// Modification time as Unix timestamp in octal ASCII.
    pub mtime: [u8; 12],
    /// Header checksum in octal ASCII.
    pub checksum: [u8; 8],
    /// Entry type flag.
    pub typeflag: u8,
    /// Symlink target.
    pub linkname: [u8; 100],
    /// Magic string ("ustar\0").
    pub magic: [u8; 6],
    /// Format version ("00").
    pub version: [u8; 2],
    /// Owner user name (null-terminated).
    pub uname: [u8; 32],
    /// Owner group name (null-terminated).
    pub gname: [u8; 32],
    /// Device major number in octal ASCII (for special files).
    pub devmajor: [u8; 8],
    /// Device minor number in octal ASCII (for special files).
    pub devminor: [u8; 8],
    /// Leading part of paths longer than 100 bytes.
    pub prefix: [u8; 155],
    /// Padding to fill the 512-byte block.
    pub pad: [u8; 12],
}

impl Default for UstarHeader {
    fn default() -> Self {
        let mut header = Self {
            name: [0u8; 100],
            mode: [0u8; 8],
            uid: [0u8; 8],
            gid: [0u8; 8],
            size: [0u8; 12],
            mtime: [0u8; 12],
            checksum: [0u8; 8],
            typeflag: 0,
            linkname: [0u8; 100],
            magic: [0u8; 6],
            version: [0u8; 2],
            uname: [0u8; 32],
            gname: [0u8; 32],
            devmajor: [0u8; 8],
            devminor: [0u8; 8],
            prefix: [0u8; 155],
            pad: [0u8; 12],
        };
        header.magic.copy_from_slice(USTAR_MAGIC);
        header.version.copy_from_slice(USTAR_VERSION);
        header
    }
}

impl fmt::Debug for UstarHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UstarHeader")
            .field("name", &String::from_utf8_lossy(truncate_null(&self.name)))
            .field("mode", &String::from_utf8_lossy(truncate_null(&self.mode)))
            .field("typeflag", &self.typeflag)
            .field("magic", &self.magic)
            .field(
                "uname",
                &String::from_utf8_lossy(truncate_null(&self.uname)),
            )
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Entry Type
// ============================================================================

/// Entry type indicating the kind of file system object.
///
/// Only [`Regular`](EntryType::Regular), [`Symlink`](EntryType::Symlink) and
/// [`Directory`](EntryType::Directory) are ever written. The other variants
/// exist so that archives produced by other tools still decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// Regular file (type '0' or '\0' for old tar compatibility).
    Regular,
    /// Hard link to another file in the archive (type '1').
    Link,
    /// Symbolic link (type '2').
    Symlink,
    /// Character device (type '3').
    Char,
    /// Block device (type '4').
    Block,
    /// Directory (type '5').
    Directory,
    /// FIFO/named pipe (type '6').
    Fifo,
    /// Contiguous file (type '7', rarely used).
    Continuous,
    /// Unknown or unsupported entry type.
    Other(u8),
}

impl EntryType {
    /// Parse an entry type from a raw byte value.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'0' | b'\0' => EntryType::Regular,
            b'1' => EntryType::Link,
            b'2' => EntryType::Symlink,
            b'3' => EntryType::Char,
            b'4' => EntryType::Block,
            b'5' => EntryType::Directory,
            b'6' => EntryType::Fifo,
            b'7' => EntryType::Continuous,
            other => EntryType::Other(other),
        }
    }

    /// Convert an entry type to its raw byte representation.
    ///
    /// Note that `Regular` is encoded as '0', not '\0'.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            EntryType::Regular => b'0',
            EntryType::Link => b'1',
            EntryType::Symlink => b'2',
            EntryType::Char => b'3',
            EntryType::Block => b'4',
            EntryType::Directory => b'5',
            EntryType::Fifo => b'6',
            EntryType::Continuous => b'7',
            EntryType::Other(b) => b,
        }
    }

    /// Returns true if this is a regular file entry.
    #[must_use]
    pub fn is_file(self) -> bool {
        matches!(self, EntryType::Regular | EntryType::Continuous)
    }

    /// Returns true if this is a directory entry.
    #[must_use]
    pub fn is_dir(self) -> bool {
        self == EntryType::Directory
    }

    /// Returns true if this is a symbolic link entry.
    #[must_use]
    pub fn is_symlink(self) -> bool {
        self == EntryType::Symlink
    }

    /// Returns true if this type is one the encoder can write.
    #[must_use]
    pub fn is_encodable(self) -> bool {
        matches!(
            self,
            EntryType::Regular | EntryType::Symlink | EntryType::Directory
        )
    }

    /// Returns true if entries of this type carry data blocks after the header.
    ///
    /// Directories and symlinks never do, whatever their size field says.
    #[must_use]
    pub fn has_data(self) -> bool {
        !matches!(self, EntryType::Directory | EntryType::Symlink)
    }
}

impl From<u8> for EntryType {
    fn from(byte: u8) -> Self {
        Self::from_byte(byte)
    }
}

impl From<EntryType> for u8 {
    fn from(entry_type: EntryType) -> Self {
        entry_type.to_byte()
    }
}

// ============================================================================
// Encoder input
// ============================================================================

/// Metadata for one archive entry, the input of [`Header::encode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Archive-relative path; directories carry a trailing `/`.
    pub path: Vec<u8>,
    /// Kind of entry.
    pub entry_type: EntryType,
    /// Full `st_mode`; masked to [`MODE_MASK`] on encode.
    pub mode: u32,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Content size; ignored for directories and symlinks.
    pub size: u64,
    /// Modification time, whole seconds since the epoch.
    pub mtime: u64,
    /// Sub-second part of the modification time. Not representable in a
    /// USTAR header and therefore not encoded.
    pub mtime_nsec: u32,
    /// Owner user name.
    pub uname: Vec<u8>,
    /// Owner group name.
    pub gname: Vec<u8>,
    /// Symlink target, empty for other types.
    pub link_target: Vec<u8>,
    /// Device (major, minor) for character and block devices.
    pub device: Option<(u32, u32)>,
}

impl EntryMetadata {
    /// Metadata with the given path and type and every other field zeroed.
    #[must_use]
    pub fn new(path: Vec<u8>, entry_type: EntryType) -> Self {
        Self {
            path,
            entry_type,
            mode: 0,
            uid: 0,
            gid: 0,
            size: 0,
            mtime: 0,
            mtime_nsec: 0,
            uname: Vec::new(),
            gname: Vec::new(),
            link_target: Vec::new(),
            device: None,
        }
    }
}

// ============================================================================
// Header Wrapper
// ============================================================================

/// High-level header wrapper with accessor methods.
///
/// This struct wraps a [`RawHeader`] and provides methods for encoding entry
/// metadata, accessing header fields and validating checksums.
///
/// ```
/// use ustar_header::Header;
///
/// let header = Header::new_ustar();
/// assert!(header.has_ustar_magic());
/// ```
#[derive(Clone, Copy, FromBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct Header {
    raw: RawHeader,
}

impl Header {
    /// Create a new header with only the USTAR magic and version set.
    #[must_use]
    pub fn new_ustar() -> Self {
        let mut header = Self {
            raw: RawHeader::default(),
        };
        header.raw.bytes[257..263].copy_from_slice(USTAR_MAGIC);
        header.raw.bytes[263..265].copy_from_slice(USTAR_VERSION);
        header
    }

    /// Encode entry metadata into a header with a valid checksum.
    ///
    /// # Errors
    ///
    /// Fails when a value does not fit its field. In particular
    /// [`HeaderError::PathTooLong`] for paths over [`MAX_PATH_LEN`] bytes,
    /// [`HeaderError::NonconformingId`] for a uid above [`MAX_OCTAL_ID`] in
    /// strict mode, [`HeaderError::SizeTooLarge`] for a size above
    /// [`MAX_OCTAL_SIZE`], and
    /// [`HeaderError::UnsupportedType`] for anything but regular files,
    /// symlinks and directories.
    pub fn encode(meta: &EntryMetadata, conformance: Conformance) -> Result<Header> {
        if !meta.entry_type.is_encodable() {
            return Err(HeaderError::UnsupportedType(meta.entry_type));
        }

        let mut header = Header::new_ustar();
        let fields = header.as_ustar_mut();

        let (prefix, name) = split_path(&meta.path)?;
        fields.prefix[..prefix.len()].copy_from_slice(prefix);
        fields.name[..name.len()].copy_from_slice(name);

        write_octal(&mut fields.mode, u64::from(meta.mode & MODE_MASK), "mode")?;

        let uid = u64::from(meta.uid);
        if uid > MAX_OCTAL_ID {
            if conformance.is_strict() {
                return Err(HeaderError::NonconformingId(uid));
            }
            write_base256(&mut fields.uid, uid);
        } else {
            write_octal(&mut fields.uid, uid, "uid")?;
        }

        // No escape for the group id: the legacy layout never had one.
        write_octal(&mut fields.gid, u64::from(meta.gid), "gid")?;

        let size = if meta.entry_type.has_data() {
            meta.size
        } else {
            0
        };
        if size > MAX_OCTAL_SIZE {
            return Err(HeaderError::SizeTooLarge(size));
        }
        write_octal(&mut fields.size, size, "size")?;

        write_octal(&mut fields.mtime, meta.mtime, "mtime")?;

        fields.typeflag = meta.entry_type.to_byte();
        if meta.entry_type.is_symlink() {
            write_str(&mut fields.linkname, &meta.link_target, "linkname")?;
        }

        write_str(&mut fields.uname, &meta.uname, "uname")?;
        write_str(&mut fields.gname, &meta.gname, "gname")?;

        if let Some((major, minor)) = meta.device {
            write_octal(&mut fields.devmajor, u64::from(major), "devmajor")?;
            write_octal(&mut fields.devminor, u64::from(minor), "devminor")?;
        }

        header.set_checksum();
        Ok(header)
    }

    /// Parse a header from bytes and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InsufficientData`] for short input, or any
    /// error from [`Header::validate`].
    pub fn decode(bytes: &[u8], conformance: Conformance) -> Result<&Header> {
        let header = Header::from_bytes(bytes)?;
        header.validate(conformance)?;
        Ok(header)
    }

    /// Get a reference to the underlying bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 512] {
        &self.raw.bytes
    }

    /// Get a mutable reference to the underlying bytes.
    pub fn as_mut_bytes(&mut self) -> &mut [u8; 512] {
        &mut self.raw.bytes
    }

    /// Parse a header from a byte slice.
    ///
    /// Returns a reference to the header if the slice is at least 512 bytes.
    /// No validation is performed.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InsufficientData`] if the slice is too short.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Header> {
        if bytes.len() < HEADER_SIZE {
            return Err(HeaderError::InsufficientData(bytes.len()));
        }
        let raw = RawHeader::ref_from_bytes(&bytes[..HEADER_SIZE])
            .map_err(|_| HeaderError::InsufficientData(bytes.len()))?;
        Ok(zerocopy::transmute_ref!(raw))
    }

    /// Parse from exactly 512 bytes without size checking.
    #[must_use]
    pub fn from_bytes_exact(bytes: &[u8; 512]) -> &Header {
        let raw = RawHeader::ref_from_bytes(bytes).expect("size is correct");
        zerocopy::transmute_ref!(raw)
    }

    /// View this header with named fields.
    #[must_use]
    pub fn as_ustar(&self) -> &UstarHeader {
        UstarHeader::ref_from_bytes(&self.raw.bytes).expect("size is correct")
    }

    /// Mutable view of this header with named fields.
    pub fn as_ustar_mut(&mut self) -> &mut UstarHeader {
        UstarHeader::mut_from_bytes(&mut self.raw.bytes).expect("size is correct")
    }

    /// Check if the magic field starts with the "ustar" tag.
    #[must_use]
    pub fn has_ustar_magic(&self) -> bool {
        self.raw.bytes[257..262] == *USTAR_TAG
    }

    /// Check the header against the format rules.
    ///
    /// The checksum and the "ustar" tag are always verified. With
    /// [`Conformance::Strict`] the uid must be plain octal, the sixth magic
    /// byte must be NUL and the version must be "00".
    ///
    /// # Errors
    ///
    /// [`HeaderError::ChecksumMismatch`], [`HeaderError::InvalidOctal`] for an
    /// unreadable checksum field, [`HeaderError::BadMagic`] or
    /// [`HeaderError::Nonconforming`].
    pub fn validate(&self, conformance: Conformance) -> Result<()> {
        self.verify_checksum()?;

        let fields = self.as_ustar();
        if !self.has_ustar_magic() {
            return Err(HeaderError::BadMagic(fields.magic));
        }

        if conformance.is_strict() {
            if fields.uid[0] & BASE256_FLAG != 0 {
                return Err(HeaderError::Nonconforming("uid uses the base-256 escape"));
            }
            if fields.magic[5] != 0 {
                return Err(HeaderError::Nonconforming("magic is not NUL terminated"));
            }
            if fields.version != *USTAR_VERSION {
                return Err(HeaderError::Nonconforming("version is not \"00\""));
            }
        }
        Ok(())
    }

    /// Get the entry type.
    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        EntryType::from_byte(self.raw.bytes[156])
    }

    /// Get the size field (file content length) in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InvalidOctal`] if the size field is not valid.
    pub fn entry_size(&self) -> Result<u64> {
        parse_numeric(&self.raw.bytes[124..136])
    }

    /// Get the file mode (permissions).
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InvalidOctal`] if the mode field is not valid.
    pub fn mode(&self) -> Result<u32> {
        parse_numeric(&self.raw.bytes[100..108]).map(|v| v as u32)
    }

    /// Get the owner user ID.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InvalidOctal`] if the uid field is not valid.
    pub fn uid(&self) -> Result<u64> {
        parse_numeric(&self.raw.bytes[108..116])
    }

    /// Get the owner group ID.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InvalidOctal`] if the gid field is not valid.
    pub fn gid(&self) -> Result<u64> {
        parse_numeric(&self.raw.bytes[116..124])
    }

    /// Get the modification time as a Unix timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InvalidOctal`] if the mtime field is not valid.
    pub fn mtime(&self) -> Result<u64> {
        parse_numeric(&self.raw.bytes[136..148])
    }

    /// Get the raw bytes of the `name` field.
    ///
    /// For paths longer than 100 bytes this is only the tail; use
    /// [`Header::path`] for the full path.
    #[must_use]
    pub fn name_bytes(&self) -> &[u8] {
        truncate_null(&self.raw.bytes[0..100])
    }

    /// Get the `prefix` field.
    #[must_use]
    pub fn prefix(&self) -> &[u8] {
        truncate_null(&self.raw.bytes[345..500])
    }

    /// Get the full archive path: `prefix` followed directly by `name`.
    #[must_use]
    pub fn path(&self) -> Cow<'_, [u8]> {
        let prefix = self.prefix();
        if prefix.is_empty() {
            Cow::Borrowed(self.name_bytes())
        } else {
            let mut path = prefix.to_vec();
            path.extend_from_slice(self.name_bytes());
            Cow::Owned(path)
        }
    }

    /// Get the raw link name bytes.
    #[must_use]
    pub fn link_name_bytes(&self) -> &[u8] {
        truncate_null(&self.raw.bytes[157..257])
    }

    /// Get the device major number.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InvalidOctal`] if the field is not valid octal.
    pub fn device_major(&self) -> Result<u32> {
        parse_octal(&self.raw.bytes[329..337]).map(|v| v as u32)
    }

    /// Get the device minor number.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InvalidOctal`] if the field is not valid octal.
    pub fn device_minor(&self) -> Result<u32> {
        parse_octal(&self.raw.bytes[337..345]).map(|v| v as u32)
    }

    /// Get the owner user name.
    #[must_use]
    pub fn username(&self) -> &[u8] {
        truncate_null(&self.raw.bytes[265..297])
    }

    /// Get the owner group name.
    #[must_use]
    pub fn groupname(&self) -> &[u8] {
        truncate_null(&self.raw.bytes[297..329])
    }

    /// Verify the header checksum.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::ChecksumMismatch`] if the checksum is invalid,
    /// or [`HeaderError::InvalidOctal`] if the stored checksum cannot be parsed.
    pub fn verify_checksum(&self) -> Result<()> {
        let expected = parse_octal(&self.raw.bytes[CHECKSUM_RANGE])?;
        let computed = self.compute_checksum();
        if expected == computed {
            Ok(())
        } else {
            Err(HeaderError::ChecksumMismatch { expected, computed })
        }
    }

    /// Compute the header checksum.
    ///
    /// This is the unsigned sum of all header bytes, with the checksum field
    /// (bytes 148..156) counted as spaces (0x20).
    #[must_use]
    pub fn compute_checksum(&self) -> u64 {
        let mut sum: u64 = 0;
        for (i, &byte) in self.raw.bytes.iter().enumerate() {
            if CHECKSUM_RANGE.contains(&i) {
                sum += u64::from(b' ');
            } else {
                sum += u64::from(byte);
            }
        }
        sum
    }

    /// Store the computed checksum as 7 octal digits and a NUL.
    pub fn set_checksum(&mut self) {
        let sum = self.compute_checksum();
        let field = &mut self.raw.bytes[CHECKSUM_RANGE];
        // A 512-byte block sums to at most 0o377000, so this cannot overflow.
        let digits = format!("{sum:07o}");
        field[..7].copy_from_slice(digits.as_bytes());
        field[7] = 0;
    }

    /// Check if this header represents an empty block (all zeros).
    ///
    /// Two consecutive empty blocks mark the end of an archive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.bytes.iter().all(|&b| b == 0)
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new_ustar()
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("path", &String::from_utf8_lossy(&self.path()))
            .field("entry_type", &self.entry_type())
            .field("size", &self.entry_size().ok())
            .field("mode", &self.mode().ok().map(|m| format!("{m:04o}")))
            .field("has_ustar_magic", &self.has_ustar_magic())
            .finish()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Split an archive path into its `prefix` and `name` parts.
///
/// Paths of up to 100 bytes live entirely in `name`. Longer paths put the
/// first `len - 100` bytes into `prefix` and the trailing 100 bytes into
/// `name`, regardless of where path separators fall.
///
/// # Errors
///
/// Returns [`HeaderError::PathTooLong`] for paths over [`MAX_PATH_LEN`] bytes.
///
/// ```
/// use ustar_header::split_path;
///
/// let path = [b'a'; 150];
/// let (prefix, name) = split_path(&path).unwrap();
/// assert_eq!((prefix.len(), name.len()), (50, 100));
/// ```
pub fn split_path(path: &[u8]) -> Result<(&[u8], &[u8])> {
    if path.len() > MAX_PATH_LEN {
        return Err(HeaderError::PathTooLong {
            len: path.len(),
            limit: MAX_PATH_LEN,
        });
    }
    Ok(path.split_at(path.len().saturating_sub(NAME_LEN)))
}

/// Largest value a NUL-terminated octal field of `width` bytes can hold.
#[must_use]
pub fn max_octal(width: usize) -> u64 {
    let digits = width.saturating_sub(1) as u32;
    8u64.checked_pow(digits).map_or(u64::MAX, |v| v - 1)
}

/// Write `value` as zero-padded octal digits filling all but the last byte,
/// which becomes NUL.
fn write_octal(field: &mut [u8], value: u64, name: &'static str) -> Result<()> {
    let digits = field.len() - 1;
    if value > max_octal(field.len()) {
        return Err(HeaderError::FieldOverflow { field: name, value });
    }
    let text = format!("{value:0digits$o}");
    field[..digits].copy_from_slice(text.as_bytes());
    field[digits] = 0;
    Ok(())
}

/// Write `value` using the GNU base-256 escape: big-endian in the trailing
/// bytes of a zeroed field, with the top bit of the first byte set.
fn write_base256(field: &mut [u8], value: u64) {
    field.fill(0);
    let bytes = value.to_be_bytes();
    let n = bytes.len().min(field.len());
    let start = field.len() - n;
    field[start..].copy_from_slice(&bytes[bytes.len() - n..]);
    field[0] |= BASE256_FLAG;
}

fn write_str(field: &mut [u8], value: &[u8], name: &'static str) -> Result<()> {
    if value.len() > field.len() {
        return Err(HeaderError::FieldTooLong {
            field: name,
            len: value.len(),
            limit: field.len(),
        });
    }
    field[..value.len()].copy_from_slice(value);
    Ok(())
}

/// Parse an octal ASCII field into a u64.
///
/// Octal fields are ASCII strings with optional leading spaces and trailing
/// spaces or null bytes. For example:
/// - `"0000644\0"` -> 420 (file mode 0644)
/// - `"     123 "` -> 83
///
/// # Errors
///
/// Returns [`HeaderError::InvalidOctal`] if the field contains invalid
/// characters (anything other than spaces, digits 0-7, or null bytes).
pub fn parse_octal(bytes: &[u8]) -> Result<u64> {
    let start = bytes.iter().position(|&b| b != b' ').unwrap_or(bytes.len());
    let end = bytes[start..]
        .iter()
        .position(|&b| b == b' ' || b == b'\0')
        .map_or(bytes.len(), |i| start + i);

    let trimmed = &bytes[start..end];

    if trimmed.is_empty() {
        return Ok(0);
    }

    let mut value: u64 = 0;
    for &byte in trimmed {
        if !byte.is_ascii_digit() || byte > b'7' {
            return Err(HeaderError::InvalidOctal(bytes.to_vec()));
        }
        value = value
            .checked_mul(8)
            .and_then(|v| v.checked_add(u64::from(byte - b'0')))
            .ok_or_else(|| HeaderError::InvalidOctal(bytes.to_vec()))?;
    }

    Ok(value)
}

/// Parse a numeric field that may be octal ASCII or GNU base-256 encoded.
///
/// When the high bit of the first byte is set (0x80), the value is stored
/// as big-endian binary in the remaining bits. Otherwise it is parsed as
/// octal ASCII.
///
/// # Errors
///
/// Returns [`HeaderError::InvalidOctal`] if octal parsing fails or the binary
/// value overflows a u64.
pub fn parse_numeric(bytes: &[u8]) -> Result<u64> {
    if bytes.is_empty() {
        return Ok(0);
    }

    if bytes[0] & BASE256_FLAG != 0 {
        let mut value: u64 = 0;
        for (i, &byte) in bytes.iter().enumerate() {
            let b = if i == 0 { byte & 0x7f } else { byte };
            value = value
                .checked_mul(256)
                .and_then(|v| v.checked_add(u64::from(b)))
                .ok_or_else(|| HeaderError::InvalidOctal(bytes.to_vec()))?;
        }
        Ok(value)
    } else {
        parse_octal(bytes)
    }
}

/// Truncate a byte slice at the first null byte.
///
/// ```
/// use ustar_header::truncate_null;
///
/// assert_eq!(truncate_null(b"hello\0world"), b"hello");
/// assert_eq!(truncate_null(b"no null here"), b"no null here");
/// assert_eq!(truncate_null(b"\0empty"), b"");
/// ```
#[must_use]
pub fn truncate_null(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(pos) => &bytes[..pos],
        None => bytes,
    }
}
