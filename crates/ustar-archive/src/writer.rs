//! Serialise walked entries into a USTAR archive.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use log::{debug, trace};
use rustix::fs::{openat, Mode, OFlags, CWD};
use ustar_header::{Conformance, EntryMetadata, Header, BLOCK_SIZE, HEADER_SIZE};

use crate::error::{ArchiveError, Result};
use crate::identity::{IdentityLookup, SystemIdentities};
use crate::metadata::{read_metadata, IdentityPolicy};
use crate::walk::FsEntry;

const ZERO_BLOCK: [u8; HEADER_SIZE] = [0u8; HEADER_SIZE];

/// Options for writing an archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Header encoding level, see [`Header::encode`].
    pub conformance: Conformance,
    /// Handling of ids without a name.
    pub identity: IdentityPolicy,
}

/// Writes entries one at a time to an output stream.
///
/// Each entry becomes a header block followed, for regular files, by the
/// file content padded to a multiple of 512 bytes. [`ArchiveWriter::finish`]
/// appends the two zero blocks that end the archive and returns the output.
///
/// Any error leaves the output as it was at the time of the failure; nothing
/// already written is taken back.
#[derive(Debug)]
pub struct ArchiveWriter<W, I = SystemIdentities> {
    out: W,
    ids: I,
    options: WriteOptions,
    written: u64,
}

impl<W: Write> ArchiveWriter<W> {
    /// Create a writer that looks names up in the system databases.
    pub fn new(out: W, options: WriteOptions) -> Self {
        Self::with_identities(out, SystemIdentities::new(), options)
    }
}

impl<W: Write, I: IdentityLookup> ArchiveWriter<W, I> {
    /// Create a writer with a custom source of user and group names.
    pub fn with_identities(out: W, ids: I, options: WriteOptions) -> Self {
        Self {
            out,
            ids,
            options,
            written: 0,
        }
    }

    /// Bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Stat `entry`, then write its header and content.
    ///
    /// # Errors
    ///
    /// Any error from [`read_metadata`], [`ArchiveError::Header`] if the
    /// metadata cannot be encoded, [`ArchiveError::SizeChanged`] if a file's
    /// length no longer matches its stat, and I/O errors.
    pub fn append(&mut self, entry: &FsEntry) -> Result<()> {
        let meta = read_metadata(entry, &self.ids, self.options.identity)?;
        self.append_metadata(&entry.fs_path, &meta)
    }

    fn append_metadata(&mut self, path: &Path, meta: &EntryMetadata) -> Result<()> {
        let header =
            Header::encode(meta, self.options.conformance).map_err(|source| ArchiveError::Header {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(
            "append {:?} ({:?}, {} bytes) at {}",
            String::from_utf8_lossy(&meta.path),
            meta.entry_type,
            meta.size,
            self.written
        );
        self.write_all(header.as_bytes())?;

        if meta.entry_type.is_file() {
            self.copy_file(path, meta.size)?;
        }
        Ok(())
    }

    /// Copy exactly `size` bytes of the file at `path`, then pad.
    fn copy_file(&mut self, path: &Path, size: u64) -> Result<()> {
        let fd = openat(
            CWD,
            path,
            OFlags::RDONLY | OFlags::NOFOLLOW | OFlags::CLOEXEC,
            Mode::empty(),
        )
        .map_err(|e| ArchiveError::io(path, e))?;
        let mut file = File::from(fd);

        let mut buf = [0u8; 8192];
        let mut copied = 0u64;
        while copied < size {
            let want = usize::try_from(size - copied).map_or(buf.len(), |n| n.min(buf.len()));
            let n = match file.read(&mut buf[..want]) {
                Ok(0) => {
                    return Err(ArchiveError::SizeChanged {
                        path: path.to_path_buf(),
                        expected: size,
                        actual: copied,
                    })
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ArchiveError::io(path, e)),
            };
            self.write_all(&buf[..n])?;
            copied += n as u64;
        }

        // The file must not have grown since it was stat'ed either.
        let mut probe = [0u8; 1];
        if file.read(&mut probe).map_err(|e| ArchiveError::io(path, e))? != 0 {
            let actual = file.metadata().map_or(size + 1, |m| m.len());
            return Err(ArchiveError::SizeChanged {
                path: path.to_path_buf(),
                expected: size,
                actual,
            });
        }

        let padding = size.next_multiple_of(BLOCK_SIZE) - size;
        if padding > 0 {
            trace!("pad {padding} bytes");
            self.write_all(&ZERO_BLOCK[..padding as usize])?;
        }
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.write_all(bytes).map_err(ArchiveError::Write)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Write the end-of-archive marker, flush, and return the output.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::Write`] if the output fails.
    pub fn finish(mut self) -> Result<W> {
        self.write_all(&ZERO_BLOCK)?;
        self.write_all(&ZERO_BLOCK)?;
        self.out.flush().map_err(ArchiveError::Write)?;
        debug!("archive complete, {} bytes", self.written);
        Ok(self.out)
    }
}

/// Write `entries` as a complete archive to `out`, returning the number of
/// bytes written.
///
/// Names are looked up in the system databases; use [`ArchiveWriter`]
/// directly for anything else.
///
/// # Errors
///
/// The first error from [`ArchiveWriter::append`] or
/// [`ArchiveWriter::finish`]. Output written before the error stays.
pub fn write_archive<W: Write>(out: W, entries: &[FsEntry], options: WriteOptions) -> Result<u64> {
    let mut writer = ArchiveWriter::new(out, options);
    for entry in entries {
        writer.append(entry)?;
    }
    let written = writer.bytes_written() + 2 * HEADER_SIZE as u64;
    writer.finish()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use ustar_header::EntryType;

    use super::*;
    use crate::identity::StaticIdentities;
    use crate::walk::FsEntryKind;

    fn lenient() -> WriteOptions {
        WriteOptions {
            identity: IdentityPolicy::Lenient,
            ..Default::default()
        }
    }

    fn file_entry(path: &Path, archive: &str) -> FsEntry {
        FsEntry {
            fs_path: path.to_path_buf(),
            archive_path: archive.as_bytes().to_vec(),
            kind: FsEntryKind::Regular,
        }
    }

    #[test]
    fn test_empty_archive_is_two_zero_blocks() {
        let out = ArchiveWriter::with_identities(Vec::new(), StaticIdentities::new(), lenient())
            .finish()
            .unwrap();
        assert_eq!(out, vec![0u8; 1024]);
    }

    #[test]
    fn test_file_content_and_padding() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("f");
        fs::write(&path, [b'z'; 600]).unwrap();

        let mut writer =
            ArchiveWriter::with_identities(Vec::new(), StaticIdentities::new(), lenient());
        writer.append(&file_entry(&path, "f")).unwrap();
        assert_eq!(writer.bytes_written(), 512 + 1024);
        let out = writer.finish().unwrap();

        assert_eq!(out.len(), 512 + 1024 + 1024);
        let header = Header::decode(&out[..512], Conformance::Strict).unwrap();
        assert_eq!(header.path().as_ref(), b"f");
        assert_eq!(header.entry_size().unwrap(), 600);
        assert!(out[512..1112].iter().all(|&b| b == b'z'));
        assert!(out[1112..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_error_carries_path() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("f");
        fs::write(&path, b"").unwrap();
        let mut meta = EntryMetadata::new(vec![b'a'; 300], EntryType::Regular);
        meta.size = 0;

        let mut writer =
            ArchiveWriter::with_identities(Vec::new(), StaticIdentities::new(), lenient());
        let err = writer.append_metadata(&path, &meta).unwrap_err();
        assert!(matches!(err, ArchiveError::Header { .. }));
        assert_eq!(writer.bytes_written(), 0);
    }

    #[test]
    fn test_shrunk_file() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("f");
        fs::write(&path, b"short").unwrap();
        let mut meta = EntryMetadata::new(b"f".to_vec(), EntryType::Regular);
        meta.size = 100;

        let mut writer =
            ArchiveWriter::with_identities(Vec::new(), StaticIdentities::new(), lenient());
        let err = writer.append_metadata(&path, &meta).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::SizeChanged {
                expected: 100,
                actual: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_grown_file() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("f");
        fs::write(&path, b"longer than expected").unwrap();
        let mut meta = EntryMetadata::new(b"f".to_vec(), EntryType::Regular);
        meta.size = 4;

        let mut writer =
            ArchiveWriter::with_identities(Vec::new(), StaticIdentities::new(), lenient());
        let err = writer.append_metadata(&path, &meta).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::SizeChanged {
                expected: 4,
                actual: 20,
                ..
            }
        ));
    }

    #[test]
    fn test_replaced_by_fifo_aborts_append() {
        // The walk saw a regular file; by write time it is a fifo.
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("f");
        rustix::fs::mknodat(CWD, &path, rustix::fs::FileType::Fifo, Mode::from_raw_mode(0o644), 0)
            .unwrap();

        let mut writer =
            ArchiveWriter::with_identities(Vec::new(), StaticIdentities::new(), lenient());
        let err = writer.append(&file_entry(&path, "f")).unwrap_err();
        assert!(matches!(err, ArchiveError::UnsupportedType { .. }));
        assert_eq!(writer.bytes_written(), 0);
    }

    #[test]
    fn test_write_failure() {
        #[derive(Debug)]
        struct Full;
        impl Write for Full {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("no space"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let err = ArchiveWriter::with_identities(Full, StaticIdentities::new(), lenient())
            .finish()
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Write(_)));
    }
}
