//! Block-level archive scanner with end-of-archive detection.

use std::io::{self, Read, Write};

use log::{debug, trace, warn};

use crate::{Header, BLOCK_SIZE, HEADER_SIZE};

use super::entry::ScannedEntry;
use super::error::{Corruption, Result, ScanError};
use super::options::ScanOptions;

/// Where the scanner stands in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// The next block is a header or the first sentinel block.
    ExpectHeader,
    /// One zero block has been read; the next one must be zero as well.
    FirstZeroBlock,
    /// The end-of-archive sentinel was read.
    Terminal,
    /// Malformed input stopped the scan.
    Corrupt,
    /// The input ended before the end-of-archive marker.
    Truncated,
    /// The underlying reader failed.
    Failed,
}

impl ScanState {
    /// Returns true once the scanner will not yield any more entries.
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            ScanState::Terminal
                | ScanState::Corrupt
                | ScanState::Truncated
                | ScanState::Failed
        )
    }
}

/// Streaming scanner over a USTAR archive.
///
/// Each call to [`next_entry`] yields the next decoded header. Entry data
/// that the caller did not consume through [`read_content`] or
/// [`copy_content`] is skipped automatically, including its padding.
///
/// # Example
///
/// ```no_run
/// use std::fs::File;
/// use std::io::BufReader;
/// use ustar_header::stream::{ArchiveScanner, ScanOptions};
///
/// let file = File::open("archive.tar").unwrap();
/// let mut scanner = ArchiveScanner::new(BufReader::new(file), ScanOptions::default());
///
/// while let Some(entry) = scanner.next_entry().unwrap() {
///     if entry.is_file() {
///         let mut data = Vec::new();
///         scanner.copy_content(&mut data).unwrap();
///         println!("{}: {} bytes", entry.path_lossy(), data.len());
///     }
/// }
/// ```
///
/// Once an error has been returned, or the end-of-archive marker has been
/// read, every further call returns `Ok(None)`.
///
/// [`next_entry`]: ArchiveScanner::next_entry
/// [`read_content`]: ArchiveScanner::read_content
/// [`copy_content`]: ArchiveScanner::copy_content
#[derive(Debug)]
pub struct ArchiveScanner<R> {
    reader: R,
    options: ScanOptions,
    state: ScanState,
    /// Buffer for the current block (reused across entries)
    block: [u8; HEADER_SIZE],
    /// Current position in the stream (for error messages)
    pos: u64,
    /// Content bytes of the current entry not yet consumed
    remaining: u64,
    /// Zero padding after the current entry's content
    padding: u64,
}

impl<R: Read> ArchiveScanner<R> {
    /// Create a new scanner with the given reader and options.
    pub fn new(reader: R, options: ScanOptions) -> Self {
        Self {
            reader,
            options,
            state: ScanState::ExpectHeader,
            block: [0u8; HEADER_SIZE],
            pos: 0,
            remaining: 0,
            padding: 0,
        }
    }

    /// Create a new scanner with default options.
    pub fn with_defaults(reader: R) -> Self {
        Self::new(reader, ScanOptions::default())
    }

    /// Get the current position in the stream.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Get the current state.
    #[must_use]
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Get the options this scanner was created with.
    #[must_use]
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Content bytes of the current entry that have not been read yet.
    #[must_use]
    pub fn remaining_content(&self) -> u64 {
        self.remaining
    }

    /// Consume the scanner and return the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Get the next entry.
    ///
    /// Returns `Ok(None)` once the end-of-archive marker has been read, and
    /// on every call after an error.
    ///
    /// # Errors
    ///
    /// [`ScanError::Corrupt`] when a block is neither a valid header nor part
    /// of the end-of-archive marker, [`ScanError::MissingEndOfArchive`] or
    /// [`ScanError::TruncatedEndOfArchive`] when the stream stops early, and
    /// [`ScanError::Io`] / [`ScanError::UnexpectedEof`] for reader failures.
    pub fn next_entry(&mut self) -> Result<Option<ScannedEntry>> {
        if self.state.is_finished() {
            return Ok(None);
        }
        let result = self.advance();
        result.map_err(|e| self.fail(e))
    }

    /// Read content of the current entry into `buf`.
    ///
    /// Returns the number of bytes read, `0` once the entry's content is
    /// exhausted. Padding is skipped by the next [`next_entry`] call.
    ///
    /// # Errors
    ///
    /// [`ScanError::UnexpectedEof`] if the stream ends inside the content.
    ///
    /// [`next_entry`]: ArchiveScanner::next_entry
    pub fn read_content(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let n = loop {
            match self.reader.read(&mut buf[..want]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.fail(e.into())),
            }
        };
        if n == 0 {
            let pos = self.pos;
            return Err(self.fail(ScanError::UnexpectedEof { pos }));
        }
        self.pos += n as u64;
        self.remaining -= n as u64;
        Ok(n)
    }

    /// Copy the rest of the current entry's content into `out`.
    ///
    /// Returns the number of bytes copied.
    ///
    /// # Errors
    ///
    /// [`ScanError::UnexpectedEof`] if the stream ends inside the content,
    /// [`ScanError::Io`] if reading or writing fails.
    pub fn copy_content<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<u64> {
        let want = self.remaining;
        let copied = match io::copy(&mut (&mut self.reader).take(want), out) {
            Ok(n) => n,
            Err(e) => return Err(self.fail(e.into())),
        };
        self.pos += copied;
        self.remaining -= copied;
        if copied < want {
            let pos = self.pos;
            return Err(self.fail(ScanError::UnexpectedEof { pos }));
        }
        Ok(copied)
    }

    fn advance(&mut self) -> Result<Option<ScannedEntry>> {
        self.skip_bytes(self.remaining + self.padding)?;
        self.remaining = 0;
        self.padding = 0;

        loop {
            let offset = self.pos;
            match self.state {
                ScanState::ExpectHeader => {
                    if !self.read_block()? {
                        return Err(ScanError::MissingEndOfArchive { pos: offset });
                    }
                    if self.block_is_zero() {
                        trace!("zero block at {offset}");
                        self.state = ScanState::FirstZeroBlock;
                        continue;
                    }

                    let header = Header::from_bytes_exact(&self.block);
                    let entry = header
                        .validate(self.options.conformance)
                        .and_then(|()| ScannedEntry::from_header(header, offset))
                        .map_err(|e| ScanError::Corrupt {
                            pos: offset,
                            source: e.into(),
                        })?;

                    let data_len = entry.data_len();
                    let padded = data_len
                        .checked_next_multiple_of(BLOCK_SIZE)
                        .ok_or(ScanError::InvalidSize(entry.size))?;
                    self.remaining = data_len;
                    self.padding = padded - data_len;

                    debug!(
                        "entry {:?} at {offset}: {:?}, {data_len} bytes",
                        entry.path_lossy(),
                        entry.entry_type
                    );
                    return Ok(Some(entry));
                }
                ScanState::FirstZeroBlock => {
                    if !self.read_block()? {
                        if self.options.allow_truncated_end {
                            warn!("archive ends at {offset} after a single zero block");
                            self.state = ScanState::Terminal;
                            return Ok(None);
                        }
                        return Err(ScanError::TruncatedEndOfArchive { pos: offset });
                    }
                    if !self.block_is_zero() {
                        return Err(ScanError::Corrupt {
                            pos: offset,
                            source: Corruption::LoneZeroBlock,
                        });
                    }
                    trace!("end of archive at {}", self.pos);
                    self.state = ScanState::Terminal;
                    return Ok(None);
                }
                ScanState::Terminal
                | ScanState::Corrupt
                | ScanState::Truncated
                | ScanState::Failed => return Ok(None),
            }
        }
    }

    /// Record the error in the state and hand it back.
    fn fail(&mut self, err: ScanError) -> ScanError {
        self.state = if err.is_corruption() {
            ScanState::Corrupt
        } else if err.is_truncation() {
            ScanState::Truncated
        } else {
            ScanState::Failed
        };
        err
    }

    fn block_is_zero(&self) -> bool {
        self.block.iter().all(|&b| b == 0)
    }

    /// Read one block, returning false on EOF before any byte of it.
    fn read_block(&mut self) -> Result<bool> {
        let mut total = 0;
        while total < HEADER_SIZE {
            match self.reader.read(&mut self.block[total..]) {
                Ok(0) => {
                    if total == 0 {
                        return Ok(false);
                    }
                    return Err(ScanError::UnexpectedEof {
                        pos: self.pos + total as u64,
                    });
                }
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.pos += HEADER_SIZE as u64;
        Ok(true)
    }

    fn skip_bytes(&mut self, len: u64) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let skipped = io::copy(&mut (&mut self.reader).take(len), &mut io::sink())?;
        self.pos += skipped;
        if skipped < len {
            return Err(ScanError::UnexpectedEof { pos: self.pos });
        }
        Ok(())
    }
}

impl<R: Read> Iterator for ArchiveScanner<R> {
    type Item = Result<ScannedEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}
