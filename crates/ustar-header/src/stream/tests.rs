//! Tests for the archive scanner.

use std::io::{Cursor, Read};

use crate::{Conformance, EntryMetadata, EntryType, Header, BLOCK_SIZE, HEADER_SIZE};

use super::*;

/// Build an archive from `(metadata, content)` pairs using the header codec.
fn build_archive(entries: &[(EntryMetadata, Vec<u8>)]) -> Vec<u8> {
    let mut data = Vec::new();
    for (meta, content) in entries {
        let header = Header::encode(meta, Conformance::Lenient).unwrap();
        data.extend_from_slice(header.as_bytes());
        if meta.entry_type.has_data() {
            data.extend_from_slice(content);
            let padded = (content.len() as u64).next_multiple_of(BLOCK_SIZE) as usize;
            data.resize(data.len() + padded - content.len(), 0);
        }
    }
    data.extend_from_slice(&[0u8; 2 * HEADER_SIZE]);
    data
}

fn file(path: &str, content: &[u8]) -> (EntryMetadata, Vec<u8>) {
    let meta = EntryMetadata {
        mode: 0o644,
        uid: 1000,
        gid: 1000,
        size: content.len() as u64,
        mtime: 1234567890,
        uname: b"user".to_vec(),
        gname: b"group".to_vec(),
        ..EntryMetadata::new(path.as_bytes().to_vec(), EntryType::Regular)
    };
    (meta, content.to_vec())
}

fn dir(path: &str) -> EntryMetadata {
    EntryMetadata {
        mode: 0o755,
        ..EntryMetadata::new(path.as_bytes().to_vec(), EntryType::Directory)
    }
}

/// `root/`, `root/a.txt` (12 bytes), `root/sub/`, `root/sub/b.txt` (600 bytes).
fn sample_tree() -> Vec<u8> {
    build_archive(&[
        (dir("root/"), Vec::new()),
        file("root/a.txt", b"hello world\n"),
        (dir("root/sub/"), Vec::new()),
        file("root/sub/b.txt", &[b'b'; 600]),
    ])
}

fn scanner(data: Vec<u8>) -> ArchiveScanner<Cursor<Vec<u8>>> {
    ArchiveScanner::new(Cursor::new(data), ScanOptions::default())
}

/// Helper to create a tar archive using the tar crate.
fn create_tar_with<F>(f: F) -> Vec<u8>
where
    F: FnOnce(&mut tar::Builder<&mut Vec<u8>>),
{
    let mut data = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut data);
        f(&mut builder);
        builder.finish().unwrap();
    }
    data
}

// =============================================================================
// Basic scanning
// =============================================================================

#[test]
fn test_empty_archive() {
    let mut scanner = scanner(vec![0u8; 2 * HEADER_SIZE]);
    assert!(scanner.next_entry().unwrap().is_none());
    assert_eq!(scanner.state(), ScanState::Terminal);
    assert_eq!(scanner.position(), 1024);
}

#[test]
fn test_single_file() {
    let mut scanner = scanner(build_archive(&[file("hello.txt", b"Hello, World!")]));

    let entry = scanner.next_entry().unwrap().expect("should have entry");
    assert_eq!(entry.path, b"hello.txt");
    assert_eq!(entry.entry_type, EntryType::Regular);
    assert_eq!(entry.offset, 0);
    assert_eq!(entry.size, 13);
    assert_eq!(entry.mode, 0o644);
    assert_eq!(entry.uid, 1000);
    assert_eq!(entry.gid, 1000);
    assert_eq!(entry.mtime, 1234567890);
    assert_eq!(entry.uname, b"user");
    assert_eq!(entry.gname, b"group");
    assert_eq!(entry.link_target, None);
    assert_eq!(entry.data_blocks(), 1);

    assert!(scanner.next_entry().unwrap().is_none());
    assert_eq!(scanner.state(), ScanState::Terminal);
}

#[test]
fn test_multiple_files_skip_content() {
    let entries: Vec<_> = (1..=3)
        .map(|i| file(&format!("file{i}.txt"), &vec![b'x'; i * 300]))
        .collect();
    let mut scanner = scanner(build_archive(&entries));

    let mut offsets = Vec::new();
    for i in 1..=3 {
        let entry = scanner.next_entry().unwrap().expect("should have entry");
        assert_eq!(entry.path, format!("file{i}.txt").as_bytes());
        offsets.push(entry.offset);
    }
    assert!(scanner.next_entry().unwrap().is_none());
    // 300 -> 1 block, 600 -> 2 blocks, 900 -> 2 blocks
    assert_eq!(offsets, vec![0, 1024, 2560]);
}

#[test]
fn test_read_content() {
    let mut scanner = scanner(build_archive(&[file("data.bin", &[7u8; 1000])]));

    let entry = scanner.next_entry().unwrap().unwrap();
    assert_eq!(scanner.remaining_content(), 1000);

    let mut buf = [0u8; 600];
    let n = scanner.read_content(&mut buf).unwrap();
    assert_eq!(n, 600);
    let mut rest = Vec::new();
    assert_eq!(scanner.copy_content(&mut rest).unwrap(), 400);
    assert_eq!(scanner.read_content(&mut buf).unwrap(), 0);
    assert!(rest.iter().all(|&b| b == 7));
    assert_eq!(entry.padded_size(), 1024);

    assert!(scanner.next_entry().unwrap().is_none());
}

#[test]
fn test_partial_read_then_next() {
    let mut scanner = scanner(build_archive(&[
        file("a", b"0123456789"),
        file("b", b"second"),
    ]));

    scanner.next_entry().unwrap().unwrap();
    let mut buf = [0u8; 4];
    scanner.read_content(&mut buf).unwrap();
    assert_eq!(&buf, b"0123");

    let entry = scanner.next_entry().unwrap().unwrap();
    assert_eq!(entry.path, b"b");
    let mut out = Vec::new();
    scanner.copy_content(&mut out).unwrap();
    assert_eq!(out, b"second");
}

#[test]
fn test_directory_and_symlink_have_no_data() {
    let mut link = EntryMetadata::new(b"link".to_vec(), EntryType::Symlink);
    link.link_target = b"target".to_vec();
    let data = build_archive(&[
        (dir("mydir/"), Vec::new()),
        (link, Vec::new()),
        file("after", b"x"),
    ]);
    let mut scanner = scanner(data);

    let d = scanner.next_entry().unwrap().unwrap();
    assert!(d.is_dir());
    assert_eq!(d.path, b"mydir/");
    assert_eq!(d.data_blocks(), 0);

    let l = scanner.next_entry().unwrap().unwrap();
    assert!(l.is_symlink());
    assert_eq!(l.link_target.as_deref(), Some(&b"target"[..]));
    assert_eq!(l.link_target_lossy().as_deref(), Some("target"));

    let f = scanner.next_entry().unwrap().unwrap();
    assert_eq!(f.offset, 1024);
    assert!(scanner.next_entry().unwrap().is_none());
}

#[test]
fn test_directory_size_field_is_ignored() {
    // A directory header claiming a size must not cause data to be skipped.
    let mut header = Header::encode(&dir("d/"), Conformance::Lenient).unwrap();
    header.as_mut_bytes()[124..136].copy_from_slice(b"00000001000\0");
    header.set_checksum();
    let (f, content) = file("f", b"x");
    let next = Header::encode(&f, Conformance::Lenient).unwrap();

    let mut data = header.as_bytes().to_vec();
    data.extend_from_slice(next.as_bytes());
    data.extend_from_slice(&content);
    data.resize(data.len() + 511, 0);
    data.extend_from_slice(&[0u8; 1024]);

    let mut scanner = scanner(data);
    let d = scanner.next_entry().unwrap().unwrap();
    assert_eq!(d.size, 512);
    assert_eq!(d.data_len(), 0);
    let f = scanner.next_entry().unwrap().unwrap();
    assert_eq!(f.path, b"f");
}

#[test]
fn test_long_path_reassembled() {
    let path = format!("{}/{}", "p".repeat(60), "n".repeat(89));
    assert_eq!(path.len(), 150);
    let mut scanner = scanner(build_archive(&[file(&path, b"")]));
    let entry = scanner.next_entry().unwrap().unwrap();
    assert_eq!(entry.path_lossy(), path);
}

#[test]
fn test_block_alignment() {
    for n in [0usize, 1, 511, 512, 513, 1024, 1025] {
        let data = build_archive(&[file("f", &vec![1u8; n])]);
        assert_eq!(data.len() % 512, 0);
        assert_eq!(data.len(), 512 + n.div_ceil(512) * 512 + 1024);

        let entry = scanner(data).next_entry().unwrap().unwrap();
        assert_eq!(entry.data_blocks(), n.div_ceil(512) as u64);
    }
}

#[test]
fn test_iterator() {
    let paths: Vec<_> = scanner(build_archive(&[file("a", b"1"), file("b", b"2")]))
        .map(|e| e.unwrap().path)
        .collect();
    assert_eq!(paths, vec![b"a".to_vec(), b"b".to_vec()]);
}

#[test]
fn test_into_inner() {
    let mut data = vec![0u8; 1024];
    data.extend_from_slice(b"trailing");
    let mut scanner = scanner(data);
    assert!(scanner.next_entry().unwrap().is_none());
    let mut rest = String::new();
    scanner.into_inner().read_to_string(&mut rest).unwrap();
    assert_eq!(rest, "trailing");
}

// =============================================================================
// End-of-archive detection
// =============================================================================

#[test]
fn test_zero_block_then_data_is_corrupt() {
    let mut data = vec![0u8; HEADER_SIZE];
    data.extend(build_archive(&[file("late", b"x")]));

    let mut scanner = scanner(data);
    let err = scanner.next_entry().unwrap_err();
    assert!(matches!(
        err,
        ScanError::Corrupt {
            pos: 512,
            source: Corruption::LoneZeroBlock
        }
    ));
    assert!(err.is_corruption());
    assert!(!err.is_truncation());
    assert_eq!(scanner.state(), ScanState::Corrupt);
    assert!(scanner.next_entry().unwrap().is_none());
}

#[test]
fn test_missing_end_of_archive() {
    let mut data = build_archive(&[file("a", b"abc")]);
    data.truncate(1024);

    let mut scanner = scanner(data);
    scanner.next_entry().unwrap().unwrap();
    let err = scanner.next_entry().unwrap_err();
    assert!(matches!(err, ScanError::MissingEndOfArchive { pos: 1024 }));
    assert!(err.is_truncation());
    assert!(!err.is_corruption());
    assert_eq!(scanner.state(), ScanState::Truncated);
}

#[test]
fn test_empty_input() {
    let err = scanner(Vec::new()).next_entry().unwrap_err();
    assert!(matches!(err, ScanError::MissingEndOfArchive { pos: 0 }));
}

#[test]
fn test_single_zero_block_lenient() {
    let mut scanner = scanner(vec![0u8; HEADER_SIZE]);
    assert!(scanner.next_entry().unwrap().is_none());
    assert_eq!(scanner.state(), ScanState::Terminal);
}

#[test]
fn test_single_zero_block_strict() {
    let mut scanner = ArchiveScanner::new(Cursor::new(vec![0u8; HEADER_SIZE]), ScanOptions::strict());
    let err = scanner.next_entry().unwrap_err();
    assert!(matches!(err, ScanError::TruncatedEndOfArchive { pos: 512 }));
    assert_eq!(scanner.state(), ScanState::Truncated);
}

// =============================================================================
// Malformed input
// =============================================================================

#[test]
fn test_checksum_corruption() {
    let mut data = build_archive(&[file("a", b"abc")]);
    data[0] ^= 0x01;

    let err = scanner(data).next_entry().unwrap_err();
    assert!(matches!(
        err,
        ScanError::Corrupt {
            pos: 0,
            source: Corruption::Header(crate::HeaderError::ChecksumMismatch { .. })
        }
    ));
}

#[test]
fn test_garbage_block() {
    let data = vec![b'G'; 2048];
    let err = scanner(data).next_entry().unwrap_err();
    assert!(matches!(err, ScanError::Corrupt { pos: 0, .. }));
}

#[test]
fn test_truncated_header() {
    let mut data = build_archive(&[file("a", b"abc")]);
    data.truncate(300);
    let mut scanner = scanner(data);
    let err = scanner.next_entry().unwrap_err();
    assert!(matches!(err, ScanError::UnexpectedEof { pos: 300 }));
    assert!(!err.is_corruption());
    assert!(err.is_truncation());
    assert_eq!(scanner.state(), ScanState::Truncated);
    assert!(scanner.next_entry().unwrap().is_none());
}

#[test]
fn test_truncated_content() {
    let mut data = build_archive(&[file("a", &[1u8; 2000])]);
    data.truncate(512 + 700);

    let mut scanner = scanner(data);
    scanner.next_entry().unwrap().unwrap();
    let err = scanner.next_entry().unwrap_err();
    assert!(matches!(err, ScanError::UnexpectedEof { pos: 1212 }));
    assert_eq!(scanner.state(), ScanState::Truncated);
    assert!(scanner.next_entry().unwrap().is_none());
}

#[test]
fn test_strict_rejects_escaped_uid() {
    let (mut meta, content) = file("big", b"");
    meta.uid = 1 << 22;
    let data = build_archive(&[(meta, content)]);

    let entry = scanner(data.clone()).next_entry().unwrap().unwrap();
    assert_eq!(entry.uid, 1 << 22);

    let mut strict = ArchiveScanner::new(Cursor::new(data), ScanOptions::strict());
    let err = strict.next_entry().unwrap_err();
    assert!(matches!(
        err,
        ScanError::Corrupt {
            source: Corruption::Header(crate::HeaderError::Nonconforming(_)),
            ..
        }
    ));
}

#[test]
fn test_io_error_is_not_corruption() {
    struct Broken;
    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk on fire"))
        }
    }
    let mut scanner = ArchiveScanner::with_defaults(Broken);
    let err = scanner.next_entry().unwrap_err();
    assert!(matches!(err, ScanError::Io(_)));
    assert!(!err.is_corruption());
    assert!(!err.is_truncation());
    assert_eq!(scanner.state(), ScanState::Failed);
    assert!(scanner.next_entry().unwrap().is_none());
}

// =============================================================================
// Archives written by other tools
// =============================================================================

#[test]
fn test_reads_tar_crate_ustar() {
    let data = create_tar_with(|b| {
        let mut header = tar::Header::new_ustar();
        header.set_mode(0o640);
        header.set_uid(42);
        header.set_gid(43);
        header.set_mtime(1_600_000_000);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(5);
        b.append_data(&mut header, "dir/hello.txt", &b"hello"[..])
            .unwrap();

        let mut header = tar::Header::new_ustar();
        header.set_mode(0o777);
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_size(0);
        b.append_link(&mut header, "link", "dir/hello.txt").unwrap();
    });

    let mut scanner = ArchiveScanner::new(Cursor::new(data), ScanOptions::strict());

    let entry = scanner.next_entry().unwrap().unwrap();
    assert_eq!(entry.path, b"dir/hello.txt");
    assert_eq!(entry.mode, 0o640);
    assert_eq!((entry.uid, entry.gid), (42, 43));
    assert_eq!(entry.mtime, 1_600_000_000);
    let mut content = Vec::new();
    scanner.copy_content(&mut content).unwrap();
    assert_eq!(content, b"hello");

    let link = scanner.next_entry().unwrap().unwrap();
    assert_eq!(link.link_target.as_deref(), Some(&b"dir/hello.txt"[..]));

    assert!(scanner.next_entry().unwrap().is_none());
}

#[test]
fn test_tar_crate_reads_our_archive() {
    let data = sample_tree();

    let mut archive = tar::Archive::new(Cursor::new(data));
    let mut seen = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let path = entry.path().unwrap().to_string_lossy().into_owned();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        seen.push((path, content.len()));
    }
    similar_asserts::assert_eq!(
        seen,
        vec![
            ("root/".to_string(), 0),
            ("root/a.txt".to_string(), 12),
            ("root/sub/".to_string(), 0),
            ("root/sub/b.txt".to_string(), 600),
        ]
    );
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn test_selection_filters_scanner() {
    let data = sample_tree();

    let selected: Vec<_> = Selection::new(["root/sub"])
        .filter(scanner(data.clone()))
        .map(|e| e.unwrap().path_lossy().into_owned())
        .collect();
    assert_eq!(selected, vec!["root/sub/", "root/sub/b.txt"]);

    let all = Selection::all().filter(scanner(data)).count();
    assert_eq!(all, 4);
}

#[test]
fn test_selection_passes_errors() {
    let mut data = vec![0u8; HEADER_SIZE];
    data.extend_from_slice(&[1u8; HEADER_SIZE]);
    let results: Vec<_> = Selection::new(["nothing"]).filter(scanner(data)).collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}
