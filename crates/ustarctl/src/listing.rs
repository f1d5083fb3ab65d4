//! Display strings for long listings.

use chrono::{Local, TimeZone};
use ustar_header::stream::ScannedEntry;
use ustar_header::EntryType;

/// Type character followed by the three `rwx` triplets, e.g. `drwxr-xr-x`.
pub fn permissions(entry_type: EntryType, mode: u32) -> String {
    let mut out = String::with_capacity(10);
    out.push(match entry_type {
        EntryType::Directory => 'd',
        EntryType::Symlink => 'l',
        _ => '-',
    });
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

/// `user/group` as stored in the header.
pub fn owner_group(uname: &[u8], gname: &[u8]) -> String {
    format!(
        "{}/{}",
        String::from_utf8_lossy(uname),
        String::from_utf8_lossy(gname)
    )
}

/// Modification time in local time as `YYYY-MM-DD HH:MM`.
///
/// Timestamps chrono cannot represent are shown as raw seconds.
pub fn modification_time(mtime: u64) -> String {
    i64::try_from(mtime)
        .ok()
        .and_then(|secs| Local.timestamp_opt(secs, 0).single())
        .map_or_else(
            || mtime.to_string(),
            |time| time.format("%Y-%m-%d %H:%M").to_string(),
        )
}

/// One line of `list --verbose` output.
pub fn long_line(entry: &ScannedEntry) -> String {
    format!(
        "{:>10} {:>17} {:>8} {:>16} {}",
        permissions(entry.entry_type, entry.mode),
        owner_group(&entry.uname, &entry.gname),
        entry.size,
        modification_time(entry.mtime),
        entry.path_lossy()
    )
}
