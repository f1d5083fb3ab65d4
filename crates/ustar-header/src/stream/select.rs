//! Path selection over scanned entries.

use super::entry::ScannedEntry;
use super::error::Result;

/// A set of path selectors used to pick entries out of an archive.
///
/// An entry is selected when its path equals one of the selectors, or when it
/// lies below a selector: `"docs"` selects `"docs"`, `"docs/"` and
/// `"docs/a.txt"` but not `"docsets/x"` or `"src/docs/a.txt"`. An empty
/// selection selects every entry.
///
/// ```
/// use ustar_header::stream::Selection;
///
/// let sel = Selection::new(["root/sub"]);
/// assert!(sel.matches(b"root/sub/"));
/// assert!(sel.matches(b"root/sub/b.txt"));
/// assert!(!sel.matches(b"root/a.txt"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selectors: Vec<Vec<u8>>,
}

impl Selection {
    /// Build a selection from path selectors.
    pub fn new<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        Self {
            selectors: selectors
                .into_iter()
                .map(|s| s.as_ref().to_vec())
                .collect(),
        }
    }

    /// A selection that matches everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Returns true if there are no selectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Check a single archive path against the selectors.
    #[must_use]
    pub fn matches(&self, path: &[u8]) -> bool {
        self.is_empty()
            || self
                .selectors
                .iter()
                .any(|selector| selector_matches(selector, path))
    }

    /// Check a scanned entry against the selectors.
    #[must_use]
    pub fn matches_entry(&self, entry: &ScannedEntry) -> bool {
        self.matches(&entry.path)
    }

    /// Wrap an entry iterator (usually an [`ArchiveScanner`]) so that only
    /// selected entries come out. Errors are always passed through.
    ///
    /// [`ArchiveScanner`]: super::ArchiveScanner
    pub fn filter<I>(self, entries: I) -> Selected<I>
    where
        I: Iterator<Item = Result<ScannedEntry>>,
    {
        Selected {
            inner: entries,
            selection: self,
        }
    }
}

fn selector_matches(selector: &[u8], path: &[u8]) -> bool {
    if selector == path {
        return true;
    }
    let selector = selector.strip_suffix(b"/").unwrap_or(selector);
    let path = path.strip_suffix(b"/").unwrap_or(path);
    // Compare as if both ended in '/', so "a/b" never matches "a/bc".
    match path.strip_prefix(selector) {
        Some(rest) => rest.is_empty() || rest.starts_with(b"/"),
        None => false,
    }
}

/// Iterator adapter returned by [`Selection::filter`].
#[derive(Debug)]
pub struct Selected<I> {
    inner: I,
    selection: Selection,
}

impl<I> Selected<I> {
    /// Consume the adapter and return the wrapped iterator.
    pub fn into_inner(self) -> I {
        self.inner
    }
}

impl<I> Iterator for Selected<I>
where
    I: Iterator<Item = Result<ScannedEntry>>,
{
    type Item = Result<ScannedEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.find(|item| match item {
            Ok(entry) => self.selection.matches_entry(entry),
            Err(_) => true,
        })
    }
}
