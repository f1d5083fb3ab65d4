//! Scanner configuration.

use crate::Conformance;

/// Options controlling how strictly an archive is scanned.
///
/// # Example
///
/// ```
/// use ustar_header::Conformance;
/// use ustar_header::stream::ScanOptions;
///
/// let opts = ScanOptions::strict();
/// assert_eq!(opts.conformance, Conformance::Strict);
/// assert!(!opts.allow_truncated_end);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Header validation level, see [`crate::Header::validate`].
    pub conformance: Conformance,

    /// Accept an archive that ends cleanly right after the first of the two
    /// end-of-archive blocks. A warning is logged when this happens.
    ///
    /// Default: `true`.
    pub allow_truncated_end: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            conformance: Conformance::Lenient,
            allow_truncated_end: true,
        }
    }
}

impl ScanOptions {
    /// Options for plain USTAR archives only: GNU extensions are refused and
    /// the end-of-archive sentinel must be complete.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            conformance: Conformance::Strict,
            allow_truncated_end: false,
        }
    }

    /// Pick [`ScanOptions::strict`] or the default depending on `strict`.
    #[must_use]
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            Self::strict()
        } else {
            Self::default()
        }
    }
}
