//! Single-byte namespace discriminator used throughout the ZIM layout.

use std::fmt;

/// A ZIM namespace byte.
///
/// Modern (v6+) archives use only four namespaces in practice, exposed as
/// associated constants below, but the byte itself is unconstrained by the
/// format, so this is a thin newtype rather than a closed enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Namespace(pub u8);

impl Namespace {
    /// User-facing content (articles, images, stylesheets, ...).
    pub const CONTENT: Namespace = Namespace(b'C');
    /// Archive metadata (`Title`, `Language`, `Tags`, ...).
    pub const METADATA: Namespace = Namespace(b'M');
    /// Well-known entries such as the favicon.
    pub const WELL_KNOWN: Namespace = Namespace(b'W');
    /// Internal indexes (title-ordered listings, search indexes).
    pub const INDEX: Namespace = Namespace(b'X');

    pub fn as_char(self) -> char {
        self.0 as char
    }

    pub fn is_content(self) -> bool {
        self == Self::CONTENT
    }

    pub fn is_metadata(self) -> bool {
        self == Self::METADATA
    }

    pub fn is_well_known(self) -> bool {
        self == Self::WELL_KNOWN
    }

    pub fn is_index(self) -> bool {
        self == Self::INDEX
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl From<u8> for Namespace {
    fn from(value: u8) -> Self {
        Namespace(value)
    }
}
