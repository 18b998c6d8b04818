use std::fmt;

/// Fatal error kinds surfaced by the alignment engine. Invariant breaches in
/// the CIGAR store are bugs and panic instead of returning one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeaverError {
    /// A structure named in a user supplied guide tree has no entry in the
    /// header lookup. Carries the offending label.
    InputNotFound(String),
    /// A database file was missing, truncated or otherwise unreadable.
    DatabaseFormat(String),
    /// Any read or write failure against the filesystem.
    Io(String),
    /// A malformed Newick tree string.
    TreeParse(String),
}

impl fmt::Display for WeaverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeaverError::InputNotFound(label) => {
                write!(f, "Could not find name {} in lookup", label)
            }
            WeaverError::DatabaseFormat(msg) => write!(f, "Database error: {}", msg),
            WeaverError::Io(msg) => write!(f, "I/O error: {}", msg),
            WeaverError::TreeParse(msg) => write!(f, "Invalid Newick tree: {}", msg),
        }
    }
}

impl std::error::Error for WeaverError {}

impl From<std::io::Error> for WeaverError {
    fn from(e: std::io::Error) -> Self {
        WeaverError::Io(e.to_string())
    }
}
