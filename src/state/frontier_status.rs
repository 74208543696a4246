/// Frontier partition definitions
///
/// Every URL stored for a session lives in exactly one of these partitions.
use std::fmt;

/// The status half of a frontier entry's composite `(status, url)` key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontierStatus {
    /// Discovered but not yet extracted
    NotVisited,

    /// Extraction was attempted (successfully or not)
    Visited,
}

impl FrontierStatus {
    /// Converts the status to its stored partition key
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::NotVisited => "not_visited",
            Self::Visited => "visited",
        }
    }

    /// Parses a status from its stored partition key
    ///
    /// Returns None if the string doesn't match any known partition.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "not_visited" => Some(Self::NotVisited),
            "visited" => Some(Self::Visited),
            _ => None,
        }
    }
}

impl fmt::Display for FrontierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
