use crate::storage::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by every frontier table name
pub const SESSION_KEY_PREFIX: &str = "crawler_table";

/// Number of host characters kept in a derived key
pub const HOST_COMPONENT_LEN: usize = 30;

const MAX_KEY_LEN: usize = 255;

/// Identifier of one crawl session and the name of its frontier table
///
/// Keys start with `crawler_table_`, only ever contain `[A-Za-z0-9_]` and are at
/// most 255 characters long. They are used as SQL identifiers, so every
/// construction path validates them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionKey(String);

impl SessionKey {
    /// Derives a key from a seed host and a creation timestamp
    ///
    /// Format: `crawler_table_<host>_<epoch-seconds>`, where `<host>` is the first
    /// 30 characters of the host with anything outside `[A-Za-z0-9_]` replaced by `_`.
    ///
    /// # Examples
    ///
    /// ```
    /// use wavecrawl::storage::SessionKey;
    ///
    /// let key = SessionKey::derive("www.example.com", 1_700_000_000);
    /// assert_eq!(key.as_str(), "crawler_table_www_example_com_1700000000");
    /// ```
    pub fn derive(host: &str, created_epoch: i64) -> Self {
        let host_component: String = host
            .chars()
            .take(HOST_COMPONENT_LEN)
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        Self(format!(
            "{}_{}_{}",
            SESSION_KEY_PREFIX, host_component, created_epoch
        ))
    }

    /// Validates an externally supplied key
    ///
    /// Names that are not frontier tables, such as the `sessions` catalog, are
    /// rejected before they can reach any SQL.
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let valid_prefix = raw
            .strip_prefix(SESSION_KEY_PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|rest| !rest.is_empty());
        let valid_len = raw.len() <= MAX_KEY_LEN;
        let valid_chars = raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

        if valid_prefix && valid_len && valid_chars {
            Ok(Self(raw.to_string()))
        } else {
            Err(StoreError::MalformedSessionKey(raw.to_string()))
        }
    }

    /// Returns a sibling key used when this one is already taken
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}_{}", self.0, n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionKey {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionKey> for String {
    fn from(key: SessionKey) -> Self {
        key.0
    }
}
