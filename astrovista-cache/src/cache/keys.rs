//! Namespaced cache keys
//!
//! Every cached artifact lives under its own prefix. Variable inputs are
//! either typed (dates are formatted canonically) or hashed, so keys from
//! different namespaces can never collide.

use crate::cache::types::CacheKey;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Prefix of every durable translation key
pub const TRANSLATION_PREFIX: &str = "translation:";

/// Namespace for categorizing cache entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Most recent record
    LatestRecord,

    /// Record for a single date
    RecordByDate,

    /// Listing for an inclusive date range
    DateRange,

    /// Search result page
    Search,

    /// Translated text
    Translation,
}

impl Namespace {
    /// Key prefix, separator included
    pub fn prefix(&self) -> &'static str {
        match self {
            Namespace::LatestRecord => "apod:latest",
            Namespace::RecordByDate => "apod:date:",
            Namespace::DateRange => "apods:range:",
            Namespace::Search => "search:",
            Namespace::Translation => TRANSLATION_PREFIX,
        }
    }
}

/// `apod:latest`
pub fn latest_record() -> CacheKey {
    Namespace::LatestRecord.prefix().to_string()
}

/// `apod:date:{YYYY-MM-DD}`
pub fn record_by_date(date: NaiveDate) -> CacheKey {
    format!("{}{}", Namespace::RecordByDate.prefix(), date.format("%Y-%m-%d"))
}

/// `apods:range:{start}:{end}`
pub fn date_range(start: NaiveDate, end: NaiveDate) -> CacheKey {
    format!(
        "{}{}:{}",
        Namespace::DateRange.prefix(),
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    )
}

/// `search:{sha256(raw query)}`
pub fn search(raw_query: &str) -> CacheKey {
    format!("{}{}", Namespace::Search.prefix(), hash_hex(raw_query))
}

/// `translation:{key}` for a key built by
/// [`translation_key`](crate::translation::translation_key)
pub fn translation(key: &str) -> CacheKey {
    format!("{}{}", Namespace::Translation.prefix(), key)
}

/// Stable hex digest of a variable input
pub fn hash_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
