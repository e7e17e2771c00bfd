//! Origin store for APOD records
//!
//! The cache sits in front of an [`ApodRepository`]. Production deployments
//! back it with a document database; [`InMemoryApodRepository`] is bundled
//! for development and tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Format of every stored date
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// An Astronomy Picture of the Day record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apod {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub hdurl: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub service_version: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

impl Apod {
    /// The record date, if it is well formed
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()
    }
}

/// Which records a query selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApodFilter {
    All,
    Date(NaiveDate),
    /// Inclusive on both ends
    DateRange { start: NaiveDate, end: NaiveDate },
    Search(SearchFilter),
}

impl ApodFilter {
    pub fn matches(&self, record: &Apod) -> bool {
        match self {
            ApodFilter::All => true,
            ApodFilter::Date(date) => record.parsed_date() == Some(*date),
            ApodFilter::DateRange { start, end } => record
                .parsed_date()
                .is_some_and(|d| d >= *start && d <= *end),
            ApodFilter::Search(search) => search.matches(record),
        }
    }
}

/// Conjunction of optional search criteria; an empty filter matches
/// everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Exact `media_type`
    pub media_type: Option<String>,
    /// Case-insensitive substring of the title or explanation
    pub text: Option<String>,
    /// Earliest date, inclusive
    pub start: Option<NaiveDate>,
    /// Latest date, inclusive
    pub end: Option<NaiveDate>,
}

impl SearchFilter {
    pub fn matches(&self, record: &Apod) -> bool {
        if let Some(media_type) = &self.media_type {
            if &record.media_type != media_type {
                return false;
            }
        }

        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            if !record.title.to_lowercase().contains(&needle)
                && !record.explanation.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        if self.start.is_none() && self.end.is_none() {
            return true;
        }
        record.parsed_date().is_some_and(|d| {
            self.start.map_or(true, |start| d >= start) && self.end.map_or(true, |end| d <= end)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    DateAscending,
    DateDescending,
}

#[derive(Debug, Error)]
pub enum OriginError {
    #[error("Origin store unavailable: {0}")]
    Unavailable(String),

    #[error("Record already exists for date {0}")]
    Duplicate(String),

    #[error("Invalid record: {0}")]
    Invalid(String),
}

/// Document store holding the authoritative records
#[async_trait]
pub trait ApodRepository: Send + Sync {
    /// The most recent record matching `filter`
    async fn fetch_one(&self, filter: &ApodFilter) -> Result<Option<Apod>, OriginError>;

    /// Records matching `filter`, sorted, after skipping `skip`, at most `limit`
    async fn fetch_many(
        &self,
        filter: &ApodFilter,
        sort: SortOrder,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Apod>, OriginError>;

    /// Store a new record, returning its id
    async fn insert(&self, record: Apod) -> Result<String, OriginError>;

    async fn count(&self, filter: &ApodFilter) -> Result<usize, OriginError>;
}

/// [`ApodRepository`] over a vector, unique by date
#[derive(Default)]
pub struct InMemoryApodRepository {
    records: RwLock<Vec<Apod>>,
    queries: AtomicUsize,
}

impl InMemoryApodRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repository, assigning ids where missing
    pub fn with_records(records: Vec<Apod>) -> Self {
        let records = records
            .into_iter()
            .map(|mut record| {
                record.id.get_or_insert_with(|| Uuid::new_v4().to_string());
                record
            })
            .collect();

        Self {
            records: RwLock::new(records),
            queries: AtomicUsize::new(0),
        }
    }

    /// Number of read queries served so far
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApodRepository for InMemoryApodRepository {
    async fn fetch_one(&self, filter: &ApodFilter) -> Result<Option<Apod>, OriginError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let records = self.records.read().await;

        Ok(records
            .iter()
            .filter(|r| filter.matches(r))
            .max_by(|a, b| a.date.cmp(&b.date))
            .cloned())
    }

    async fn fetch_many(
        &self,
        filter: &ApodFilter,
        sort: SortOrder,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Apod>, OriginError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let records = self.records.read().await;

        let mut matching: Vec<Apod> = records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        match sort {
            SortOrder::DateAscending => matching.sort_by(|a, b| a.date.cmp(&b.date)),
            SortOrder::DateDescending => matching.sort_by(|a, b| b.date.cmp(&a.date)),
        }

        Ok(matching
            .into_iter()
            .skip(skip)
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn insert(&self, mut record: Apod) -> Result<String, OriginError> {
        if record.parsed_date().is_none() {
            return Err(OriginError::Invalid(format!("bad date '{}'", record.date)));
        }

        let mut records = self.records.write().await;
        if records.iter().any(|r| r.date == record.date) {
            return Err(OriginError::Duplicate(record.date));
        }

        let id = Uuid::new_v4().to_string();
        record.id = Some(id.clone());
        debug!("Inserted APOD {} ({})", record.date, id);
        records.push(record);

        Ok(id)
    }

    async fn count(&self, filter: &ApodFilter) -> Result<usize, OriginError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| filter.matches(r)).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apod(date: &str) -> Apod {
        Apod {
            id: None,
            date: date.to_string(),
            explanation: format!("Explanation for {}", date),
            hdurl: String::new(),
            media_type: "image".to_string(),
            service_version: "v1".to_string(),
            title: format!("Title {}", date),
            url: String::new(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn repository() -> InMemoryApodRepository {
        InMemoryApodRepository::with_records(vec![
            apod("2023-01-02"),
            apod("2023-01-01"),
            apod("2023-01-03"),
        ])
    }

    #[tokio::test]
    async fn test_fetch_one_returns_most_recent() {
        let repo = repository();

        let latest = repo.fetch_one(&ApodFilter::All).await.unwrap().unwrap();
        assert_eq!(latest.date, "2023-01-03");

        let by_date = repo
            .fetch_one(&ApodFilter::Date(date("2023-01-01")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_date.date, "2023-01-01");
        assert!(by_date.id.is_some());

        assert!(repo
            .fetch_one(&ApodFilter::Date(date("2024-01-01")))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_fetch_many_range_sorted() {
        let repo = repository();
        let filter = ApodFilter::DateRange {
            start: date("2023-01-02"),
            end: date("2023-01-03"),
        };

        let records = repo
            .fetch_many(&filter, SortOrder::DateAscending, 0, None)
            .await
            .unwrap();
        let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2023-01-02", "2023-01-03"]);

        let page = repo
            .fetch_many(&ApodFilter::All, SortOrder::DateDescending, 1, Some(1))
            .await
            .unwrap();
        assert_eq!(page[0].date, "2023-01-02");
        assert_eq!(repo.count(&filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let repo = repository();

        let id = repo.insert(apod("2023-01-04")).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(repo.count(&ApodFilter::All).await.unwrap(), 4);

        let result = repo.insert(apod("2023-01-04")).await;
        assert!(matches!(result, Err(OriginError::Duplicate(_))));

        let result = repo.insert(apod("yesterday")).await;
        assert!(matches!(result, Err(OriginError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_search_filter_criteria() {
        let mut video = apod("2023-01-05");
        video.media_type = "video".to_string();
        video.title = "Orion Nebula Flythrough".to_string();
        let repo = InMemoryApodRepository::with_records(vec![
            apod("2023-01-01"),
            apod("2023-01-02"),
            video,
        ]);

        let everything = ApodFilter::Search(SearchFilter::default());
        assert_eq!(repo.count(&everything).await.unwrap(), 3);

        let videos = ApodFilter::Search(SearchFilter {
            media_type: Some("video".to_string()),
            ..Default::default()
        });
        assert_eq!(repo.count(&videos).await.unwrap(), 1);

        let text = ApodFilter::Search(SearchFilter {
            text: Some("NEBULA".to_string()),
            ..Default::default()
        });
        let found = repo
            .fetch_many(&text, SortOrder::DateDescending, 0, None)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].date, "2023-01-05");

        let open_ended = ApodFilter::Search(SearchFilter {
            start: Some(date("2023-01-02")),
            ..Default::default()
        });
        assert_eq!(repo.count(&open_ended).await.unwrap(), 2);

        let until = ApodFilter::Search(SearchFilter {
            end: Some(date("2023-01-01")),
            text: Some("explanation".to_string()),
            ..Default::default()
        });
        assert_eq!(repo.count(&until).await.unwrap(), 1);
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(apod("2023-01-01")).unwrap();
        assert!(json.get("_id").is_none());
        assert_eq!(json["media_type"], "image");

        let parsed: Apod = serde_json::from_str(r#"{"date":"2023-01-01","title":"M31"}"#).unwrap();
        assert_eq!(parsed.title, "M31");
        assert!(parsed.explanation.is_empty());
    }
}
