//! In-memory quote history.
//!
//! Holds the rolling window of generated prices that the lookup
//! endpoints serve. Entries older than the retention window are dropped
//! on insert.

use std::sync::RwLock;

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// One published price point.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    /// Quote identifier.
    pub id: Uuid,
    /// Price value.
    pub value: f64,
    /// When the quote was generated.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Rolling board of recent quotes.
pub struct QuoteBoard {
    retention: Duration,
    quotes: RwLock<Vec<Quote>>,
}

impl QuoteBoard {
    /// Creates a board retaining quotes for the given window.
    #[must_use]
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            quotes: RwLock::new(Vec::new()),
        }
    }

    /// Publishes a new price, dropping entries past retention.
    pub fn publish(&self, value: f64) -> Quote {
        let quote = Quote {
            id: Uuid::new_v4(),
            value,
            created_at: OffsetDateTime::now_utc(),
        };
        let cutoff = quote.created_at - self.retention;
        if let Ok(mut quotes) = self.quotes.write() {
            quotes.retain(|q| q.created_at > cutoff);
            quotes.push(quote.clone());
        }
        quote
    }

    /// Returns the most recently published quote.
    #[must_use]
    pub fn latest(&self) -> Option<Quote> {
        self.quotes.read().ok()?.last().cloned()
    }

    /// Returns the lowest quote within the given lookback window.
    #[must_use]
    pub fn lowest_within(&self, window: Duration) -> Option<Quote> {
        let cutoff = OffsetDateTime::now_utc() - window;
        let quotes = self.quotes.read().ok()?;
        quotes
            .iter()
            .filter(|q| q.created_at > cutoff)
            .min_by(|a, b| a.value.total_cmp(&b.value))
            .cloned()
    }
}
