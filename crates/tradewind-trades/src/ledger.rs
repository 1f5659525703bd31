//! In-memory trade ledger.

use std::sync::RwLock;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// One recorded trade.
#[derive(Debug, Clone, Serialize)]
pub struct Trade {
    /// Trade identifier.
    pub id: Uuid,
    /// The user who placed the trade.
    pub user_id: String,
    /// Trade price.
    pub price: f64,
    /// Trade quantity.
    pub quantity: u32,
    /// When the trade was placed.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Append-only ledger of placed trades.
#[derive(Default)]
pub struct TradeLedger {
    trades: RwLock<Vec<Trade>>,
}

impl TradeLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a trade for the given user.
    pub fn record(&self, user_id: &str, price: f64, quantity: u32) -> Trade {
        let trade = Trade {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            price,
            quantity,
            created_at: OffsetDateTime::now_utc(),
        };
        if let Ok(mut trades) = self.trades.write() {
            trades.push(trade.clone());
        }
        trade
    }

    /// Lists trades placed by the given user, newest first.
    #[must_use]
    pub fn list_for_user(&self, user_id: &str) -> Vec<Trade> {
        self.trades
            .read()
            .map(|trades| {
                let mut own: Vec<Trade> = trades
                    .iter()
                    .filter(|t| t.user_id == user_id)
                    .cloned()
                    .collect();
                own.reverse();
                own
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_list() {
        let ledger = TradeLedger::new();
        ledger.record("user-1", 100.0, 2);
        ledger.record("user-2", 50.0, 1);
        ledger.record("user-1", 75.0, 3);

        let own = ledger.list_for_user("user-1");
        assert_eq!(own.len(), 2);
        // Newest first.
        assert!((own[0].price - 75.0).abs() < f64::EPSILON);
        assert!(ledger.list_for_user("user-3").is_empty());
    }
}
