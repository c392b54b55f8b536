use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::traits::TradingApi;
use crate::models::quote::Quote;

struct CachedHistory {
    fetched_at: Instant,
    quotes: Vec<Quote>,
}

/// Loads the bounded quote backlog that seeds a chart.
///
/// One request per `(symbol, limit)` until `stale_after` elapses. Failures
/// are never cached and never surfaced: the caller gets an empty history and
/// renders an empty chart.
pub struct HistoryLoader {
    api: Arc<dyn TradingApi>,
    stale_after: Duration,
    cache: Mutex<HashMap<(String, usize), CachedHistory>>,
}

impl HistoryLoader {
    pub fn new(api: Arc<dyn TradingApi>, stale_after: Duration) -> Self {
        Self {
            api,
            stale_after,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Up to `limit` most recent quotes for `symbol`, ascending by timestamp.
    pub async fn load(&self, symbol: &str, limit: usize) -> Vec<Quote> {
        if limit == 0 || symbol.is_empty() {
            return Vec::new();
        }

        let key = (symbol.to_string(), limit);
        {
            let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = cache.get(&key) {
                if entry.fetched_at.elapsed() < self.stale_after {
                    return entry.quotes.clone();
                }
            }
        }

        let quotes = match self.api.get_history(symbol, limit).await {
            Ok(raw) => normalize(symbol, raw, limit),
            Err(e) => {
                warn!(symbol, "history fetch failed, rendering empty chart: {e}");
                return Vec::new();
            }
        };
        debug!(symbol, points = quotes.len(), "history loaded");

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(
            key,
            CachedHistory {
                fetched_at: Instant::now(),
                quotes: quotes.clone(),
            },
        );
        quotes
    }

    /// Force the next `load` for `symbol` to hit the backend.
    pub fn invalidate(&self, symbol: &str) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.retain(|(s, _), _| s != symbol);
    }
}

/// Keep valid quotes for `symbol`, sort ascending, drop duplicate
/// timestamps, and trim to the newest `limit`.
fn normalize(symbol: &str, mut quotes: Vec<Quote>, limit: usize) -> Vec<Quote> {
    quotes.retain(|q| q.symbol == symbol && q.validate().is_ok());
    quotes.sort_by_key(|q| q.timestamp);
    quotes.dedup_by_key(|q| q.timestamp);
    if quotes.len() > limit {
        quotes.drain(..quotes.len() - limit);
    }
    quotes
}
