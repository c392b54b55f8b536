use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

use crate::models::quote::Quote;

type Listener = Arc<dyn Fn(&Quote) + Send + Sync>;

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Quote>,
    listeners: HashMap<String, Vec<(u64, Listener)>>,
    next_listener_id: u64,
}

/// Most recent accepted quote per symbol, shared by every consumer.
///
/// Cloning is cheap and yields a handle to the same store. Create one per
/// application (or per test) and pass it to whoever needs it.
///
/// Acceptance rule: a write lands only if there is no entry for the symbol
/// or the cached timestamp is strictly older. Duplicates and out-of-order
/// quotes are dropped silently. Entries are never evicted.
#[derive(Clone, Default)]
pub struct QuoteCache {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for QuoteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("QuoteCache")
            .field("symbols", &inner.entries.len())
            .field(
                "listeners",
                &inner.listeners.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

impl QuoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store `quote` if it is newer than what is cached for its symbol.
    ///
    /// Returns whether the write was accepted. Subscribers of the symbol are
    /// called before this returns, once per accepted write, and outside the
    /// internal lock so they may read the cache themselves.
    pub fn write(&self, quote: Quote) -> bool {
        let listeners: Vec<Listener> = {
            let mut inner = self.lock();
            if let Some(existing) = inner.entries.get(&quote.symbol) {
                if !quote.is_newer_than(existing) {
                    trace!(
                        symbol = %quote.symbol,
                        cached = existing.timestamp,
                        incoming = quote.timestamp,
                        "stale quote dropped"
                    );
                    return false;
                }
            }
            let listeners = inner
                .listeners
                .get(&quote.symbol)
                .map(|ls| ls.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default();
            inner.entries.insert(quote.symbol.clone(), quote.clone());
            listeners
        };

        for listener in &listeners {
            listener(&quote);
        }
        true
    }

    /// The cached quote for `symbol`, if any has been accepted.
    pub fn read(&self, symbol: &str) -> Option<Quote> {
        self.lock().entries.get(symbol).cloned()
    }

    /// Cached quotes for the given symbols; absent symbols are left out.
    pub fn snapshot<'a, I>(&self, symbols: I) -> HashMap<String, Quote>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let inner = self.lock();
        symbols
            .into_iter()
            .filter_map(|s| inner.entries.get(s).map(|q| (s.to_string(), q.clone())))
            .collect()
    }

    /// Every symbol with a cached quote, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.lock().entries.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `callback` on every accepted write for `symbol` until the
    /// returned guard is dropped.
    pub fn subscribe<F>(&self, symbol: &str, callback: F) -> CacheSubscription
    where
        F: Fn(&Quote) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner
            .listeners
            .entry(symbol.to_string())
            .or_default()
            .push((id, Arc::new(callback)));
        CacheSubscription {
            cache: self.clone(),
            symbol: symbol.to_string(),
            id,
        }
    }

    /// Number of live subscriptions for `symbol`.
    pub fn subscriber_count(&self, symbol: &str) -> usize {
        self.lock().listeners.get(symbol).map_or(0, Vec::len)
    }

    fn unsubscribe(&self, symbol: &str, id: u64) {
        let mut inner = self.lock();
        if let Some(listeners) = inner.listeners.get_mut(symbol) {
            listeners.retain(|(lid, _)| *lid != id);
            if listeners.is_empty() {
                inner.listeners.remove(symbol);
            }
        }
    }
}

/// Keeps a cache listener registered; dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct CacheSubscription {
    cache: QuoteCache,
    symbol: String,
    id: u64,
}

impl CacheSubscription {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl Drop for CacheSubscription {
    fn drop(&mut self) {
        self.cache.unsubscribe(&self.symbol, self.id);
    }
}
