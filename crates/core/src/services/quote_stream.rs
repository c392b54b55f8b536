use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::api::sse::SseEvent;
use crate::api::traits::TradingApi;
use crate::models::quote::Quote;
use crate::models::settings::ReconnectPolicy;
use crate::services::quote_cache::QuoteCache;

/// Name of the push event carrying a JSON-encoded `Quote`.
pub const QUOTE_EVENT: &str = "quote";

/// Connectivity of one push subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    /// First connection attempt in progress
    Connecting,
    /// Connected and receiving
    Open,
    /// Connection failed or dropped. Stays set until the next successful open.
    Offline(String),
}

impl StreamStatus {
    pub fn is_offline(&self) -> bool {
        matches!(self, StreamStatus::Offline(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            StreamStatus::Offline(msg) => Some(msg),
            _ => None,
        }
    }
}

/// What happened to one pushed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Written to the cache
    Accepted,
    /// Valid, but not newer than the cached quote
    Stale,
    /// Not a quote event, or a quote for another symbol
    Ignored,
    /// Unparseable or invalid payload
    Malformed,
}

/// Opens live quote subscriptions that feed the shared `QuoteCache`.
#[derive(Clone)]
pub struct QuoteStream {
    api: Arc<dyn TradingApi>,
    cache: QuoteCache,
    policy: ReconnectPolicy,
    hydrate_fresh_for: Duration,
}

impl QuoteStream {
    pub fn new(
        api: Arc<dyn TradingApi>,
        cache: QuoteCache,
        policy: ReconnectPolicy,
        hydrate_fresh_for: Duration,
    ) -> Self {
        Self {
            api,
            cache,
            policy,
            hydrate_fresh_for,
        }
    }

    /// Start streaming `symbol`: a one-shot hydration fetch and the push
    /// connection run in parallel on the current tokio runtime.
    ///
    /// To switch symbols, drop the old subscription and subscribe again.
    pub fn subscribe(&self, symbol: &str) -> QuoteSubscription {
        let symbol = symbol.to_string();
        let (status_tx, status_rx) = watch::channel(StreamStatus::Connecting);

        let hydration = if self.needs_hydration(&symbol) {
            Some(tokio::spawn(hydrate(
                Arc::clone(&self.api),
                self.cache.clone(),
                symbol.clone(),
            )))
        } else {
            trace!(symbol = %symbol, "cached quote still fresh, skipping hydration");
            None
        };

        let push = tokio::spawn(run_push(
            Arc::clone(&self.api),
            self.cache.clone(),
            symbol.clone(),
            self.policy.clone(),
            status_tx,
        ));

        QuoteSubscription {
            symbol,
            cache: self.cache.clone(),
            status: status_rx,
            hydration,
            push,
        }
    }

    fn needs_hydration(&self, symbol: &str) -> bool {
        let Some(cached) = self.cache.read(symbol) else {
            return true;
        };
        let age = chrono::Utc::now().timestamp() - cached.timestamp;
        age < 0 || age as u64 >= self.hydrate_fresh_for.as_secs()
    }
}

/// A live subscription to one symbol.
///
/// Dropping it (or calling `close`) tears down the push connection and
/// abandons any in-flight hydration, so a late response can never land
/// after the consumer has moved on.
pub struct QuoteSubscription {
    symbol: String,
    cache: QuoteCache,
    status: watch::Receiver<StreamStatus>,
    hydration: Option<JoinHandle<()>>,
    push: JoinHandle<()>,
}

impl std::fmt::Debug for QuoteSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteSubscription")
            .field("symbol", &self.symbol)
            .field("status", &*self.status.borrow())
            .finish()
    }
}

impl QuoteSubscription {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Latest known quote. Stays available while offline (stale-but-present).
    pub fn latest(&self) -> Option<Quote> {
        self.cache.read(&self.symbol)
    }

    pub fn status(&self) -> StreamStatus {
        self.status.borrow().clone()
    }

    pub fn is_offline(&self) -> bool {
        self.status.borrow().is_offline()
    }

    /// Receiver that changes whenever connectivity does.
    pub fn watch_status(&self) -> watch::Receiver<StreamStatus> {
        self.status.clone()
    }

    /// Explicit teardown; equivalent to dropping.
    pub fn close(self) {}
}

impl Drop for QuoteSubscription {
    fn drop(&mut self) {
        if let Some(h) = self.hydration.take() {
            h.abort();
        }
        self.push.abort();
        debug!(symbol = %self.symbol, "quote subscription closed");
    }
}

async fn hydrate(api: Arc<dyn TradingApi>, cache: QuoteCache, symbol: String) {
    match api.get_quote(&symbol).await {
        Ok(quote) if quote.symbol != symbol => {
            debug!(
                requested = %symbol,
                received = %quote.symbol,
                "hydration response for another symbol discarded"
            );
        }
        Ok(quote) => match quote.validate() {
            Ok(()) => {
                cache.write(quote);
            }
            Err(e) => warn!(symbol = %symbol, "invalid hydration quote: {e}"),
        },
        Err(e) => warn!(symbol = %symbol, "quote hydration failed: {e}"),
    }
}

async fn run_push(
    api: Arc<dyn TradingApi>,
    cache: QuoteCache,
    symbol: String,
    policy: ReconnectPolicy,
    status: watch::Sender<StreamStatus>,
) {
    let mut failures: u32 = 0;

    loop {
        match api.open_quote_events(&symbol).await {
            Ok(mut source) => {
                failures = 0;
                info!(symbol = %symbol, "quote stream open");
                status.send_replace(StreamStatus::Open);

                let reason = loop {
                    match source.next_event().await {
                        Ok(Some(event)) => {
                            apply_event(&cache, &symbol, &event);
                        }
                        Ok(None) => break "stream closed by server".to_string(),
                        Err(e) => break e.user_message(),
                    }
                };
                warn!(symbol = %symbol, "quote stream dropped: {reason}");
                status.send_replace(StreamStatus::Offline(reason));
            }
            Err(e) => {
                error!(symbol = %symbol, "quote stream connection error: {e}");
                status.send_replace(StreamStatus::Offline(e.user_message()));
            }
        }

        if !policy.allows(failures) {
            warn!(symbol = %symbol, failures, "giving up on quote stream");
            return;
        }
        let delay = policy.delay_with_jitter(failures, jitter_sample());
        failures = failures.saturating_add(1);
        debug!(symbol = %symbol, ?delay, "reconnecting quote stream");
        tokio::time::sleep(delay).await;
    }
}

/// Parse one pushed event and write it to the cache if it is a valid,
/// newer quote for `symbol`. Bad payloads are logged and dropped.
pub fn apply_event(cache: &QuoteCache, symbol: &str, event: &SseEvent) -> EventOutcome {
    if event.event != QUOTE_EVENT {
        trace!(event = %event.event, "non-quote event ignored");
        return EventOutcome::Ignored;
    }

    let quote: Quote = match serde_json::from_str(&event.data) {
        Ok(q) => q,
        Err(e) => {
            warn!(symbol, "malformed quote payload dropped: {e}");
            return EventOutcome::Malformed;
        }
    };
    if let Err(e) = quote.validate() {
        warn!(symbol, "invalid quote dropped: {e}");
        return EventOutcome::Malformed;
    }
    if quote.symbol != symbol {
        debug!(expected = symbol, received = %quote.symbol, "quote for another symbol ignored");
        return EventOutcome::Ignored;
    }

    if cache.write(quote) {
        EventOutcome::Accepted
    } else {
        EventOutcome::Stale
    }
}

/// Uniform sample in `0.0..1.0` for backoff jitter; falls back to the
/// midpoint (no jitter) if the OS RNG is unavailable.
fn jitter_sample() -> f64 {
    let mut bytes = [0u8; 4];
    match getrandom::getrandom(&mut bytes) {
        Ok(()) => u32::from_le_bytes(bytes) as f64 / (u32::MAX as f64 + 1.0),
        Err(_) => 0.5,
    }
}
