pub mod api;
pub mod errors;
pub mod models;
pub mod services;

use std::sync::Arc;

use api::http::HttpTradingApi;
use api::traits::TradingApi;
use errors::CoreError;
use models::{
    leaderboard::LeaderboardPage,
    quote::Quote,
    settings::ClientConfig,
    trade::TradeAction,
    user::{Credentials, ProfileUpdate, Registration, User},
};
use services::{
    chart_sync::{ChartFeed, ChartSeries, ChartSynchronizer},
    history_loader::HistoryLoader,
    quote_cache::QuoteCache,
    quote_stream::{QuoteStream, QuoteSubscription},
    session::UserSession,
    ticker_service::TickerService,
    trade_service::TradeService,
    valuation::{self, PortfolioValuation},
};

/// Main entry point for the paper-trading client core.
/// Holds the shared quote cache, the user session and every service built
/// on them.
#[must_use]
pub struct PaperTrader {
    config: ClientConfig,
    api: Arc<dyn TradingApi>,
    cache: QuoteCache,
    session: UserSession,
    stream: QuoteStream,
    history: HistoryLoader,
    trades: TradeService,
    tickers: TickerService,
}

impl std::fmt::Debug for PaperTrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaperTrader")
            .field("api_url", &self.config.api_url)
            .field("cached_quotes", &self.cache.len())
            .field("authenticated", &self.session.is_authenticated())
            .finish()
    }
}

impl PaperTrader {
    /// Connect to the backend described by `config` over HTTP.
    pub fn connect(config: ClientConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let api = Arc::new(HttpTradingApi::new(&config)?);
        Ok(Self::with_api(config, api))
    }

    /// Build on any backend implementation (tests, alternative transports).
    pub fn with_api(config: ClientConfig, api: Arc<dyn TradingApi>) -> Self {
        let cache = QuoteCache::new();
        let session = UserSession::new(Arc::clone(&api));
        let stream = QuoteStream::new(
            Arc::clone(&api),
            cache.clone(),
            config.reconnect.clone(),
            config.quote_stale_after(),
        );
        let history = HistoryLoader::new(Arc::clone(&api), config.history_stale_after());
        let trades = TradeService::new(Arc::clone(&api), session.clone());
        let tickers = TickerService::new(Arc::clone(&api));
        Self {
            config,
            api,
            cache,
            session,
            stream,
            history,
            trades,
            tickers,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The shared quote cache (one per `PaperTrader`).
    pub fn quote_cache(&self) -> &QuoteCache {
        &self.cache
    }

    pub fn session(&self) -> &UserSession {
        &self.session
    }

    // ── Quotes ──────────────────────────────────────────────────────

    /// Start a live subscription for `symbol`. Must be called inside a
    /// tokio runtime. Drop the handle to close it.
    pub fn subscribe_quotes(&self, symbol: &str) -> QuoteSubscription {
        self.stream.subscribe(symbol)
    }

    #[must_use]
    pub fn latest_quote(&self, symbol: &str) -> Option<Quote> {
        self.cache.read(symbol)
    }

    /// Latest cached quote, or `QuoteNotAvailable` until one has arrived.
    pub fn require_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        self.cache
            .read(symbol)
            .ok_or_else(|| CoreError::QuoteNotAvailable(symbol.to_string()))
    }

    /// Fetch the current quote once and write it through the cache.
    pub async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let quote = self.api.get_quote(symbol).await?;
        quote.validate()?;
        self.cache.write(quote.clone());
        Ok(self.cache.read(symbol).unwrap_or(quote))
    }

    // ── Chart ───────────────────────────────────────────────────────

    /// History for the chart, using the configured limit. Empty on failure.
    pub async fn load_history(&self, symbol: &str) -> Vec<Quote> {
        self.history.load(symbol, self.config.history_limit).await
    }

    pub fn history_loader(&self) -> &HistoryLoader {
        &self.history
    }

    /// Switch `chart` to `symbol` and return a feed of live quotes for it.
    /// The feed is subscribed before seeding, so no tick is lost in between.
    pub async fn activate_chart<S: ChartSeries>(
        &self,
        chart: &mut ChartSynchronizer<S>,
        symbol: &str,
    ) -> ChartFeed {
        let mut feed = ChartFeed::new(&self.cache, symbol);
        chart
            .activate(symbol, &self.history, self.config.history_limit)
            .await;
        if let Some(quote) = self.cache.read(symbol) {
            chart.apply_quote(&quote);
        }
        chart.drain(&mut feed);
        feed
    }

    // ── Portfolio ───────────────────────────────────────────────────

    /// Value the current user's holdings against cached quotes.
    /// `None` when logged out.
    #[must_use]
    pub fn portfolio_valuation(&self) -> Option<PortfolioValuation> {
        let user = self.session.current()?;
        let quotes = self
            .cache
            .snapshot(user.portfolio.keys().map(String::as_str));
        Some(valuation::value_portfolio(&user.portfolio, &quotes))
    }

    /// Quantity string for the MAX / percentage buttons of the trade panel.
    /// `"0.000000"` until a quote for `symbol` is known.
    #[must_use]
    pub fn max_affordable_quantity(&self, symbol: &str, fraction: f64) -> String {
        let price = self.cache.read(symbol).map_or(0.0, |q| q.price);
        valuation::max_affordable_quantity(self.session.balance(), price, fraction)
    }

    // ── Trading ─────────────────────────────────────────────────────

    pub async fn submit_trade<F>(
        &self,
        action: TradeAction,
        symbol: &str,
        quantity: f64,
        on_success: F,
    ) -> Result<User, CoreError>
    where
        F: FnOnce(&User),
    {
        self.trades.submit(action, symbol, quantity, on_success).await
    }

    pub fn is_submitting_trade(&self) -> bool {
        self.trades.is_submitting()
    }

    // ── Account ─────────────────────────────────────────────────────

    pub async fn login(&self, credentials: &Credentials) -> Result<User, CoreError> {
        self.session.login(credentials).await
    }

    pub async fn register(&self, registration: &Registration) -> Result<User, CoreError> {
        self.session.register(registration).await
    }

    pub async fn logout(&self) -> Result<(), CoreError> {
        self.session.logout().await
    }

    pub async fn refresh_user(&self) -> Result<User, CoreError> {
        self.session.refresh().await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, CoreError> {
        self.session.update_profile(update).await
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.session.current()
    }

    // ── Community ───────────────────────────────────────────────────

    pub async fn leaderboard(&self, limit: u32, offset: u32) -> Result<LeaderboardPage, CoreError> {
        self.api.get_leaderboard(limit, offset).await
    }

    pub async fn public_profile(&self, username: &str) -> Result<User, CoreError> {
        if username.trim().is_empty() {
            return Err(CoreError::ValidationError("username is required".into()));
        }
        self.api.get_public_profile(username).await
    }

    // ── Tickers ─────────────────────────────────────────────────────

    pub async fn tickers(&self) -> Result<Vec<String>, CoreError> {
        Ok(self.tickers.tickers().await?.to_vec())
    }

    /// The requested ticker if configured, else the first configured one.
    pub async fn resolve_ticker(&self, requested: Option<&str>) -> Result<Option<String>, CoreError> {
        self.tickers.resolve(requested).await
    }
}
