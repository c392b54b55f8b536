// ═══════════════════════════════════════════════════════════════════
// Mock Trading API (for testing without a real backend)
// ═══════════════════════════════════════════════════════════════════

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use papertrade_core::api::sse::SseEvent;
use papertrade_core::api::traits::{QuoteEventSource, TradingApi};
use papertrade_core::errors::CoreError;
use papertrade_core::models::leaderboard::{LeaderboardEntry, LeaderboardPage, PublicConfig};
use papertrade_core::models::quote::Quote;
use papertrade_core::models::trade::{TradeAction, TradeRequest};
use papertrade_core::models::user::{
    Credentials, PortfolioItem, ProfileUpdate, Registration, User,
};

/// What one call to `open_quote_events` does.
pub enum Connection {
    /// Fail to connect with this error
    Refuse(CoreError),
    /// Deliver these events, then keep the connection open forever
    Events(Vec<SseEvent>),
    /// Deliver these events, then fail with this error
    EventsThenError(Vec<SseEvent>, CoreError),
}

#[derive(Default)]
pub struct MockTradingApi {
    pub quotes: Mutex<HashMap<String, Quote>>,
    pub history: Mutex<HashMap<String, Vec<Quote>>>,
    pub tickers: Mutex<Vec<String>>,
    pub user: Mutex<Option<User>>,
    pub trade_result: Mutex<Option<Result<User, CoreError>>>,
    pub connections: Mutex<VecDeque<Connection>>,
    pub trade_gate: Mutex<Option<Arc<Notify>>>,
    pub leaderboard: Mutex<LeaderboardPage>,
    pub fail_history: Mutex<bool>,

    pub quote_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    pub config_calls: AtomicUsize,
    pub trade_calls: AtomicUsize,
    pub open_calls: AtomicUsize,
    pub last_trade: Mutex<Option<TradeRequest>>,
}

impl MockTradingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(self, quote: Quote) -> Self {
        self.quotes
            .lock()
            .unwrap()
            .insert(quote.symbol.clone(), quote);
        self
    }

    pub fn with_history(self, symbol: &str, quotes: Vec<Quote>) -> Self {
        self.history
            .lock()
            .unwrap()
            .insert(symbol.to_string(), quotes);
        self
    }

    pub fn with_tickers(self, tickers: &[&str]) -> Self {
        *self.tickers.lock().unwrap() = tickers.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_user(self, user: User) -> Self {
        *self.user.lock().unwrap() = Some(user);
        self
    }

    pub fn with_trade_result(self, result: Result<User, CoreError>) -> Self {
        *self.trade_result.lock().unwrap() = Some(result);
        self
    }

    pub fn with_connection(self, connection: Connection) -> Self {
        self.connections.lock().unwrap().push_back(connection);
        self
    }

    pub fn trades(&self) -> usize {
        self.trade_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TradingApi for MockTradingApi {
    async fn get_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.quotes
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| CoreError::api(404, Some(format!("no quote for {symbol}"))))
    }

    async fn get_history(&self, symbol: &str, limit: usize) -> Result<Vec<Quote>, CoreError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_history.lock().unwrap() {
            return Err(CoreError::api(500, None));
        }
        let all = self
            .history
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .unwrap_or_default();
        let skip = all.len().saturating_sub(limit);
        Ok(all.into_iter().skip(skip).collect())
    }

    async fn get_config(&self) -> Result<PublicConfig, CoreError> {
        self.config_calls.fetch_add(1, Ordering::SeqCst);
        Ok(PublicConfig {
            tickers: self.tickers.lock().unwrap().clone(),
        })
    }

    async fn get_me(&self) -> Result<User, CoreError> {
        self.user
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CoreError::api(401, Some("Unauthorized".into())))
    }

    async fn update_me(&self, update: &ProfileUpdate) -> Result<User, CoreError> {
        let mut guard = self.user.lock().unwrap();
        let user = guard
            .as_mut()
            .ok_or_else(|| CoreError::api(401, Some("Unauthorized".into())))?;
        user.first_name = update.first_name.clone();
        user.last_name = update.last_name.clone();
        user.website = update.website.clone();
        user.is_public = update.is_public;
        Ok(user.clone())
    }

    async fn trade(&self, request: &TradeRequest) -> Result<User, CoreError> {
        self.trade_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_trade.lock().unwrap() = Some(request.clone());
        let gate = self.trade_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.trade_result.lock().unwrap().take() {
            Some(result) => result,
            None => Err(CoreError::api(500, None)),
        }
    }

    async fn login(&self, credentials: &Credentials) -> Result<User, CoreError> {
        if credentials.password != "correct-horse" {
            return Err(CoreError::api(401, Some("Invalid credentials".into())));
        }
        let user = self
            .user
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| user_with(10_000.0, &[]));
        Ok(user)
    }

    async fn logout(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn register(&self, registration: &Registration) -> Result<User, CoreError> {
        let mut user = user_with(10_000.0, &[]);
        user.email = Some(registration.email.clone());
        user.first_name = registration.first_name.clone();
        user.last_name = registration.last_name.clone();
        Ok(user)
    }

    async fn get_leaderboard(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<LeaderboardPage, CoreError> {
        let page = self.leaderboard.lock().unwrap().clone();
        Ok(LeaderboardPage {
            entries: page
                .entries
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
            last_update: page.last_update,
        })
    }

    async fn get_public_profile(&self, username: &str) -> Result<User, CoreError> {
        if username == "ghost" {
            return Err(CoreError::api(404, Some("user not found".into())));
        }
        let mut user = user_with(5_000.0, &[("AAPL", 1.0, 100.0)]);
        user.username = Some(username.to_string());
        user.is_public = true;
        Ok(user)
    }

    async fn open_quote_events(
        &self,
        _symbol: &str,
    ) -> Result<Box<dyn QuoteEventSource>, CoreError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.connections.lock().unwrap().pop_front();
        match next {
            Some(Connection::Refuse(e)) => Err(e),
            Some(Connection::Events(events)) => Ok(Box::new(ScriptedSource {
                events: events.into(),
                end: None,
            })),
            Some(Connection::EventsThenError(events, e)) => Ok(Box::new(ScriptedSource {
                events: events.into(),
                end: Some(e),
            })),
            None => Ok(Box::new(ScriptedSource {
                events: VecDeque::new(),
                end: None,
            })),
        }
    }
}

struct ScriptedSource {
    events: VecDeque<SseEvent>,
    end: Option<CoreError>,
}

#[async_trait]
impl QuoteEventSource for ScriptedSource {
    async fn next_event(&mut self) -> Result<Option<SseEvent>, CoreError> {
        if let Some(e) = self.events.pop_front() {
            return Ok(Some(e));
        }
        match self.end.take() {
            Some(err) => Err(err),
            None => std::future::pending().await,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Builders
// ═══════════════════════════════════════════════════════════════════

pub fn quote(symbol: &str, price: f64, timestamp: i64) -> Quote {
    Quote::new(symbol, price, timestamp)
}

pub fn quote_event(symbol: &str, price: f64, timestamp: i64) -> SseEvent {
    let q = quote(symbol, price, timestamp);
    SseEvent::new("quote", serde_json::to_string(&q).unwrap())
}

pub fn item(symbol: &str, quantity: f64, average_price: f64) -> PortfolioItem {
    PortfolioItem {
        stock_symbol: symbol.to_string(),
        quantity,
        average_price,
    }
}

pub fn portfolio(items: &[(&str, f64, f64)]) -> BTreeMap<String, PortfolioItem> {
    items
        .iter()
        .map(|(s, q, p)| (s.to_string(), item(s, *q, *p)))
        .collect()
}

pub fn user_with(balance: f64, items: &[(&str, f64, f64)]) -> User {
    User {
        id: Some(1),
        username: Some("trader".into()),
        email: Some("trader@example.com".into()),
        first_name: "Test".into(),
        last_name: "Trader".into(),
        website: None,
        is_public: false,
        balance,
        portfolio: portfolio(items),
        created_at: None,
    }
}

pub fn leaderboard_entry(rank: u32, name: &str, net_worth: f64) -> LeaderboardEntry {
    LeaderboardEntry {
        rank,
        user_id: rank as i64,
        username: Some(name.to_lowercase()),
        first_name: name.to_string(),
        last_name: "Doe".into(),
        total_net_worth: net_worth,
    }
}

pub fn buy() -> TradeAction {
    TradeAction::Buy
}
