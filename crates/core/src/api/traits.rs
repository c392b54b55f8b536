use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::leaderboard::{LeaderboardPage, PublicConfig};
use crate::models::quote::Quote;
use crate::models::trade::TradeRequest;
use crate::models::user::{Credentials, ProfileUpdate, Registration, User};

use super::sse::SseEvent;

/// Trait abstraction over the paper-trading backend.
///
/// `HttpTradingApi` talks to the real REST/SSE server; tests plug in an
/// in-memory implementation. Services only ever see this trait.
#[async_trait]
pub trait TradingApi: Send + Sync {
    /// `GET /quote?symbol=`: current quote, used to hydrate before the push
    /// channel delivers its first message.
    async fn get_quote(&self, symbol: &str) -> Result<Quote, CoreError>;

    /// `GET /history?symbol=&limit=`: up to `limit` most recent quotes.
    async fn get_history(&self, symbol: &str, limit: usize) -> Result<Vec<Quote>, CoreError>;

    /// `GET /config`: the configured ticker universe.
    async fn get_config(&self) -> Result<PublicConfig, CoreError>;

    /// `GET /user/me`
    async fn get_me(&self) -> Result<User, CoreError>;

    /// `PUT /user/me`
    async fn update_me(&self, update: &ProfileUpdate) -> Result<User, CoreError>;

    /// `POST /buy` or `POST /sell`, depending on the request's action.
    /// Returns the full updated user record.
    async fn trade(&self, request: &TradeRequest) -> Result<User, CoreError>;

    /// `POST /login`
    async fn login(&self, credentials: &Credentials) -> Result<User, CoreError>;

    /// `POST /logout`
    async fn logout(&self) -> Result<(), CoreError>;

    /// `POST /register`
    async fn register(&self, registration: &Registration) -> Result<User, CoreError>;

    /// `GET /leaderboard?limit=&offset=`
    async fn get_leaderboard(&self, limit: u32, offset: u32)
        -> Result<LeaderboardPage, CoreError>;

    /// `GET /users/{username}`: public view of another trader.
    async fn get_public_profile(&self, username: &str) -> Result<User, CoreError>;

    /// `GET /quotes/events?symbol=`: opens the server-push channel.
    async fn open_quote_events(
        &self,
        symbol: &str,
    ) -> Result<Box<dyn QuoteEventSource>, CoreError>;
}

/// An open server-push connection.
///
/// Dropping it closes the underlying connection.
#[async_trait]
pub trait QuoteEventSource: Send {
    /// Wait for the next event. `Ok(None)` means the server ended the stream.
    async fn next_event(&mut self) -> Result<Option<SseEvent>, CoreError>;
}
