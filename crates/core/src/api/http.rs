use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::leaderboard::{LeaderboardPage, PublicConfig};
use crate::models::quote::Quote;
use crate::models::settings::ClientConfig;
use crate::models::trade::TradeRequest;
use crate::models::user::{Credentials, ProfileUpdate, Registration, User};

use super::sse::{SseDecoder, SseEvent};
use super::traits::{QuoteEventSource, TradingApi};

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// REST/SSE client for the paper-trading backend.
///
/// - **Auth**: session cookie set by `/login` or `/register`, kept in a
///   cookie jar shared by both inner clients.
/// - **Errors**: non-2xx bodies look like `{ "error": "..." }`; the message
///   is passed through verbatim, else `"Error: {status}"`.
/// - **Push**: `/quotes/events` is read on a client without a request
///   timeout, since the connection is meant to stay open.
pub struct HttpTradingApi {
    client: Client,
    stream_client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl HttpTradingApi {
    pub fn new(config: &ClientConfig) -> Result<Self, CoreError> {
        let jar = Arc::new(Jar::default());

        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(config.request_timeout())
            .build()?;

        let stream_client = Client::builder()
            .cookie_provider(jar)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            stream_client,
            base_url: config.base_url().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base}/users/{username}` with the name percent-encoded as one segment.
    fn profile_url(&self, username: &str) -> Result<Url, CoreError> {
        let mut url = Url::parse(&self.url("/users"))
            .map_err(|e| CoreError::Config(format!("invalid api_url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| CoreError::Config("api_url cannot be a base URL".into()))?
            .push(username);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CoreError> {
        let resp = check_status(request.send().await?).await?;
        resp.json::<T>()
            .await
            .map_err(|e| CoreError::Deserialization(e.to_string()))
    }
}

/// Turn a non-2xx response into `CoreError::Api`, passing 2xx through.
async fn check_status(resp: Response) -> Result<Response, CoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error);
    Err(CoreError::api(status.as_u16(), message))
}

#[async_trait]
impl TradingApi for HttpTradingApi {
    async fn get_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let req = self
            .client
            .get(self.url("/quote"))
            .query(&[("symbol", symbol)]);
        self.send(req).await
    }

    async fn get_history(&self, symbol: &str, limit: usize) -> Result<Vec<Quote>, CoreError> {
        let req = self
            .client
            .get(self.url("/history"))
            .query(&[("symbol", symbol.to_string()), ("limit", limit.to_string())]);
        self.send(req).await
    }

    async fn get_config(&self) -> Result<PublicConfig, CoreError> {
        self.send(self.client.get(self.url("/config"))).await
    }

    async fn get_me(&self) -> Result<User, CoreError> {
        self.send(self.client.get(self.url("/user/me"))).await
    }

    async fn update_me(&self, update: &ProfileUpdate) -> Result<User, CoreError> {
        self.send(self.client.put(self.url("/user/me")).json(update))
            .await
    }

    async fn trade(&self, request: &TradeRequest) -> Result<User, CoreError> {
        let req = self
            .client
            .post(self.url(request.action.path()))
            .header(IDEMPOTENCY_HEADER, request.request_id.to_string())
            .json(&request.body());
        self.send(req).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<User, CoreError> {
        self.send(self.client.post(self.url("/login")).json(credentials))
            .await
    }

    async fn logout(&self) -> Result<(), CoreError> {
        check_status(self.client.post(self.url("/logout")).send().await?).await?;
        Ok(())
    }

    async fn register(&self, registration: &Registration) -> Result<User, CoreError> {
        self.send(self.client.post(self.url("/register")).json(registration))
            .await
    }

    async fn get_leaderboard(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<LeaderboardPage, CoreError> {
        let req = self
            .client
            .get(self.url("/leaderboard"))
            .query(&[("limit", limit), ("offset", offset)]);
        self.send(req).await
    }

    async fn get_public_profile(&self, username: &str) -> Result<User, CoreError> {
        let url = self.profile_url(username)?;
        self.send(self.client.get(url)).await
    }

    async fn open_quote_events(
        &self,
        symbol: &str,
    ) -> Result<Box<dyn QuoteEventSource>, CoreError> {
        let resp = self
            .stream_client
            .get(self.url("/quotes/events"))
            .query(&[("symbol", symbol)])
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check_status(resp).await?;
        debug!(symbol, "push channel opened");
        Ok(Box::new(HttpEventSource {
            response,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        }))
    }
}

struct HttpEventSource {
    response: Response,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
}

#[async_trait]
impl QuoteEventSource for HttpEventSource {
    async fn next_event(&mut self) -> Result<Option<SseEvent>, CoreError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            match self.response.chunk().await? {
                Some(bytes) => self.pending.extend(self.decoder.push(&bytes)),
                None => return Ok(None),
            }
        }
    }
}
