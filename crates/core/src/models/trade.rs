use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    /// Backend path for this action.
    pub fn path(&self) -> &'static str {
        match self {
            TradeAction::Buy => "/buy",
            TradeAction::Sell => "/sell",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

/// A single order, built at submission time and dropped once the call resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRequest {
    pub action: TradeAction,
    pub symbol: String,
    pub quantity: f64,

    /// Sent as `Idempotency-Key`; a fresh id per submission
    pub request_id: Uuid,
}

impl TradeRequest {
    pub fn new(action: TradeAction, symbol: impl Into<String>, quantity: f64) -> Self {
        Self {
            action,
            symbol: symbol.into(),
            quantity,
            request_id: Uuid::new_v4(),
        }
    }

    /// JSON body for `POST /buy` and `POST /sell`.
    pub fn body(&self) -> TradeBody<'_> {
        TradeBody {
            symbol: &self.symbol,
            quantity: self.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TradeBody<'a> {
    pub symbol: &'a str,
    pub quantity: f64,
}
