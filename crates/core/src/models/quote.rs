use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::CoreError;

/// A timestamped price observation for one symbol.
///
/// Produced by the backend feed and never mutated once received. Ordering
/// between quotes of the same symbol is by `timestamp` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker as the backend knows it, possibly source-tagged (`CG:bitcoin`)
    pub symbol: String,

    /// Last traded price, always > 0
    pub price: f64,

    /// Seconds since the Unix epoch
    pub timestamp: i64,

    /// True while the instrument's market is closed (trading disabled)
    #[serde(default)]
    pub is_closed: bool,

    /// Data source tag reported by the backend, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Quote {
    pub fn new(symbol: impl Into<String>, price: f64, timestamp: i64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp,
            is_closed: false,
            source: None,
        }
    }

    /// Strictly newer than `other`. Equal timestamps are not newer.
    pub fn is_newer_than(&self, other: &Quote) -> bool {
        self.timestamp > other.timestamp
    }

    /// Reject payloads that parse as JSON but cannot be a real quote.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.symbol.trim().is_empty() {
            return Err(CoreError::ValidationError("quote has no symbol".into()));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "quote for {} has invalid price {}",
                self.symbol, self.price
            )));
        }
        Ok(())
    }

    /// The quote time as a UTC datetime, `None` if out of chrono's range.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    /// Parsed ticker (source tag + bare symbol).
    pub fn ticker(&self) -> Ticker {
        Ticker::parse(&self.symbol)
    }
}

/// Where a ticker's prices come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TickerSource {
    /// Finnhub (stocks). Untagged symbols default here.
    #[serde(rename = "FH")]
    Finnhub,
    /// CoinGecko (crypto)
    #[serde(rename = "CG")]
    CoinGecko,
}

impl TickerSource {
    pub fn tag(&self) -> &'static str {
        match self {
            TickerSource::Finnhub => "FH",
            TickerSource::CoinGecko => "CG",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TickerSource::Finnhub => "Finnhub",
            TickerSource::CoinGecko => "CoinGecko",
        }
    }
}

impl fmt::Display for TickerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A symbol split into its source tag and bare name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticker {
    pub source: TickerSource,
    pub symbol: String,
}

impl Ticker {
    /// `"CG:bitcoin"` → CoinGecko/`bitcoin`, `"FH:AAPL"` or `"AAPL"` → Finnhub/`AAPL`.
    ///
    /// Unknown prefixes (e.g. exchange tags like `BINANCE:BTCUSDT`) are kept
    /// as part of the symbol.
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix("CG:") {
            return Self {
                source: TickerSource::CoinGecko,
                symbol: rest.to_string(),
            };
        }
        if let Some(rest) = raw.strip_prefix("FH:") {
            return Self {
                source: TickerSource::Finnhub,
                symbol: rest.to_string(),
            };
        }
        Self {
            source: TickerSource::Finnhub,
            symbol: raw.to_string(),
        }
    }

    pub fn display_symbol(&self) -> String {
        self.symbol.to_uppercase()
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.symbol)
    }
}
