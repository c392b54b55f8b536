use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::api::traits::TradingApi;
use crate::errors::CoreError;

/// The configured ticker universe (`GET /config`), fetched once.
pub struct TickerService {
    api: Arc<dyn TradingApi>,
    tickers: OnceCell<Vec<String>>,
}

impl TickerService {
    pub fn new(api: Arc<dyn TradingApi>) -> Self {
        Self {
            api,
            tickers: OnceCell::new(),
        }
    }

    /// All tradable tickers, in server order. A failed fetch is retried on
    /// the next call.
    pub async fn tickers(&self) -> Result<&[String], CoreError> {
        let tickers = self
            .tickers
            .get_or_try_init(|| async { Ok::<_, CoreError>(self.api.get_config().await?.tickers) })
            .await?;
        Ok(tickers.as_slice())
    }

    /// The requested ticker if it is configured, else the first configured
    /// one, else `None`.
    pub async fn resolve(&self, requested: Option<&str>) -> Result<Option<String>, CoreError> {
        Ok(resolve_ticker(self.tickers().await?, requested))
    }

    pub async fn is_valid(&self, symbol: &str) -> Result<bool, CoreError> {
        Ok(self.tickers().await?.iter().any(|t| t == symbol))
    }
}

/// Pick `requested` when it is in `tickers`, otherwise fall back to the first.
pub fn resolve_ticker(tickers: &[String], requested: Option<&str>) -> Option<String> {
    match requested {
        Some(r) if tickers.iter().any(|t| t == r) => Some(r.to_string()),
        _ => tickers.first().cloned(),
    }
}
