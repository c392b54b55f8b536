use thiserror::Error;

/// Unified error type for the entire papertrade-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── API / Network ───────────────────────────────────────────────
    /// Non-2xx response. `message` is the server's `error` field verbatim,
    /// or `"Error: {status}"` when the body carried none.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    // ── Serialization ───────────────────────────────────────────────
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── Configuration ───────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("A trade is already being submitted")]
    TradeInFlight,

    #[error("Quote not available for {0}")]
    QuoteNotAvailable(String),

    #[error("Chart update rejected: {0}")]
    Chart(String),
}

impl CoreError {
    /// Build an API error from a status code and an optional server message.
    pub fn api(status: u16, message: Option<String>) -> Self {
        CoreError::Api {
            status,
            message: message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("Error: {status}")),
        }
    }

    /// The plain string shown next to the control that triggered the error.
    ///
    /// Server rejections pass through untouched; everything else uses the
    /// `Display` text.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status for API errors, `None` for everything else.
    pub fn status(&self) -> Option<u16> {
        match self {
            CoreError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Session tokens and symbols ride in query strings; keep them out of
        // anything that may end up in a log line.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
