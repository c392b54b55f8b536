use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::traits::TradingApi;
use crate::errors::CoreError;
use crate::models::trade::{TradeAction, TradeRequest};
use crate::models::user::User;
use crate::services::session::UserSession;

/// Sends buy/sell orders for one trade panel.
///
/// The backend decides affordability and position limits; the client only
/// rejects obviously invalid input and never edits the user record itself.
/// One order may be in flight per instance (a UI-level guard, not
/// server-side idempotency).
pub struct TradeService {
    api: Arc<dyn TradingApi>,
    session: UserSession,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TradeService {
    pub fn new(api: Arc<dyn TradingApi>, session: UserSession) -> Self {
        Self {
            api,
            session,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a submission is pending (disable the buttons while true).
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Validate locally, then send. On success the session's user is
    /// replaced with the server response and `on_success` runs; on failure
    /// nothing changes and the server's message comes back verbatim.
    pub async fn submit<F>(
        &self,
        action: TradeAction,
        symbol: &str,
        quantity: f64,
        on_success: F,
    ) -> Result<User, CoreError>
    where
        F: FnOnce(&User),
    {
        validate_order(symbol, quantity)?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CoreError::TradeInFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let request = TradeRequest::new(action, symbol, quantity);
        info!(
            action = %request.action,
            symbol,
            quantity,
            request_id = %request.request_id,
            "submitting order"
        );

        match self.api.trade(&request).await {
            Ok(user) => {
                self.session.replace(user.clone());
                on_success(&user);
                Ok(user)
            }
            Err(e) => {
                warn!(action = %action, symbol, "order rejected: {e}");
                Err(e)
            }
        }
    }
}

/// Local checks that never need the network.
pub fn validate_order(symbol: &str, quantity: f64) -> Result<(), CoreError> {
    if symbol.trim().is_empty() {
        return Err(CoreError::ValidationError("No active ticker selected".into()));
    }
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(CoreError::ValidationError("Quantity must be positive".into()));
    }
    Ok(())
}
