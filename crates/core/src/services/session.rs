use std::sync::{Arc, RwLock};
use tracing::info;

use crate::api::traits::TradingApi;
use crate::errors::CoreError;
use crate::models::user::{Credentials, PortfolioItem, ProfileUpdate, Registration, User};

/// The authenticated user's record as last returned by the server.
///
/// The record is only ever replaced whole, never merged, so cash and
/// positions cannot drift apart.
#[derive(Clone)]
pub struct UserSession {
    api: Arc<dyn TradingApi>,
    user: Arc<RwLock<Option<User>>>,
}

impl UserSession {
    pub fn new(api: Arc<dyn TradingApi>) -> Self {
        Self {
            api,
            user: Arc::new(RwLock::new(None)),
        }
    }

    /// Snapshot of the current user, `None` when logged out.
    pub fn current(&self) -> Option<User> {
        self.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Cash buying power; 0 when logged out.
    pub fn balance(&self) -> f64 {
        self.user
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(0.0, |u| u.balance)
    }

    pub fn position(&self, symbol: &str) -> Option<PortfolioItem> {
        self.user
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .and_then(|u| u.position(symbol).cloned())
    }

    /// Swap in a fresh server record.
    pub fn replace(&self, user: User) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = Some(user);
    }

    pub fn clear(&self) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<User, CoreError> {
        credentials.validate()?;
        let user = self.api.login(credentials).await?;
        info!(email = %credentials.email, "logged in");
        self.replace(user.clone());
        Ok(user)
    }

    pub async fn register(&self, registration: &Registration) -> Result<User, CoreError> {
        registration.validate()?;
        let user = self.api.register(registration).await?;
        info!(email = %registration.email, "registered");
        self.replace(user.clone());
        Ok(user)
    }

    /// Clears the local record even if the server call fails.
    pub async fn logout(&self) -> Result<(), CoreError> {
        let result = self.api.logout().await;
        self.clear();
        result
    }

    /// Re-read `GET /user/me`. A 401 clears the session.
    pub async fn refresh(&self) -> Result<User, CoreError> {
        match self.api.get_me().await {
            Ok(user) => {
                self.replace(user.clone());
                Ok(user)
            }
            Err(e) if e.status() == Some(401) => {
                self.clear();
                Err(CoreError::NotAuthenticated)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, CoreError> {
        if !self.is_authenticated() {
            return Err(CoreError::NotAuthenticated);
        }
        update.validate()?;
        let user = self.api.update_me(update).await?;
        self.replace(user.clone());
        Ok(user)
    }
}
