use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::CoreError;

/// One open position, exactly as the server last reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioItem {
    pub stock_symbol: String,
    pub quantity: f64,
    pub average_price: f64,
}

impl PortfolioItem {
    /// Cost basis: quantity × average price.
    pub fn cost_basis(&self) -> f64 {
        self.quantity * self.average_price
    }
}

/// The authenticated user (or a public view of another user).
///
/// The client never edits this in place: every server response replaces
/// the whole record, which keeps `balance` and `portfolio` consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    #[serde(default)]
    pub website: Option<String>,

    #[serde(default)]
    pub is_public: bool,

    /// Cash buying power
    #[serde(default)]
    pub balance: f64,

    /// Open positions keyed by symbol (one entry per symbol)
    #[serde(default)]
    pub portfolio: BTreeMap<String, PortfolioItem>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn position(&self, symbol: &str) -> Option<&PortfolioItem> {
        self.portfolio.get(symbol)
    }

    /// Quantity held for `symbol`, 0 when there is no position.
    pub fn position_quantity(&self, symbol: &str) -> f64 {
        self.position(symbol).map(|p| p.quantity).unwrap_or(0.0)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Body of `PUT /user/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub website: Option<String>,
    pub is_public: bool,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "first name and last name are required".into(),
            ));
        }
        Ok(())
    }
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

/// Body of `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl Registration {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        if self.first_name.trim().is_empty() {
            return Err(CoreError::ValidationError("First name is required".into()));
        }
        if self.last_name.trim().is_empty() {
            return Err(CoreError::ValidationError("Last name is required".into()));
        }
        Ok(())
    }
}

const MIN_PASSWORD_LEN: usize = 8;

fn validate_email(email: &str) -> Result<(), CoreError> {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(CoreError::ValidationError("Invalid email address".into())),
    }
}

fn validate_password(password: &str) -> Result<(), CoreError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::ValidationError(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}
