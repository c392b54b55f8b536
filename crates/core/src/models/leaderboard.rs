use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ranked trader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub total_net_worth: f64,
}

/// A page of `GET /leaderboard`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardPage {
    #[serde(default)]
    pub entries: Vec<LeaderboardEntry>,

    /// Seconds since the epoch of the last server-side recomputation (0 = never)
    #[serde(default)]
    pub last_update: i64,
}

impl LeaderboardPage {
    /// When the board was last recomputed, `None` if it never was.
    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        if self.last_update <= 0 {
            return None;
        }
        DateTime::from_timestamp(self.last_update, 0)
    }
}

/// `GET /config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicConfig {
    #[serde(default)]
    pub tickers: Vec<String>,
}
