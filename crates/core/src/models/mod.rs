pub mod chart;
pub mod leaderboard;
pub mod quote;
pub mod settings;
pub mod trade;
pub mod user;
