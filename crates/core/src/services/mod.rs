pub mod chart_sync;
pub mod history_loader;
pub mod quote_cache;
pub mod quote_stream;
pub mod session;
pub mod ticker_service;
pub mod trade_service;
pub mod valuation;
