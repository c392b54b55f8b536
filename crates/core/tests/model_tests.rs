use papertrade_core::models::chart::{ChartColors, ChartPoint, ChartTheme};
use papertrade_core::models::leaderboard::{LeaderboardPage, PublicConfig};
use papertrade_core::models::quote::{Quote, Ticker, TickerSource};
use papertrade_core::models::settings::{ClientConfig, ReconnectPolicy};
use papertrade_core::models::trade::{TradeAction, TradeRequest};
use papertrade_core::models::user::{Credentials, ProfileUpdate, Registration, User};
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════
//  Quote
// ═══════════════════════════════════════════════════════════════════

mod quote {
    use super::*;

    #[test]
    fn deserializes_backend_payload_without_optional_fields() {
        let q: Quote =
            serde_json::from_str(r#"{"symbol":"AAPL","price":187.5,"timestamp":1700000000}"#)
                .unwrap();
        assert_eq!(q.symbol, "AAPL");
        assert_eq!(q.price, 187.5);
        assert_eq!(q.timestamp, 1_700_000_000);
        assert!(!q.is_closed);
        assert_eq!(q.source, None);
    }

    #[test]
    fn deserializes_closed_market_flag() {
        let q: Quote = serde_json::from_str(
            r#"{"symbol":"AAPL","price":1.0,"timestamp":1,"is_closed":true,"source":"FH"}"#,
        )
        .unwrap();
        assert!(q.is_closed);
        assert_eq!(q.source.as_deref(), Some("FH"));
    }

    #[test]
    fn newer_is_strict() {
        let a = Quote::new("AAPL", 1.0, 100);
        let b = Quote::new("AAPL", 2.0, 100);
        let c = Quote::new("AAPL", 3.0, 101);
        assert!(!b.is_newer_than(&a));
        assert!(c.is_newer_than(&a));
        assert!(!a.is_newer_than(&c));
    }

    #[test]
    fn validate_rejects_bad_prices_and_symbols() {
        assert!(Quote::new("AAPL", 1.0, 1).validate().is_ok());
        assert!(Quote::new("AAPL", 0.0, 1).validate().is_err());
        assert!(Quote::new("AAPL", -5.0, 1).validate().is_err());
        assert!(Quote::new("AAPL", f64::NAN, 1).validate().is_err());
        assert!(Quote::new("AAPL", f64::INFINITY, 1).validate().is_err());
        assert!(Quote::new("  ", 1.0, 1).validate().is_err());
    }

    #[test]
    fn datetime_conversion() {
        let q = Quote::new("AAPL", 1.0, 0);
        assert_eq!(q.datetime().unwrap().to_rfc3339(), "1970-01-01T00:00:00+00:00");
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Ticker
// ═══════════════════════════════════════════════════════════════════

mod ticker {
    use super::*;

    #[test]
    fn coingecko_prefix() {
        let t = Ticker::parse("CG:bitcoin");
        assert_eq!(t.source, TickerSource::CoinGecko);
        assert_eq!(t.symbol, "bitcoin");
        assert_eq!(t.display_symbol(), "BITCOIN");
    }

    #[test]
    fn finnhub_prefix() {
        let t = Ticker::parse("FH:AAPL");
        assert_eq!(t.source, TickerSource::Finnhub);
        assert_eq!(t.symbol, "AAPL");
    }

    #[test]
    fn untagged_defaults_to_finnhub() {
        let t = Ticker::parse("msft");
        assert_eq!(t.source, TickerSource::Finnhub);
        assert_eq!(t.display_symbol(), "MSFT");
    }

    #[test]
    fn exchange_prefix_stays_in_symbol() {
        let t = Ticker::parse("BINANCE:BTCUSDT");
        assert_eq!(t.source, TickerSource::Finnhub);
        assert_eq!(t.symbol, "BINANCE:BTCUSDT");
    }

    #[test]
    fn display_round_trips_tag() {
        assert_eq!(Ticker::parse("CG:eth").to_string(), "CG:eth");
        assert_eq!(TickerSource::CoinGecko.label(), "CoinGecko");
    }

    #[test]
    fn quote_exposes_ticker() {
        let q = Quote::new("CG:solana", 100.0, 1);
        assert_eq!(q.ticker().source, TickerSource::CoinGecko);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  User & forms
// ═══════════════════════════════════════════════════════════════════

mod user {
    use super::*;

    const USER_JSON: &str = r#"{
        "id": 7,
        "username": "jdoe",
        "email": "j@doe.dev",
        "first_name": "Jane",
        "last_name": "Doe",
        "balance": 8500.25,
        "is_public": true,
        "portfolio": {
            "AAPL": {"stock_symbol": "AAPL", "quantity": 10, "average_price": 150}
        }
    }"#;

    #[test]
    fn deserializes_full_record() {
        let u: User = serde_json::from_str(USER_JSON).unwrap();
        assert_eq!(u.id, Some(7));
        assert_eq!(u.balance, 8500.25);
        assert_eq!(u.position_quantity("AAPL"), 10.0);
        assert_eq!(u.position("AAPL").unwrap().cost_basis(), 1500.0);
        assert_eq!(u.full_name(), "Jane Doe");
    }

    #[test]
    fn public_view_with_missing_fields() {
        let u: User = serde_json::from_str(r#"{"first_name":"A","last_name":"B"}"#).unwrap();
        assert_eq!(u.balance, 0.0);
        assert!(u.portfolio.is_empty());
        assert_eq!(u.position_quantity("AAPL"), 0.0);
    }

    #[test]
    fn credentials_validation() {
        assert!(Credentials::new("a@b.io", "longenough").validate().is_ok());
        assert!(Credentials::new("not-an-email", "longenough").validate().is_err());
        assert!(Credentials::new("a@b.io", "short").validate().is_err());
    }

    #[test]
    fn registration_requires_names() {
        let mut r = Registration {
            email: "a@b.io".into(),
            password: "longenough".into(),
            first_name: "Ann".into(),
            last_name: "Lee".into(),
        };
        assert!(r.validate().is_ok());
        r.last_name = " ".into();
        let err = r.validate().unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: Last name is required");
    }

    #[test]
    fn profile_update_requires_names() {
        let p = ProfileUpdate {
            first_name: String::new(),
            last_name: "Lee".into(),
            website: None,
            is_public: true,
        };
        assert!(p.validate().is_err());
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Trade
// ═══════════════════════════════════════════════════════════════════

mod trade {
    use super::*;

    #[test]
    fn action_paths_and_display() {
        assert_eq!(TradeAction::Buy.path(), "/buy");
        assert_eq!(TradeAction::Sell.path(), "/sell");
        assert_eq!(TradeAction::Sell.to_string(), "SELL");
    }

    #[test]
    fn action_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&TradeAction::Buy).unwrap(), "\"BUY\"");
    }

    #[test]
    fn request_body_has_symbol_and_quantity_only() {
        let req = TradeRequest::new(TradeAction::Buy, "AAPL", 2.5);
        let json = serde_json::to_value(req.body()).unwrap();
        assert_eq!(json, serde_json::json!({"symbol": "AAPL", "quantity": 2.5}));
    }

    #[test]
    fn each_request_gets_a_fresh_id() {
        let a = TradeRequest::new(TradeAction::Buy, "AAPL", 1.0);
        let b = TradeRequest::new(TradeAction::Buy, "AAPL", 1.0);
        assert_ne!(a.request_id, b.request_id);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Leaderboard / config / chart
// ═══════════════════════════════════════════════════════════════════

mod misc {
    use super::*;

    #[test]
    fn leaderboard_never_updated() {
        let page: LeaderboardPage = serde_json::from_str(r#"{"entries":[]}"#).unwrap();
        assert!(page.last_updated_at().is_none());
    }

    #[test]
    fn leaderboard_last_update() {
        let page: LeaderboardPage = serde_json::from_str(
            r#"{"entries":[{"rank":1,"user_id":3,"first_name":"A","last_name":"B","total_net_worth":12000.5}],"last_update":86400}"#,
        )
        .unwrap();
        assert_eq!(page.entries[0].total_net_worth, 12000.5);
        assert_eq!(
            page.last_updated_at().unwrap().to_rfc3339(),
            "1970-01-02T00:00:00+00:00"
        );
    }

    #[test]
    fn public_config() {
        let c: PublicConfig = serde_json::from_str(r#"{"tickers":["AAPL","CG:bitcoin"]}"#).unwrap();
        assert_eq!(c.tickers.len(), 2);
    }

    #[test]
    fn chart_point_from_quote() {
        let p = ChartPoint::from(&Quote::new("AAPL", 12.5, 99));
        assert_eq!(p, ChartPoint { time: 99, value: 12.5 });
    }

    #[test]
    fn themes_differ() {
        assert_ne!(
            ChartColors::for_theme(ChartTheme::Light),
            ChartColors::for_theme(ChartTheme::Dark)
        );
        assert_eq!(ChartTheme::default(), ChartTheme::Light);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Settings
// ═══════════════════════════════════════════════════════════════════

mod settings {
    use super::*;

    #[test]
    fn defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.history_limit, 100);
        assert_eq!(c.history_stale_after(), Duration::from_secs(300));
        assert_eq!(c.quote_stale_after(), Duration::from_secs(30));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn base_url_trims_trailing_slash() {
        let c = ClientConfig::new("https://paper.example/api/");
        assert_eq!(c.base_url(), "https://paper.example/api");
    }

    #[test]
    fn from_json_fills_defaults() {
        let c = ClientConfig::from_json(r#"{"api_url":"https://x.dev","history_limit":50}"#)
            .unwrap();
        assert_eq!(c.history_limit, 50);
        assert_eq!(c.reconnect, ReconnectPolicy::default());
    }

    #[test]
    fn from_json_rejects_bad_url() {
        assert!(ClientConfig::from_json(r#"{"api_url":"ftp://x"}"#).is_err());
    }

    #[test]
    fn zero_history_limit_is_invalid() {
        let mut c = ClientConfig::default();
        c.history_limit = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn backoff_grows_and_caps() {
        let p = ReconnectPolicy::default();
        assert_eq!(p.base_delay(0), Duration::from_millis(1_000));
        assert_eq!(p.base_delay(1), Duration::from_millis(2_000));
        assert_eq!(p.base_delay(3), Duration::from_millis(8_000));
        assert_eq!(p.base_delay(10), Duration::from_millis(30_000));
        assert_eq!(p.base_delay(u32::MAX), Duration::from_millis(30_000));
    }

    #[test]
    fn jitter_stays_within_band() {
        let p = ReconnectPolicy::default();
        assert_eq!(p.delay_with_jitter(1, 0.0), Duration::from_millis(1_600));
        assert_eq!(p.delay_with_jitter(1, 0.5), Duration::from_millis(2_000));
        assert_eq!(p.delay_with_jitter(1, 1.0), Duration::from_millis(2_400));
    }

    #[test]
    fn max_attempts() {
        let p = ReconnectPolicy {
            max_attempts: Some(2),
            ..ReconnectPolicy::default()
        };
        assert!(p.allows(0));
        assert!(p.allows(1));
        assert!(!p.allows(2));
        assert!(ReconnectPolicy::default().allows(u32::MAX));
    }

    #[test]
    fn invalid_policy() {
        let p = ReconnectPolicy {
            jitter: 1.5,
            ..ReconnectPolicy::default()
        };
        assert!(p.validate().is_err());
        let p = ReconnectPolicy {
            multiplier: 0.5,
            ..ReconnectPolicy::default()
        };
        assert!(p.validate().is_err());
    }
}
