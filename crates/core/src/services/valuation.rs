//! Portfolio figures derived from holdings and live quotes.
//!
//! Everything here is a pure recomputation over a holdings snapshot and a
//! quote snapshot; nothing is updated incrementally. Figures that need a
//! quote are `None` until one has been observed for that symbol.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::models::quote::Quote;
use crate::models::user::PortfolioItem;

/// Upper bound on the buying-power fraction, so a full-balance order does
/// not fail the server's strict "cost ≤ balance" check after rounding.
pub const MAX_BUYING_POWER_FRACTION: f64 = 0.999999;

/// Decimal places of order quantities.
pub const QUANTITY_DECIMALS: usize = 6;

/// One holding, valued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingValuation {
    pub symbol: String,
    pub quantity: f64,
    pub average_price: f64,

    /// quantity × average_price
    pub cost_basis: f64,

    /// Live price; `None` while loading
    pub price: Option<f64>,

    /// quantity × price
    pub market_value: Option<f64>,

    /// (price − average_price) × quantity
    pub unrealized_pnl: Option<f64>,

    /// Trading on this instrument is currently closed
    pub is_closed: bool,
}

/// The whole portfolio, valued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValuation {
    pub holdings: Vec<HoldingValuation>,
    pub invested_capital: f64,

    /// `None` unless every holding has a quote
    pub market_value: Option<f64>,

    /// `None` unless every holding has a quote
    pub unrealized_pnl: Option<f64>,
}

impl PortfolioValuation {
    /// True while at least one holding is waiting for its first quote.
    pub fn is_loading(&self) -> bool {
        self.holdings.iter().any(|h| h.price.is_none())
    }

    /// Cash plus market value, `None` while loading.
    pub fn net_worth(&self, balance: f64) -> Option<f64> {
        self.market_value.map(|mv| balance + mv)
    }
}

/// Σ quantity × average_price. Never depends on quotes.
pub fn invested_capital(portfolio: &BTreeMap<String, PortfolioItem>) -> f64 {
    portfolio.values().map(PortfolioItem::cost_basis).sum()
}

/// Σ quantity × price, or `None` if any holding lacks a quote.
pub fn market_value(
    portfolio: &BTreeMap<String, PortfolioItem>,
    quotes: &HashMap<String, Quote>,
) -> Option<f64> {
    portfolio
        .iter()
        .map(|(symbol, item)| quotes.get(symbol).map(|q| item.quantity * q.price))
        .sum()
}

/// (price − average_price) × quantity for one holding.
pub fn unrealized_pnl(item: &PortfolioItem, quote: &Quote) -> f64 {
    (quote.price - item.average_price) * item.quantity
}

/// Σ unrealized P&L, or `None` if any holding lacks a quote.
pub fn total_unrealized_pnl(
    portfolio: &BTreeMap<String, PortfolioItem>,
    quotes: &HashMap<String, Quote>,
) -> Option<f64> {
    portfolio
        .iter()
        .map(|(symbol, item)| quotes.get(symbol).map(|q| unrealized_pnl(item, q)))
        .sum()
}

/// Value every holding and the aggregate.
pub fn value_portfolio(
    portfolio: &BTreeMap<String, PortfolioItem>,
    quotes: &HashMap<String, Quote>,
) -> PortfolioValuation {
    let holdings = portfolio
        .iter()
        .map(|(symbol, item)| {
            let quote = quotes.get(symbol);
            HoldingValuation {
                symbol: symbol.clone(),
                quantity: item.quantity,
                average_price: item.average_price,
                cost_basis: item.cost_basis(),
                price: quote.map(|q| q.price),
                market_value: quote.map(|q| item.quantity * q.price),
                unrealized_pnl: quote.map(|q| unrealized_pnl(item, q)),
                is_closed: quote.is_some_and(|q| q.is_closed),
            }
        })
        .collect();

    PortfolioValuation {
        holdings,
        invested_capital: invested_capital(portfolio),
        market_value: market_value(portfolio, quotes),
        unrealized_pnl: total_unrealized_pnl(portfolio, quotes),
    }
}

/// Largest order quantity affordable with `fraction` of `buying_power` at
/// `price`, floored to 6 decimals and formatted for a quantity input.
///
/// `fraction` is capped at 0.999999; a non-positive price gives `"0.000000"`.
pub fn max_affordable_quantity(buying_power: f64, price: f64, fraction: f64) -> String {
    format!(
        "{:.*}",
        QUANTITY_DECIMALS,
        max_affordable_quantity_value(buying_power, price, fraction)
    )
}

/// Numeric form of `max_affordable_quantity`.
pub fn max_affordable_quantity_value(buying_power: f64, price: f64, fraction: f64) -> f64 {
    if !(price > 0.0) || !price.is_finite() || !(buying_power > 0.0) || !(fraction > 0.0) {
        return 0.0;
    }
    let fraction = fraction.min(MAX_BUYING_POWER_FRACTION);
    floor_to_decimals(buying_power * fraction / price, QUANTITY_DECIMALS as i32)
}

/// Relative tolerance absorbed before flooring. Binary noise sits around
/// 1e-16 of the value; real fractional parts are far above this.
const FLOOR_EPSILON: f64 = 1e-9;

/// Floor to `decimals` places. Only binary noise (9.99999 stored as
/// 9.9999899999…) is nudged up; a genuine 0.9997 of a unit still floors down.
fn floor_to_decimals(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    let scaled = value * scale;
    (scaled + scaled.abs() * FLOOR_EPSILON).floor() / scale
}

/// Direction of the last price move, for up/down colouring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceDirection {
    #[default]
    Unchanged,
    Up,
    Down,
}

/// Remembers the previous price and reports which way it moved.
/// An equal price keeps the previous direction.
#[derive(Debug, Clone, Default)]
pub struct PriceTrend {
    previous: Option<f64>,
    direction: PriceDirection,
}

impl PriceTrend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, price: f64) -> PriceDirection {
        if let Some(prev) = self.previous {
            if price > prev {
                self.direction = PriceDirection::Up;
            } else if price < prev {
                self.direction = PriceDirection::Down;
            }
        }
        self.previous = Some(price);
        self.direction
    }

    pub fn direction(&self) -> PriceDirection {
        self.direction
    }
}
