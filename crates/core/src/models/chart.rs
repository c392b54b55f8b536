use serde::{Deserialize, Serialize};

use super::quote::Quote;

/// A single point on a price chart.
///
/// Generated by the core; front ends only render them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Seconds since the epoch (the chart's time axis)
    pub time: i64,

    /// Price at that time
    pub value: f64,
}

impl From<&Quote> for ChartPoint {
    fn from(q: &Quote) -> Self {
        Self {
            time: q.timestamp,
            value: q.price,
        }
    }
}

/// Light or dark UI theme, driven by the host application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartTheme {
    #[default]
    Light,
    Dark,
}

/// Colours applied to the chart and its area series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartColors {
    pub background: String,
    pub text: String,
    pub border: String,
    pub area_top: String,
    pub area_bottom: String,
    pub area_line: String,
}

impl ChartColors {
    pub fn for_theme(theme: ChartTheme) -> Self {
        match theme {
            ChartTheme::Light => Self {
                background: "#ffffff".into(),
                text: "#0f172a".into(),
                border: "#e2e8f0".into(),
                area_top: "rgba(37, 99, 235, 0.4)".into(),
                area_bottom: "rgba(37, 99, 235, 0.0)".into(),
                area_line: "#2563eb".into(),
            },
            ChartTheme::Dark => Self {
                background: "#0b1120".into(),
                text: "#e2e8f0".into(),
                border: "#1e293b".into(),
                area_top: "rgba(59, 130, 246, 0.4)".into(),
                area_bottom: "rgba(59, 130, 246, 0.0)".into(),
                area_line: "#3b82f6".into(),
            },
        }
    }
}
