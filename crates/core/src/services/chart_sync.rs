use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::chart::{ChartColors, ChartPoint, ChartTheme};
use crate::models::quote::Quote;
use crate::services::history_loader::HistoryLoader;
use crate::services::quote_cache::{CacheSubscription, QuoteCache};

/// The rendering library's area series, seen from the core.
pub trait ChartSeries {
    /// Replace every point. Points are ascending by time.
    fn set_data(&mut self, points: &[ChartPoint]);

    /// Append a point, or update the last one if the time is equal.
    /// Must reject a point older than the last plotted one.
    fn update(&mut self, point: ChartPoint) -> Result<(), CoreError>;

    fn clear(&mut self) {
        self.set_data(&[]);
    }

    /// Presentation only.
    fn apply_colors(&mut self, _colors: &ChartColors) {}
}

/// Operation log entry recorded by `SeriesBuffer`.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesOp {
    SetData(Vec<ChartPoint>),
    Update(ChartPoint),
}

/// In-memory series. Keeps the plotted points and every operation applied,
/// so front ends without a widget (and tests) can inspect each render.
#[derive(Debug, Clone, Default)]
pub struct SeriesBuffer {
    points: Vec<ChartPoint>,
    ops: Vec<SeriesOp>,
    colors: Option<ChartColors>,
}

impl SeriesBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[ChartPoint] {
        &self.points
    }

    pub fn ops(&self) -> &[SeriesOp] {
        &self.ops
    }

    pub fn colors(&self) -> Option<&ChartColors> {
        self.colors.as_ref()
    }
}

impl ChartSeries for SeriesBuffer {
    fn set_data(&mut self, points: &[ChartPoint]) {
        self.points = points.to_vec();
        self.ops.push(SeriesOp::SetData(points.to_vec()));
    }

    fn update(&mut self, point: ChartPoint) -> Result<(), CoreError> {
        match self.points.last_mut() {
            Some(last) if point.time < last.time => {
                return Err(CoreError::Chart(format!(
                    "time {} is older than last point {}",
                    point.time, last.time
                )));
            }
            Some(last) if point.time == last.time => last.value = point.value,
            _ => self.points.push(point),
        }
        self.ops.push(SeriesOp::Update(point));
        Ok(())
    }

    fn apply_colors(&mut self, colors: &ChartColors) {
        self.colors = Some(colors.clone());
    }
}

/// Lifecycle of a synchronized chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartState {
    /// Cleared, waiting for history
    Uninitialized,
    /// History plotted, no live point yet
    Seeded,
    /// Receiving live points
    Live,
}

/// Proof that a seed belongs to the current symbol. A ticket from before
/// the last `begin` is stale and its history is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedTicket {
    generation: u64,
    symbol: String,
}

impl SeedTicket {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

/// Keeps one chart series in step with history and live quotes.
///
/// Uninitialized → Seeded → Live, back to Uninitialized on every symbol
/// change. The series is cleared before a new symbol's history is requested,
/// and live points are never plotted before the seed for the same symbol.
pub struct ChartSynchronizer<S: ChartSeries> {
    series: S,
    symbol: Option<String>,
    state: ChartState,
    generation: u64,
    last_time: Option<i64>,
    pending: Option<Quote>,
    theme: ChartTheme,
}

impl<S: ChartSeries> ChartSynchronizer<S> {
    pub fn new(series: S) -> Self {
        Self {
            series,
            symbol: None,
            state: ChartState::Uninitialized,
            generation: 0,
            last_time: None,
            pending: None,
            theme: ChartTheme::default(),
        }
    }

    pub fn state(&self) -> ChartState {
        self.state
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn series(&self) -> &S {
        &self.series
    }

    pub fn into_series(self) -> S {
        self.series
    }

    pub fn last_plotted_time(&self) -> Option<i64> {
        self.last_time
    }

    pub fn theme(&self) -> ChartTheme {
        self.theme
    }

    /// Switch to `symbol`: clear the series and go back to Uninitialized.
    pub fn begin(&mut self, symbol: &str) -> SeedTicket {
        self.generation += 1;
        self.series.clear();
        self.symbol = Some(symbol.to_string());
        self.state = ChartState::Uninitialized;
        self.last_time = None;
        self.pending = None;
        debug!(symbol, generation = self.generation, "chart reset");
        SeedTicket {
            generation: self.generation,
            symbol: symbol.to_string(),
        }
    }

    /// Bulk-load `history` for the ticket's symbol.
    ///
    /// Returns false (and plots nothing) if the ticket is stale. A quote that
    /// arrived while unseeded is applied right after, if it is newer.
    pub fn seed(&mut self, ticket: &SeedTicket, history: &[Quote]) -> bool {
        self.seed_points(ticket, history).is_some()
    }

    /// `seed`, returning how many history points were plotted.
    fn seed_points(&mut self, ticket: &SeedTicket, history: &[Quote]) -> Option<usize> {
        if ticket.generation != self.generation {
            debug!(symbol = %ticket.symbol, "stale chart seed discarded");
            return None;
        }

        let mut points: Vec<ChartPoint> = history
            .iter()
            .filter(|q| q.symbol == ticket.symbol)
            .map(ChartPoint::from)
            .collect();
        points.sort_by_key(|p| p.time);
        points.dedup_by_key(|p| p.time);

        self.series.set_data(&points);
        self.last_time = points.last().map(|p| p.time);
        self.state = ChartState::Seeded;

        if let Some(quote) = self.pending.take() {
            self.apply_quote(&quote);
        }
        Some(points.len())
    }

    /// Plot a live quote. Quotes for another symbol, or not strictly newer
    /// than the last plotted point, are dropped and logged.
    pub fn apply_quote(&mut self, quote: &Quote) -> bool {
        if self.symbol.as_deref() != Some(quote.symbol.as_str()) {
            debug!(symbol = %quote.symbol, "chart update for inactive symbol ignored");
            return false;
        }

        if self.state == ChartState::Uninitialized {
            let newer = self
                .pending
                .as_ref()
                .map_or(true, |p| quote.is_newer_than(p));
            if newer {
                self.pending = Some(quote.clone());
            }
            return false;
        }

        if let Some(last) = self.last_time {
            if quote.timestamp <= last {
                debug!(
                    symbol = %quote.symbol,
                    last,
                    incoming = quote.timestamp,
                    "chart update skipped due to timestamp mismatch"
                );
                return false;
            }
        }

        match self.series.update(ChartPoint::from(quote)) {
            Ok(()) => {
                self.last_time = Some(quote.timestamp);
                self.state = ChartState::Live;
                true
            }
            Err(e) => {
                warn!(symbol = %quote.symbol, "chart update failed: {e}");
                false
            }
        }
    }

    /// Full switch: clear, load history, seed.
    /// Returns the number of points plotted by the seed.
    pub async fn activate(&mut self, symbol: &str, loader: &HistoryLoader, limit: usize) -> usize {
        let ticket = self.begin(symbol);
        let history = loader.load(symbol, limit).await;
        self.seed_points(&ticket, &history).unwrap_or(0)
    }

    /// Apply everything queued on `feed`. Returns how many points were plotted.
    pub fn drain(&mut self, feed: &mut ChartFeed) -> usize {
        let mut applied = 0;
        while let Ok(quote) = feed.rx.try_recv() {
            if self.apply_quote(&quote) {
                applied += 1;
            }
        }
        applied
    }

    /// Recolour for the host theme.
    pub fn set_theme(&mut self, theme: ChartTheme) {
        self.theme = theme;
        self.series.apply_colors(&ChartColors::for_theme(theme));
    }
}

/// Queue of accepted cache writes for one symbol, for a chart owned by a
/// single task. Dropping it unsubscribes from the cache.
pub struct ChartFeed {
    rx: mpsc::UnboundedReceiver<Quote>,
    _subscription: CacheSubscription,
}

impl ChartFeed {
    pub fn new(cache: &QuoteCache, symbol: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = cache.subscribe(symbol, move |q| {
            // receiver gone means the chart was torn down
            let _ = tx.send(q.clone());
        });
        Self {
            rx,
            _subscription: subscription,
        }
    }

    /// Wait for the next accepted quote.
    pub async fn recv(&mut self) -> Option<Quote> {
        self.rx.recv().await
    }
}
