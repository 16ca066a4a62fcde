use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Direction of an exchange order or position
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "Buy"),
            OrderSide::Sell => write!(f, "Sell"),
        }
    }
}

/// Open position snapshot as reported by the exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: OrderSide,
    pub size: f64,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Time since the exchange last touched this position
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.updated_at
    }
}

/// Most recently closed position for a symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub symbol: String,
    pub closed_at: DateTime<Utc>,
}

impl ClosedPosition {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.closed_at
    }
}

/// Unfilled limit or conditional order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenOrder {
    pub id: String,
    pub symbol: String,
    pub status: String,
}

/// OHLCV bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Time-ascending window of bars fetched for one cycle
#[derive(Debug, Clone)]
pub struct MarketDataWindow {
    symbol: String,
    interval: String,
    candles: Vec<Candle>,
}

impl MarketDataWindow {
    /// Build a window, sorting bars oldest first and keeping the newest `limit` of them
    pub fn new(
        symbol: impl Into<String>,
        interval: impl Into<String>,
        mut candles: Vec<Candle>,
        limit: usize,
    ) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        if candles.len() > limit {
            let excess = candles.len() - limit;
            candles.drain(..excess);
        }

        Self {
            symbol: symbol.into(),
            interval: interval.into(),
            candles,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

/// Columnar view of a window, prepared by a strategy engine
///
/// Strategy and risk engines share the same frame within a cycle.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub timestamps: Vec<DateTime<Utc>>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl Frame {
    pub fn from_candles(candles: &[Candle]) -> Self {
        let mut frame = Frame::default();
        for candle in candles {
            frame.timestamps.push(candle.timestamp);
            frame.open.push(candle.open);
            frame.high.push(candle.high);
            frame.low.push(candle.low);
            frame.close.push(candle.close);
            frame.volume.push(candle.volume);
        }
        frame
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    /// Last close, the price an order would be placed against
    pub fn current_price(&self) -> Option<f64> {
        self.close.last().copied()
    }
}

/// The strategy's directional call for the current window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrendSignal {
    Long,
    Short,
    None,
}

impl TrendSignal {
    /// Order side for this signal, or `None` when there is nothing to trade
    pub fn order_side(&self) -> Option<OrderSide> {
        match self {
            TrendSignal::Long => Some(OrderSide::Buy),
            TrendSignal::Short => Some(OrderSide::Sell),
            TrendSignal::None => None,
        }
    }
}

impl fmt::Display for TrendSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendSignal::Long => write!(f, "LONG"),
            TrendSignal::Short => write!(f, "SHORT"),
            TrendSignal::None => write!(f, "NONE"),
        }
    }
}

/// Stop-loss / take-profit pair attached to a prospective order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RiskBounds {
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Indicator values logged alongside a trade decision
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub bollinger_upper: f64,
    pub bollinger_middle: f64,
    pub bollinger_lower: f64,
    pub current_price: f64,
}

/// Order sent to the exchange command interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub leverage: u32,
    pub current_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Outcome of a single order submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderResult {
    pub accepted: bool,
    pub order_id: Option<String>,
    pub details: String,
}

impl OrderResult {
    pub fn accepted(order_id: Option<String>, details: impl Into<String>) -> Self {
        Self {
            accepted: true,
            order_id,
            details: details.into(),
        }
    }

    pub fn rejected(details: impl Into<String>) -> Self {
        Self {
            accepted: false,
            order_id: None,
            details: details.into(),
        }
    }
}

/// Why the guard refused a new position
#[derive(Debug, Clone, PartialEq)]
pub enum BlockReason {
    TooManyPositions { count: usize },
    RecentPositionTooYoung { age: Duration },
    RecentlyClosed { age: Duration },
    PendingOrderExists { count: usize },
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::TooManyPositions { count } => {
                write!(f, "{} open positions already", count)
            }
            BlockReason::RecentPositionTooYoung { age } => {
                write!(
                    f,
                    "open position is only {:.2}h old",
                    age.num_seconds() as f64 / 3600.0
                )
            }
            BlockReason::RecentlyClosed { age } => {
                write!(f, "last position closed {}s ago", age.num_seconds())
            }
            BlockReason::PendingOrderExists { count } => {
                write!(f, "{} open order(s) pending", count)
            }
        }
    }
}

/// Result of the pre-trade eligibility checks
#[derive(Debug, Clone, PartialEq)]
pub struct GuardDecision {
    pub allowed: bool,
    pub reason: Option<BlockReason>,
}

impl GuardDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn block(reason: BlockReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}
