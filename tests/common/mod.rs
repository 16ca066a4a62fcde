// Shared in-memory collaborators for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use guardbot::api::{ExchangeCommand, ExchangeQuery};
use guardbot::risk::RiskEngine;
use guardbot::strategy::StrategyEngine;
use guardbot::{
    BotError, Candle, ClosedPosition, CycleSettings, Frame, IndicatorSnapshot, MarketDataWindow,
    OpenOrder, OrderRequest, OrderResult, OrderSide, Position, Result, RiskBounds, TrendSignal,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const SYMBOL: &str = "BTCUSDT";

pub fn settings() -> CycleSettings {
    CycleSettings {
        symbol: SYMBOL.to_string(),
        quantity: 0.03,
        interval: "1".to_string(),
        limit: 100,
        leverage: 10,
    }
}

pub fn position_updated(now: DateTime<Utc>, age: Duration) -> Position {
    Position {
        symbol: SYMBOL.to_string(),
        side: OrderSide::Buy,
        size: 0.03,
        opened_at: now - age - Duration::minutes(5),
        updated_at: now - age,
    }
}

pub fn closed(now: DateTime<Utc>, age: Duration) -> ClosedPosition {
    ClosedPosition {
        symbol: SYMBOL.to_string(),
        closed_at: now - age,
    }
}

pub fn pending_order(id: &str) -> OpenOrder {
    OpenOrder {
        id: id.to_string(),
        symbol: SYMBOL.to_string(),
        status: "New".to_string(),
    }
}

/// `count` one-minute bars ending at `now`, closing at 100.0
pub fn window(now: DateTime<Utc>, count: usize) -> MarketDataWindow {
    let candles = (0..count)
        .map(|i| Candle {
            symbol: SYMBOL.to_string(),
            timestamp: now - Duration::minutes((count - i) as i64),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0,
            volume: 10.0,
        })
        .collect();
    MarketDataWindow::new(SYMBOL, "1", candles, 100)
}

/// Canned reply; `Err` holds the failure message
pub type Scripted<T> = std::result::Result<T, String>;

/// Scripted exchange state with per-query call counters
pub struct MockExchange {
    pub positions: Mutex<Scripted<Vec<Position>>>,
    pub last_closed: Mutex<Scripted<Option<ClosedPosition>>>,
    pub orders: Mutex<Scripted<Vec<OpenOrder>>>,
    pub data: Mutex<Scripted<Option<MarketDataWindow>>>,
    /// Delay applied inside `get_open_positions`
    pub delay: Option<std::time::Duration>,
    pub positions_calls: AtomicUsize,
    pub closed_calls: AtomicUsize,
    pub orders_calls: AtomicUsize,
    pub data_calls: AtomicUsize,
}

impl MockExchange {
    /// Flat account with a full window of data
    pub fn idle(now: DateTime<Utc>) -> Self {
        Self {
            positions: Mutex::new(Ok(Vec::new())),
            last_closed: Mutex::new(Ok(None)),
            orders: Mutex::new(Ok(Vec::new())),
            data: Mutex::new(Ok(Some(window(now, 30)))),
            delay: None,
            positions_calls: AtomicUsize::new(0),
            closed_calls: AtomicUsize::new(0),
            orders_calls: AtomicUsize::new(0),
            data_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_positions(self, positions: Vec<Position>) -> Self {
        *self.positions.lock().unwrap() = Ok(positions);
        self
    }

    pub fn with_last_closed(self, closed: ClosedPosition) -> Self {
        *self.last_closed.lock().unwrap() = Ok(Some(closed));
        self
    }

    pub fn with_orders(self, orders: Vec<OpenOrder>) -> Self {
        *self.orders.lock().unwrap() = Ok(orders);
        self
    }

    pub fn with_data(self, data: Option<MarketDataWindow>) -> Self {
        *self.data.lock().unwrap() = Ok(data);
        self
    }

    pub fn failing_positions(self) -> Self {
        *self.positions.lock().unwrap() = Err("position list timed out".to_string());
        self
    }

    pub fn failing_closed(self) -> Self {
        *self.last_closed.lock().unwrap() = Err("closed pnl timed out".to_string());
        self
    }

    pub fn failing_data(self) -> Self {
        *self.data.lock().unwrap() = Err("kline timed out".to_string());
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> (usize, usize, usize, usize) {
        (
            self.positions_calls.load(Ordering::SeqCst),
            self.closed_calls.load(Ordering::SeqCst),
            self.orders_calls.load(Ordering::SeqCst),
            self.data_calls.load(Ordering::SeqCst),
        )
    }
}

fn replay<T: Clone>(slot: &Mutex<Scripted<T>>) -> Result<T> {
    slot.lock()
        .unwrap()
        .clone()
        .map_err(|msg| BotError::Exchange(anyhow::anyhow!(msg)))
}

#[async_trait]
impl ExchangeQuery for MockExchange {
    async fn get_open_positions(&self, _symbol: &str) -> Result<Vec<Position>> {
        self.positions_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        replay(&self.positions)
    }

    async fn get_last_closed_position(&self, _symbol: &str) -> Result<Option<ClosedPosition>> {
        self.closed_calls.fetch_add(1, Ordering::SeqCst);
        replay(&self.last_closed)
    }

    async fn get_open_orders(&self, _symbol: &str) -> Result<Vec<OpenOrder>> {
        self.orders_calls.fetch_add(1, Ordering::SeqCst);
        replay(&self.orders)
    }

    async fn get_historical_data(
        &self,
        _symbol: &str,
        _interval: &str,
        _limit: usize,
    ) -> Result<Option<MarketDataWindow>> {
        self.data_calls.fetch_add(1, Ordering::SeqCst);
        replay(&self.data)
    }
}

/// Records every order it receives
pub struct MockCommand {
    pub requests: Mutex<Vec<OrderRequest>>,
    pub accept: bool,
}

impl MockCommand {
    pub fn accepting() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            accept: true,
        }
    }

    pub fn rejecting() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            accept: false,
        }
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ExchangeCommand for MockCommand {
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderResult> {
        self.requests.lock().unwrap().push(request.clone());
        if self.accept {
            Ok(OrderResult::accepted(Some("order-1".to_string()), "accepted"))
        } else {
            Ok(OrderResult::rejected("insufficient margin"))
        }
    }
}

/// Returns a fixed classification for any frame
pub struct FixedStrategy {
    pub signal: Option<TrendSignal>,
}

impl StrategyEngine for FixedStrategy {
    fn name(&self) -> &str {
        "fixed"
    }

    fn min_bars_required(&self) -> usize {
        1
    }

    fn classify(&self, _frame: &Frame) -> Result<Option<TrendSignal>> {
        Ok(self.signal)
    }

    fn snapshot_indicators(&self, frame: &Frame) -> Result<IndicatorSnapshot> {
        let price = frame.current_price().unwrap_or_default();
        Ok(IndicatorSnapshot {
            rsi: 50.0,
            bollinger_upper: price,
            bollinger_middle: price,
            bollinger_lower: price,
            current_price: price,
        })
    }
}

/// Places bounds a fixed distance from the last close, or fixed absolute bounds
pub enum FixedRisk {
    Offset(f64),
    Absolute(RiskBounds),
}

impl RiskEngine for FixedRisk {
    fn compute_risk_bounds(&self, frame: &Frame, trend: TrendSignal) -> Result<RiskBounds> {
        let price = frame.current_price().unwrap_or_default();
        match (self, trend) {
            (FixedRisk::Absolute(bounds), _) => Ok(*bounds),
            (FixedRisk::Offset(d), TrendSignal::Long) => Ok(RiskBounds {
                stop_loss: price - d,
                take_profit: price + 2.0 * d,
            }),
            (FixedRisk::Offset(d), TrendSignal::Short) => Ok(RiskBounds {
                stop_loss: price + d,
                take_profit: price - 2.0 * d,
            }),
            (_, TrendSignal::None) => Err(BotError::RiskBounds("no trend".to_string())),
        }
    }
}
