// Technical indicators used by the bundled strategy and risk engines
// All functions take time-ascending columns and return the value at the last bar.

pub mod atr;
pub mod bollinger;
pub mod moving_average;
pub mod rsi;

pub use atr::{calculate_atr, true_ranges};
pub use bollinger::{calculate_bollinger, BollingerBands};
pub use moving_average::{calculate_sma, calculate_std_dev};
pub use rsi::calculate_rsi;
