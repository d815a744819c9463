pub mod classify;
pub mod config;
pub mod dataset;
pub mod error;
pub mod partition;
pub mod plot;
pub mod record;
pub mod stats;
pub mod util;

/// Input files record nanoseconds, every statistic is reported in microseconds
pub const NS_TO_US: f64 = 1.0 / 1_000.0;
