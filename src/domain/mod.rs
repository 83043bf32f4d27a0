//! Core domain types and logic.

pub mod analytics;
pub mod backtest;
pub mod calendar;
pub mod config_validation;
pub mod duration;
pub mod error;
pub mod metrics;
pub mod period;
pub mod pipeline;
pub mod portfolio;
pub mod position;
pub mod quote;
pub mod screen;
pub mod series;
