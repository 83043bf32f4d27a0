//! Configuration validation.
//!
//! Each `load_*` reads one section into its typed form and rejects the first
//! bad key. `validate_config` runs them all before a command starts.

use crate::domain::analytics::MetricKey;
use crate::domain::analytics::parabolic::ParabolicParams;
use crate::domain::backtest::BacktestConfig;
use crate::domain::calendar::Cadence;
use crate::domain::duration::{Duration, DurationUnit, find_daily};
use crate::domain::error::RotatorError;
use crate::domain::quote::Instrument;
use crate::domain::screen::{Aggregation, Criterion, Direction, MetricMode, ScreenSpec};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_POOL_SIZE: i64 = 4;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), RotatorError> {
    load_instruments(config)?;
    load_durations(config)?;
    load_trend_params(config)?;
    load_screen_spec(config)?;
    load_backtest_config(config)?;
    Ok(())
}

pub fn load_database_path(config: &dyn ConfigPort) -> Result<String, RotatorError> {
    match config.get_string("sqlite", "path") {
        Some(p) if !p.trim().is_empty() => Ok(p.trim().to_string()),
        _ => Err(RotatorError::ConfigMissing {
            section: "sqlite".to_string(),
            key: "path".to_string(),
        }),
    }
}

pub fn load_pool_size(config: &dyn ConfigPort) -> Result<u32, RotatorError> {
    let size = config.get_int("sqlite", "pool_size", DEFAULT_POOL_SIZE);
    u32::try_from(size)
        .ok()
        .filter(|s| *s > 0)
        .ok_or_else(|| RotatorError::invalid_config("sqlite", "pool_size", "must be positive"))
}

/// Instruments sorted by symbol, which fixes the screen's tie order.
pub fn load_instruments(config: &dyn ConfigPort) -> Result<Vec<Instrument>, RotatorError> {
    let mut instruments: Vec<Instrument> = config
        .get_section("instruments")
        .into_iter()
        .map(|(symbol, description)| Instrument::new(symbol, description))
        .collect();
    if instruments.is_empty() {
        return Err(RotatorError::ConfigMissing {
            section: "instruments".to_string(),
            key: "<symbol>".to_string(),
        });
    }
    instruments.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(instruments)
}

/// Configured durations, or the defaults when the section is absent. Ids are
/// assigned after sorting days before months, shortest first.
pub fn load_durations(config: &dyn ConfigPort) -> Result<Vec<Duration>, RotatorError> {
    let entries = config.get_section("durations");
    if entries.is_empty() {
        return Ok(Duration::defaults());
    }

    let mut parsed = Vec::with_capacity(entries.len());
    for (name, days) in entries {
        let (unit, qty) = Duration::parse_name(&name)
            .map_err(|reason| RotatorError::invalid_config("durations", &name, reason))?;
        let days: usize = days
            .trim()
            .parse()
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| {
                RotatorError::invalid_config("durations", &name, "trading days must be a positive integer")
            })?;
        parsed.push((unit, qty, days));
    }
    parsed.sort_by_key(|(unit, qty, _)| (*unit == DurationUnit::Month, *qty));

    let durations: Vec<Duration> = parsed
        .into_iter()
        .enumerate()
        .map(|(i, (unit, qty, days))| Duration::new(i as u32 + 1, unit, qty, days))
        .collect();

    match find_daily(&durations) {
        Some(_) => Ok(durations),
        None => Err(RotatorError::ConfigMissing {
            section: "durations".to_string(),
            key: "day_1".to_string(),
        }),
    }
}

pub fn load_trend_params(config: &dyn ConfigPort) -> Result<ParabolicParams, RotatorError> {
    let defaults = ParabolicParams::default();
    let step = config.get_double("trend", "step", defaults.step);
    let max = config.get_double("trend", "max", defaults.max);
    if step <= 0.0 || !step.is_finite() {
        return Err(RotatorError::invalid_config("trend", "step", "must be positive"));
    }
    if max < step || !max.is_finite() {
        return Err(RotatorError::invalid_config("trend", "max", "must be at least step"));
    }
    Ok(ParabolicParams { step, max })
}

pub fn load_screen_spec(config: &dyn ConfigPort) -> Result<ScreenSpec, RotatorError> {
    let aggregation = match config.get_string("screen", "aggregation") {
        Some(value) => value
            .parse::<Aggregation>()
            .map_err(|reason| RotatorError::invalid_config("screen", "aggregation", reason))?,
        None => Aggregation::RankWeighted,
    };

    let metrics = config.get_list("screen", "metrics");
    if metrics.is_empty() {
        return Err(RotatorError::ConfigMissing {
            section: "screen".to_string(),
            key: "metrics".to_string(),
        });
    }
    let n = metrics.len();

    let weights = config.get_list("screen", "weights");
    if weights.len() != n {
        return Err(RotatorError::invalid_config(
            "screen",
            "weights",
            format!("expected {n} weights, got {}", weights.len()),
        ));
    }
    let directions = config.get_list("screen", "directions");
    if directions.len() != n {
        return Err(RotatorError::invalid_config(
            "screen",
            "directions",
            format!("expected {n} directions, got {}", directions.len()),
        ));
    }
    let modes = config.get_list("screen", "modes");
    if !modes.is_empty() && modes.len() != n {
        return Err(RotatorError::invalid_config(
            "screen",
            "modes",
            format!("expected {n} modes, got {}", modes.len()),
        ));
    }

    let mut criteria = Vec::with_capacity(n);
    for i in 0..n {
        let metric = MetricKey::parse(&metrics[i])
            .map_err(|reason| RotatorError::invalid_config("screen", "metrics", reason))?;
        let weight: f64 = weights[i].parse().map_err(|_| {
            RotatorError::invalid_config("screen", "weights", format!("'{}' is not a number", weights[i]))
        })?;
        let direction = directions[i]
            .parse::<Direction>()
            .map_err(|reason| RotatorError::invalid_config("screen", "directions", reason))?;
        let mode = match modes.get(i) {
            Some(m) => Some(
                m.parse::<MetricMode>()
                    .map_err(|reason| RotatorError::invalid_config("screen", "modes", reason))?,
            ),
            None => None,
        };
        criteria.push(Criterion {
            metric,
            weight,
            direction,
            mode,
        });
    }

    let spec = ScreenSpec {
        aggregation,
        criteria,
    };
    spec.validate()?;
    Ok(spec)
}

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, RotatorError> {
    let initial_capital = config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL);
    if initial_capital <= 0.0 || !initial_capital.is_finite() {
        return Err(RotatorError::invalid_config(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }

    let benchmark = match config.get_string("backtest", "benchmark") {
        Some(b) if !b.trim().is_empty() => b.trim().to_uppercase(),
        _ => {
            return Err(RotatorError::ConfigMissing {
                section: "backtest".to_string(),
                key: "benchmark".to_string(),
            });
        }
    };

    let cadence = match config.get_string("backtest", "cadence") {
        Some(c) => c
            .parse::<Cadence>()
            .map_err(|reason| RotatorError::invalid_config("backtest", "cadence", reason))?,
        None => Cadence::Monthly,
    };

    let start_date = parse_date(config.get_string("backtest", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start >= end {
            return Err(RotatorError::invalid_config(
                "backtest",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }

    Ok(BacktestConfig {
        initial_capital,
        benchmark,
        cadence,
        start_date,
        end_date,
    })
}

fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, RotatorError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                RotatorError::invalid_config(
                    "backtest",
                    field,
                    format!("invalid {field} format, expected YYYY-MM-DD"),
                )
            }),
    }
}
