//! Derived-data rebuild: periods, returns, volatility, ulcer index, trend.
//!
//! Steps run in dependency order. When a store is attached each step's
//! output replaces the stored table before the next step starts. Replacing
//! the periods clears every later table, so a failure leaves earlier steps
//! committed and later tables empty.

use chrono::NaiveDate;
use log::info;
use std::collections::{HashMap, HashSet};

use super::analytics::parabolic::{ParabolicParams, TrendPoint, compute_trend};
use super::analytics::returns::compute_returns;
use super::analytics::ulcer::compute_ulcer_index;
use super::analytics::volatility::compute_volatility;
use super::analytics::{MetricKey, MetricKind, MetricRow};
use super::calendar::TradingCalendar;
use super::duration::{Duration, find_by_name};
use super::error::RotatorError;
use super::period::{Period, generate_all_periods};
use super::screen::MetricSource;
use super::series::QuoteBook;
use crate::ports::store_port::DerivedStore;

/// Everything the rebuild produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedData {
    pub durations: Vec<Duration>,
    pub periods: Vec<Period>,
    pub returns: Vec<MetricRow>,
    pub volatility: Vec<MetricRow>,
    pub ulcer: Vec<MetricRow>,
    pub trend: Vec<TrendPoint>,
}

impl DerivedData {
    pub fn rows(&self, kind: MetricKind) -> &[MetricRow] {
        match kind {
            MetricKind::Return => &self.returns,
            MetricKind::Volatility => &self.volatility,
            MetricKind::Ulcer => &self.ulcer,
            MetricKind::Trend => &[],
        }
    }

    pub fn summary(&self) -> RebuildSummary {
        RebuildSummary {
            durations: self.durations.len(),
            periods: self.periods.len(),
            returns: self.returns.len(),
            volatility: self.volatility.len(),
            ulcer: self.ulcer.len(),
            trend: self.trend.len(),
        }
    }
}

impl MetricSource for DerivedData {
    fn metric_values(
        &self,
        key: &MetricKey,
        as_of: NaiveDate,
    ) -> Result<HashMap<String, f64>, RotatorError> {
        let Some(name) = key.duration.as_deref() else {
            return Ok(self
                .trend
                .iter()
                .filter(|p| p.date == as_of)
                .map(|p| (p.symbol.clone(), p.stance.signum()))
                .collect());
        };
        let duration = find_by_name(&self.durations, name).ok_or_else(|| {
            RotatorError::invalid_config("screen", "metrics", format!("no duration named {name}"))
        })?;
        let period_ids: HashSet<u32> = self
            .periods
            .iter()
            .filter(|p| p.duration_id == duration.id && p.end == as_of)
            .map(|p| p.id)
            .collect();
        Ok(self
            .rows(key.kind)
            .iter()
            .filter(|r| period_ids.contains(&r.period_id))
            .map(|r| (r.symbol.clone(), r.value))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    pub durations: usize,
    pub periods: usize,
    pub returns: usize,
    pub volatility: usize,
    pub ulcer: usize,
    pub trend: usize,
}

/// Computes every derived table in memory.
pub fn compute_all(
    book: &QuoteBook,
    durations: &[Duration],
    params: &ParabolicParams,
) -> Result<DerivedData, RotatorError> {
    run_steps(book, durations, params, None)
}

/// Computes every derived table and persists each one as it completes.
pub fn rebuild(
    book: &QuoteBook,
    durations: &[Duration],
    params: &ParabolicParams,
    store: &dyn DerivedStore,
) -> Result<RebuildSummary, RotatorError> {
    run_steps(book, durations, params, Some(store)).map(|d| d.summary())
}

fn run_steps(
    book: &QuoteBook,
    durations: &[Duration],
    params: &ParabolicParams,
    store: Option<&dyn DerivedStore>,
) -> Result<DerivedData, RotatorError> {
    let series = book.series();
    let symbols = book.symbols();

    let calendar = TradingCalendar::from_series(series);
    info!(
        "calendar: {} trading days across {} instruments",
        calendar.len(),
        series.len()
    );

    let periods = generate_all_periods(durations, &calendar)?;
    if let Some(store) = store {
        store.replace_periods(durations, &periods)?;
    }
    info!("periods: {} rows over {} durations", periods.len(), durations.len());

    let returns = compute_returns(&periods, series)?;
    if let Some(store) = store {
        store.replace_metric(MetricKind::Return, &returns)?;
    }
    info!("returns: {} rows", returns.len());

    let volatility = compute_volatility(durations, &periods, &returns, &symbols)?;
    if let Some(store) = store {
        store.replace_metric(MetricKind::Volatility, &volatility)?;
    }
    info!("volatility: {} rows", volatility.len());

    let ulcer = compute_ulcer_index(durations, &periods, series)?;
    if let Some(store) = store {
        store.replace_metric(MetricKind::Ulcer, &ulcer)?;
    }
    info!("ulcer index: {} rows", ulcer.len());

    let trend = compute_trend(series, params);
    if let Some(store) = store {
        store.replace_trend(&trend)?;
    }
    info!("trend: {} rows", trend.len());

    Ok(DerivedData {
        durations: durations.to_vec(),
        periods,
        returns,
        volatility,
        ulcer,
        trend,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::duration::DurationUnit;
    use crate::domain::quote::Quote;
    use crate::domain::series::QuoteSeries;
    use std::cell::RefCell;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, n).unwrap()
    }

    fn make_series(symbol: &str, closes: &[f64]) -> QuoteSeries {
        let quotes = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Quote {
                symbol: symbol.to_string(),
                date: day(i as u32 + 1),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 100,
                adj_close: c,
            })
            .collect();
        QuoteSeries::new(symbol, quotes).unwrap()
    }

    fn durations() -> Vec<Duration> {
        vec![
            Duration::new(1, DurationUnit::Day, 1, 1),
            Duration::new(2, DurationUnit::Day, 3, 3),
        ]
    }

    fn book() -> QuoteBook {
        QuoteBook::new(vec![
            make_series("AAA", &[10.0, 11.0, 10.5, 12.0, 12.5, 11.0, 13.0]),
            make_series("BBB", &[20.0, 19.0, 21.0, 20.0, 22.0, 23.0, 21.0]),
        ])
    }

    #[derive(Default)]
    struct RecordingStore {
        calls: RefCell<Vec<String>>,
        fail_on: Option<MetricKind>,
    }

    impl DerivedStore for RecordingStore {
        fn replace_periods(&self, _: &[Duration], _: &[Period]) -> Result<(), RotatorError> {
            self.calls.borrow_mut().push("periods".into());
            Ok(())
        }

        fn replace_metric(&self, kind: MetricKind, _: &[MetricRow]) -> Result<(), RotatorError> {
            if self.fail_on == Some(kind) {
                return Err(RotatorError::DatabaseQuery {
                    reason: "disk full".into(),
                });
            }
            self.calls.borrow_mut().push(kind.to_string());
            Ok(())
        }

        fn replace_trend(&self, _: &[TrendPoint]) -> Result<(), RotatorError> {
            self.calls.borrow_mut().push("trend".into());
            Ok(())
        }

        fn load_derived(&self) -> Result<DerivedData, RotatorError> {
            Ok(DerivedData::default())
        }
    }

    #[test]
    fn compute_all_produces_every_table() {
        let data = compute_all(&book(), &durations(), &ParabolicParams::default()).unwrap();

        // 7 dates: 6 daily periods, 4 three-day periods
        assert_eq!(data.periods.len(), 10);
        assert_eq!(data.returns.len(), 20);
        assert!(!data.volatility.is_empty());
        assert_eq!(data.ulcer.len(), 8);
        assert!(data.trend.iter().all(|p| p.symbol == "AAA" || p.symbol == "BBB"));
    }

    #[test]
    fn compute_all_is_deterministic() {
        let first = compute_all(&book(), &durations(), &ParabolicParams::default()).unwrap();
        let second = compute_all(&book(), &durations(), &ParabolicParams::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rebuild_writes_steps_in_order() {
        let store = RecordingStore::default();
        let summary = rebuild(&book(), &durations(), &ParabolicParams::default(), &store).unwrap();

        assert_eq!(
            *store.calls.borrow(),
            vec!["periods", "return", "volatility", "ulcer", "trend"]
        );
        assert_eq!(summary.periods, 10);
        assert_eq!(summary.durations, 2);
    }

    #[test]
    fn rebuild_stops_at_failed_step() {
        let store = RecordingStore {
            fail_on: Some(MetricKind::Volatility),
            ..Default::default()
        };
        let result = rebuild(&book(), &durations(), &ParabolicParams::default(), &store);

        assert!(matches!(result, Err(RotatorError::DatabaseQuery { .. })));
        assert_eq!(*store.calls.borrow(), vec!["periods", "return"]);
    }

    #[test]
    fn insufficient_history_is_raised() {
        let short = QuoteBook::new(vec![make_series("AAA", &[10.0, 11.0])]);
        let result = compute_all(&short, &durations(), &ParabolicParams::default());
        assert!(matches!(
            result,
            Err(RotatorError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn metric_values_resolve_by_period_end() {
        let data = compute_all(&book(), &durations(), &ParabolicParams::default()).unwrap();

        let key = MetricKey::parse("return_day_3").unwrap();
        let values = data.metric_values(&key, day(4)).unwrap();
        assert!((values["AAA"] - 0.2).abs() < 1e-12);
        assert!((values["BBB"] - 0.0).abs() < 1e-12);

        // No three-day period ends on day 3.
        assert!(data.metric_values(&key, day(3)).unwrap().is_empty());
    }

    #[test]
    fn metric_values_trend_is_signed_stance() {
        let data = compute_all(&book(), &durations(), &ParabolicParams::default()).unwrap();
        let Some(point) = data.trend.first() else {
            return;
        };
        let values = data.metric_values(&MetricKey::trend(), point.date).unwrap();
        assert_eq!(values[&point.symbol], point.stance.signum());
    }

    #[test]
    fn metric_values_unknown_duration() {
        let data = compute_all(&book(), &durations(), &ParabolicParams::default()).unwrap();
        let key = MetricKey::parse("return_month_6").unwrap();
        assert!(matches!(
            data.metric_values(&key, day(4)),
            Err(RotatorError::ConfigInvalid { .. })
        ));
    }
}
