//! Parabolic stop-and-reverse trend engine.
//!
//! Bootstrap: the first bar `i` that is a local low pivot
//! (L[i-1] > L[i] < L[i+1]) starts a long stance with STOP = L[i] and
//! EXTREME = H[i+1]; a local high pivot (H[i-1] < H[i] > H[i+1]) starts a
//! short stance with STOP = H[i] and EXTREME = L[i+1]. A bar that is both is
//! skipped. The pivot is confirmed on bar i+1 and output starts on bar i+2.
//!
//! Each later bar t, long stance:
//! - STOP > L[t] reverses to short: STOP = EXTREME, AF = step, EXTREME = L[t]
//! - otherwise EXTREME = max(EXTREME, H[t]),
//!   STOP = STOP + AF * (EXTREME - STOP) clamped to min(L[t-1], L[t-2]),
//!   then AF += step (capped) if EXTREME moved.
//!
//! Short stance mirrors with highs and minima.

use crate::domain::quote::Quote;
use crate::domain::series::QuoteSeries;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_STEP: f64 = 0.02;
pub const DEFAULT_MAX: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParabolicParams {
    pub step: f64,
    pub max: f64,
}

impl Default for ParabolicParams {
    fn default() -> Self {
        ParabolicParams {
            step: DEFAULT_STEP,
            max: DEFAULT_MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stance {
    Long,
    Short,
}

impl Stance {
    /// +1 long, -1 short; the value the screen ranks on.
    pub fn signum(&self) -> f64 {
        match self {
            Stance::Long => 1.0,
            Stance::Short => -1.0,
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stance::Long => write!(f, "long"),
            Stance::Short => write!(f, "short"),
        }
    }
}

impl FromStr for Stance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "long" => Ok(Stance::Long),
            "short" => Ok(Stance::Short),
            other => Err(format!("unknown stance '{other}'")),
        }
    }
}

/// One emitted `(symbol, date) -> (stance, stop)` row.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub symbol: String,
    pub date: NaiveDate,
    pub stance: Stance,
    pub stop: f64,
}

/// Per-instrument engine state threaded through the scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParabolicContext {
    pub stance: Stance,
    pub stop: f64,
    pub extreme: f64,
    pub af: f64,
}

impl ParabolicContext {
    /// Advances to bar `t`. Requires `t >= 2`.
    pub fn step(&mut self, bars: &[Quote], t: usize, params: &ParabolicParams) {
        let bar = &bars[t];
        match self.stance {
            Stance::Long => {
                if self.stop > bar.low {
                    self.reverse(Stance::Short, bar.low, params);
                    return;
                }
                let new_extreme = bar.high > self.extreme;
                if new_extreme {
                    self.extreme = bar.high;
                }
                let stop = self.stop + self.af * (self.extreme - self.stop);
                self.stop = stop.min(bars[t - 1].low).min(bars[t - 2].low);
                if new_extreme {
                    self.accelerate(params);
                }
            }
            Stance::Short => {
                if self.stop < bar.high {
                    self.reverse(Stance::Long, bar.high, params);
                    return;
                }
                let new_extreme = bar.low < self.extreme;
                if new_extreme {
                    self.extreme = bar.low;
                }
                let stop = self.stop + self.af * (self.extreme - self.stop);
                self.stop = stop.max(bars[t - 1].high).max(bars[t - 2].high);
                if new_extreme {
                    self.accelerate(params);
                }
            }
        }
    }

    fn reverse(&mut self, stance: Stance, extreme: f64, params: &ParabolicParams) {
        self.stance = stance;
        self.stop = self.extreme;
        self.extreme = extreme;
        self.af = params.step;
    }

    fn accelerate(&mut self, params: &ParabolicParams) {
        self.af = (self.af + params.step).min(params.max);
    }
}

/// Finds the first pivot. Returns the index of the confirming bar and the
/// starting state.
pub fn bootstrap(bars: &[Quote], params: &ParabolicParams) -> Option<(usize, ParabolicContext)> {
    if bars.len() < 3 {
        return None;
    }
    for i in 1..bars.len() - 1 {
        let (prev, cur, next) = (&bars[i - 1], &bars[i], &bars[i + 1]);
        let high_pivot = prev.high < cur.high && cur.high > next.high;
        let low_pivot = prev.low > cur.low && cur.low < next.low;

        let ctx = match (high_pivot, low_pivot) {
            (false, true) => ParabolicContext {
                stance: Stance::Long,
                stop: cur.low,
                extreme: next.high,
                af: params.step,
            },
            (true, false) => ParabolicContext {
                stance: Stance::Short,
                stop: cur.high,
                extreme: next.low,
                af: params.step,
            },
            _ => continue,
        };
        return Some((i + 1, ctx));
    }
    None
}

/// Engine state after each output bar, in date order.
pub fn trace(bars: &[Quote], params: &ParabolicParams) -> Vec<(NaiveDate, ParabolicContext)> {
    let Some((confirmed, mut ctx)) = bootstrap(bars, params) else {
        return Vec::new();
    };
    (confirmed + 1..bars.len())
        .map(|t| {
            ctx.step(bars, t, params);
            (bars[t].date, ctx)
        })
        .collect()
}

pub fn compute_trend(series: &[QuoteSeries], params: &ParabolicParams) -> Vec<TrendPoint> {
    series
        .iter()
        .flat_map(|s| {
            trace(&s.quotes, params)
                .into_iter()
                .map(|(date, ctx)| TrendPoint {
                    symbol: s.symbol.clone(),
                    date,
                    stance: ctx.stance,
                    stop: ctx.stop,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn make_bars(hl: &[(f64, f64)]) -> Vec<Quote> {
        hl.iter()
            .enumerate()
            .map(|(i, &(high, low))| Quote {
                symbol: "GLD".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: (high + low) / 2.0,
                high,
                low,
                close: (high + low) / 2.0,
                volume: 1000,
                adj_close: (high + low) / 2.0,
            })
            .collect()
    }

    #[test]
    fn fewer_than_three_bars_yields_nothing() {
        let bars = make_bars(&[(10.0, 9.0), (11.0, 10.0)]);
        assert!(trace(&bars, &ParabolicParams::default()).is_empty());
    }

    #[test]
    fn no_pivot_yields_nothing() {
        let bars = make_bars(&[(10.0, 9.0), (11.0, 10.0), (12.0, 11.0), (13.0, 12.0)]);
        assert!(bootstrap(&bars, &ParabolicParams::default()).is_none());
    }

    #[test]
    fn low_pivot_bootstraps_long() {
        let bars = make_bars(&[(10.0, 9.0), (9.5, 8.0), (11.0, 9.5), (12.0, 10.0)]);
        let (confirmed, ctx) = bootstrap(&bars, &ParabolicParams::default()).unwrap();

        assert_eq!(confirmed, 2);
        assert_eq!(ctx.stance, Stance::Long);
        assert_eq!(ctx.stop, 8.0);
        assert_eq!(ctx.extreme, 11.0);
        assert_eq!(ctx.af, 0.02);
    }

    #[test]
    fn high_pivot_bootstraps_short() {
        let bars = make_bars(&[(10.0, 9.0), (12.0, 9.5), (11.0, 8.0)]);
        let (confirmed, ctx) = bootstrap(&bars, &ParabolicParams::default()).unwrap();

        assert_eq!(confirmed, 2);
        assert_eq!(ctx.stance, Stance::Short);
        assert_eq!(ctx.stop, 12.0);
        assert_eq!(ctx.extreme, 8.0);
    }

    #[test]
    fn double_pivot_is_skipped() {
        // Bar 1 is both a high and a low pivot; bar 3 is the first plain low pivot.
        let bars = make_bars(&[
            (10.0, 9.0),
            (12.0, 8.0),
            (11.0, 8.5),
            (10.0, 7.0),
            (11.0, 9.0),
        ]);
        let (confirmed, ctx) = bootstrap(&bars, &ParabolicParams::default()).unwrap();
        assert_eq!(confirmed, 4);
        assert_eq!(ctx.stance, Stance::Long);
        assert_eq!(ctx.stop, 7.0);
        assert_eq!(ctx.extreme, 11.0);
    }

    #[test]
    fn output_starts_after_confirmation() {
        let bars = make_bars(&[
            (10.0, 9.0),
            (9.5, 8.0),
            (11.0, 9.5),
            (12.0, 10.0),
            (13.0, 11.0),
        ]);
        let points = trace(&bars, &ParabolicParams::default());

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].0, bars[3].date);
        assert_eq!(points[1].0, bars[4].date);
    }

    #[test]
    fn long_update_accelerates_after_new_extreme() {
        let bars = make_bars(&[
            (10.0, 9.0),
            (9.5, 8.0),
            (11.0, 9.5),
            (12.0, 10.0),
        ]);
        let points = trace(&bars, &ParabolicParams::default());
        let (_, ctx) = points[0];

        // extreme 11 -> 12, stop = 8 + 0.02 * (12 - 8), clamp min(9.5, 8.0) = 8.0
        assert_eq!(ctx.stance, Stance::Long);
        assert_eq!(ctx.extreme, 12.0);
        assert!((ctx.stop - 8.0).abs() < 1e-12);
        assert!((ctx.af - 0.04).abs() < 1e-12);
    }

    #[test]
    fn long_stop_trails_without_clamp() {
        let bars = make_bars(&[
            (10.0, 9.0),
            (9.5, 8.0),
            (11.0, 9.5),
            (12.0, 10.0),
            (12.5, 11.0),
        ]);
        let points = trace(&bars, &ParabolicParams::default());
        let (_, ctx) = points[1];

        // stop 8.0, af 0.04, extreme 12.5 -> 8 + 0.04 * 4.5 = 8.18 < min(10, 9.5)
        assert!((ctx.stop - 8.18).abs() < 1e-12);
        assert!((ctx.af - 0.06).abs() < 1e-12);
    }

    #[test]
    fn long_reverses_when_stop_exceeds_low() {
        let bars = make_bars(&[
            (10.0, 9.0),
            (9.5, 8.0),
            (11.0, 9.5),
            (12.0, 10.0),
            (9.0, 7.5),
        ]);
        let points = trace(&bars, &ParabolicParams::default());
        let (_, ctx) = points[1];

        // stop 8.0 > low 7.5: short, stop = prior extreme 12, extreme = 7.5
        assert_eq!(ctx.stance, Stance::Short);
        assert_eq!(ctx.stop, 12.0);
        assert_eq!(ctx.extreme, 7.5);
        assert_eq!(ctx.af, 0.02);
    }

    #[test]
    fn short_reverses_when_stop_below_high() {
        let bars = make_bars(&[(10.0, 9.0), (12.0, 9.5), (11.0, 8.0), (13.0, 10.0)]);
        let points = trace(&bars, &ParabolicParams::default());
        let (_, ctx) = points[0];

        assert_eq!(ctx.stance, Stance::Long);
        assert_eq!(ctx.stop, 8.0);
        assert_eq!(ctx.extreme, 13.0);
    }

    #[test]
    fn short_stop_clamped_to_recent_highs() {
        let bars = make_bars(&[
            (10.0, 9.0),
            (12.0, 9.5),
            (11.0, 8.0),
            (10.5, 7.0),
        ]);
        let points = trace(&bars, &ParabolicParams::default());
        let (_, ctx) = points[0];

        // stop 12 + 0.02 * (7 - 12) = 11.9, clamp max(11, 12) = 12
        assert_eq!(ctx.stance, Stance::Short);
        assert_eq!(ctx.stop, 12.0);
        assert_eq!(ctx.extreme, 7.0);
        assert!((ctx.af - 0.04).abs() < 1e-12);
    }

    #[test]
    fn compute_trend_labels_rows() {
        let quotes = make_bars(&[
            (10.0, 9.0),
            (9.5, 8.0),
            (11.0, 9.5),
            (12.0, 10.0),
        ]);
        let series = QuoteSeries::new("GLD", quotes).unwrap();
        let points = compute_trend(&[series], &ParabolicParams::default());

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].symbol, "GLD");
        assert_eq!(points[0].stance, Stance::Long);
        assert_eq!(points[0].stance.to_string(), "long");
    }

    fn random_walk() -> impl Strategy<Value = Vec<(f64, f64)>> {
        prop::collection::vec((-2.0f64..2.0, 0.1f64..3.0), 3..120).prop_map(|steps| {
            let mut mid = 100.0;
            steps
                .into_iter()
                .map(|(drift, spread)| {
                    mid = (mid + drift).max(5.0);
                    (mid + spread / 2.0, mid - spread / 2.0)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn af_bounded_and_only_resets_on_reversal(hl in random_walk()) {
            let params = ParabolicParams::default();
            let bars = make_bars(&hl);
            let points = trace(&bars, &params);
            let mut prev: Option<ParabolicContext> = None;
            for (_, ctx) in points {
                prop_assert!(ctx.af <= params.max + 1e-12);
                prop_assert!(ctx.af >= params.step - 1e-12);
                if let Some(p) = prev {
                    if ctx.af < p.af {
                        prop_assert!(ctx.stance != p.stance);
                        prop_assert!((ctx.af - params.step).abs() < 1e-12);
                    }
                }
                prev = Some(ctx);
            }
        }

        #[test]
        fn stance_flips_iff_stop_crossed(hl in random_walk()) {
            let params = ParabolicParams::default();
            let bars = make_bars(&hl);
            let Some((confirmed, mut ctx)) = bootstrap(&bars, &params) else {
                return Ok(());
            };
            for t in confirmed + 1..bars.len() {
                let before = ctx;
                ctx.step(&bars, t, &params);
                let crossed = match before.stance {
                    Stance::Long => before.stop > bars[t].low,
                    Stance::Short => before.stop < bars[t].high,
                };
                prop_assert_eq!(crossed, ctx.stance != before.stance);
            }
        }
    }
}
