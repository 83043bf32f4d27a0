//! Derived-table storage port.
//!
//! Each `replace_*` call swaps a whole table's contents atomically: on error
//! nothing from that call is visible.

use crate::domain::analytics::parabolic::TrendPoint;
use crate::domain::analytics::{MetricKind, MetricRow};
use crate::domain::duration::Duration;
use crate::domain::error::RotatorError;
use crate::domain::period::Period;
use crate::domain::pipeline::DerivedData;

pub trait DerivedStore {
    /// Replaces durations and periods. Clears every metric table and the
    /// trend points, which all derive from the quotes the periods cover.
    fn replace_periods(
        &self,
        durations: &[Duration],
        periods: &[Period],
    ) -> Result<(), RotatorError>;

    fn replace_metric(&self, kind: MetricKind, rows: &[MetricRow]) -> Result<(), RotatorError>;

    fn replace_trend(&self, points: &[TrendPoint]) -> Result<(), RotatorError>;

    fn load_derived(&self) -> Result<DerivedData, RotatorError>;
}
