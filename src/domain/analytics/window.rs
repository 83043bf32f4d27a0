//! Date-keyed series with windowed views.
//!
//! `DatedSeries::windows` walks a sequence of `(start, end]` bounds and yields
//! the slice of observations dated inside each one. Two cursors only move
//! forward while bounds advance, so a pass over sorted bounds is linear. Each
//! call starts a fresh iterator.

use chrono::NaiveDate;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatedSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl DatedSeries {
    /// Sorts by date. Callers guarantee dates are unique.
    pub fn new(mut points: Vec<(NaiveDate, f64)>) -> Self {
        points.sort_by_key(|(d, _)| *d);
        let (dates, values) = points.into_iter().unzip();
        Self { dates, values }
    }

    /// The `count` observations ending exactly on `end`, oldest first.
    pub fn trailing(&self, end: NaiveDate, count: usize) -> Option<&[f64]> {
        let hi = self.dates.partition_point(|d| *d <= end);
        if hi == 0 || self.dates[hi - 1] != end || hi < count {
            return None;
        }
        Some(&self.values[hi - count..hi])
    }

    pub fn windows<I>(&self, bounds: I) -> Windows<'_, I::IntoIter>
    where
        I: IntoIterator<Item = (NaiveDate, NaiveDate)>,
    {
        Windows {
            series: self,
            bounds: bounds.into_iter(),
            lo: 0,
            hi: 0,
            last: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Window<'a> {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub values: &'a [f64],
}

pub struct Windows<'a, I> {
    series: &'a DatedSeries,
    bounds: I,
    lo: usize,
    hi: usize,
    last: Option<(NaiveDate, NaiveDate)>,
}

impl<'a, I> Iterator for Windows<'a, I>
where
    I: Iterator<Item = (NaiveDate, NaiveDate)>,
{
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (start, end) = self.bounds.next()?;
        let dates = &self.series.dates;

        // Out-of-order bounds rewind the cursors.
        if let Some((prev_start, prev_end)) = self.last {
            if end < prev_end {
                self.hi = 0;
            }
            if start < prev_start {
                self.lo = 0;
            }
        }
        self.last = Some((start, end));

        while self.hi < dates.len() && dates[self.hi] <= end {
            self.hi += 1;
        }
        while self.lo < dates.len() && dates[self.lo] <= start {
            self.lo += 1;
        }
        let lo = self.lo.min(self.hi);

        Some(Window {
            start,
            end,
            values: &self.series.values[lo..self.hi],
        })
    }
}
