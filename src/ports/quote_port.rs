//! Quote access port traits.

use crate::domain::error::RotatorError;
use crate::domain::quote::{Instrument, Quote};
use chrono::NaiveDate;

/// Read side of the quote store.
pub trait QuotePort {
    fn list_instruments(&self) -> Result<Vec<Instrument>, RotatorError>;

    /// Quotes for one symbol in date order, bounded inclusively when given.
    fn fetch_quotes(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Quote>, RotatorError>;

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RotatorError>;
}

/// Write side used by the importer.
pub trait QuoteSink {
    fn save_instrument(&self, instrument: &Instrument) -> Result<(), RotatorError>;

    /// Upserts by `(symbol, date)`. Returns the number of rows written.
    fn save_quotes(&self, quotes: &[Quote]) -> Result<usize, RotatorError>;
}
