//! CSV quote files, one `<SYMBOL>.csv` per instrument.
//!
//! Expected header: `Date,Open,High,Low,Close,Volume,Adj Close`. Columns are
//! matched by name, case-insensitively. Without an `Adj Close` column the
//! close doubles as the adjusted close.

use crate::domain::error::RotatorError;
use crate::domain::quote::{Instrument, Quote};
use crate::ports::quote_port::QuotePort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    adj_close: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord, file: &str) -> Result<Self, RotatorError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                RotatorError::integrity(format!("{file}: missing column '{name}'"))
            })
        };
        Ok(Columns {
            date: require("date")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: require("volume")?,
            adj_close: find("adj close").or_else(|| find("adj_close")),
        })
    }
}

fn field<'r>(record: &'r StringRecord, idx: usize, name: &str, line: u64) -> Result<&'r str, RotatorError> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| RotatorError::integrity(format!("line {line}: missing {name} value")))
}

fn number(record: &StringRecord, idx: usize, name: &str, line: u64) -> Result<f64, RotatorError> {
    let raw = field(record, idx, name, line)?;
    raw.parse()
        .map_err(|e| RotatorError::integrity(format!("line {line}: invalid {name} '{raw}': {e}")))
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    fn read_all(&self, symbol: &str) -> Result<Vec<Quote>, RotatorError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => RotatorError::NoData {
                symbol: symbol.to_string(),
            },
            _ => RotatorError::Io(e),
        })?;
        let file = path.display().to_string();

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| RotatorError::integrity(format!("{file}: {e}")))?
            .clone();
        let cols = Columns::from_headers(&headers, &file)?;

        let mut quotes = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| RotatorError::integrity(format!("{file}: {e}")))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let date_str = field(&record, cols.date, "date", line)?;
            let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT).map_err(|e| {
                RotatorError::integrity(format!("line {line}: invalid date '{date_str}': {e}"))
            })?;
            let close = number(&record, cols.close, "close", line)?;
            let adj_close = match cols.adj_close {
                Some(idx) => number(&record, idx, "adj close", line)?,
                None => close,
            };
            let volume = number(&record, cols.volume, "volume", line)?;

            quotes.push(Quote {
                symbol: symbol.to_string(),
                date,
                open: number(&record, cols.open, "open", line)?,
                high: number(&record, cols.high, "high", line)?,
                low: number(&record, cols.low, "low", line)?,
                close,
                volume: volume.round() as i64,
                adj_close,
            });
        }

        quotes.sort_by_key(|q| q.date);
        Ok(quotes)
    }
}

impl QuotePort for CsvAdapter {
    /// Every `*.csv` file in the base directory, named by its stem.
    fn list_instruments(&self) -> Result<Vec<Instrument>, RotatorError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut instruments = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                instruments.push(Instrument::new(stem, ""));
            }
        }

        instruments.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(instruments)
    }

    fn fetch_quotes(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Quote>, RotatorError> {
        let mut quotes = self.read_all(symbol)?;
        quotes.retain(|q| {
            start_date.is_none_or(|s| q.date >= s) && end_date.is_none_or(|e| q.date <= e)
        });
        Ok(quotes)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RotatorError> {
        let quotes = match self.read_all(symbol) {
            Ok(q) => q,
            Err(RotatorError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (quotes.first(), quotes.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, quotes.len())),
            _ => None,
        })
    }
}
