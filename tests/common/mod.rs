#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use rotator::domain::error::RotatorError;
use rotator::domain::quote::{Instrument, Quote};
use rotator::domain::series::{QuoteBook, QuoteSeries};
use rotator::ports::quote_port::QuotePort;
use std::collections::HashMap;
use std::io::Write;

pub struct MockQuotePort {
    pub data: HashMap<String, Vec<Quote>>,
    pub errors: HashMap<String, String>,
}

impl MockQuotePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_quotes(mut self, symbol: &str, quotes: Vec<Quote>) -> Self {
        self.data.insert(symbol.to_string(), quotes);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    fn check(&self, symbol: &str) -> Result<(), RotatorError> {
        match self.errors.get(symbol) {
            Some(reason) => Err(RotatorError::Database {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl QuotePort for MockQuotePort {
    fn list_instruments(&self) -> Result<Vec<Instrument>, RotatorError> {
        let mut symbols: Vec<&String> = self.data.keys().collect();
        symbols.sort();
        Ok(symbols.into_iter().map(|s| Instrument::new(s.as_str(), "")).collect())
    }

    fn fetch_quotes(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Quote>, RotatorError> {
        self.check(symbol)?;
        let quotes = self.data.get(symbol).ok_or_else(|| RotatorError::NoData {
            symbol: symbol.to_string(),
        })?;
        Ok(quotes
            .iter()
            .filter(|q| start_date.is_none_or(|s| q.date >= s) && end_date.is_none_or(|e| q.date <= e))
            .cloned()
            .collect())
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RotatorError> {
        self.check(symbol)?;
        Ok(match self.data.get(symbol) {
            Some(quotes) if !quotes.is_empty() => {
                let min = quotes.iter().map(|q| q.date).min().unwrap();
                let max = quotes.iter().map(|q| q.date).max().unwrap();
                Some((min, max, quotes.len()))
            }
            _ => None,
        })
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// `n` consecutive weekdays starting at `start` (or the next weekday).
pub fn weekdays(start: &str, n: usize) -> Vec<NaiveDate> {
    let mut d = date(start);
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(d);
        }
        d = d.succ_opt().unwrap();
    }
    out
}

pub fn make_quote(symbol: &str, date: NaiveDate, adj_close: f64) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        date,
        open: adj_close,
        high: adj_close * 1.01,
        low: adj_close * 0.99,
        close: adj_close,
        volume: 1_000,
        adj_close,
    }
}

/// Quotes compounding at `daily_growth` per bar from `start_price`.
pub fn compounding_quotes(
    symbol: &str,
    dates: &[NaiveDate],
    start_price: f64,
    daily_growth: f64,
) -> Vec<Quote> {
    dates
        .iter()
        .enumerate()
        .map(|(i, &d)| make_quote(symbol, d, start_price * (1.0 + daily_growth).powi(i as i32)))
        .collect()
}

pub fn make_series(symbol: &str, quotes: Vec<Quote>) -> QuoteSeries {
    QuoteSeries::new(symbol, quotes).unwrap()
}

/// Three instruments over the same weekdays: GRO rises, FLT is flat, DEC falls.
pub fn sample_quotes(n: usize) -> Vec<(String, Vec<Quote>)> {
    let dates = weekdays("2012-01-02", n);
    vec![
        ("DEC".to_string(), compounding_quotes("DEC", &dates, 80.0, -0.001)),
        ("FLT".to_string(), compounding_quotes("FLT", &dates, 100.0, 0.0)),
        ("GRO".to_string(), compounding_quotes("GRO", &dates, 50.0, 0.002)),
    ]
}

pub fn sample_book(n: usize) -> QuoteBook {
    QuoteBook::new(
        sample_quotes(n)
            .into_iter()
            .map(|(symbol, quotes)| make_series(&symbol, quotes))
            .collect(),
    )
}

pub fn sample_port(n: usize) -> MockQuotePort {
    sample_quotes(n)
        .into_iter()
        .fold(MockQuotePort::new(), |port, (symbol, quotes)| {
            port.with_quotes(&symbol, quotes)
        })
}

/// Config text for the sample universe. `db_path` fills `[sqlite] path`.
pub fn sample_ini(db_path: &str) -> String {
    format!(
        r#"
[sqlite]
path = {db_path}
pool_size = 2

[instruments]
GRO = Growth ETF
FLT = Flat ETF
DEC = Declining ETF

[durations]
day_1 = 1
day_20 = 20
month_1 = 21

[trend]
step = 0.02
max = 0.2

[screen]
aggregation = rank
metrics = return_month_1, volatility_day_20
weights = 0.7, 0.3
directions = higher, lower

[backtest]
initial_capital = 10000
benchmark = FLT
cadence = monthly
"#
    )
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Writes one `<SYMBOL>.csv` per sample instrument into `dir`.
pub fn write_sample_csv(dir: &std::path::Path, n: usize) {
    for (symbol, quotes) in sample_quotes(n) {
        let mut text = String::from("Date,Open,High,Low,Close,Volume,Adj Close\n");
        for q in quotes {
            text.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                q.date, q.open, q.high, q.low, q.close, q.volume, q.adj_close
            ));
        }
        std::fs::write(dir.join(format!("{symbol}.csv")), text).unwrap();
    }
}
