//! Per-instrument quote history with a date index.

use crate::domain::backtest::PriceSource;
use crate::domain::error::RotatorError;
use crate::domain::quote::Quote;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct QuoteSeries {
    pub symbol: String,
    pub quotes: Vec<Quote>,
    date_index: HashMap<NaiveDate, usize>,
}

impl QuoteSeries {
    /// Builds a series from quotes in any order. Fails on a duplicate date,
    /// a quote belonging to another symbol, or an invalid price.
    pub fn new(symbol: impl Into<String>, mut quotes: Vec<Quote>) -> Result<Self, RotatorError> {
        let symbol = symbol.into();
        quotes.sort_by_key(|q| q.date);

        let mut date_index = HashMap::with_capacity(quotes.len());
        for (i, quote) in quotes.iter().enumerate() {
            if quote.symbol != symbol {
                return Err(RotatorError::integrity(format!(
                    "quote for {} found in {} series",
                    quote.symbol, symbol
                )));
            }
            quote.validate()?;
            if date_index.insert(quote.date, i).is_some() {
                return Err(RotatorError::integrity(format!(
                    "duplicate quote for {} on {}",
                    symbol, quote.date
                )));
            }
        }

        Ok(Self {
            symbol,
            quotes,
            date_index,
        })
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&Quote> {
        self.date_index.get(&date).map(|&i| &self.quotes[i])
    }

    pub fn adj_close(&self, date: NaiveDate) -> Option<f64> {
        self.get(date).map(|q| q.adj_close)
    }
}

/// All loaded series, addressable by symbol.
#[derive(Debug, Clone, Default)]
pub struct QuoteBook {
    series: Vec<QuoteSeries>,
    index: HashMap<String, usize>,
}

impl QuoteBook {
    pub fn new(series: Vec<QuoteSeries>) -> Self {
        let index = series
            .iter()
            .enumerate()
            .map(|(i, s)| (s.symbol.clone(), i))
            .collect();
        Self { series, index }
    }

    pub fn series(&self) -> &[QuoteSeries] {
        &self.series
    }

    pub fn get(&self, symbol: &str) -> Option<&QuoteSeries> {
        self.index.get(symbol).map(|&i| &self.series[i])
    }

    pub fn symbols(&self) -> Vec<String> {
        self.series.iter().map(|s| s.symbol.clone()).collect()
    }
}

impl PriceSource for QuoteBook {
    fn price(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        self.get(symbol).and_then(|s| s.adj_close(date))
    }
}
