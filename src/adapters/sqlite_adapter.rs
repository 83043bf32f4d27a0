//! SQLite storage adapter: quotes in, derived tables out.

use crate::domain::analytics::parabolic::{Stance, TrendPoint};
use crate::domain::analytics::{MetricKey, MetricKind, MetricRow};
use crate::domain::config_validation::{load_database_path, load_pool_size};
use crate::domain::duration::{Duration, DurationUnit};
use crate::domain::error::RotatorError;
use crate::domain::period::Period;
use crate::domain::pipeline::DerivedData;
use crate::domain::quote::{Instrument, Quote};
use crate::domain::screen::MetricSource;
use crate::ports::config_port::ConfigPort;
use crate::ports::quote_port::{QuotePort, QuoteSink};
use crate::ports::store_port::DerivedStore;
use chrono::NaiveDate;
use log::debug;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Row, params};
use std::collections::HashMap;

const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS instrument (
    symbol TEXT PRIMARY KEY,
    description TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS quote (
    symbol TEXT NOT NULL,
    date TEXT NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    volume INTEGER NOT NULL,
    adj_close REAL NOT NULL,
    PRIMARY KEY (symbol, date)
);
CREATE INDEX IF NOT EXISTS idx_quote_date ON quote(date);
CREATE TABLE IF NOT EXISTS duration (
    id INTEGER PRIMARY KEY,
    unit TEXT NOT NULL,
    unit_qty INTEGER NOT NULL,
    trading_days INTEGER NOT NULL,
    UNIQUE (unit, unit_qty)
);
CREATE TABLE IF NOT EXISTS period (
    id INTEGER PRIMARY KEY,
    duration_id INTEGER NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    UNIQUE (duration_id, start_date, end_date)
);
CREATE INDEX IF NOT EXISTS idx_period_end ON period(end_date);
CREATE TABLE IF NOT EXISTS metric_value (
    kind TEXT NOT NULL,
    symbol TEXT NOT NULL,
    period_id INTEGER NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (kind, symbol, period_id)
);
CREATE TABLE IF NOT EXISTS trend_point (
    symbol TEXT NOT NULL,
    date TEXT NOT NULL,
    stance TEXT NOT NULL,
    stop REAL NOT NULL,
    PRIMARY KEY (symbol, date)
);
CREATE INDEX IF NOT EXISTS idx_trend_date ON trend_point(date);";

fn pool_err(e: r2d2::Error) -> RotatorError {
    RotatorError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> RotatorError {
    RotatorError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parsed_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let text: String = row.get(idx)?;
    text.parse::<T>().map_err(|reason| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            reason.into(),
        )
    })
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, RotatorError> {
        let db_path = load_database_path(config)?;
        let pool_size = load_pool_size(config)?;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    /// Single-connection pool; every pooled connection would otherwise get
    /// its own empty database.
    pub fn in_memory() -> Result<Self, RotatorError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(pool_err)?;
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, RotatorError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), RotatorError> {
        self.conn()?.execute_batch(SCHEMA).map_err(query_err)
    }

    fn query_all<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, RotatorError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(query_err)?;
        let rows = stmt.query_map(params, map).map_err(query_err)?;
        rows.collect::<rusqlite::Result<Vec<T>>>().map_err(query_err)
    }

    fn load_durations(&self) -> Result<Vec<Duration>, RotatorError> {
        self.query_all(
            "SELECT id, unit, unit_qty, trading_days FROM duration ORDER BY id",
            [],
            |row| {
                let unit: DurationUnit = parsed_column(row, 1)?;
                let trading_days: i64 = row.get(3)?;
                Ok(Duration::new(row.get(0)?, unit, row.get(2)?, trading_days as usize))
            },
        )
    }

    fn load_periods(&self) -> Result<Vec<Period>, RotatorError> {
        self.query_all(
            "SELECT id, duration_id, start_date, end_date FROM period ORDER BY id",
            [],
            |row| {
                Ok(Period {
                    id: row.get(0)?,
                    duration_id: row.get(1)?,
                    start: date_column(row, 2)?,
                    end: date_column(row, 3)?,
                })
            },
        )
    }

    fn load_metric(&self, kind: MetricKind) -> Result<Vec<MetricRow>, RotatorError> {
        self.query_all(
            "SELECT symbol, period_id, value FROM metric_value WHERE kind = ?1 ORDER BY rowid",
            params![kind.as_str()],
            |row| {
                Ok(MetricRow {
                    symbol: row.get(0)?,
                    period_id: row.get(1)?,
                    value: row.get(2)?,
                })
            },
        )
    }

    fn load_trend(&self) -> Result<Vec<TrendPoint>, RotatorError> {
        self.query_all(
            "SELECT symbol, date, stance, stop FROM trend_point ORDER BY rowid",
            [],
            |row| {
                Ok(TrendPoint {
                    symbol: row.get(0)?,
                    date: date_column(row, 1)?,
                    stance: parsed_column(row, 2)?,
                    stop: row.get(3)?,
                })
            },
        )
    }
}

impl QuotePort for SqliteAdapter {
    fn list_instruments(&self) -> Result<Vec<Instrument>, RotatorError> {
        self.query_all(
            "SELECT symbol, description FROM instrument ORDER BY symbol",
            [],
            |row| {
                Ok(Instrument {
                    symbol: row.get(0)?,
                    description: row.get(1)?,
                })
            },
        )
    }

    fn fetch_quotes(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Quote>, RotatorError> {
        let start = start_date.map(format_date);
        let end = end_date.map(format_date);
        self.query_all(
            "SELECT symbol, date, open, high, low, close, volume, adj_close
             FROM quote
             WHERE symbol = ?1
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)
             ORDER BY date ASC",
            params![symbol, start, end],
            |row| {
                Ok(Quote {
                    symbol: row.get(0)?,
                    date: date_column(row, 1)?,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    volume: row.get(6)?,
                    adj_close: row.get(7)?,
                })
            },
        )
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RotatorError> {
        let result: (Option<String>, Option<String>, i64) = self
            .conn()?
            .query_row(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM quote WHERE symbol = ?1",
                params![symbol],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                let parse = |s: &str| {
                    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| RotatorError::Database {
                        reason: e.to_string(),
                    })
                };
                Ok(Some((parse(&min_str)?, parse(&max_str)?, count as usize)))
            }
            _ => Ok(None),
        }
    }
}

impl QuoteSink for SqliteAdapter {
    fn save_instrument(&self, instrument: &Instrument) -> Result<(), RotatorError> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO instrument (symbol, description) VALUES (?1, ?2)",
                params![instrument.symbol, instrument.description],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn save_quotes(&self, quotes: &[Quote]) -> Result<usize, RotatorError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO quote
                     (symbol, date, open, high, low, close, volume, adj_close)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(query_err)?;
            for q in quotes {
                stmt.execute(params![
                    q.symbol,
                    format_date(q.date),
                    q.open,
                    q.high,
                    q.low,
                    q.close,
                    q.volume,
                    q.adj_close
                ])
                .map_err(query_err)?;
            }
        }
        tx.commit().map_err(query_err)?;
        Ok(quotes.len())
    }
}

impl DerivedStore for SqliteAdapter {
    fn replace_periods(
        &self,
        durations: &[Duration],
        periods: &[Period],
    ) -> Result<(), RotatorError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        tx.execute_batch(
            "DELETE FROM metric_value; DELETE FROM trend_point; DELETE FROM period; DELETE FROM duration;",
        )
            .map_err(query_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO duration (id, unit, unit_qty, trading_days) VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(query_err)?;
            for d in durations {
                stmt.execute(params![
                    d.id,
                    d.unit.to_string(),
                    d.unit_qty,
                    d.trading_days as i64
                ])
                .map_err(query_err)?;
            }
            let mut stmt = tx
                .prepare(
                    "INSERT INTO period (id, duration_id, start_date, end_date) VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(query_err)?;
            for p in periods {
                stmt.execute(params![
                    p.id,
                    p.duration_id,
                    format_date(p.start),
                    format_date(p.end)
                ])
                .map_err(query_err)?;
            }
        }
        tx.commit().map_err(query_err)?;
        debug!("stored {} durations, {} periods", durations.len(), periods.len());
        Ok(())
    }

    fn replace_metric(&self, kind: MetricKind, rows: &[MetricRow]) -> Result<(), RotatorError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        tx.execute("DELETE FROM metric_value WHERE kind = ?1", params![kind.as_str()])
            .map_err(query_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO metric_value (kind, symbol, period_id, value) VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(query_err)?;
            for r in rows {
                stmt.execute(params![kind.as_str(), r.symbol, r.period_id, r.value])
                    .map_err(query_err)?;
            }
        }
        tx.commit().map_err(query_err)?;
        debug!("stored {} {kind} rows", rows.len());
        Ok(())
    }

    fn replace_trend(&self, points: &[TrendPoint]) -> Result<(), RotatorError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        tx.execute("DELETE FROM trend_point", []).map_err(query_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO trend_point (symbol, date, stance, stop) VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(query_err)?;
            for p in points {
                stmt.execute(params![
                    p.symbol,
                    format_date(p.date),
                    p.stance.to_string(),
                    p.stop
                ])
                .map_err(query_err)?;
            }
        }
        tx.commit().map_err(query_err)?;
        debug!("stored {} trend points", points.len());
        Ok(())
    }

    fn load_derived(&self) -> Result<DerivedData, RotatorError> {
        Ok(DerivedData {
            durations: self.load_durations()?,
            periods: self.load_periods()?,
            returns: self.load_metric(MetricKind::Return)?,
            volatility: self.load_metric(MetricKind::Volatility)?,
            ulcer: self.load_metric(MetricKind::Ulcer)?,
            trend: self.load_trend()?,
        })
    }
}

impl MetricSource for SqliteAdapter {
    fn metric_values(
        &self,
        key: &MetricKey,
        as_of: NaiveDate,
    ) -> Result<HashMap<String, f64>, RotatorError> {
        let date = format_date(as_of);
        let Some(name) = key.duration.as_deref() else {
            let rows = self.query_all(
                "SELECT symbol, stance FROM trend_point WHERE date = ?1",
                params![date],
                |row| {
                    let stance: Stance = parsed_column(row, 1)?;
                    Ok((row.get::<_, String>(0)?, stance.signum()))
                },
            )?;
            return Ok(rows.into_iter().collect());
        };

        let (unit, qty) = Duration::parse_name(name)
            .map_err(|reason| RotatorError::invalid_config("screen", "metrics", reason))?;
        let known: i64 = self
            .conn()?
            .query_row(
                "SELECT COUNT(*) FROM duration WHERE unit = ?1 AND unit_qty = ?2",
                params![unit.to_string(), qty],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        if known == 0 {
            return Err(RotatorError::invalid_config(
                "screen",
                "metrics",
                format!("no duration named {name}"),
            ));
        }

        let rows = self.query_all(
            "SELECT m.symbol, m.value
             FROM metric_value m
             JOIN period p ON p.id = m.period_id
             JOIN duration d ON d.id = p.duration_id
             WHERE m.kind = ?1 AND d.unit = ?2 AND d.unit_qty = ?3 AND p.end_date = ?4",
            params![key.kind.as_str(), unit.to_string(), qty, date],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
        )?;
        Ok(rows.into_iter().collect())
    }
}
