//! INI file configuration adapter.

use crate::domain::error::RotatorError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RotatorError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| RotatorError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, RotatorError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| RotatorError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }

    /// Keys come back lowercased and sorted; the parser does not keep file order.
    fn get_section(&self, section: &str) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
                    .collect()
            })
            .unwrap_or_default();
        pairs.sort();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[sqlite]
path = /var/lib/rotator/etf.db

[backtest]
initial_capital = 10000
benchmark = SPY
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("sqlite", "path"),
            Some("/var/lib/rotator/etf.db".to_string())
        );
        assert_eq!(
            adapter.get_string("backtest", "benchmark"),
            Some("SPY".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nbenchmark = SPY\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_and_defaults() {
        let adapter =
            FileConfigAdapter::from_string("[sqlite]\npool_size = 4\nbad = abc\n").unwrap();
        assert_eq!(adapter.get_int("sqlite", "pool_size", 0), 4);
        assert_eq!(adapter.get_int("sqlite", "missing", 42), 42);
        assert_eq!(adapter.get_int("sqlite", "bad", 42), 42);
    }

    #[test]
    fn get_double_and_defaults() {
        let adapter =
            FileConfigAdapter::from_string("[trend]\nstep = 0.02\nmax = nope\n").unwrap();
        assert_eq!(adapter.get_double("trend", "step", 0.0), 0.02);
        assert_eq!(adapter.get_double("trend", "max", 0.2), 0.2);
        assert_eq!(adapter.get_double("trend", "missing", 99.9), 99.9);
    }

    #[test]
    fn get_bool_values() {
        let adapter =
            FileConfigAdapter::from_string("[x]\na = true\nb = no\nc = 1\n").unwrap();
        assert!(adapter.get_bool("x", "a", false));
        assert!(!adapter.get_bool("x", "b", true));
        assert!(adapter.get_bool("x", "c", false));
        assert!(adapter.get_bool("x", "missing", true));
    }

    #[test]
    fn get_list_splits_and_trims() {
        let adapter = FileConfigAdapter::from_string(
            "[screen]\nmetrics = return_month_3, volatility_day_20 ,,ulcer_day_20\n",
        )
        .unwrap();
        assert_eq!(
            adapter.get_list("screen", "metrics"),
            vec!["return_month_3", "volatility_day_20", "ulcer_day_20"]
        );
        assert!(adapter.get_list("screen", "missing").is_empty());
    }

    #[test]
    fn get_section_lists_pairs() {
        let adapter = FileConfigAdapter::from_string(
            "[instruments]\nSPY = S&P 500\nEFA = EAFE\n\n[other]\nx = 1\n",
        )
        .unwrap();
        assert_eq!(
            adapter.get_section("instruments"),
            vec![
                ("efa".to_string(), "EAFE".to_string()),
                ("spy".to_string(), "S&P 500".to_string()),
            ]
        );
        assert!(adapter.get_section("missing").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[sqlite]\npath = etf.db\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("sqlite", "path"), Some("etf.db".to_string()));
    }

    #[test]
    fn from_file_missing_is_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(RotatorError::ConfigParse { .. })));
    }
}
