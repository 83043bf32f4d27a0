//! CLI integration tests.
//!
//! Tests cover:
//! - Argument parsing for every subcommand
//! - Config loading and validation failures mapped to exit codes
//! - Import, compute, screen and backtest against a temporary SQLite file

mod common;

use clap::Parser;
use common::*;
use rotator::cli::{self, Cli, Command};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;

fn same_code(actual: ExitCode, expected: ExitCode) -> bool {
    format!("{actual:?}") == format!("{expected:?}")
}

fn run(config: &Path, command: Command) -> ExitCode {
    cli::run(Cli {
        config: config.to_path_buf(),
        command,
    })
}

mod argument_parsing {
    use super::*;

    #[test]
    fn config_defaults_to_rotator_ini() {
        let cli = Cli::try_parse_from(["rotator", "info"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("rotator.ini"));
        assert!(matches!(cli.command, Command::Info));
    }

    #[test]
    fn config_is_global() {
        let cli = Cli::try_parse_from(["rotator", "compute", "--config", "etf.ini"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("etf.ini"));
    }

    #[test]
    fn screen_parses_date() {
        let cli = Cli::try_parse_from(["rotator", "screen", "--date", "2012-03-30"]).unwrap();
        match cli.command {
            Command::Screen { date: d } => assert_eq!(d, date("2012-03-30")),
            other => panic!("expected screen, got {other:?}"),
        }
    }

    #[test]
    fn screen_rejects_bad_date() {
        assert!(Cli::try_parse_from(["rotator", "screen", "--date", "30/03/2012"]).is_err());
    }

    #[test]
    fn backtest_output_is_optional() {
        let cli = Cli::try_parse_from(["rotator", "backtest"]).unwrap();
        assert!(matches!(cli.command, Command::Backtest { output: None }));

        let cli = Cli::try_parse_from(["rotator", "backtest", "-o", "trail.csv"]).unwrap();
        match cli.command {
            Command::Backtest { output } => assert_eq!(output, Some(PathBuf::from("trail.csv"))),
            other => panic!("expected backtest, got {other:?}"),
        }
    }

    #[test]
    fn import_requires_dir() {
        assert!(Cli::try_parse_from(["rotator", "import"]).is_err());
    }
}

mod config_errors {
    use super::*;

    #[test]
    fn missing_config_file_exits_with_config_code() {
        let code = run(Path::new("/nonexistent/rotator.ini"), Command::Info);
        assert!(same_code(code, ExitCode::from(2)));
    }

    #[test]
    fn bad_weights_exit_with_weights_code() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("rotator.db");
        let ini = sample_ini(&db.display().to_string()).replace("0.7, 0.3", "0.7, 0.4");
        let file = write_temp_ini(&ini);

        let code = run(file.path(), Command::Info);
        assert!(same_code(code, ExitCode::from(4)));
    }

    #[test]
    fn missing_sqlite_path_exits_with_config_code() {
        let ini = sample_ini("").replace("path = \n", "");
        let file = write_temp_ini(&ini);

        let code = run(file.path(), Command::Info);
        assert!(same_code(code, ExitCode::from(2)));
    }

    #[test]
    fn load_config_reports_parse_error() {
        let result = cli::load_config(Path::new("/nonexistent/rotator.ini"));
        assert!(matches!(
            result,
            Err(rotator::domain::error::RotatorError::ConfigParse { .. })
        ));
    }
}

#[cfg(feature = "sqlite")]
mod commands {
    use super::*;

    struct Workspace {
        dir: TempDir,
        config: PathBuf,
    }

    fn workspace() -> Workspace {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("rotator.db");
        let config = dir.path().join("rotator.ini");
        std::fs::write(&config, sample_ini(&db.display().to_string())).unwrap();
        let csv_dir = dir.path().join("quotes");
        std::fs::create_dir(&csv_dir).unwrap();
        write_sample_csv(&csv_dir, 130);
        Workspace { dir, config }
    }

    fn import(ws: &Workspace) -> ExitCode {
        run(
            &ws.config,
            Command::Import {
                dir: ws.dir.path().join("quotes"),
            },
        )
    }

    #[test]
    fn compute_without_quotes_is_a_data_error() {
        let ws = workspace();
        let code = run(&ws.config, Command::Compute);
        assert!(same_code(code, ExitCode::from(5)));
    }

    #[test]
    fn import_then_info() {
        let ws = workspace();
        assert!(same_code(import(&ws), ExitCode::SUCCESS));
        assert!(same_code(run(&ws.config, Command::Info), ExitCode::SUCCESS));
    }

    #[test]
    fn full_workflow_writes_trail() {
        let ws = workspace();
        let trail = ws.dir.path().join("trail.csv");

        assert!(same_code(import(&ws), ExitCode::SUCCESS));
        assert!(same_code(run(&ws.config, Command::Compute), ExitCode::SUCCESS));
        assert!(same_code(
            run(
                &ws.config,
                Command::Screen {
                    date: date("2012-03-30")
                }
            ),
            ExitCode::SUCCESS
        ));
        assert!(same_code(
            run(
                &ws.config,
                Command::Backtest {
                    output: Some(trail.clone())
                }
            ),
            ExitCode::SUCCESS
        ));

        let text = std::fs::read_to_string(&trail).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("date,action"));
        assert!(lines[1].starts_with("2012-01-31,enter,"));
        assert!(lines[2].starts_with("2012-02-29,rotate,GRO"));
        assert!(lines[6].starts_with("2012-06-29,exit,GRO"));
    }

    #[test]
    fn backtest_before_compute_skips_every_date() {
        let ws = workspace();
        assert!(same_code(import(&ws), ExitCode::SUCCESS));

        let trail = ws.dir.path().join("trail.csv");
        let code = run(
            &ws.config,
            Command::Backtest {
                output: Some(trail.clone()),
            },
        );

        assert!(same_code(code, ExitCode::SUCCESS));
        let text = std::fs::read_to_string(&trail).unwrap();
        assert_eq!(text.lines().filter(|l| l.contains(",skip,")).count(), 5);
        assert!(text.contains("2012-06-29,hold,"));
    }
}
