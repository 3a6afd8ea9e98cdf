//! Cash flow minimizer command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use settlement::{config::LoggingConfig, Config, SettlementMinimizer, Transaction};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cashflow", version, about = "Minimize the payments needed to settle group debts")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "CASHFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the settlement plan for a JSON array of transactions
    Minimize {
        /// Input file, `-` for stdin
        input: PathBuf,
    },
    /// Print the net balance of every participant
    Balances {
        /// Input file, `-` for stdin
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging)?;

    tracing::debug!(service = %config.service_name, version = %config.service_version, "starting");

    let engine = SettlementMinimizer::new(config);

    match &cli.command {
        Command::Minimize { input } => {
            let transactions = read_transactions(input)?;
            let plan = engine
                .plan(&transactions)
                .context("failed to compute settlement plan")?;
            write_json(&plan, cli.pretty)?;
        }
        Command::Balances { input } => {
            let transactions = read_transactions(input)?;
            let balances = engine
                .balances(&transactions)
                .context("failed to compute net balances")?;
            write_json(&balances, cli.pretty)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let mut config = Config::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            config.apply_env()?;
            Ok(config)
        }
        None => Ok(Config::from_env()?),
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok(), logging)?;

    // stdout carries the JSON result, so logs go to stderr
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }

    Ok(())
}

/// `RUST_LOG` wins when it parses; otherwise the configured level applies
fn log_filter(rust_log: Option<String>, logging: &LoggingConfig) -> Result<EnvFilter> {
    let level: tracing::Level = logging
        .default_level
        .parse()
        .with_context(|| format!("invalid log level {}", logging.default_level))?;

    let from_env = rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok());
    Ok(from_env.unwrap_or_else(|| EnvFilter::default().add_directive(level.into())))
}

fn read_transactions(input: &Path) -> Result<Vec<Transaction>> {
    if input == Path::new("-") {
        parse_transactions(io::stdin().lock()).context("failed to read stdin")
    } else {
        let file = std::fs::File::open(input)
            .with_context(|| format!("failed to read {}", input.display()))?;
        parse_transactions(file).with_context(|| format!("failed to read {}", input.display()))
    }
}

fn parse_transactions(mut reader: impl Read) -> Result<Vec<Transaction>> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;

    let transactions: Vec<Transaction> =
        serde_json::from_str(&content).context("input is not a JSON array of transactions")?;
    tracing::info!(count = transactions.len(), "loaded transactions");
    Ok(transactions)
}

fn write_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut stdout, value)?;
    } else {
        serde_json::to_writer(&mut stdout, value)?;
    }
    writeln!(stdout)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::io::Write;
    use tracing_subscriber::filter::LevelFilter;

    const INPUT: &str = r#"[
        {"from": "A", "to": "B", "amount": "10"},
        {"from": "B", "to": "C", "amount": 10},
        {"from": "A", "to": "C", "amount": "5.00"}
    ]"#;

    #[test]
    fn test_read_transactions_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(INPUT.as_bytes()).unwrap();

        let transactions = read_transactions(file.path()).unwrap();
        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions[2].amount, Decimal::new(5, 0));

        let plan = SettlementMinimizer::default().plan(&transactions).unwrap();
        assert_eq!(plan.settlements.len(), 1);
        assert_eq!(plan.settlements[0].amount, Decimal::new(15, 0));
    }

    #[test]
    fn test_parse_transactions_from_reader() {
        let transactions = parse_transactions(io::Cursor::new(INPUT)).unwrap();
        assert_eq!(transactions.len(), 3);

        let balances = SettlementMinimizer::default()
            .balances(&transactions)
            .unwrap();
        assert_eq!(balances.get(&"A".into()), Decimal::new(-15, 0));
    }

    #[test]
    fn test_malformed_input_is_reported() {
        let err = parse_transactions(io::Cursor::new(r#"{"from": "A"}"#)).unwrap_err();
        assert!(err.to_string().contains("JSON array of transactions"));

        let err = read_transactions(Path::new("/nonexistent/transactions.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limits]\nmax_transactions = 2").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.limits.max_transactions, 2);

        let engine = SettlementMinimizer::new(config);
        let transactions = parse_transactions(io::Cursor::new(INPUT)).unwrap();
        assert!(engine.plan(&transactions).is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/cashflow.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to load config"));
    }

    #[test]
    fn test_log_filter_prefers_rust_log() {
        let logging = LoggingConfig {
            json: false,
            default_level: "warn".into(),
        };

        let filter = log_filter(Some("debug".into()), &logging).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = log_filter(None, &logging).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));

        let filter = log_filter(Some("  ".into()), &logging).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["cashflow", "--pretty", "minimize", "-"]).unwrap();
        assert!(cli.pretty);
        assert!(matches!(cli.command, Command::Minimize { ref input } if input == Path::new("-")));

        let cli = Cli::try_parse_from(["cashflow", "balances", "tx.json", "-c", "cfg.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("cfg.toml")));
        assert!(matches!(cli.command, Command::Balances { .. }));

        assert!(Cli::try_parse_from(["cashflow", "settle"]).is_err());
    }
}
