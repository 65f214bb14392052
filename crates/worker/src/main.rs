use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use earnings_core::config::Settings;
use earnings_core::domain::key::AnalysisKey;
use earnings_core::domain::request::AnalysisRequest;
use earnings_core::orchestrator::Analyzer;

#[derive(Debug, Parser)]
#[command(name = "earnings_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze one earnings call and print the result as JSON.
    Analyze {
        #[arg(long)]
        ticker: String,

        #[arg(long)]
        year: i32,

        /// Fiscal quarter, 1-4.
        #[arg(long)]
        quarter: u8,

        /// Ignore any cached analysis for this quarter.
        #[arg(long)]
        force_refresh: bool,
    },

    /// Print the cached quarters for a ticker, grouped by year.
    List {
        #[arg(long)]
        ticker: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let analyzer = Analyzer::from_settings(&settings).await?;

    match args.command {
        Command::Analyze {
            ticker,
            year,
            quarter,
            force_refresh,
        } => {
            let req = AnalysisRequest {
                key: AnalysisKey::new(&ticker, year, quarter)?,
                force_refresh,
            };

            let served = match analyzer.analyze(&req).await {
                Ok(served) => served,
                Err(e) => {
                    let err = anyhow::Error::new(e);
                    sentry_anyhow::capture_anyhow(&err);
                    tracing::error!(key = %req.key, error = %err, "analysis failed");
                    return Err(err);
                }
            };

            if let Some(warning) = &served.warning {
                tracing::warn!(key = %req.key, %warning, "served fallback analysis");
            }

            let out = serde_json::json!({
                "ticker": req.key.ticker(),
                "year": req.key.year(),
                "quarter": req.key.quarter(),
                "date": served.transcript_date,
                "provenance": served.provenance,
                "warning": served.warning,
                "analysis": served.result,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&out).context("serialize analysis failed")?
            );
        }
        Command::List { ticker } => {
            let years = analyzer.available_quarters(&ticker).await.map_err(|e| {
                sentry_anyhow::capture_anyhow(&e);
                e
            })?;
            println!(
                "{}",
                serde_json::to_string_pretty(&years).context("serialize listing failed")?
            );
        }
    }

    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analyze_command() {
        let args = Args::try_parse_from([
            "earnings_worker",
            "analyze",
            "--ticker",
            "aapl",
            "--year",
            "2024",
            "--quarter",
            "3",
            "--force-refresh",
        ])
        .unwrap();

        match args.command {
            Command::Analyze {
                ticker,
                year,
                quarter,
                force_refresh,
            } => {
                assert_eq!(ticker, "aapl");
                assert_eq!(year, 2024);
                assert_eq!(quarter, 3);
                assert!(force_refresh);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn list_requires_ticker() {
        assert!(Args::try_parse_from(["earnings_worker", "list"]).is_err());
        assert!(Args::try_parse_from(["earnings_worker", "list", "--ticker", "MSFT"]).is_ok());
    }
}
