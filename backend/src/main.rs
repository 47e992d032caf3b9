//! agw-job - batch heat-unit computations
//!
//! ```text
//! agw-job [--base <°C>] season <location-uuid> <start>:<end>[:label]...
//! agw-job [--base <°C>] trial <trial-uuid>
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use agroweather_backend::external::provider_chain;
use agroweather_backend::services::{HeatUnitService, SourceOrchestrator, WeatherCache};
use agroweather_backend::store::PgStore;
use agroweather_backend::Config;
use shared::types::GpsCoordinates;
use shared::Season;

enum Command {
    Season { location_id: Uuid, seasons: Vec<Season> },
    Trial { trial_id: Uuid },
}

struct Args {
    base_temp: Option<f64>,
    command: Command,
}

fn parse_season(arg: &str) -> anyhow::Result<Season> {
    let mut parts = arg.splitn(3, ':');
    let start = parts.next().unwrap_or_default();
    let end = parts
        .next()
        .with_context(|| format!("season '{}' must look like <start>:<end>[:label]", arg))?;
    let label = parts.next().filter(|l| !l.is_empty()).map(str::to_string);

    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").with_context(|| format!("invalid start date in '{}'", arg))?;
    let end = NaiveDate::parse_from_str(end, "%Y-%m-%d").with_context(|| format!("invalid end date in '{}'", arg))?;

    Season::new(label, start, end).map_err(|e| anyhow::anyhow!("season '{}': {}", arg, e))
}

fn parse_args(mut args: Vec<String>) -> anyhow::Result<Args> {
    let mut base_temp = None;
    if let Some(i) = args.iter().position(|a| a == "--base") {
        let value = args.get(i + 1).context("--base needs a value")?;
        base_temp = Some(value.parse::<f64>().with_context(|| format!("invalid base temperature '{}'", value))?);
        args.drain(i..=i + 1);
    }

    let command = match args.first().map(String::as_str) {
        Some("season") => {
            let location_id = args.get(1).context("missing location id")?;
            let location_id = Uuid::parse_str(location_id).context("invalid location id")?;
            let seasons = args[2..].iter().map(|a| parse_season(a)).collect::<anyhow::Result<Vec<_>>>()?;
            if seasons.is_empty() {
                bail!("at least one season is required");
            }
            Command::Season { location_id, seasons }
        }
        Some("trial") => {
            let trial_id = args.get(1).context("missing trial id")?;
            Command::Trial {
                trial_id: Uuid::parse_str(trial_id).context("invalid trial id")?,
            }
        }
        _ => bail!("usage: agw-job [--base <C>] season <location-uuid> <start>:<end>[:label]... | trial <trial-uuid>"),
    };

    Ok(Args { base_temp, command })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agw_job=debug,agroweather_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args(std::env::args().skip(1).collect())?;

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    tracing::debug!("Environment: {}", config.environment);

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    let store = Arc::new(PgStore::new(db_pool));
    let orchestrator = SourceOrchestrator::new(
        WeatherCache::new(store.clone()),
        provider_chain(&config.providers)?,
        config.cache.strict_coverage,
    );
    let service = HeatUnitService::new(
        store.clone(),
        store,
        orchestrator,
        GpsCoordinates::new(config.defaults.latitude, config.defaults.longitude),
        config.phenology.clone(),
    );

    let base_temp = args.base_temp.unwrap_or(config.defaults.base_temp);
    let output = match args.command {
        Command::Season { location_id, seasons } => {
            let report = service.season_report(location_id, &seasons, base_temp).await;
            report.map(|r| serde_json::to_string_pretty(&r))
        }
        Command::Trial { trial_id } => {
            let result = service.aggregate_trial(trial_id, base_temp).await;
            result.map(|r| serde_json::to_string_pretty(&r))
        }
    };

    match output {
        Ok(json) => {
            println!("{}", json?);
            Ok(())
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", serde_json::to_string_pretty(&e.detail())?);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parses_seasons_with_optional_labels() {
        let parsed = parse_args(args(&[
            "season",
            "6f1c2d7e-9a3b-4c5d-8e7f-0a1b2c3d4e5f",
            "2023-05-01:2023-09-30",
            "2024-05-01:2024-09-30:wet year",
            "--base",
            "8",
        ]))
        .unwrap();

        assert_eq!(parsed.base_temp, Some(8.0));
        let Command::Season { seasons, .. } = parsed.command else {
            panic!("expected a season command");
        };
        assert_eq!(seasons.len(), 2);
        assert_eq!(seasons[0].display_label(), "2023");
        assert_eq!(seasons[1].display_label(), "wet year");
    }

    #[test]
    fn test_rejects_reversed_season() {
        assert!(parse_args(args(&[
            "season",
            "6f1c2d7e-9a3b-4c5d-8e7f-0a1b2c3d4e5f",
            "2024-09-30:2024-05-01"
        ]))
        .is_err());
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        assert!(parse_args(args(&["forecast"])).is_err());
    }
}
