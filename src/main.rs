//! Entry point: parse CLI, resolve configuration and dispatch to command handlers.

use anyhow::Context;
use clap::Parser;
use mlb_pitchers::{
    cli::{Commands, MlbPitchers},
    commands::{query, update, CommandContext},
    storage::PitcherFilter,
    Config,
};
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Exit code for configuration and store-open failures.
const EXIT_CONFIG: u8 = 2;

/// Run the CLI.
#[tokio::main]
async fn main() -> ExitCode {
    let app = MlbPitchers::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(season) = config.season_without_fip_constant() {
        warn!(
            %season,
            "no FIP constant configured for the current season; set MLB_PITCHERS_FIP_CONSTANTS"
        );
    }

    let ctx = match CommandContext::new(config).context("failed to open the pitcher store") {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match run(&ctx, app.command).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(ctx: &CommandContext, command: Commands) -> anyhow::Result<u8> {
    match command {
        Commands::Update {
            teams,
            years,
            force_update,
            clear_db,
            json,
        } => {
            let report = update::handle_update(
                ctx,
                update::UpdateParams {
                    teams,
                    years,
                    force: force_update,
                    clear_db,
                    as_json: json,
                },
            )
            .await
            .context("sync aborted")?;
            return Ok(report.exit_code());
        }

        Commands::Search {
            name,
            team,
            range,
            json,
        } => {
            let filter = PitcherFilter {
                name,
                team,
                range: range.to_range()?,
            };
            query::handle_search(ctx, filter, json)?
        }

        Commands::Series {
            pitcher_id,
            metric,
            bucket,
            range,
            json,
        } => query::handle_series(ctx, pitcher_id, &metric, bucket, range.to_range()?, json)?,

        Commands::Appearances {
            pitcher_id,
            range,
            json,
        } => query::handle_appearances(ctx, pitcher_id, range.to_range()?, json)?,

        Commands::Report {
            pitcher_id,
            range,
            json,
        } => query::handle_report(ctx, pitcher_id, range.to_range()?, json)?,

        Commands::Compare {
            pitcher_id,
            season_a,
            season_b,
            json,
        } => query::handle_compare(ctx, pitcher_id, season_a, season_b, json)?,

        Commands::Trend {
            pitcher_id,
            metric,
            bucket,
            window,
            range,
            json,
        } => query::handle_trend(
            ctx,
            pitcher_id,
            &metric,
            bucket,
            window,
            range.to_range()?,
            json,
        )?,

        Commands::Periods {
            pitcher_id,
            metric,
            period_a,
            period_b,
            json,
        } => query::handle_periods(ctx, pitcher_id, &metric, period_a, period_b, json)?,

        Commands::Monthly {
            pitcher_id,
            metric,
            range,
            json,
        } => query::handle_monthly(ctx, pitcher_id, &metric, range.to_range()?, json)?,

        Commands::Changes {
            pitcher_id,
            metric,
            window,
            threshold,
            range,
            json,
        } => query::handle_changes(
            ctx,
            pitcher_id,
            &metric,
            window,
            threshold,
            range.to_range()?,
            json,
        )?,

        Commands::Seasons {
            pitcher_id,
            metric,
            seasons,
            json,
        } => query::handle_seasons(ctx, pitcher_id, &metric, &seasons, json)?,

        Commands::Status { teams, json } => query::handle_status(ctx, &teams, json)?,
    }

    Ok(0)
}
