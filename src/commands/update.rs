//! `update` command: sync provider data into the local store.

use super::common::{to_json, CommandContext};
use crate::cli::types::TeamCode;
use crate::provider::{HttpStatsSource, ProviderClient, StatsSource};
use crate::sync::{CancelFlag, SyncOrchestrator, SyncReport, SyncRequest, SyncSettings, UnitStatus};
use crate::Result;
use chrono::NaiveDate;
use std::fmt::Write as _;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateParams {
    pub teams: Vec<TeamCode>,
    pub years: u16,
    pub force: bool,
    pub clear_db: bool,
    pub as_json: bool,
}

/// Sync from the configured HTTP provider. Ctrl-C stops the run after the
/// unit in progress.
pub async fn handle_update(ctx: &CommandContext, params: UpdateParams) -> Result<SyncReport> {
    let source = HttpStatsSource::new(ctx.config.provider_url.clone(), ctx.config.request_timeout)?;

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current unit");
            on_interrupt.cancel();
        }
    });

    let today = chrono::Local::now().date_naive();
    let result = run_update(ctx, source, &params, today, &cancel).await;
    watcher.abort();

    let report = result?;
    if params.as_json {
        println!("{}", to_json(&report)?); // tarpaulin::skip
    } else {
        print!("{}", format_report(&report)); // tarpaulin::skip
    }
    Ok(report)
}

/// Run a sync against any source as of `today`.
pub async fn run_update<S: StatsSource>(
    ctx: &CommandContext,
    source: S,
    params: &UpdateParams,
    today: NaiveDate,
    cancel: &CancelFlag,
) -> Result<SyncReport> {
    if params.clear_db {
        info!("clearing all stored data");
        ctx.repo.clear_all_data()?;
    }

    let client = ProviderClient::new(
        source,
        ctx.config.retry.clone(),
        ctx.config.min_request_interval,
    );
    let orchestrator = SyncOrchestrator::new(
        ctx.repo.clone(),
        client,
        SyncSettings::new(ctx.config.current_season, today),
    );
    let request = SyncRequest::new(params.teams.clone(), params.years, params.force);
    orchestrator.run(&request, cancel).await
}

/// One line per unit, followed by a summary and the failed units with reasons.
pub fn format_report(report: &SyncReport) -> String {
    let mut out = String::new();
    for unit in &report.units {
        let _ = write!(out, "{:<10} {:<22}", unit.unit.to_string(), unit.status.to_string());
        if unit.status == UnitStatus::Complete || unit.status == UnitStatus::Failed {
            let _ = write!(
                out,
                " games={} inserted={} replaced={} unchanged={} skipped={}",
                unit.games_written, unit.inserted, unit.replaced, unit.unchanged, unit.games_skipped
            );
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "\n✓ {} complete, {} failed, {} skipped; {} games written",
        report.count(&UnitStatus::Complete),
        report.failed().count(),
        report
            .units
            .iter()
            .filter(|u| matches!(u.status, UnitStatus::Skipped(_)))
            .count(),
        report.games_written()
    );

    let failed: Vec<_> = report.failed().collect();
    if !failed.is_empty() {
        out.push_str("\nFailed units:\n");
        for unit in failed {
            let _ = writeln!(
                out,
                "  {}: {}",
                unit.unit,
                unit.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    out
}
