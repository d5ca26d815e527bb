use std::path::Path;

use serde::Serialize;
use sla_core::engine::{collect_metrics, collect_reachability, now_epoch};
use sla_core::error::{codes, AppError};
use sla_core::period::PeriodRequest;
use sla_core::report::write_reachability_csv;
use sla_core::scope::ReportScope;
use sla_core::source::IncidentSource;
use sla_fetch::ZabbixClient;

use crate::cli::Command;
use crate::settings::Settings;

fn to_json<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| {
        AppError::new(codes::REPORT_ENCODE_FAILED, "Failed to encode report").with_details(e.to_string())
    })
}

pub fn metrics<S: IncidentSource + Sync>(
    source: &S,
    settings: &Settings,
    period: &PeriodRequest,
    scope: &ReportScope,
    now: i64,
) -> Result<String, AppError> {
    let report = collect_metrics(source, &settings.engine, period, scope, now)?;
    for w in &report.warnings {
        tracing::warn!(code = %w.code, details = ?w.details, "{}", w.message);
    }
    to_json(&report)
}

pub struct ReachabilityRequest<'a> {
    pub period: &'a PeriodRequest,
    pub scope: &'a ReportScope,
    pub page: usize,
    pub page_size: Option<usize>,
    pub csv: Option<&'a Path>,
}

pub fn reachability<S: IncidentSource + Sync>(
    source: &S,
    settings: &Settings,
    req: &ReachabilityRequest<'_>,
    now: i64,
) -> Result<String, AppError> {
    let report = collect_reachability(source, &settings.engine, req.period, req.scope, now)?;
    for w in &report.warnings {
        tracing::warn!(code = %w.code, details = ?w.details, "{}", w.message);
    }

    if let Some(path) = req.csv {
        let calendar = settings.engine.calendar()?;
        write_reachability_csv(path, &report.rows, &calendar)?;
        tracing::info!(path = %path.display(), rows = report.rows.len(), "reachability CSV written");
    }

    let page_size = req.page_size.unwrap_or(settings.engine.page_size);
    to_json(&report.page(req.page, page_size))
}

/// Run one subcommand against Zabbix and return what should be printed.
pub fn run(command: &Command, settings: &Settings) -> Result<String, AppError> {
    let client = ZabbixClient::new(settings.zabbix.clone())?;
    tracing::info!(endpoint = client.endpoint(), "using zabbix source");

    match command {
        Command::Metrics { period, scope } => {
            metrics(&client, settings, &period.request()?, &scope.scope(), now_epoch())
        }
        Command::Reachability {
            period,
            scope,
            page,
            page_size,
            csv,
        } => {
            let period = period.request()?;
            let scope = scope.scope();
            reachability(
                &client,
                settings,
                &ReachabilityRequest {
                    period: &period,
                    scope: &scope,
                    page: *page,
                    page_size: *page_size,
                    csv: csv.as_deref(),
                },
                now_epoch(),
            )
        }
    }
}
