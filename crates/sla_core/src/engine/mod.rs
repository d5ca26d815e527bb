use crate::analytics::{build_metrics_report, MetricsReport};
use crate::config::EngineConfig;
use crate::domain::TimeWindow;
use crate::error::{codes, AppError};
use crate::period::PeriodRequest;
use crate::reachability::{build_reachability_report, ReachabilityReport};
use crate::scope::ReportScope;
use crate::source::{load_dataset, IncidentSource};

pub fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Validate configuration and resolve the requested period. Runs before any fetch.
///
/// Windows longer than `max_period_days` are rejected.
pub fn resolve_window(
    config: &EngineConfig,
    period: &PeriodRequest,
    now: i64,
) -> Result<TimeWindow, AppError> {
    config.validate()?;
    let window = config.calendar()?.resolve(period, now)?;
    if window.length() > config.max_period_seconds() {
        return Err(AppError::new(codes::PERIOD_INVALID, "Period is longer than max_period_days")
            .with_details(format!(
                "start={}; end={}; max_period_days={}",
                window.start, window.end, config.max_period_days
            )));
    }
    Ok(window)
}

/// Fetch and aggregate the metrics report for one period and scope.
pub fn collect_metrics<S>(
    source: &S,
    config: &EngineConfig,
    period: &PeriodRequest,
    scope: &ReportScope,
    now: i64,
) -> Result<MetricsReport, AppError>
where
    S: IncidentSource + Sync,
{
    let window = resolve_window(config, period, now)?;
    tracing::info!(start = window.start, end = window.end, ?scope, "collecting metrics");
    let dataset = load_dataset(source, config, &window, scope)?;
    build_metrics_report(&dataset, config, window, scope)
}

/// Fetch and build the reachability report for one period and scope.
pub fn collect_reachability<S>(
    source: &S,
    config: &EngineConfig,
    period: &PeriodRequest,
    scope: &ReportScope,
    now: i64,
) -> Result<ReachabilityReport, AppError>
where
    S: IncidentSource + Sync,
{
    let window = resolve_window(config, period, now)?;
    tracing::info!(start = window.start, end = window.end, ?scope, "collecting reachability");
    let dataset = load_dataset(source, config, &window, scope)?;
    build_reachability_report(&dataset, config, window, scope)
}
