use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::analytics::{Aggregation, DowntimeMinutes};
use crate::availability::AvailabilitySet;
use crate::classify::AlertType;
use crate::config::EngineConfig;
use crate::domain::{severity_label, TimeWindow, ValidationWarning};
use crate::error::AppError;
use crate::scope::ReportScope;
use crate::source::Dataset;

pub const REACHABILITY_REPORT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReachabilityRow {
    pub event_id: String,
    pub name: String,
    pub severity: Option<u8>,
    pub severity_label: String,
    pub alert_type: AlertType,
    pub item_keys: Vec<String>,
    pub host_names: Vec<String>,
    /// Set in all-groups scope (one row per incident-group pair) and in group scope.
    pub group_name: Option<String>,
    pub opened_at: Option<i64>,
    pub closed_at: Option<i64>,
    pub window_downtime_seconds: i64,
    pub total_downtime_seconds: i64,
    pub is_open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub pages: usize,
    pub total: usize,
}

/// Slice one page out of an already sorted list.
///
/// `pages = max(1, ceil(total / page_size))`; the requested page is clamped to `[1, pages]`.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total = items.len();
    let pages = total.div_ceil(page_size).max(1);
    let page = page.clamp(1, pages);
    let start = ((page - 1) * page_size).min(total);
    let end = (page * page_size).min(total);
    Page {
        items: items[start..end].to_vec(),
        page,
        page_size,
        pages,
        total,
    }
}

fn compare_rows(a: &ReachabilityRow, b: &ReachabilityRow) -> Ordering {
    b.window_downtime_seconds
        .cmp(&a.window_downtime_seconds)
        .then_with(|| b.opened_at.cmp(&a.opened_at))
        .then_with(|| a.event_id.cmp(&b.event_id))
        .then_with(|| a.group_name.cmp(&b.group_name))
}

/// Most in-window downtime first, then most recent start.
pub fn sort_rows(rows: &mut [ReachabilityRow]) {
    rows.sort_by(compare_rows);
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReachabilitySummary {
    pub incident_count: i64,
    pub open_incident_count: i64,
    pub downtime: DowntimeMinutes,
    pub availability: AvailabilitySet,
}

/// Full, sorted reachability report; `page` cuts the view handed to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReachabilityReport {
    pub version: u32,
    pub scope: ReportScope,
    pub window: TimeWindow,
    pub timezone: String,
    pub summary: ReachabilitySummary,
    pub rows: Vec<ReachabilityRow>,
    pub warnings: Vec<ValidationWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReachabilityPage {
    pub version: u32,
    pub scope: ReportScope,
    pub window: TimeWindow,
    pub timezone: String,
    pub summary: ReachabilitySummary,
    pub page: Page<ReachabilityRow>,
    pub warnings: Vec<ValidationWarning>,
}

impl ReachabilityReport {
    pub fn page(&self, page: usize, page_size: usize) -> ReachabilityPage {
        ReachabilityPage {
            version: self.version,
            scope: self.scope.clone(),
            window: self.window,
            timezone: self.timezone.clone(),
            summary: self.summary.clone(),
            page: paginate(&self.rows, page, page_size),
            warnings: self.warnings.clone(),
        }
    }
}

fn build_rows(agg: &Aggregation<'_>) -> Vec<ReachabilityRow> {
    let hosts = agg.dataset.host_index();
    let groups = agg.dataset.group_index();
    let mut rows = Vec::new();

    for fact in agg.facts.iter().filter(|f| f.reachability) {
        let incident = fact.incident;
        let host_ids = fact.host_ids();
        let host_names: Vec<String> = host_ids
            .iter()
            .map(|id| hosts.get(id).map(|h| h.name.clone()).unwrap_or_else(|| id.to_string()))
            .collect();
        let total_downtime_seconds = incident
            .clock
            .map(|c| (fact.recovery_clock.unwrap_or(agg.window.end) - c).max(0))
            .unwrap_or(0);

        let row = ReachabilityRow {
            event_id: incident.event_id.clone(),
            name: incident.name.clone(),
            severity: incident.severity,
            severity_label: severity_label(incident.severity).to_string(),
            alert_type: fact.classification.alert_type,
            item_keys: fact.classification.item_keys.clone(),
            host_names,
            group_name: None,
            opened_at: incident.clock,
            closed_at: fact.recovery_clock,
            window_downtime_seconds: fact.window_seconds(),
            total_downtime_seconds,
            is_open: fact.is_open,
        };

        match &agg.view.scope {
            ReportScope::Global => rows.push(row),
            ReportScope::Group { group_id } => {
                let group_name = groups.get(group_id.as_str()).map(|g| g.name.clone());
                rows.push(ReachabilityRow { group_name, ..row });
            }
            ReportScope::AllGroups => {
                let group_names: BTreeSet<&str> = host_ids
                    .iter()
                    .filter_map(|id| agg.view.hosts.get(id))
                    .flat_map(|h| h.group_ids.iter())
                    .filter_map(|g| groups.get(g.as_str()).map(|g| g.name.as_str()))
                    .collect();
                if group_names.is_empty() {
                    rows.push(row);
                } else {
                    for name in group_names {
                        rows.push(ReachabilityRow {
                            group_name: Some(name.to_string()),
                            ..row.clone()
                        });
                    }
                }
            }
        }
    }

    sort_rows(&mut rows);
    rows
}

/// Build the reachability-only report: allow-listed reachability incidents, sorted.
pub fn build_reachability_report(
    dataset: &Dataset,
    config: &EngineConfig,
    window: TimeWindow,
    scope: &ReportScope,
) -> Result<ReachabilityReport, AppError> {
    let agg = Aggregation::prepare(dataset, config, window, scope)?;
    let rows = build_rows(&agg);

    let mut incident_ids = BTreeSet::new();
    let mut open_ids = BTreeSet::new();
    for fact in agg.facts.iter().filter(|f| f.reachability) {
        incident_ids.insert(fact.event_id());
        if fact.is_open {
            open_ids.insert(fact.event_id());
        }
    }
    let (_, _, reach_down, availability) =
        agg.pooled_availability(agg.view.hosts.values().copied());

    tracing::info!(
        incidents = incident_ids.len(),
        rows = rows.len(),
        availability = availability.overall,
        "reachability report built"
    );

    Ok(ReachabilityReport {
        version: REACHABILITY_REPORT_VERSION,
        scope: scope.clone(),
        window,
        timezone: agg.calendar.timezone().name().to_string(),
        summary: ReachabilitySummary {
            incident_count: incident_ids.len() as i64,
            open_incident_count: open_ids.len() as i64,
            downtime: DowntimeMinutes::from(&reach_down),
            availability,
        },
        rows,
        warnings: agg.warnings,
    })
}
