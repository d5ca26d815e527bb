use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::availability::{availability_set, AvailabilitySet};
use crate::config::EngineConfig;
use crate::domain::{
    severity_label, DowntimeTotals, Host, HostGroup, TimeWindow, ValidationWarning, SEVERITY_LEVELS,
};
use crate::downtime::{DowntimeLedger, HostDowntime};
use crate::error::AppError;
use crate::facts::{collect_facts, IncidentFacts};
use crate::metrics::{average_kpis, seconds_to_minutes, KpiAverages};
use crate::period::BusinessCalendar;
use crate::scope::{resolve_scope, ReportScope, ScopeView};
use crate::source::Dataset;

pub const METRICS_REPORT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityCount {
    pub severity: u8,
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DowntimeMinutes {
    pub total: f64,
    pub business: f64,
    pub off_hours: f64,
}

impl From<&DowntimeTotals> for DowntimeMinutes {
    fn from(t: &DowntimeTotals) -> Self {
        Self {
            total: seconds_to_minutes(t.total as f64),
            business: seconds_to_minutes(t.business as f64),
            off_hours: seconds_to_minutes(t.off as f64),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostRow {
    pub host_id: String,
    pub name: String,
    pub active: bool,
    pub group_names: Vec<String>,
    pub incident_count: i64,
    pub downtime: DowntimeMinutes,
    pub availability: AvailabilitySet,
    pub reachability_downtime: DowntimeMinutes,
    pub reachability_availability: AvailabilitySet,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedHost {
    pub host_id: String,
    pub name: String,
    pub downtime_minutes: f64,
    pub share_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedIncident {
    pub event_id: String,
    pub name: String,
    pub severity: Option<u8>,
    pub downtime_minutes: f64,
    pub share_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupReport {
    pub group_id: String,
    pub name: String,
    pub host_count: i64,
    pub active_host_count: i64,
    pub inactive_host_count: i64,
    pub incident_count: i64,
    pub open_incident_count: i64,
    pub impactful_incident_count: i64,
    pub impactful_incident_ids: Vec<String>,
    pub reachability_incident_count: i64,
    /// Averages over the group's incidents, each counted once.
    pub kpis: KpiAverages,
    pub severity_counts: Vec<SeverityCount>,
    pub downtime: DowntimeMinutes,
    pub availability: AvailabilitySet,
    pub reachability_availability: AvailabilitySet,
    pub top_hosts: Vec<RankedHost>,
    pub top_incidents: Vec<RankedIncident>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScopeSummary {
    pub host_count: i64,
    pub active_host_count: i64,
    pub incident_count: i64,
    pub open_incident_count: i64,
    pub impactful_incident_count: i64,
    pub reachability_incident_count: i64,
    pub kpis: KpiAverages,
    pub downtime: DowntimeMinutes,
    pub availability: AvailabilitySet,
    pub reachability_availability: AvailabilitySet,
    pub severity_counts: Vec<SeverityCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriticalIncident {
    pub event_id: String,
    pub name: String,
    pub host_names: Vec<String>,
    pub opened_at: Option<i64>,
    pub closed_at: Option<i64>,
    pub is_open: bool,
    pub impactful: bool,
    pub detection_minutes: Option<f64>,
    pub response_minutes: Option<f64>,
    pub resolution_minutes: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsReport {
    pub version: u32,
    pub scope: ReportScope,
    pub window: TimeWindow,
    pub timezone: String,
    pub summary: ScopeSummary,
    pub hosts: Vec<HostRow>,
    pub groups: Vec<GroupReport>,
    pub critical_incidents: Vec<CriticalIncident>,
    pub warnings: Vec<ValidationWarning>,
}

/// Per-call state shared by the metrics and reachability reports.
pub struct Aggregation<'a> {
    pub dataset: &'a Dataset,
    pub config: &'a EngineConfig,
    pub calendar: BusinessCalendar,
    pub window: TimeWindow,
    pub view: ScopeView<'a>,
    pub facts: Vec<IncidentFacts<'a>>,
    /// Window length split the same way downtime is, so business/off views line up.
    pub window_totals: DowntimeTotals,
    pub host_downtime: BTreeMap<&'a str, HostDowntime>,
    pub warnings: Vec<ValidationWarning>,
}

impl<'a> Aggregation<'a> {
    pub fn prepare(
        dataset: &'a Dataset,
        config: &'a EngineConfig,
        window: TimeWindow,
        scope: &ReportScope,
    ) -> Result<Self, AppError> {
        config.validate()?;
        let calendar = config.calendar()?;
        let view = resolve_scope(dataset, scope)?;
        let (facts, fact_warnings) = collect_facts(dataset, config, &calendar, &window, &view);

        let ledger = DowntimeLedger::accumulate(&facts, &view);
        let host_downtime = view
            .hosts
            .keys()
            .map(|id| (*id, ledger.host_downtime(id, &calendar)))
            .collect();

        let split = calendar.split_by_shift(window.start, window.end);
        let window_totals = DowntimeTotals {
            total: split.total(),
            business: split.business,
            off: split.off,
        };

        let mut warnings = dataset.warnings.clone();
        warnings.extend(fact_warnings);

        Ok(Self {
            dataset,
            config,
            calendar,
            window,
            view,
            facts,
            window_totals,
            host_downtime,
            warnings,
        })
    }

    pub fn downtime_of(&self, host_id: &str) -> HostDowntime {
        self.host_downtime.get(host_id).cloned().unwrap_or_default()
    }

    /// Host-seconds downtime and availability over the active hosts of `hosts`, full then
    /// reachability-only.
    pub fn pooled_availability<'h>(
        &self,
        hosts: impl IntoIterator<Item = &'h Host>,
    ) -> (DowntimeTotals, AvailabilitySet, DowntimeTotals, AvailabilitySet) {
        let mut active = 0i64;
        let mut down = DowntimeTotals::default();
        let mut reach = DowntimeTotals::default();
        for host in hosts {
            if !host.is_active() {
                continue;
            }
            active += 1;
            if let Some(dt) = self.host_downtime.get(host.id.as_str()) {
                down.add(&dt.downtime);
                reach.add(&dt.reachability);
            }
        }
        (
            down,
            availability_set(&self.window_totals, active, &down),
            reach,
            availability_set(&self.window_totals, active, &reach),
        )
    }
}

fn severity_counts(histogram: &[i64; SEVERITY_LEVELS]) -> Vec<SeverityCount> {
    histogram
        .iter()
        .enumerate()
        .map(|(sev, count)| SeverityCount {
            severity: sev as u8,
            label: severity_label(Some(sev as u8)).to_string(),
            count: *count,
        })
        .collect()
}

/// Identity-keyed incident tallies; an incident visited through several hosts counts once.
#[derive(Debug, Default)]
struct IncidentTally<'a> {
    incident_ids: BTreeSet<&'a str>,
    open_ids: BTreeSet<&'a str>,
    impactful_ids: BTreeSet<&'a str>,
    reachability_ids: BTreeSet<&'a str>,
    severity: [i64; SEVERITY_LEVELS],
}

impl<'a> IncidentTally<'a> {
    fn visit(&mut self, fact: &IncidentFacts<'a>) {
        let id = fact.event_id();
        if !self.incident_ids.insert(id) {
            return;
        }
        if fact.is_open {
            self.open_ids.insert(id);
        }
        if fact.impactful {
            self.impactful_ids.insert(id);
        }
        if fact.reachability {
            self.reachability_ids.insert(id);
        }
        if fact.starts_in_window {
            if let Some(sev) = fact.incident.severity {
                if let Some(slot) = self.severity.get_mut(sev as usize) {
                    *slot += 1;
                }
            }
        }
    }
}

/// Transient per-group accumulator, discarded when the report is built.
struct GroupAccumulator<'a> {
    group: &'a HostGroup,
    active_hosts: BTreeSet<&'a str>,
    inactive_hosts: BTreeSet<&'a str>,
    tally: IncidentTally<'a>,
    incident_impact: BTreeMap<&'a str, i64>,
}

impl<'a> GroupAccumulator<'a> {
    fn new(group: &'a HostGroup) -> Self {
        Self {
            group,
            active_hosts: BTreeSet::new(),
            inactive_hosts: BTreeSet::new(),
            tally: IncidentTally::default(),
            incident_impact: BTreeMap::new(),
        }
    }

    fn add_host(&mut self, host: &'a Host) {
        if host.is_active() {
            self.active_hosts.insert(host.id.as_str());
        } else {
            self.inactive_hosts.insert(host.id.as_str());
        }
    }

    fn visit(&mut self, fact: &IncidentFacts<'a>, host: &Host) {
        self.tally.visit(fact);
        let secs = fact.window_seconds();
        if host.is_active() && secs > 0 {
            *self.incident_impact.entry(fact.event_id()).or_insert(0) += secs;
        }
    }
}

fn share_pct(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    (100.0 * part as f64 / whole as f64).clamp(0.0, 100.0)
}

fn build_group_report(
    agg: &Aggregation<'_>,
    acc: GroupAccumulator<'_>,
    facts_by_id: &BTreeMap<&str, &IncidentFacts<'_>>,
) -> GroupReport {
    let members: Vec<&Host> = acc
        .active_hosts
        .iter()
        .chain(acc.inactive_hosts.iter())
        .filter_map(|id| agg.view.hosts.get(id).copied())
        .collect();
    let (down, availability, _, reachability_availability) =
        agg.pooled_availability(members.iter().copied());

    let mut ranked_hosts: Vec<(&Host, i64)> = members
        .iter()
        .filter(|h| h.is_active())
        .map(|h| (*h, agg.downtime_of(&h.id).downtime.total))
        .filter(|(_, secs)| *secs > 0)
        .collect();
    ranked_hosts.sort_by(|a, b| {
        (-(a.1), &a.0.name, &a.0.id).cmp(&(-(b.1), &b.0.name, &b.0.id))
    });
    let top_hosts = ranked_hosts
        .into_iter()
        .take(agg.config.top_n)
        .map(|(h, secs)| RankedHost {
            host_id: h.id.clone(),
            name: h.name.clone(),
            downtime_minutes: seconds_to_minutes(secs as f64),
            share_pct: share_pct(secs, down.total),
        })
        .collect();

    let impact_total: i64 = acc.incident_impact.values().sum();
    let mut ranked_incidents: Vec<(&str, i64, i64)> = acc
        .incident_impact
        .iter()
        .map(|(id, secs)| {
            let clock = facts_by_id
                .get(id)
                .and_then(|f| f.incident.clock)
                .unwrap_or(i64::MIN);
            (*id, *secs, clock)
        })
        .collect();
    // Most downtime first, then most recent start, then event id.
    ranked_incidents.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)).then(a.0.cmp(b.0)));
    let top_incidents = ranked_incidents
        .into_iter()
        .take(agg.config.top_n)
        .map(|(id, secs, _)| {
            let fact = facts_by_id.get(id);
            RankedIncident {
                event_id: id.to_string(),
                name: fact.map(|f| f.incident.name.clone()).unwrap_or_default(),
                severity: fact.and_then(|f| f.incident.severity),
                downtime_minutes: seconds_to_minutes(secs as f64),
                share_pct: share_pct(secs, impact_total),
            }
        })
        .collect();

    let kpis = average_kpis(
        acc.tally
            .incident_ids
            .iter()
            .filter_map(|id| facts_by_id.get(id))
            .map(|f| &f.kpis),
    );

    GroupReport {
        group_id: acc.group.id.clone(),
        name: acc.group.name.clone(),
        host_count: (acc.active_hosts.len() + acc.inactive_hosts.len()) as i64,
        active_host_count: acc.active_hosts.len() as i64,
        inactive_host_count: acc.inactive_hosts.len() as i64,
        incident_count: acc.tally.incident_ids.len() as i64,
        open_incident_count: acc.tally.open_ids.len() as i64,
        impactful_incident_count: acc.tally.impactful_ids.len() as i64,
        impactful_incident_ids: acc.tally.impactful_ids.iter().map(|s| s.to_string()).collect(),
        reachability_incident_count: acc.tally.reachability_ids.len() as i64,
        kpis,
        severity_counts: severity_counts(&acc.tally.severity),
        downtime: DowntimeMinutes::from(&down),
        availability,
        reachability_availability,
        top_hosts,
        top_incidents,
    }
}

fn build_host_rows(agg: &Aggregation<'_>) -> Vec<HostRow> {
    let groups = agg.dataset.group_index();
    let mut incident_counts: BTreeMap<&str, i64> = BTreeMap::new();
    for fact in &agg.facts {
        for host_id in fact.host_ids() {
            *incident_counts.entry(host_id).or_insert(0) += 1;
        }
    }

    let mut rows: Vec<(i64, HostRow)> = agg
        .view
        .hosts
        .values()
        .map(|host| {
            let dt = agg.downtime_of(&host.id);
            let mut group_names: Vec<String> = host
                .group_ids
                .iter()
                .filter_map(|g| groups.get(g.as_str()).map(|g| g.name.clone()))
                .collect();
            group_names.sort();
            let row = HostRow {
                host_id: host.id.clone(),
                name: host.name.clone(),
                active: host.is_active(),
                group_names,
                incident_count: incident_counts.get(host.id.as_str()).copied().unwrap_or(0),
                downtime: DowntimeMinutes::from(&dt.downtime),
                availability: availability_set(&agg.window_totals, 1, &dt.downtime),
                reachability_downtime: DowntimeMinutes::from(&dt.reachability),
                reachability_availability: availability_set(
                    &agg.window_totals,
                    1,
                    &dt.reachability,
                ),
            };
            (dt.downtime.total, row)
        })
        .collect();

    // Deterministic ordering: most downtime first, then name, then id.
    rows.sort_by(|a, b| {
        (-(a.0), &a.1.name, &a.1.host_id).cmp(&(-(b.0), &b.1.name, &b.1.host_id))
    });
    rows.into_iter().map(|(_, r)| r).collect()
}

fn build_critical_incidents(agg: &Aggregation<'_>) -> Vec<CriticalIncident> {
    let hosts = agg.dataset.host_index();
    let mut critical: Vec<&IncidentFacts<'_>> =
        agg.facts.iter().filter(|f| f.is_max_severity()).collect();
    critical.sort_by(|a, b| {
        (b.incident.clock, &b.incident.event_id).cmp(&(a.incident.clock, &a.incident.event_id))
    });

    let minutes = |secs: Option<i64>| secs.map(|s| seconds_to_minutes(s as f64));
    critical
        .into_iter()
        .map(|f| CriticalIncident {
            event_id: f.incident.event_id.clone(),
            name: f.incident.name.clone(),
            host_names: f
                .host_ids()
                .into_iter()
                .map(|id| hosts.get(id).map(|h| h.name.clone()).unwrap_or_else(|| id.to_string()))
                .collect(),
            opened_at: f.incident.clock,
            closed_at: f.recovery_clock,
            is_open: f.is_open,
            impactful: f.impactful,
            detection_minutes: minutes(f.kpis.detection_seconds),
            response_minutes: minutes(f.kpis.response_seconds),
            resolution_minutes: minutes(f.kpis.resolution_seconds),
        })
        .collect()
}

fn build_summary(agg: &Aggregation<'_>) -> ScopeSummary {
    let mut tally = IncidentTally::default();
    for fact in &agg.facts {
        tally.visit(fact);
    }
    let (down, availability, _, reachability_availability) =
        agg.pooled_availability(agg.view.hosts.values().copied());

    ScopeSummary {
        host_count: agg.view.hosts.len() as i64,
        active_host_count: agg.view.active_host_count(),
        incident_count: tally.incident_ids.len() as i64,
        open_incident_count: tally.open_ids.len() as i64,
        impactful_incident_count: tally.impactful_ids.len() as i64,
        reachability_incident_count: tally.reachability_ids.len() as i64,
        kpis: average_kpis(agg.facts.iter().map(|f| &f.kpis)),
        downtime: DowntimeMinutes::from(&down),
        availability,
        reachability_availability,
        severity_counts: severity_counts(&tally.severity),
    }
}

fn build_group_reports(agg: &Aggregation<'_>) -> Vec<GroupReport> {
    if agg.view.groups.is_empty() {
        return Vec::new();
    }

    let mut accumulators: BTreeMap<&str, GroupAccumulator<'_>> = agg
        .view
        .groups
        .iter()
        .map(|g| (g.id.as_str(), GroupAccumulator::new(*g)))
        .collect();

    // Membership is captured once per host, independent of the incident walk.
    for host in agg.view.hosts.values() {
        for gid in &host.group_ids {
            if let Some(acc) = accumulators.get_mut(gid.as_str()) {
                acc.add_host(*host);
            }
        }
    }

    for fact in &agg.facts {
        for host_id in fact.host_ids() {
            let Some(host) = agg.view.hosts.get(host_id) else {
                continue;
            };
            for gid in &host.group_ids {
                if let Some(acc) = accumulators.get_mut(gid.as_str()) {
                    acc.visit(fact, host);
                }
            }
        }
    }

    let facts_by_id: BTreeMap<&str, &IncidentFacts<'_>> =
        agg.facts.iter().map(|f| (f.event_id(), f)).collect();

    agg.view
        .groups
        .iter()
        .filter_map(|g| accumulators.remove(g.id.as_str()))
        .map(|acc| build_group_report(agg, acc, &facts_by_id))
        .collect()
}

/// Build the metrics report for one scope and window.
///
/// Output ordering is stable so reports are snapshot-testable.
pub fn build_metrics_report(
    dataset: &Dataset,
    config: &EngineConfig,
    window: TimeWindow,
    scope: &ReportScope,
) -> Result<MetricsReport, AppError> {
    let agg = Aggregation::prepare(dataset, config, window, scope)?;

    let summary = build_summary(&agg);
    let hosts = build_host_rows(&agg);
    let groups = build_group_reports(&agg);
    let critical_incidents = build_critical_incidents(&agg);

    tracing::info!(
        incidents = summary.incident_count,
        hosts = summary.host_count,
        groups = groups.len(),
        availability = summary.availability.overall,
        "metrics report built"
    );

    Ok(MetricsReport {
        version: METRICS_REPORT_VERSION,
        scope: scope.clone(),
        window,
        timezone: agg.calendar.timezone().name().to_string(),
        summary,
        hosts,
        groups,
        critical_incidents,
        warnings: agg.warnings,
    })
}
