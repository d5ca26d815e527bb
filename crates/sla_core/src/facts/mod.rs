use std::collections::BTreeSet;

use crate::classify::{classify_incident, is_reachability_alert, Classification};
use crate::config::EngineConfig;
use crate::domain::{Incident, Interval, TimeWindow, ValidationWarning, MAX_SEVERITY};
use crate::metrics::{compute_incident_kpis, IncidentKpis};
use crate::period::BusinessCalendar;
use crate::scope::ScopeView;
use crate::source::Dataset;

/// Everything the aggregation stages need to know about one incident, computed once.
#[derive(Debug, Clone)]
pub struct IncidentFacts<'a> {
    pub incident: &'a Incident,
    pub recovery_clock: Option<i64>,
    /// Incident span clipped into the window; `None` when the start clock is unusable.
    pub interval: Option<Interval>,
    pub business_seconds: i64,
    pub kpis: IncidentKpis,
    pub classification: Classification,
    /// Reachability class and allow-listed.
    pub reachability: bool,
    /// Still open at the end of the window.
    pub is_open: bool,
    pub starts_in_window: bool,
    pub impactful: bool,
}

impl<'a> IncidentFacts<'a> {
    pub fn event_id(&self) -> &'a str {
        &self.incident.event_id
    }

    pub fn window_seconds(&self) -> i64 {
        self.interval.map(|iv| iv.duration()).unwrap_or(0)
    }

    /// Host ids on the incident, each once, in backend order.
    pub fn host_ids(&self) -> Vec<&'a str> {
        let mut seen = BTreeSet::new();
        self.incident
            .hosts
            .iter()
            .map(String::as_str)
            .filter(|h| seen.insert(*h))
            .collect()
    }

    pub fn is_max_severity(&self) -> bool {
        self.incident.severity == Some(MAX_SEVERITY)
    }
}

/// Whether an incident overlaps `[window.start, window.end)`.
///
/// Incidents without a usable clock are kept: they were returned for this period and still
/// count as alerts even though they contribute no duration.
pub fn overlaps_window(incident: &Incident, recovery_clock: Option<i64>, window: &TimeWindow) -> bool {
    let Some(clock) = incident.clock else {
        return true;
    };
    if clock >= window.end {
        return false;
    }
    recovery_clock.map_or(true, |r| r >= window.start)
}

pub fn collect_facts<'a>(
    dataset: &'a Dataset,
    config: &EngineConfig,
    calendar: &BusinessCalendar,
    window: &TimeWindow,
    view: &ScopeView<'_>,
) -> (Vec<IncidentFacts<'a>>, Vec<ValidationWarning>) {
    let mut facts = Vec::new();
    let mut warnings = Vec::new();
    let threshold = config.impact_threshold_seconds();

    for incident in &dataset.incidents {
        if !view.includes_incident(incident) {
            continue;
        }

        let recovery_clock = dataset.recovery_clock(incident);
        if let (Some(id), None) = (&incident.recovery_event_id, recovery_clock) {
            warnings.push(
                ValidationWarning::new(
                    "RECOVERY_EVENT_MISSING",
                    "Recovery event not returned; incident treated as open",
                )
                .with_details(format!("event_id={}; recovery_event_id={id}", incident.event_id)),
            );
        }

        if !overlaps_window(incident, recovery_clock, window) {
            continue;
        }

        let (kpis, kpi_warnings) = compute_incident_kpis(incident, recovery_clock, window);
        warnings.extend(kpi_warnings);

        let interval = incident.clock.map(|c| window.clip(c, recovery_clock));
        let business_seconds = interval
            .map(|iv| calendar.split_by_shift(iv.start, iv.end).business)
            .unwrap_or(0);

        let trigger = dataset.triggers.get(&incident.object_id);
        let classification = classify_incident(trigger, &incident.name);
        let reachability = is_reachability_alert(&classification, config);

        let is_open = recovery_clock.map_or(true, |r| r > window.end);
        let starts_in_window = incident.clock.map_or(false, |c| window.contains(c));
        let impactful = incident.severity == Some(MAX_SEVERITY)
            && business_seconds > 0
            && kpis.resolution_seconds.unwrap_or(0) > threshold;

        facts.push(IncidentFacts {
            incident,
            recovery_clock,
            interval,
            business_seconds,
            kpis,
            classification,
            reachability,
            is_open,
            starts_in_window,
            impactful,
        });
    }

    tracing::debug!(
        in_scope = facts.len(),
        fetched = dataset.incidents.len(),
        "incident facts collected"
    );

    (facts, warnings)
}
