use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{DowntimeTotals, Interval};
use crate::facts::IncidentFacts;
use crate::intervals::merge_intervals;
use crate::period::BusinessCalendar;
use crate::scope::ScopeView;

/// Raw, unmerged intervals of one host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostIntervals {
    pub all: Vec<Interval>,
    pub reachability: Vec<Interval>,
}

/// Merged downtime of one host, full and reachability-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostDowntime {
    pub downtime: DowntimeTotals,
    pub reachability: DowntimeTotals,
    pub merged: Vec<Interval>,
}

/// Per-host interval lists: one entry per (incident, host) pair overlapping the window.
#[derive(Debug, Clone, Default)]
pub struct DowntimeLedger {
    hosts: BTreeMap<String, HostIntervals>,
}

impl DowntimeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one clipped interval to a host. Empty intervals carry no downtime and are skipped.
    pub fn record(&mut self, host_id: &str, interval: Interval, reachability: bool) {
        if interval.is_empty() {
            return;
        }
        let entry = self.hosts.entry(host_id.to_string()).or_default();
        entry.all.push(interval);
        if reachability {
            entry.reachability.push(interval);
        }
    }

    /// Build the ledger for every in-scope host touched by the given incidents.
    pub fn accumulate(facts: &[IncidentFacts<'_>], view: &ScopeView<'_>) -> Self {
        let mut ledger = Self::new();
        for fact in facts {
            let Some(interval) = fact.interval else {
                continue;
            };
            for host_id in fact.host_ids() {
                if view.contains_host(host_id) {
                    ledger.record(host_id, interval, fact.reachability);
                }
            }
        }
        ledger
    }

    pub fn intervals(&self, host_id: &str) -> Option<&HostIntervals> {
        self.hosts.get(host_id)
    }

    /// Merge and split one host's intervals. Hosts without incidents get zero downtime.
    pub fn host_downtime(&self, host_id: &str, calendar: &BusinessCalendar) -> HostDowntime {
        let Some(raw) = self.hosts.get(host_id) else {
            return HostDowntime::default();
        };
        let merged = merge_intervals(&raw.all);
        let reach_merged = merge_intervals(&raw.reachability);
        HostDowntime {
            downtime: calendar.totals(&merged),
            reachability: calendar.totals(&reach_merged),
            merged,
        }
    }
}
