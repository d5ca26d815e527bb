use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::domain::{Host, HostGroup, Incident, RecoveryEvent, TimeWindow, Trigger, ValidationWarning};
use crate::error::{codes, AppError};
use crate::scope::ReportScope;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentQuery {
    pub group_ids: Option<Vec<String>>,
    pub time_from: i64,
    pub time_till: i64,
}

/// Incidents plus whatever the source had to drop or coerce while decoding them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentBatch {
    pub incidents: Vec<Incident>,
    pub warnings: Vec<ValidationWarning>,
}

/// Data-fetch contract the engine consumes.
///
/// Implementations are expected to retry transient failures themselves; any error returned
/// here aborts the aggregation.
pub trait IncidentSource {
    fn fetch_host_groups(&self) -> Result<Vec<HostGroup>, AppError>;

    fn fetch_hosts(&self, group_ids: Option<&[String]>) -> Result<Vec<Host>, AppError>;

    fn fetch_hosts_by_ids(&self, ids: &[String]) -> Result<Vec<Host>, AppError>;

    /// Incidents whose start falls in `[time_from, time_till]`, newest first.
    fn fetch_incidents(&self, query: &IncidentQuery) -> Result<IncidentBatch, AppError>;

    fn fetch_recovery_events(
        &self,
        event_ids: &[String],
    ) -> Result<BTreeMap<String, RecoveryEvent>, AppError>;

    fn fetch_triggers_by_ids(&self, ids: &[String]) -> Result<Vec<Trigger>, AppError>;
}

/// Everything one aggregation call needs, fetched up front.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub groups: Vec<HostGroup>,
    pub hosts: Vec<Host>,
    pub incidents: Vec<Incident>,
    pub recoveries: BTreeMap<String, RecoveryEvent>,
    pub triggers: BTreeMap<String, Trigger>,
    pub warnings: Vec<ValidationWarning>,
}

impl Dataset {
    pub fn host_index(&self) -> BTreeMap<&str, &Host> {
        self.hosts.iter().map(|h| (h.id.as_str(), h)).collect()
    }

    pub fn group_index(&self) -> BTreeMap<&str, &HostGroup> {
        self.groups.iter().map(|g| (g.id.as_str(), g)).collect()
    }

    pub fn recovery_clock(&self, incident: &Incident) -> Option<i64> {
        let id = incident.recovery_event_id.as_deref()?;
        self.recoveries.get(id).map(|r| r.clock)
    }
}

fn group_filter(scope: &ReportScope) -> Option<Vec<String>> {
    match scope {
        ReportScope::Group { group_id } => Some(vec![group_id.clone()]),
        ReportScope::Global | ReportScope::AllGroups => None,
    }
}

/// Run the fetch sequence for one aggregation call.
///
/// Groups, hosts and incidents are fetched concurrently; recovery events, triggers and hosts
/// referenced by incidents but outside the primary filter follow once incidents are known.
/// Any fetch error aborts the whole load.
pub fn load_dataset<S>(
    source: &S,
    config: &EngineConfig,
    window: &TimeWindow,
    scope: &ReportScope,
) -> Result<Dataset, AppError>
where
    S: IncidentSource + Sync,
{
    let filter = group_filter(scope);
    let query = IncidentQuery {
        group_ids: filter.clone(),
        time_from: window.start.saturating_sub(config.lookback_seconds()).max(0),
        time_till: window.end,
    };

    let (groups, (hosts, batch)) = rayon::join(
        || source.fetch_host_groups(),
        || {
            rayon::join(
                || source.fetch_hosts(filter.as_deref()),
                || source.fetch_incidents(&query),
            )
        },
    );
    let groups = groups?;
    let mut hosts = hosts?;
    let batch = batch?;

    if let ReportScope::Group { group_id } = scope {
        if !groups.iter().any(|g| &g.id == group_id) {
            return Err(AppError::new(codes::GROUP_NOT_FOUND, "Host group not found")
                .with_details(format!("group_id={group_id}")));
        }
    }

    let known: BTreeSet<&str> = hosts.iter().map(|h| h.id.as_str()).collect();
    let missing_hosts: Vec<String> = batch
        .incidents
        .iter()
        .flat_map(|i| i.hosts.iter())
        .filter(|id| !known.contains(id.as_str()))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let recovery_ids: Vec<String> = batch
        .incidents
        .iter()
        .filter_map(|i| i.recovery_event_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let trigger_ids: Vec<String> = batch
        .incidents
        .iter()
        .map(|i| i.object_id.clone())
        .filter(|id| !id.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    tracing::debug!(
        incidents = batch.incidents.len(),
        hosts = hosts.len(),
        missing_hosts = missing_hosts.len(),
        recoveries = recovery_ids.len(),
        triggers = trigger_ids.len(),
        "primary fetch complete"
    );

    let (extra_hosts, (recoveries, triggers)) = rayon::join(
        || {
            if missing_hosts.is_empty() {
                Ok(Vec::new())
            } else {
                source.fetch_hosts_by_ids(&missing_hosts)
            }
        },
        || {
            rayon::join(
                || {
                    if recovery_ids.is_empty() {
                        Ok(BTreeMap::new())
                    } else {
                        source.fetch_recovery_events(&recovery_ids)
                    }
                },
                || {
                    if trigger_ids.is_empty() {
                        Ok(Vec::new())
                    } else {
                        source.fetch_triggers_by_ids(&trigger_ids)
                    }
                },
            )
        },
    );

    let mut seen: BTreeSet<String> = hosts.iter().map(|h| h.id.clone()).collect();
    for host in extra_hosts? {
        if seen.insert(host.id.clone()) {
            hosts.push(host);
        }
    }

    Ok(Dataset {
        groups,
        hosts,
        incidents: batch.incidents,
        recoveries: recoveries?,
        triggers: triggers?
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect(),
        warnings: batch.warnings,
    })
}
