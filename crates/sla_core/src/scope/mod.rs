use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Host, HostGroup, Incident};
use crate::error::{codes, AppError};
use crate::source::Dataset;

/// Which slice of the estate a report covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ReportScope {
    /// Every fetched host; no per-group tables.
    Global,
    /// One host group, with its own group table.
    Group { group_id: String },
    /// Every fetched host plus one group table per host group.
    AllGroups,
}

/// Hosts and groups a report is computed over, borrowed from the dataset.
#[derive(Debug, Clone)]
pub struct ScopeView<'a> {
    pub scope: ReportScope,
    pub hosts: BTreeMap<&'a str, &'a Host>,
    pub groups: Vec<&'a HostGroup>,
}

impl<'a> ScopeView<'a> {
    pub fn contains_host(&self, host_id: &str) -> bool {
        self.hosts.contains_key(host_id)
    }

    /// Whether an incident belongs to this scope.
    ///
    /// Global and all-groups scopes take every incident, including ones whose hosts could not
    /// be resolved; a group scope needs at least one member host on the incident.
    pub fn includes_incident(&self, incident: &Incident) -> bool {
        match self.scope {
            ReportScope::Global | ReportScope::AllGroups => true,
            ReportScope::Group { .. } => incident.hosts.iter().any(|h| self.contains_host(h)),
        }
    }

    pub fn active_host_count(&self) -> i64 {
        self.hosts.values().filter(|h| h.is_active()).count() as i64
    }
}

pub fn resolve_scope<'a>(dataset: &'a Dataset, scope: &ReportScope) -> Result<ScopeView<'a>, AppError> {
    match scope {
        ReportScope::Global => Ok(ScopeView {
            scope: scope.clone(),
            hosts: dataset.host_index(),
            groups: Vec::new(),
        }),
        ReportScope::AllGroups => {
            let mut groups: Vec<&HostGroup> = dataset.groups.iter().collect();
            groups.sort_by(|a, b| (&a.name, &a.id).cmp(&(&b.name, &b.id)));
            Ok(ScopeView {
                scope: scope.clone(),
                hosts: dataset.host_index(),
                groups,
            })
        }
        ReportScope::Group { group_id } => {
            let group = dataset
                .groups
                .iter()
                .find(|g| &g.id == group_id)
                .ok_or_else(|| {
                    AppError::new(codes::GROUP_NOT_FOUND, "Host group not found")
                        .with_details(format!("group_id={group_id}"))
                })?;
            let hosts = dataset
                .hosts
                .iter()
                .filter(|h| h.group_ids.iter().any(|g| g == group_id))
                .map(|h| (h.id.as_str(), h))
                .collect();
            Ok(ScopeView {
                scope: scope.clone(),
                hosts,
                groups: vec![group],
            })
        }
    }
}
