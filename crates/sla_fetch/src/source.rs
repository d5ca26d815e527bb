use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};
use sla_core::domain::{Host, HostGroup, RecoveryEvent, Trigger, ValidationWarning};
use sla_core::error::AppError;
use sla_core::source::{IncidentBatch, IncidentQuery, IncidentSource};

use crate::client::ZabbixClient;
use crate::wire::{incident_from_raw, recovery_clock, RawEvent, RawGroup, RawHost, RawRecovery, RawTrigger};

fn host_params() -> Value {
    json!({
        "output": ["hostid", "host", "name", "status"],
        "selectHostGroups": ["groupid"],
        "selectTags": ["tag", "value"],
        "selectInventory": "extend",
    })
}

fn with_field(mut params: Value, key: &str, value: Value) -> Value {
    if let Value::Object(map) = &mut params {
        map.insert(key.to_string(), value);
    }
    params
}

impl ZabbixClient {
    /// One `event.get` page of problem events, highest event id first.
    ///
    /// `eventid_till` is the paging cursor. Event ids are unique, so a cursor on them never
    /// stalls on a second that holds more than one page of events.
    fn problem_page(
        &self,
        query: &IncidentQuery,
        eventid_till: Option<u64>,
    ) -> Result<Vec<RawEvent>, AppError> {
        let mut params = json!({
            "output": ["eventid", "r_eventid", "objectid", "name", "clock", "severity"],
            "source": 0,
            "object": 0,
            "value": 1,
            "select_acknowledges": ["clock"],
            "selectHosts": ["hostid"],
            "selectTags": ["tag", "value"],
            "time_from": query.time_from,
            "time_till": query.time_till,
            "sortfield": ["eventid"],
            "sortorder": "DESC",
            "limit": self.config().page_size,
        });
        if let Some(groups) = &query.group_ids {
            params = with_field(params, "groupids", json!(groups));
        }
        if let Some(cursor) = eventid_till {
            params = with_field(params, "eventid_till", json!(cursor.to_string()));
        }
        self.call("event.get", &params)
    }
}

impl IncidentSource for ZabbixClient {
    fn fetch_host_groups(&self) -> Result<Vec<HostGroup>, AppError> {
        let raw: Vec<RawGroup> = self.call("hostgroup.get", &json!({"output": ["groupid", "name"]}))?;
        Ok(raw.into_iter().map(HostGroup::from).collect())
    }

    fn fetch_hosts(&self, group_ids: Option<&[String]>) -> Result<Vec<Host>, AppError> {
        let params = match group_ids {
            Some(ids) => with_field(host_params(), "groupids", json!(ids)),
            None => host_params(),
        };
        let raw: Vec<RawHost> = self.call("host.get", &params)?;
        Ok(raw.into_iter().map(Host::from).collect())
    }

    fn fetch_hosts_by_ids(&self, ids: &[String]) -> Result<Vec<Host>, AppError> {
        self.batched(ids, |chunk| {
            let params = with_field(host_params(), "hostids", json!(chunk));
            let raw: Vec<RawHost> = self.call("host.get", &params)?;
            Ok(raw.into_iter().map(Host::from).collect())
        })
    }

    /// Pages backward by event id until a short page or the page ceiling. Events repeated
    /// across page boundaries are kept once; the batch is returned newest clock first.
    fn fetch_incidents(&self, query: &IncidentQuery) -> Result<IncidentBatch, AppError> {
        let page_size = self.config().page_size;
        let max_pages = self.config().max_pages;
        let mut seen = BTreeSet::new();
        let mut batch = IncidentBatch::default();
        let mut cursor: Option<u64> = None;

        for page in 1..=max_pages {
            let raw = self.problem_page(query, cursor)?;
            let full = raw.len() >= page_size;
            let lowest = raw
                .iter()
                .filter_map(|e| e.eventid.trim().parse::<u64>().ok())
                .min();

            for event in raw {
                if seen.insert(event.eventid.clone()) {
                    batch.incidents.push(incident_from_raw(event, &mut batch.warnings));
                }
            }

            if !full {
                break;
            }
            let Some(lowest) = lowest else {
                tracing::warn!(page, "event page without numeric ids; paging stopped");
                batch.warnings.push(
                    ValidationWarning::new(
                        "SOURCE_PAGE_STALLED",
                        "Incident paging stopped on a full page without numeric event ids; older incidents were not fetched",
                    )
                    .with_details(format!("page={page}")),
                );
                break;
            };
            if lowest == 0 {
                break;
            }
            cursor = Some(lowest - 1);

            if page == max_pages {
                tracing::warn!(max_pages, fetched = batch.incidents.len(), "event page limit reached");
                batch.warnings.push(
                    ValidationWarning::new(
                        "SOURCE_PAGE_LIMIT",
                        "Incident paging stopped at the configured page limit; older incidents were not fetched",
                    )
                    .with_details(format!("max_pages={max_pages}; next_eventid_till={}", lowest - 1)),
                );
            }
        }

        // Stable, so events sharing a clock keep descending id order; malformed clocks go last.
        batch.incidents.sort_by(|a, b| b.clock.cmp(&a.clock));
        tracing::debug!(
            incidents = batch.incidents.len(),
            warnings = batch.warnings.len(),
            "incidents fetched"
        );
        Ok(batch)
    }

    fn fetch_recovery_events(
        &self,
        event_ids: &[String],
    ) -> Result<BTreeMap<String, RecoveryEvent>, AppError> {
        let raw: Vec<RawRecovery> = self.batched(event_ids, |chunk| {
            self.call(
                "event.get",
                &json!({"output": ["eventid", "clock"], "eventids": chunk}),
            )
        })?;

        let mut warnings = Vec::new();
        let mut out = BTreeMap::new();
        for r in &raw {
            if let Some(clock) = recovery_clock(r, &mut warnings) {
                out.insert(r.eventid.clone(), RecoveryEvent { clock });
            }
        }
        for w in &warnings {
            tracing::warn!(code = %w.code, details = ?w.details, "{}", w.message);
        }
        Ok(out)
    }

    fn fetch_triggers_by_ids(&self, ids: &[String]) -> Result<Vec<Trigger>, AppError> {
        self.batched(ids, |chunk| {
            let raw: Vec<RawTrigger> = self.call(
                "trigger.get",
                &json!({
                    "output": ["triggerid", "description", "comments"],
                    "triggerids": chunk,
                    "selectItems": ["key_"],
                    "expandDescription": true,
                }),
            )?;
            Ok(raw.into_iter().map(Trigger::from).collect())
        })
    }
}
