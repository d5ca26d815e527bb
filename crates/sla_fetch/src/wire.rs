//! Raw Zabbix API records and their conversion into domain types.
//!
//! The API returns every number as a string; conversion goes through
//! `sla_core::normalize::fields` so malformed values become warnings instead of errors.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use sla_core::domain::{Acknowledgment, Host, HostGroup, Incident, Tag, Trigger, ValidationWarning};
use sla_core::normalize::fields::{parse_epoch, parse_event_ref, parse_host_status, parse_severity};

#[derive(Debug, Clone, Deserialize)]
pub struct RawGroup {
    pub groupid: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGroupRef {
    pub groupid: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTag {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHost {
    pub hostid: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    /// `hostgroups` since 6.2, `groups` before.
    #[serde(default, alias = "groups")]
    pub hostgroups: Vec<RawGroupRef>,
    #[serde(default)]
    pub tags: Vec<RawTag>,
    /// An object when inventory is enabled, an empty array otherwise.
    #[serde(default)]
    pub inventory: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHostRef {
    pub hostid: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAck {
    #[serde(default)]
    pub clock: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub eventid: String,
    #[serde(default)]
    pub r_eventid: String,
    #[serde(default)]
    pub objectid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub clock: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub hosts: Vec<RawHostRef>,
    #[serde(default)]
    pub acknowledges: Vec<RawAck>,
    #[serde(default)]
    pub tags: Vec<RawTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRecovery {
    pub eventid: String,
    #[serde(default)]
    pub clock: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub key_: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTrigger {
    pub triggerid: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub items: Vec<RawItem>,
}

fn tags(raw: Vec<RawTag>) -> Vec<Tag> {
    raw.into_iter()
        .map(|t| Tag {
            tag: t.tag,
            value: t.value,
        })
        .collect()
}

fn inventory(raw: Value) -> BTreeMap<String, String> {
    match raw {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(k, v)| match v {
                Value::String(s) if !s.is_empty() => Some((k, s)),
                _ => None,
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}

impl From<RawGroup> for HostGroup {
    fn from(raw: RawGroup) -> Self {
        HostGroup {
            id: raw.groupid,
            name: raw.name,
        }
    }
}

impl From<RawHost> for Host {
    fn from(raw: RawHost) -> Self {
        // Visible name, falling back to the technical host name.
        let name = if raw.name.trim().is_empty() {
            raw.host
        } else {
            raw.name
        };
        Host {
            id: raw.hostid,
            name,
            status: parse_host_status(&raw.status),
            group_ids: raw.hostgroups.into_iter().map(|g| g.groupid).collect(),
            tags: tags(raw.tags),
            inventory: inventory(raw.inventory),
        }
    }
}

impl From<RawTrigger> for Trigger {
    fn from(raw: RawTrigger) -> Self {
        Trigger {
            id: raw.triggerid,
            description: raw.description,
            comments: raw.comments,
            item_keys: raw
                .items
                .into_iter()
                .map(|i| i.key_)
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }
}

/// Convert a problem event, pushing a warning for every value that had to be dropped.
pub fn incident_from_raw(raw: RawEvent, warnings: &mut Vec<ValidationWarning>) -> Incident {
    let context = format!("event_id={}", raw.eventid);
    let clock = parse_epoch("clock", &raw.clock, &context, warnings);
    let severity = parse_severity(&raw.severity, &context, warnings);
    let acknowledgments = raw
        .acknowledges
        .iter()
        .filter_map(|a| parse_epoch("acknowledge clock", &a.clock, &context, warnings))
        .map(|clock| Acknowledgment { clock })
        .collect();

    Incident {
        event_id: raw.eventid,
        recovery_event_id: parse_event_ref(&raw.r_eventid),
        object_id: raw.objectid,
        name: raw.name,
        clock,
        severity,
        hosts: raw.hosts.into_iter().map(|h| h.hostid).collect(),
        acknowledgments,
        tags: tags(raw.tags),
    }
}

/// Recovery clock for one event, or `None` (with a warning) when malformed.
pub fn recovery_clock(raw: &RawRecovery, warnings: &mut Vec<ValidationWarning>) -> Option<i64> {
    parse_epoch(
        "recovery clock",
        &raw.clock,
        &format!("event_id={}", raw.eventid),
        warnings,
    )
}
