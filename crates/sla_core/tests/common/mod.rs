#![allow(dead_code)]

use std::collections::BTreeMap;

use sla_core::domain::{
    Acknowledgment, Host, HostGroup, HostStatus, Incident, RecoveryEvent, TimeWindow, Trigger,
};
use sla_core::source::Dataset;

/// 2026-01-01T00:00:00Z, a Thursday.
pub const T0: i64 = 1_767_225_600;

pub fn window(start: i64, end: i64) -> TimeWindow {
    TimeWindow { start, end }
}

pub fn group(id: &str, name: &str) -> HostGroup {
    HostGroup {
        id: id.to_string(),
        name: name.to_string(),
    }
}

pub fn host(id: &str, name: &str, groups: &[&str]) -> Host {
    Host {
        id: id.to_string(),
        name: name.to_string(),
        status: HostStatus::Active,
        group_ids: groups.iter().map(|g| g.to_string()).collect(),
        tags: Vec::new(),
        inventory: BTreeMap::new(),
    }
}

pub fn inactive_host(id: &str, name: &str, groups: &[&str]) -> Host {
    Host {
        status: HostStatus::Inactive,
        ..host(id, name, groups)
    }
}

pub fn incident(event_id: &str, clock: i64, severity: u8, hosts: &[&str]) -> Incident {
    Incident {
        event_id: event_id.to_string(),
        recovery_event_id: None,
        object_id: format!("trg-{event_id}"),
        name: format!("Problem {event_id}"),
        clock: Some(clock),
        severity: Some(severity),
        hosts: hosts.iter().map(|h| h.to_string()).collect(),
        acknowledgments: Vec::new(),
        tags: Vec::new(),
    }
}

pub fn with_acks(mut incident: Incident, acks: &[i64]) -> Incident {
    incident.acknowledgments = acks.iter().map(|c| Acknowledgment { clock: *c }).collect();
    incident
}

pub fn with_name(mut incident: Incident, name: &str) -> Incident {
    incident.name = name.to_string();
    incident
}

/// Mark `incident` as recovered at `clock`, registering the recovery event in `dataset`.
pub fn recover(dataset: &mut Dataset, incident: &mut Incident, clock: i64) {
    let id = format!("r-{}", incident.event_id);
    incident.recovery_event_id = Some(id.clone());
    dataset.recoveries.insert(id, RecoveryEvent { clock });
}

pub fn icmp_trigger(dataset: &mut Dataset, incident: &Incident) {
    let trigger = Trigger {
        id: incident.object_id.clone(),
        description: "Unavailable by ICMP ping".to_string(),
        comments: String::new(),
        item_keys: vec!["icmpping".to_string()],
    };
    dataset.triggers.insert(trigger.id.clone(), trigger);
}

pub fn dataset(groups: Vec<HostGroup>, hosts: Vec<Host>) -> Dataset {
    Dataset {
        groups,
        hosts,
        ..Dataset::default()
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}
