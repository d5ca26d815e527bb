use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Highest severity level the backend reports ("Disaster").
pub const MAX_SEVERITY: u8 = 5;

/// Number of severity levels (0..=MAX_SEVERITY).
pub const SEVERITY_LEVELS: usize = MAX_SEVERITY as usize + 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub tag: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Acknowledgment {
    pub clock: i64,
}

/// Canonical incident (problem event) used by every engine stage.
///
/// Notes:
/// - `clock` and `severity` are `None` when the backend sent a malformed value. Such incidents
///   are still counted in alert totals but contribute no durations.
/// - `recovery_event_id == None` means the incident was still open when fetched.
/// - `hosts` keeps the backend order; the first host is the one shown in single-host views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Incident {
    pub event_id: String,
    pub recovery_event_id: Option<String>,
    pub object_id: String,
    pub name: String,
    pub clock: Option<i64>,
    pub severity: Option<u8>,
    pub hosts: Vec<String>,
    pub acknowledgments: Vec<Acknowledgment>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecoveryEvent {
    pub clock: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Host {
    pub id: String,
    pub name: String,
    pub status: HostStatus,
    pub group_ids: Vec<String>,
    pub tags: Vec<Tag>,
    pub inventory: BTreeMap<String, String>,
}

impl Host {
    pub fn is_active(&self) -> bool {
        self.status == HostStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostGroup {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Trigger {
    pub id: String,
    pub description: String,
    pub comments: String,
    pub item_keys: Vec<String>,
}

/// Closed-open span of epoch seconds. `end >= start` always holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
}

impl Interval {
    /// Build an interval, collapsing inverted input to an empty span at `start`.
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn duration(&self) -> i64 {
        (self.end - self.start).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.duration() == 0
    }
}

/// Requested reporting window `[start, end)` in epoch seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn length(&self) -> i64 {
        (self.end - self.start).max(0)
    }

    /// Clamp an epoch second into the window.
    pub fn clamp(&self, ts: i64) -> i64 {
        ts.max(self.start).min(self.end.max(self.start))
    }

    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Clamp `[start, end)` into the window; `None` end means "still running".
    pub fn clip(&self, start: i64, end: Option<i64>) -> Interval {
        let s = self.clamp(start);
        let e = self.clamp(end.unwrap_or(self.end));
        Interval::new(s, e)
    }
}

/// Downtime split into business and off-hours seconds. `business + off == total`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DowntimeTotals {
    pub total: i64,
    pub business: i64,
    pub off: i64,
}

impl DowntimeTotals {
    pub fn add(&mut self, other: &DowntimeTotals) {
        self.total += other.total;
        self.business += other.business;
        self.off += other.off;
    }
}

pub fn severity_label(severity: Option<u8>) -> &'static str {
    match severity {
        Some(0) => "Not classified",
        Some(1) => "Information",
        Some(2) => "Warning",
        Some(3) => "Average",
        Some(4) => "High",
        Some(5) => "Disaster",
        _ => "Unknown",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationWarning {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl ValidationWarning {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
