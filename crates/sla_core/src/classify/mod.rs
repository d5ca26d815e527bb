use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::domain::Trigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertType {
    #[serde(rename = "ICMP")]
    Icmp,
    #[serde(rename = "SNMP")]
    Snmp,
    #[serde(rename = "Agent")]
    Agent,
    #[serde(rename = "HTTP")]
    Http,
    #[serde(rename = "Port/TCP")]
    Port,
    #[serde(rename = "Log")]
    Log,
    #[serde(rename = "Uptime")]
    Uptime,
    #[serde(rename = "Other")]
    Other,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Icmp => "ICMP",
            AlertType::Snmp => "SNMP",
            AlertType::Agent => "Agent",
            AlertType::Http => "HTTP",
            AlertType::Port => "Port/TCP",
            AlertType::Log => "Log",
            AlertType::Uptime => "Uptime",
            AlertType::Other => "Other",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub alert_type: AlertType,
    pub item_keys: Vec<String>,
    pub is_reachability_class: bool,
}

#[derive(Debug, Clone, Copy)]
enum Needle {
    /// Substring of the lower-cased haystack.
    Contains(&'static str),
    /// Whole alphanumeric token of the haystack.
    Word(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    alert_type: AlertType,
    reachability: bool,
    needles: &'static [Needle],
}

use Needle::{Contains, Word};

/// Ordered rule table; the first matching rule wins.
///
/// SNMP traps come first so they never fall through to the reachability-class SNMP rule.
const RULES: &[Rule] = &[
    Rule {
        alert_type: AlertType::Snmp,
        reachability: false,
        needles: &[Contains("snmptrap"), Contains("snmp trap"), Contains("snmp.trap")],
    },
    Rule {
        alert_type: AlertType::Agent,
        reachability: true,
        needles: &[
            Contains("agent.ping"),
            Contains("agent.available"),
            Contains("zabbix[host,agent,available]"),
            Contains("agent is not available"),
            Contains("agent not available"),
            Contains("agent unavailable"),
            Contains("agent is unreachable"),
        ],
    },
    Rule {
        alert_type: AlertType::Icmp,
        reachability: true,
        needles: &[Contains("icmpping"), Contains("icmp"), Word("ping")],
    },
    Rule {
        alert_type: AlertType::Snmp,
        reachability: true,
        needles: &[Contains("snmp")],
    },
    Rule {
        alert_type: AlertType::Http,
        reachability: false,
        needles: &[Contains("web.test"), Contains("web.page"), Contains("http")],
    },
    Rule {
        alert_type: AlertType::Port,
        reachability: false,
        needles: &[
            Contains("net.tcp"),
            Contains("net.udp"),
            Word("tcp"),
            Word("udp"),
            Word("port"),
        ],
    },
    Rule {
        alert_type: AlertType::Log,
        reachability: false,
        needles: &[
            Contains("log["),
            Contains("logrt["),
            Contains("log.count"),
            Contains("logrt.count"),
            Contains("eventlog["),
        ],
    },
    Rule {
        alert_type: AlertType::Uptime,
        reachability: true,
        needles: &[Contains("system.uptime"), Contains("uptime"), Contains("restarted")],
    },
];

fn matches(needle: Needle, haystack: &str, words: &[&str]) -> bool {
    match needle {
        Contains(s) => haystack.contains(s),
        Word(w) => words.iter().any(|t| *t == w),
    }
}

/// Classify trigger metadata into an alert type.
///
/// Pure: the same keys and text always produce the same classification.
pub fn classify(item_keys: &[String], text: &str) -> Classification {
    let mut haystack = item_keys.join(" ");
    haystack.push(' ');
    haystack.push_str(text);
    let haystack = haystack.to_lowercase();
    let words: Vec<&str> = haystack
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let (alert_type, is_reachability_class) = RULES
        .iter()
        .find(|rule| rule.needles.iter().any(|n| matches(*n, &haystack, &words)))
        .map(|rule| (rule.alert_type, rule.reachability))
        .unwrap_or((AlertType::Other, false));

    Classification {
        alert_type,
        item_keys: item_keys.to_vec(),
        is_reachability_class,
    }
}

/// Classify an incident from its trigger (when fetched) and its own name.
pub fn classify_incident(trigger: Option<&Trigger>, incident_name: &str) -> Classification {
    match trigger {
        Some(t) => {
            let text = format!("{} {} {}", t.description, t.comments, incident_name);
            classify(&t.item_keys, &text)
        }
        None => classify(&[], incident_name),
    }
}

/// Second stage: heuristic class AND the configured allow-list.
pub fn is_reachability_alert(classification: &Classification, config: &EngineConfig) -> bool {
    classification.is_reachability_class
        && config.allows_reachability_type(classification.alert_type.as_str())
}
