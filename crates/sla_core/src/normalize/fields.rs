use crate::domain::{HostStatus, ValidationWarning, MAX_SEVERITY};

fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v as f64);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => None,
    }
}

/// Parse a backend epoch-seconds string.
///
/// Contract:
/// - Integer and finite decimal strings are accepted (decimals truncate toward zero).
/// - Empty, non-numeric, non-finite or negative values yield `None` and an explicit warning;
///   downstream duration math then treats the incident as contributing nothing.
pub fn parse_epoch(
    field: &str,
    raw: &str,
    context: &str,
    warnings: &mut Vec<ValidationWarning>,
) -> Option<i64> {
    match parse_number(raw) {
        Some(v) if v >= 0.0 && v <= i64::MAX as f64 => Some(v.trunc() as i64),
        _ => {
            warnings.push(
                ValidationWarning::new(
                    "SOURCE_CLOCK_MALFORMED",
                    format!("Malformed {field}; value ignored"),
                )
                .with_details(format!("{context}; raw={raw}")),
            );
            None
        }
    }
}

/// Parse a backend severity (0..=5). Anything else yields `None` and a warning.
pub fn parse_severity(
    raw: &str,
    context: &str,
    warnings: &mut Vec<ValidationWarning>,
) -> Option<u8> {
    match parse_number(raw) {
        Some(v) if v >= 0.0 && v <= f64::from(MAX_SEVERITY) && v.fract() == 0.0 => Some(v as u8),
        _ => {
            warnings.push(
                ValidationWarning::new("SOURCE_SEVERITY_MALFORMED", "Malformed severity; value ignored")
                    .with_details(format!("{context}; raw={raw}")),
            );
            None
        }
    }
}

/// Backend event references use `""` or `"0"` for "none".
pub fn parse_event_ref(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "0" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// `"0"` is a monitored host; every other value is treated as not monitored.
pub fn parse_host_status(raw: &str) -> HostStatus {
    if raw.trim() == "0" {
        HostStatus::Active
    } else {
        HostStatus::Inactive
    }
}
