use serde::{Deserialize, Serialize};

use crate::domain::{Incident, TimeWindow, ValidationWarning};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncidentKpis {
    pub detection_seconds: Option<i64>,
    pub response_seconds: Option<i64>,
    pub resolution_seconds: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct KpiAverages {
    pub detection_minutes: f64,
    pub response_minutes: f64,
    pub resolution_minutes: f64,
    pub detection_samples: i64,
    pub response_samples: i64,
    pub resolution_samples: i64,
}

/// Seconds to minutes. Non-finite or zero input yields `0`.
pub fn seconds_to_minutes(secs: f64) -> f64 {
    if !secs.is_finite() || secs == 0.0 {
        return 0.0;
    }
    secs / 60.0
}

/// Arithmetic mean of the defined values, `None` when there are none.
pub fn mean(values: impl IntoIterator<Item = i64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0i128, 0i64), |(s, c), v| (s + i128::from(v), c + 1));
    if count == 0 {
        return None;
    }
    Some(sum as f64 / count as f64)
}

/// Compute deterministic per-incident KPIs relative to the requested window.
///
/// - detection: first acknowledgment minus the clamped start (`None` without acks)
/// - response: second acknowledgment minus the clamped start, falling back to detection
/// - resolution: recovery (or window end while open) minus the clamped start
///
/// Deltas never go negative. An incident without a usable clock yields no KPIs and a warning.
pub fn compute_incident_kpis(
    incident: &Incident,
    recovery_clock: Option<i64>,
    window: &TimeWindow,
) -> (IncidentKpis, Vec<ValidationWarning>) {
    let mut warnings = Vec::new();

    let Some(clock) = incident.clock else {
        warnings.push(
            ValidationWarning::new(
                "KPI_CLOCK_MISSING",
                "Incident has no usable start clock; KPIs skipped",
            )
            .with_details(format!("event_id={}", incident.event_id)),
        );
        return (IncidentKpis::default(), warnings);
    };

    let start = window.clamp(clock);

    let mut ack_clocks: Vec<i64> = incident.acknowledgments.iter().map(|a| a.clock).collect();
    ack_clocks.sort();

    let detection_seconds = ack_clocks.first().map(|first| (first - start).max(0));
    let response_seconds = match ack_clocks.get(1) {
        Some(second) => Some((second - start).max(0)),
        None => detection_seconds,
    };

    let end = recovery_clock.unwrap_or(window.end).min(window.end);
    let resolution_seconds = Some((end - start).max(0));

    (
        IncidentKpis {
            detection_seconds,
            response_seconds,
            resolution_seconds,
        },
        warnings,
    )
}

/// Average KPIs in minutes over the incidents that define each value.
pub fn average_kpis<'a>(kpis: impl IntoIterator<Item = &'a IncidentKpis>) -> KpiAverages {
    let mut detection = Vec::new();
    let mut response = Vec::new();
    let mut resolution = Vec::new();
    for k in kpis {
        detection.extend(k.detection_seconds);
        response.extend(k.response_seconds);
        resolution.extend(k.resolution_seconds);
    }

    let minutes = |vals: &[i64]| seconds_to_minutes(mean(vals.iter().copied()).unwrap_or(f64::NAN));

    KpiAverages {
        detection_minutes: minutes(&detection),
        response_minutes: minutes(&response),
        resolution_minutes: minutes(&resolution),
        detection_samples: detection.len() as i64,
        response_samples: response.len() as i64,
        resolution_samples: resolution.len() as i64,
    }
}
