use serde::{Deserialize, Serialize};

use crate::domain::DowntimeTotals;

/// Availability percentages over the full window and its business / off-hours parts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AvailabilitySet {
    pub overall: f64,
    pub business: f64,
    pub off_hours: f64,
}

impl Default for AvailabilitySet {
    fn default() -> Self {
        Self {
            overall: 100.0,
            business: 100.0,
            off_hours: 100.0,
        }
    }
}

/// `100 * (window - downtime) / window`, clamped to `[0, 100]`; 100 for an empty window.
pub fn availability(window_seconds: i64, downtime_seconds: i64) -> f64 {
    if window_seconds <= 0 {
        return 100.0;
    }
    let pct = 100.0 * (window_seconds - downtime_seconds) as f64 / window_seconds as f64;
    if !pct.is_finite() {
        return 100.0;
    }
    pct.clamp(0.0, 100.0)
}

/// Availability in the host-seconds model: the window is multiplied by `host_count`.
///
/// `window` holds the window's own total/business/off seconds; `downtime` is already summed
/// over the counted hosts.
pub fn availability_set(
    window: &DowntimeTotals,
    host_count: i64,
    downtime: &DowntimeTotals,
) -> AvailabilitySet {
    let hosts = host_count.max(0);
    AvailabilitySet {
        overall: availability(window.total * hosts, downtime.total),
        business: availability(window.business * hosts, downtime.business),
        off_hours: availability(window.off * hosts, downtime.off),
    }
}
