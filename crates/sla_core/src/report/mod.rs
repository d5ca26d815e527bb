use std::path::Path;

use crate::error::{codes, AppError};
use crate::period::BusinessCalendar;
use crate::reachability::ReachabilityRow;

pub const REACHABILITY_CSV_HEADER: [&str; 12] = [
    "event_id",
    "name",
    "severity",
    "alert_type",
    "item_keys",
    "hosts",
    "group",
    "opened_at",
    "closed_at",
    "window_downtime",
    "total_downtime",
    "status",
];

pub fn format_duration_seconds(secs: Option<i64>) -> String {
    match secs {
        None => "UNKNOWN".to_string(),
        Some(s) => {
            let s = s.max(0);
            let minutes = s / 60;
            let rem = s % 60;
            if minutes >= 24 * 60 {
                let days = minutes / (24 * 60);
                let hours = (minutes / 60) % 24;
                format!("{days}d {hours}h")
            } else if minutes >= 60 {
                let hours = minutes / 60;
                let m = minutes % 60;
                format!("{hours}h {m}m")
            } else if minutes > 0 {
                format!("{minutes}m {rem}s")
            } else {
                format!("{rem}s")
            }
        }
    }
}

fn csv_error(message: &str, e: impl std::fmt::Display) -> AppError {
    AppError::new(codes::REPORT_CSV_FAILED, message.to_string()).with_details(e.to_string())
}

fn write_rows<W: std::io::Write>(
    wtr: &mut csv::Writer<W>,
    rows: &[ReachabilityRow],
    calendar: &BusinessCalendar,
) -> Result<(), AppError> {
    wtr.write_record(REACHABILITY_CSV_HEADER)
        .map_err(|e| csv_error("Failed to write CSV header", e))?;

    for row in rows {
        let opened = row
            .opened_at
            .map(|ts| calendar.format_local(ts))
            .unwrap_or_default();
        let closed = row
            .closed_at
            .map(|ts| calendar.format_local(ts))
            .unwrap_or_default();
        let status = if row.is_open { "open" } else { "resolved" };
        wtr.write_record([
            row.event_id.as_str(),
            row.name.as_str(),
            row.severity_label.as_str(),
            row.alert_type.as_str(),
            row.item_keys.join("; ").as_str(),
            row.host_names.join(", ").as_str(),
            row.group_name.as_deref().unwrap_or(""),
            opened.as_str(),
            closed.as_str(),
            format_duration_seconds(Some(row.window_downtime_seconds)).as_str(),
            format_duration_seconds(Some(row.total_downtime_seconds)).as_str(),
            status,
        ])
        .map_err(|e| csv_error("Failed to write CSV row", e))?;
    }
    wtr.flush().map_err(|e| csv_error("Failed to flush CSV", e))?;
    Ok(())
}

/// Render reachability rows as CSV with timestamps in the calendar's local timezone.
pub fn reachability_csv(
    rows: &[ReachabilityRow],
    calendar: &BusinessCalendar,
) -> Result<String, AppError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    write_rows(&mut wtr, rows, calendar)?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv_error("Failed to finish CSV", e))?;
    String::from_utf8(bytes).map_err(|e| csv_error("CSV output was not UTF-8", e))
}

pub fn write_reachability_csv(
    path: &Path,
    rows: &[ReachabilityRow],
    calendar: &BusinessCalendar,
) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| {
        csv_error(
            "Failed to create CSV file",
            format!("path={}; err={e}", path.display()),
        )
    })?;
    write_rows(&mut wtr, rows, calendar)
}
