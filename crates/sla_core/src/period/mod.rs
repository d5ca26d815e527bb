use chrono::{DateTime, Months, NaiveDate, Offset, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::domain::{DowntimeTotals, Interval, TimeWindow};
use crate::error::{codes, AppError};

const MINUTES_PER_DAY: u32 = 24 * 60;
const SECONDS_PER_DAY: i64 = 86_400;

/// A calendar period as requested by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PeriodRequest {
    /// `YYYY-MM` or `YYYY-MM-DD`, interpreted in the configured timezone.
    Calendar { token: String },
    /// Explicit epoch-second boundaries.
    Range { start: i64, end: i64 },
}

/// Business-vs-off-hours split of one span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftSplit {
    pub business: i64,
    pub off: i64,
}

impl ShiftSplit {
    pub fn total(&self) -> i64 {
        self.business + self.off
    }
}

/// Timezone-aware business calendar built from a validated `EngineConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessCalendar {
    tz: Tz,
    start_minute: u32,
    end_minute: u32,
    step_seconds: i64,
}

impl BusinessCalendar {
    pub fn new(tz: Tz, start_hour: u32, end_hour: u32, shift_step_minutes: u32) -> Self {
        Self {
            tz,
            start_minute: start_hour * 60,
            end_minute: end_hour * 60,
            step_seconds: i64::from(shift_step_minutes.max(1)) * 60,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn resolve(&self, request: &PeriodRequest, now: i64) -> Result<TimeWindow, AppError> {
        match request {
            PeriodRequest::Calendar { token } => self.resolve_period(token, now),
            PeriodRequest::Range { start, end } => resolve_range(*start, *end, now),
        }
    }

    /// Resolve a calendar token into absolute boundaries.
    ///
    /// The end is clamped to `now` when the period is the current one; a period that has not
    /// started yet resolves to an empty window at its start.
    pub fn resolve_period(&self, token: &str, now: i64) -> Result<TimeWindow, AppError> {
        let (first_day, next_day) = parse_calendar_token(token)?;
        let start = self.local_midnight(first_day, token)?;
        let end = self.local_midnight(next_day, token)?;
        let end = end.min(now).max(start);
        Ok(TimeWindow { start, end })
    }

    fn local_midnight(&self, date: NaiveDate, token: &str) -> Result<i64, AppError> {
        // Midnight can fall into a DST gap in a few zones; the first valid hour is used then.
        for hour in 0..3 {
            let Some(naive) = date.and_hms_opt(hour, 0, 0) else {
                continue;
            };
            if let Some(dt) = self.tz.from_local_datetime(&naive).earliest() {
                return Ok(dt.timestamp());
            }
        }
        Err(AppError::new(codes::PERIOD_INVALID, "Period start does not exist in timezone")
            .with_details(format!("token={token}; timezone={}", self.tz.name())))
    }

    fn utc_offset_seconds(&self, ts: i64) -> i64 {
        match DateTime::from_timestamp(ts, 0) {
            Some(utc) => i64::from(
                self.tz
                    .offset_from_utc_datetime(&utc.naive_utc())
                    .fix()
                    .local_minus_utc(),
            ),
            None => 0,
        }
    }

    /// Local minute of day (0..1440) for an epoch second.
    pub fn local_minute_of_day(&self, ts: i64) -> u32 {
        let local = ts + self.utc_offset_seconds(ts);
        (local.rem_euclid(SECONDS_PER_DAY) / 60) as u32
    }

    pub fn is_business_minute(&self, minute: u32) -> bool {
        let (s, e) = (self.start_minute, self.end_minute);
        if e >= MINUTES_PER_DAY {
            minute >= s || minute < e - MINUTES_PER_DAY
        } else if e > s {
            minute >= s && minute < e
        } else if e == s {
            false
        } else {
            minute >= s || minute < e
        }
    }

    pub fn is_business_time(&self, ts: i64) -> bool {
        self.is_business_minute(self.local_minute_of_day(ts))
    }

    /// Split `[start, end)` into business and off-hours seconds.
    ///
    /// The span is walked in shift-step slices and each slice is classified by the local time
    /// of its first second, so the error is at most one step per business-window crossing.
    pub fn split_by_shift(&self, start: i64, end: i64) -> ShiftSplit {
        let mut split = ShiftSplit::default();
        let mut t = start;
        while t < end {
            let next = (t + self.step_seconds).min(end);
            if self.is_business_time(t) {
                split.business += next - t;
            } else {
                split.off += next - t;
            }
            t = next;
        }
        split
    }

    /// Sum already-merged intervals into `{total, business, off}`.
    pub fn totals(&self, merged: &[Interval]) -> DowntimeTotals {
        let mut totals = DowntimeTotals::default();
        for iv in merged {
            let split = self.split_by_shift(iv.start, iv.end);
            totals.total += split.total();
            totals.business += split.business;
            totals.off += split.off;
        }
        totals
    }

    /// Format an epoch second as local `YYYY-MM-DD HH:MM:SS`.
    pub fn format_local(&self, ts: i64) -> String {
        match DateTime::from_timestamp(ts, 0) {
            Some(utc) => utc
                .with_timezone(&self.tz)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            None => String::new(),
        }
    }
}

/// Validate explicit boundaries; the end is clamped to `now`. Boundaries before the epoch
/// are rejected.
pub fn resolve_range(start: i64, end: i64, now: i64) -> Result<TimeWindow, AppError> {
    if start < 0 {
        return Err(AppError::new(codes::PERIOD_INVALID, "Period start must not be negative")
            .with_details(format!("start={start}")));
    }
    if start >= end {
        return Err(AppError::new(codes::PERIOD_INVALID, "Period start must be before its end")
            .with_details(format!("start={start}; end={end}")));
    }
    Ok(TimeWindow {
        start,
        end: end.min(now).max(start),
    })
}

fn invalid_token(token: &str) -> AppError {
    AppError::new(
        codes::PERIOD_INVALID,
        "Period must be a calendar month (YYYY-MM) or day (YYYY-MM-DD)",
    )
    .with_details(format!("token={token}"))
}

/// Parse a calendar token into its first day and the first day after it.
fn parse_calendar_token(token: &str) -> Result<(NaiveDate, NaiveDate), AppError> {
    let trimmed = token.trim();
    let parts: Vec<&str> = trimmed.split('-').collect();
    if parts.iter().any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit())) {
        return Err(invalid_token(token));
    }

    match parts.as_slice() {
        [year, month] if year.len() == 4 && month.len() <= 2 => {
            let year: i32 = year.parse().map_err(|_| invalid_token(token))?;
            let month: u32 = month.parse().map_err(|_| invalid_token(token))?;
            let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| invalid_token(token))?;
            let next = first
                .checked_add_months(Months::new(1))
                .ok_or_else(|| invalid_token(token))?;
            Ok((first, next))
        }
        [year, month, day] if year.len() == 4 && month.len() <= 2 && day.len() <= 2 => {
            let year: i32 = year.parse().map_err(|_| invalid_token(token))?;
            let month: u32 = month.parse().map_err(|_| invalid_token(token))?;
            let day: u32 = day.parse().map_err(|_| invalid_token(token))?;
            let first =
                NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid_token(token))?;
            let next = first.succ_opt().ok_or_else(|| invalid_token(token))?;
            Ok((first, next))
        }
        _ => Err(invalid_token(token)),
    }
}
