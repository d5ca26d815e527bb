use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{codes, AppError};
use crate::period::BusinessCalendar;

pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_BUSINESS_START_HOUR: u32 = 7;
pub const DEFAULT_BUSINESS_END_HOUR: u32 = 24;
pub const DEFAULT_SHIFT_STEP_MINUTES: u32 = 5;
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;
pub const DEFAULT_IMPACT_THRESHOLD_MINUTES: u32 = 60;
pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_MAX_PERIOD_DAYS: u32 = 400;

pub fn default_reachability_types() -> Vec<String> {
    ["ICMP", "Agent", "Uptime", "SNMP"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Immutable engine configuration passed into every aggregation entry point.
///
/// Every field has a serde default so a partial TOML table or a handful of environment
/// variables is enough to build one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// IANA timezone used for calendar periods, business hours and local timestamps.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// First local hour inside the business window.
    #[serde(default = "default_business_start_hour")]
    pub business_start_hour: u32,

    /// Local hour the business window ends at (exclusive). `>= 24` means through midnight.
    #[serde(default = "default_business_end_hour")]
    pub business_end_hour: u32,

    /// Slice size used when splitting downtime into business and off-hours.
    #[serde(default = "default_shift_step_minutes")]
    pub shift_step_minutes: u32,

    /// Alert types admitted into reachability views (case-insensitive).
    #[serde(default = "default_reachability_types")]
    pub reachability_types: Vec<String>,

    /// How far before the window start incidents are fetched, to catch long-running ones.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Resolution time above which a max-severity business-hours incident is impactful.
    #[serde(default = "default_impact_threshold_minutes")]
    pub impact_threshold_minutes: u32,

    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Default page size of the reachability report.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Longest period a report may cover. Bounds the business-hours split work.
    #[serde(default = "default_max_period_days")]
    pub max_period_days: u32,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_business_start_hour() -> u32 {
    DEFAULT_BUSINESS_START_HOUR
}

fn default_business_end_hour() -> u32 {
    DEFAULT_BUSINESS_END_HOUR
}

fn default_shift_step_minutes() -> u32 {
    DEFAULT_SHIFT_STEP_MINUTES
}

fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}

fn default_impact_threshold_minutes() -> u32 {
    DEFAULT_IMPACT_THRESHOLD_MINUTES
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_max_period_days() -> u32 {
    DEFAULT_MAX_PERIOD_DAYS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            business_start_hour: DEFAULT_BUSINESS_START_HOUR,
            business_end_hour: DEFAULT_BUSINESS_END_HOUR,
            shift_step_minutes: DEFAULT_SHIFT_STEP_MINUTES,
            reachability_types: default_reachability_types(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            impact_threshold_minutes: DEFAULT_IMPACT_THRESHOLD_MINUTES,
            top_n: DEFAULT_TOP_N,
            page_size: DEFAULT_PAGE_SIZE,
            max_period_days: DEFAULT_MAX_PERIOD_DAYS,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration and build the business calendar it describes.
    pub fn calendar(&self) -> Result<BusinessCalendar, AppError> {
        let tz: Tz = self.timezone.trim().parse().map_err(|_| {
            AppError::new(codes::CONFIG_INVALID, "Unknown timezone")
                .with_details(format!("timezone={}", self.timezone))
        })?;

        if self.business_start_hour > 23 {
            return Err(
                AppError::new(codes::CONFIG_INVALID, "business_start_hour must be within 0..=23")
                    .with_details(format!("business_start_hour={}", self.business_start_hour)),
            );
        }
        if self.business_end_hour > 48 {
            return Err(
                AppError::new(codes::CONFIG_INVALID, "business_end_hour must be within 0..=48")
                    .with_details(format!("business_end_hour={}", self.business_end_hour)),
            );
        }
        if self.shift_step_minutes == 0 || self.shift_step_minutes > 24 * 60 {
            return Err(
                AppError::new(codes::CONFIG_INVALID, "shift_step_minutes must be within 1..=1440")
                    .with_details(format!("shift_step_minutes={}", self.shift_step_minutes)),
            );
        }

        Ok(BusinessCalendar::new(
            tz,
            self.business_start_hour,
            self.business_end_hour,
            self.shift_step_minutes,
        ))
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.calendar()?;
        if self.top_n == 0 {
            return Err(AppError::new(codes::CONFIG_INVALID, "top_n must be positive"));
        }
        if self.page_size == 0 {
            return Err(AppError::new(codes::CONFIG_INVALID, "page_size must be positive"));
        }
        if self.max_period_days == 0 {
            return Err(AppError::new(codes::CONFIG_INVALID, "max_period_days must be positive"));
        }
        Ok(())
    }

    pub fn impact_threshold_seconds(&self) -> i64 {
        i64::from(self.impact_threshold_minutes) * 60
    }

    pub fn lookback_seconds(&self) -> i64 {
        i64::from(self.lookback_days) * 86_400
    }

    pub fn max_period_seconds(&self) -> i64 {
        i64::from(self.max_period_days) * 86_400
    }

    /// Whether `alert_type` is on the reachability allow-list.
    pub fn allows_reachability_type(&self, alert_type: &str) -> bool {
        self.reachability_types
            .iter()
            .any(|t| t.trim().eq_ignore_ascii_case(alert_type))
    }
}
