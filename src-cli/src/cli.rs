use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sla_core::error::{codes, AppError};
use sla_core::period::PeriodRequest;
use sla_core::scope::ReportScope;

use crate::settings::SettingsOverrides;

/// SLA metrics and availability reports from Zabbix incidents.
#[derive(Debug, Parser)]
#[command(name = "slareview", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// TOML settings file (default: ./slareview.toml when present).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// IANA timezone for periods, business hours and local timestamps.
    #[arg(long, global = true, value_name = "TZ")]
    pub timezone: Option<String>,

    /// Zabbix frontend URL.
    #[arg(long, global = true, value_name = "URL")]
    pub zabbix_url: Option<String>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,
}

impl GlobalArgs {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            timezone: self.timezone.clone(),
            zabbix_url: self.zabbix_url.clone(),
            log_json: self.log_json,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the metrics report (KPIs, availability, host and group tables) as JSON.
    Metrics {
        #[command(flatten)]
        period: PeriodArgs,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Print one page of the reachability report as JSON, optionally exporting all rows to CSV.
    Reachability {
        #[command(flatten)]
        period: PeriodArgs,
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Rows per page (default: engine.page_size).
        #[arg(long)]
        page_size: Option<usize>,
        /// Write every row of the report to this CSV file.
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct PeriodArgs {
    /// Calendar month `YYYY-MM` or day `YYYY-MM-DD`.
    #[arg(long, value_name = "TOKEN", required_unless_present = "from", conflicts_with_all = ["from", "till"])]
    pub period: Option<String>,

    /// Range start, epoch seconds.
    #[arg(long, value_name = "EPOCH", requires = "till")]
    pub from: Option<i64>,

    /// Range end, epoch seconds.
    #[arg(long, value_name = "EPOCH", requires = "from")]
    pub till: Option<i64>,
}

impl PeriodArgs {
    pub fn request(&self) -> Result<PeriodRequest, AppError> {
        match (&self.period, self.from, self.till) {
            (Some(token), None, None) => Ok(PeriodRequest::Calendar {
                token: token.clone(),
            }),
            (None, Some(start), Some(end)) => Ok(PeriodRequest::Range { start, end }),
            _ => Err(AppError::new(
                codes::PERIOD_INVALID,
                "Give either --period or both --from and --till",
            )),
        }
    }
}

#[derive(Debug, Args)]
pub struct ScopeArgs {
    /// Restrict the report to one host group id.
    #[arg(long, value_name = "ID", conflicts_with = "all_groups")]
    pub group: Option<String>,

    /// Add one table per host group.
    #[arg(long)]
    pub all_groups: bool,
}

impl ScopeArgs {
    pub fn scope(&self) -> ReportScope {
        match (&self.group, self.all_groups) {
            (Some(group_id), _) => ReportScope::Group {
                group_id: group_id.clone(),
            },
            (None, true) => ReportScope::AllGroups,
            (None, false) => ReportScope::Global,
        }
    }
}
