use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sla_core::config::EngineConfig;
use sla_core::error::{codes, AppError};
use sla_fetch::ZabbixConfig;

const DEFAULTS_TOML: &str = include_str!("../config/default.toml");
const ENV_PREFIX: &str = "SLA";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub engine: EngineConfig,
    pub zabbix: ZabbixConfig,
    pub log: LogSettings,
}

/// Values given on the command line; they win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub timezone: Option<String>,
    pub zabbix_url: Option<String>,
    pub log_json: bool,
}

fn config_error(message: &str, e: config::ConfigError) -> AppError {
    AppError::new(codes::CONFIG_INVALID, message.to_string()).with_details(e.to_string())
}

/// Load settings from the process environment.
///
/// Precedence: built-in defaults < TOML file < `SLA__SECTION__KEY` environment < overrides.
pub fn load(file: Option<&Path>, overrides: &SettingsOverrides) -> Result<Settings, AppError> {
    load_with_env(file, None, overrides)
}

/// Same as [`load`], reading environment variables from `env` instead of the process when given.
pub fn load_with_env(
    file: Option<&Path>,
    env: Option<HashMap<String, String>>,
    overrides: &SettingsOverrides,
) -> Result<Settings, AppError> {
    let mut builder = config::Config::builder()
        .add_source(config::File::from_str(DEFAULTS_TOML, config::FileFormat::Toml));

    builder = match file {
        Some(path) => builder.add_source(config::File::from(path).required(true)),
        None => builder.add_source(config::File::with_name("slareview").required(false)),
    };

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("engine.reachability_types")
            .source(env),
    );

    let log_format = overrides.log_json.then_some("json");
    builder = builder
        .set_override_option("engine.timezone", overrides.timezone.clone())
        .and_then(|b| b.set_override_option("zabbix.url", overrides.zabbix_url.clone()))
        .and_then(|b| b.set_override_option("log.format", log_format))
        .map_err(|e| config_error("Invalid command-line override", e))?;

    let settings: Settings = builder
        .build()
        .map_err(|e| config_error("Failed to read configuration", e))?
        .try_deserialize()
        .map_err(|e| config_error("Configuration has an unexpected shape", e))?;

    settings.engine.validate()?;
    tracing::debug!(
        timezone = %settings.engine.timezone,
        zabbix = ?settings.zabbix,
        "settings loaded"
    );
    Ok(settings)
}
