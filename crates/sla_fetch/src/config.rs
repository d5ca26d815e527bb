use std::fmt;

use serde::{Deserialize, Serialize};
use sla_core::error::{codes, AppError};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_MAX_PAGES: usize = 20;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

const RPC_PATH: &str = "api_jsonrpc.php";

/// Connection and paging settings for the Zabbix JSON-RPC API.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZabbixConfig {
    /// Frontend base URL or the full `api_jsonrpc.php` endpoint.
    pub url: String,
    /// API token sent as `Authorization: Bearer <token>`.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Events per `event.get` page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Page ceiling per incident query; hitting it yields a warning, not an error.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Ids per batched lookup.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Upper bound on in-flight batched lookups.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Linear backoff step: attempt `n` waits `n * retry_backoff_ms`.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

impl ZabbixConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let url = self.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::new(codes::CONFIG_INVALID, "Zabbix URL must be http(s)")
                .with_details(format!("url={url}")));
        }
        for (name, value) in [
            ("page_size", self.page_size),
            ("max_pages", self.max_pages),
            ("batch_size", self.batch_size),
            ("concurrency", self.concurrency),
        ] {
            if value == 0 {
                return Err(AppError::new(codes::CONFIG_INVALID, format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    /// Full JSON-RPC endpoint derived from `url`.
    pub fn endpoint(&self) -> String {
        let url = self.url.trim().trim_end_matches('/');
        if url.ends_with(RPC_PATH) {
            url.to_string()
        } else {
            format!("{url}/{RPC_PATH}")
        }
    }
}

impl fmt::Debug for ZabbixConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZabbixConfig")
            .field("url", &self.url)
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("batch_size", &self.batch_size)
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_rpc_path_once() {
        assert_eq!(
            ZabbixConfig::new("https://zbx.example.com/", "t").endpoint(),
            "https://zbx.example.com/api_jsonrpc.php"
        );
        assert_eq!(
            ZabbixConfig::new("https://zbx.example.com/api_jsonrpc.php", "t").endpoint(),
            "https://zbx.example.com/api_jsonrpc.php"
        );
    }

    #[test]
    fn debug_output_hides_token() {
        let cfg = ZabbixConfig::new("https://zbx.example.com", "secret-token");
        assert!(!format!("{cfg:?}").contains("secret-token"));
    }

    #[test]
    fn zero_limits_are_rejected() {
        let cfg = ZabbixConfig {
            batch_size: 0,
            ..ZabbixConfig::new("https://zbx.example.com", "t")
        };
        assert_eq!(cfg.validate().expect_err("invalid").code, "CONFIG_INVALID");
        let cfg = ZabbixConfig::new("zbx.example.com", "t");
        assert_eq!(cfg.validate().expect_err("scheme").code, "CONFIG_INVALID");
    }
}
