use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sla_core::error::{codes, AppError};

use crate::config::ZabbixConfig;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

/// Blocking Zabbix JSON-RPC client.
///
/// Transport failures, timeouts and 5xx/429 responses are retried with linear backoff;
/// RPC-level errors and undecodable payloads fail immediately.
pub struct ZabbixClient {
    config: ZabbixConfig,
    endpoint: String,
    pool: rayon::ThreadPool,
    next_id: AtomicU64,
}

impl ZabbixClient {
    pub fn new(config: ZabbixConfig) -> Result<Self, AppError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.concurrency)
            .thread_name(|i| format!("zabbix-fetch-{i}"))
            .build()
            .map_err(|e| {
                AppError::new(codes::CONFIG_INVALID, "Failed to start fetch worker pool")
                    .with_details(e.to_string())
            })?;
        let endpoint = config.endpoint();
        Ok(Self {
            config,
            endpoint,
            pool,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &ZabbixConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call `method` and decode its `result`, retrying transient failures.
    pub fn call<T: DeserializeOwned>(&self, method: &str, params: &Value) -> Result<T, AppError> {
        let mut attempt: u32 = 0;
        loop {
            match self.call_once(method, params) {
                Ok(v) => return Ok(v),
                Err(e) if e.retryable && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.retry_backoff_ms * u64::from(attempt);
                    tracing::warn!(
                        method,
                        attempt,
                        delay_ms = delay,
                        error = %e,
                        "retrying zabbix request"
                    );
                    std::thread::sleep(Duration::from_millis(delay));
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn call_once<T: DeserializeOwned>(&self, method: &str, params: &Value) -> Result<T, AppError> {
        let req = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        let body = serde_json::to_value(&req).map_err(|e| {
            AppError::new(codes::FETCH_FAILED, "Failed to encode request")
                .with_details(format!("method={method}; err={e}"))
        })?;

        let mut http = ureq::post(&self.endpoint)
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .set("Content-Type", "application/json-rpc");
        if !self.config.token.is_empty() {
            http = http.set("Authorization", &format!("Bearer {}", self.config.token));
        }

        let resp = match http.send_json(body) {
            Ok(r) if r.status() == 200 => r,
            Ok(r) => {
                return Err(AppError::new(codes::FETCH_FAILED, "Zabbix request failed")
                    .with_details(format!("method={method}; status={}", r.status())))
            }
            Err(ureq::Error::Status(code, _)) => {
                return Err(AppError::new(codes::FETCH_FAILED, "Zabbix request failed")
                    .with_details(format!("method={method}; status={code}"))
                    .with_retryable(code == 429 || code >= 500))
            }
            Err(e) => {
                return Err(AppError::new(codes::FETCH_FAILED, "Failed to reach Zabbix")
                    .with_details(format!("method={method}; err={e}"))
                    .with_retryable(true))
            }
        };

        let envelope: RpcResponse = resp.into_json().map_err(|e| {
            AppError::new(codes::FETCH_DECODE_FAILED, "Failed to decode Zabbix response")
                .with_details(format!("method={method}; err={e}"))
        })?;

        if let Some(err) = envelope.error {
            return Err(AppError::new(codes::FETCH_RPC_ERROR, err.message)
                .with_details(format!("method={method}; code={}; data={}", err.code, err.data)));
        }
        let result = envelope.result.ok_or_else(|| {
            AppError::new(codes::FETCH_DECODE_FAILED, "Zabbix response had no result")
                .with_details(format!("method={method}"))
        })?;
        serde_json::from_value(result).map_err(|e| {
            AppError::new(codes::FETCH_DECODE_FAILED, "Unexpected Zabbix result shape")
                .with_details(format!("method={method}; err={e}"))
        })
    }

    /// Run `fetch` over `ids` in `batch_size` chunks on the bounded worker pool.
    ///
    /// Results keep chunk order; the first failing chunk fails the whole lookup.
    pub fn batched<T, F>(&self, ids: &[String], fetch: F) -> Result<Vec<T>, AppError>
    where
        T: Send,
        F: Fn(&[String]) -> Result<Vec<T>, AppError> + Sync,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let chunks: Vec<&[String]> = ids.chunks(self.config.batch_size).collect();
        tracing::debug!(ids = ids.len(), batches = chunks.len(), "batched lookup");
        let results: Vec<Vec<T>> = self.pool.install(|| {
            chunks
                .par_iter()
                .map(|chunk| fetch(chunk))
                .collect::<Result<Vec<_>, AppError>>()
        })?;
        Ok(results.into_iter().flatten().collect())
    }
}
