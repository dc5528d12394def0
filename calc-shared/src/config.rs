//! Environment-driven configuration for the orchestrator and worker processes.
//!
//! Both processes load their configuration from environment variables (with
//! optional `.env` support for local development via `dotenvy`), validated at
//! startup. Values that are absent fall back to the defaults below.

use serde::Deserialize;

use crate::errors::{CalcError, CalcResult};

/// Per-operation synthetic execution costs, in milliseconds, advertised to
/// workers alongside a leased task.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct OperationTimings {
    #[serde(default = "default_addition_ms")]
    pub addition_ms: u64,
    #[serde(default = "default_subtraction_ms")]
    pub subtraction_ms: u64,
    #[serde(default = "default_multiplication_ms")]
    pub multiplication_ms: u64,
    #[serde(default = "default_division_ms")]
    pub division_ms: u64,
}

fn default_addition_ms() -> u64 {
    50
}
fn default_subtraction_ms() -> u64 {
    50
}
fn default_multiplication_ms() -> u64 {
    100
}
fn default_division_ms() -> u64 {
    100
}

impl Default for OperationTimings {
    fn default() -> Self {
        Self {
            addition_ms: default_addition_ms(),
            subtraction_ms: default_subtraction_ms(),
            multiplication_ms: default_multiplication_ms(),
            division_ms: default_division_ms(),
        }
    }
}

/// Configuration for the orchestrator process (gRPC server, store, sweeper).
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_grpc_addr")]
    pub grpc_addr: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default)]
    pub timings: OperationTimings,
    #[serde(default = "default_lease_ttl_seconds")]
    pub lease_ttl_seconds: u64,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_grpc_addr() -> String {
    "0.0.0.0:50051".to_string()
}
fn default_db_path() -> String {
    "./data/calc.db".to_string()
}
fn default_lease_ttl_seconds() -> u64 {
    30
}
fn default_sweep_interval_seconds() -> u64 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            grpc_addr: default_grpc_addr(),
            db_path: default_db_path(),
            timings: OperationTimings::default(),
            lease_ttl_seconds: default_lease_ttl_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            log_level: default_log_level(),
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from process environment variables, falling back
    /// to `.env` if present. Returns a typed [`CalcError::Config`] on a
    /// malformed (non-default-able) value rather than panicking, so the
    /// caller can exit with status 1 and a clear message.
    pub fn from_env() -> CalcResult<Self> {
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .set_default("grpc_addr", default_grpc_addr())
            .map_err(|e| CalcError::config(e.to_string()))?
            .set_default("db_path", default_db_path())
            .map_err(|e| CalcError::config(e.to_string()))?
            .set_default("timings.addition_ms", default_addition_ms() as i64)
            .map_err(|e| CalcError::config(e.to_string()))?
            .set_default("timings.subtraction_ms", default_subtraction_ms() as i64)
            .map_err(|e| CalcError::config(e.to_string()))?
            .set_default(
                "timings.multiplication_ms",
                default_multiplication_ms() as i64,
            )
            .map_err(|e| CalcError::config(e.to_string()))?
            .set_default("timings.division_ms", default_division_ms() as i64)
            .map_err(|e| CalcError::config(e.to_string()))?
            .set_default("lease_ttl_seconds", default_lease_ttl_seconds() as i64)
            .map_err(|e| CalcError::config(e.to_string()))?
            .set_default(
                "sweep_interval_seconds",
                default_sweep_interval_seconds() as i64,
            )
            .map_err(|e| CalcError::config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| CalcError::config(e.to_string()))?
            .add_source(
                config::Environment::default()
                    .try_parsing(true)
                    .separator("__")
                    .source(Some(env_aliases())),
            );

        let raw = builder.build().map_err(|e| CalcError::config(e.to_string()))?;
        raw.try_deserialize()
            .map_err(|e| CalcError::config(e.to_string()))
    }
}

/// Configuration for the worker process (gRPC client, polling loop).
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_calculator_addr")]
    pub calculator_addr: String,
    #[serde(default = "default_computing_power")]
    pub computing_power: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_calculator_addr() -> String {
    "http://127.0.0.1:50051".to_string()
}
fn default_computing_power() -> usize {
    4
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            calculator_addr: default_calculator_addr(),
            computing_power: default_computing_power(),
            log_level: default_log_level(),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> CalcResult<Self> {
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .set_default("calculator_addr", default_calculator_addr())
            .map_err(|e| CalcError::config(e.to_string()))?
            .set_default("computing_power", default_computing_power() as i64)
            .map_err(|e| CalcError::config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| CalcError::config(e.to_string()))?
            .add_source(
                config::Environment::default()
                    .try_parsing(true)
                    .separator("__")
                    .source(Some(worker_env_aliases())),
            );

        let raw = builder.build().map_err(|e| CalcError::config(e.to_string()))?;
        raw.try_deserialize()
            .map_err(|e| CalcError::config(e.to_string()))
    }
}

/// Reads the orchestrator's documented env var names directly, since they do
/// not share a common prefix (`GRPC_ADDR`, `DB_PATH`, `TIME_ADDITION_MS`, ...)
/// the way a conventional `config::Environment::with_prefix` setup expects.
fn env_aliases() -> std::collections::HashMap<String, String> {
    let mut map = std::collections::HashMap::new();
    for (env_key, config_key) in [
        ("GRPC_ADDR", "grpc_addr"),
        ("DB_PATH", "db_path"),
        ("TIME_ADDITION_MS", "timings.addition_ms"),
        ("TIME_SUBTRACTION_MS", "timings.subtraction_ms"),
        ("TIME_MULTIPLICATIONS_MS", "timings.multiplication_ms"),
        ("TIME_DIVISIONS_MS", "timings.division_ms"),
        ("LEASE_TTL_SECONDS", "lease_ttl_seconds"),
        ("SWEEP_INTERVAL_SECONDS", "sweep_interval_seconds"),
        ("LOG_LEVEL", "log_level"),
    ] {
        if let Ok(value) = std::env::var(env_key) {
            map.insert(config_key.to_string(), value);
        }
    }
    map
}

fn worker_env_aliases() -> std::collections::HashMap<String, String> {
    let mut map = std::collections::HashMap::new();
    for (env_key, config_key) in [
        ("CALCULATOR_ADDR", "calculator_addr"),
        ("COMPUTING_POWER", "computing_power"),
        ("LOG_LEVEL", "log_level"),
    ] {
        if let Ok(value) = std::env::var(env_key) {
            map.insert(config_key.to_string(), value);
        }
    }
    map
}
