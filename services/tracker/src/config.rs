use anyhow::{Context, Result, bail};
use chrono::Duration;
use larder_compliance::{EvaluatorPolicy, UnmonitoredPolicy};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;

pub const DEFAULT_ACTION_DUE_HOURS: u32 = 24;
pub const DEFAULT_PG_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_PG_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_PG_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "pg" => Ok(StorageBackend::Postgres),
            other => bail!("unknown storage backend {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
}

impl PostgresConfig {
    pub fn with_url(url: String) -> Self {
        Self {
            url,
            max_connections: DEFAULT_PG_MAX_CONNECTIONS,
            connect_timeout_ms: DEFAULT_PG_CONNECT_TIMEOUT_MS,
            acquire_timeout_ms: DEFAULT_PG_ACQUIRE_TIMEOUT_MS,
        }
    }
}

// Tracker configuration sourced from environment variables, optionally
// overridden by a YAML file.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub unmonitored_policy: UnmonitoredPolicy,
    pub action_due_hours: u32,
}

#[derive(Debug, Deserialize)]
struct TrackerConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<StorageBackend>,
    postgres: Option<PostgresConfigOverride>,
    unmonitored_policy: Option<UnmonitoredPolicy>,
    action_due_hours: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PostgresConfigOverride {
    url: Option<String>,
    max_connections: Option<u32>,
    connect_timeout_ms: Option<u64>,
    acquire_timeout_ms: Option<u64>,
}

impl TrackerConfig {
    pub fn from_env() -> Result<Self> {
        let metrics_bind = std::env::var("LARDER_TRACKER_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:9090".to_string())
            .parse()
            .with_context(|| "parse LARDER_TRACKER_METRICS_BIND")?;
        let bind_addr = std::env::var("LARDER_TRACKER_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse LARDER_TRACKER_BIND")?;
        let storage = match std::env::var("LARDER_TRACKER_STORAGE_BACKEND") {
            Ok(value) => value
                .parse()
                .with_context(|| "parse LARDER_TRACKER_STORAGE_BACKEND")?,
            Err(_) => StorageBackend::Memory,
        };
        let postgres = match std::env::var("LARDER_TRACKER_POSTGRES_URL") {
            Ok(url) => Some(PostgresConfig {
                url,
                max_connections: env_number(
                    "LARDER_TRACKER_POSTGRES_MAX_CONNECTIONS",
                    DEFAULT_PG_MAX_CONNECTIONS,
                )?,
                connect_timeout_ms: env_number(
                    "LARDER_TRACKER_POSTGRES_CONNECT_TIMEOUT_MS",
                    DEFAULT_PG_CONNECT_TIMEOUT_MS,
                )?,
                acquire_timeout_ms: env_number(
                    "LARDER_TRACKER_POSTGRES_ACQUIRE_TIMEOUT_MS",
                    DEFAULT_PG_ACQUIRE_TIMEOUT_MS,
                )?,
            }),
            Err(_) => None,
        };
        let unmonitored_policy = match std::env::var("LARDER_UNMONITORED_POLICY") {
            Ok(value) => value
                .parse::<UnmonitoredPolicy>()
                .map_err(anyhow::Error::msg)
                .with_context(|| "parse LARDER_UNMONITORED_POLICY")?,
            Err(_) => UnmonitoredPolicy::default(),
        };
        let action_due_hours = env_number("LARDER_ACTION_DUE_HOURS", DEFAULT_ACTION_DUE_HOURS)?;
        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            unmonitored_policy,
            action_due_hours,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("LARDER_TRACKER_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read LARDER_TRACKER_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: TrackerConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse tracker config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.storage {
            self.storage = value;
        }
        if let Some(pg) = override_cfg.postgres {
            let mut current = match (self.postgres.take(), pg.url) {
                (Some(existing), Some(url)) => Some(PostgresConfig { url, ..existing }),
                (Some(existing), None) => Some(existing),
                (None, Some(url)) => Some(PostgresConfig::with_url(url)),
                (None, None) => None,
            };
            if let Some(cfg) = current.as_mut() {
                if let Some(value) = pg.max_connections {
                    cfg.max_connections = value;
                }
                if let Some(value) = pg.connect_timeout_ms {
                    cfg.connect_timeout_ms = value;
                }
                if let Some(value) = pg.acquire_timeout_ms {
                    cfg.acquire_timeout_ms = value;
                }
            }
            self.postgres = current;
        }
        if let Some(value) = override_cfg.unmonitored_policy {
            self.unmonitored_policy = value;
        }
        if let Some(value) = override_cfg.action_due_hours {
            self.action_due_hours = value;
        }
        Ok(())
    }

    pub fn evaluator_policy(&self) -> EvaluatorPolicy {
        EvaluatorPolicy {
            unmonitored: self.unmonitored_policy,
            action_due_after: Duration::hours(i64::from(self.action_due_hours)),
            ..EvaluatorPolicy::default()
        }
    }
}

fn env_number<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value.trim().parse().with_context(|| format!("parse {key}")),
        Err(_) => Ok(default),
    }
}
