//! Controller configuration.
//!
//! All tunables are read from environment variables at startup and threaded
//! into the components that need them.

use crate::error::ControllerError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Label placed on every StatefulSet rendered from a workload.
pub const DEFAULT_LABEL_KEY: &str = "statefulsetworkload.oam.crossplane.io";

/// Namespace used when a workload carries none.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Runtime configuration of the StatefulSetWorkload controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch. `None` watches all namespaces.
    pub watch_namespace: Option<String>,
    /// Label key whose value is the owning workload's uid
    pub label_key: String,
    /// Fallback namespace for rendered children
    pub default_namespace: String,
    /// Fixed delay before retrying a failed reconcile
    pub retry_delay: Duration,
    /// Delay before re-checking a successfully reconciled workload
    pub resync_interval: Duration,
    /// Upper bound on `status.conditions` history
    pub max_conditions: usize,
    /// Maximum concurrent reconciles
    pub concurrency: u16,
    /// Quiet period after the last event before reconciling
    pub debounce: Duration,
    /// Listen address of the probes/metrics server
    pub probe_addr: SocketAddr,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            label_key: DEFAULT_LABEL_KEY.to_string(),
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            retry_delay: Duration::from_secs(30),
            resync_interval: Duration::from_secs(300),
            max_conditions: 16,
            concurrency: 3,
            debounce: Duration::from_secs(1),
            probe_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl ControllerConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let watch_namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());
        let label_key = lookup("LABEL_KEY").unwrap_or(defaults.label_key);
        let default_namespace = lookup("DEFAULT_NAMESPACE").unwrap_or(defaults.default_namespace);

        let retry_delay = parse_or(&lookup, "RETRY_DELAY_SECS", defaults.retry_delay.as_secs())?;
        let resync_interval = parse_or(&lookup, "RESYNC_INTERVAL_SECS", defaults.resync_interval.as_secs())?;
        let max_conditions = parse_or(&lookup, "MAX_CONDITIONS", defaults.max_conditions)?;
        let concurrency = parse_or(&lookup, "RECONCILE_CONCURRENCY", defaults.concurrency)?;
        let debounce = parse_or(&lookup, "DEBOUNCE_SECS", defaults.debounce.as_secs())?;
        let probe_addr = parse_or(&lookup, "PROBE_ADDR", defaults.probe_addr)?;

        if label_key.is_empty() {
            return Err(ControllerError::InvalidConfig("LABEL_KEY must not be empty".to_string()));
        }
        if default_namespace.is_empty() {
            return Err(ControllerError::InvalidConfig("DEFAULT_NAMESPACE must not be empty".to_string()));
        }
        if retry_delay == 0 {
            return Err(ControllerError::InvalidConfig("RETRY_DELAY_SECS must be greater than zero".to_string()));
        }
        if max_conditions == 0 {
            return Err(ControllerError::InvalidConfig("MAX_CONDITIONS must be at least 1".to_string()));
        }

        Ok(Self {
            watch_namespace,
            label_key,
            default_namespace,
            retry_delay: Duration::from_secs(retry_delay),
            resync_interval: Duration::from_secs(resync_interval),
            max_conditions,
            concurrency,
            debounce: Duration::from_secs(debounce),
            probe_addr,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ControllerError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("{} has invalid value {:?}: {}", key, raw, e))
        }),
        None => Ok(default),
    }
}
