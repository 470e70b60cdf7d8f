//! Configuration for the filter RPC server.

use init4_bin_base::utils::from_env::FromEnv;
use std::time::Duration;

/// Default interval between eviction sweeps when eviction is enabled from
/// the environment without an explicit interval.
const DEFAULT_CLEAN_INTERVAL: Duration = Duration::from_secs(60);

/// Policy for removing filters that clients stopped polling.
///
/// The default is [`EvictionPolicy::Never`]: a filter lives until it is
/// uninstalled. Deployments exposed to untrusted clients should enable
/// [`EvictionPolicy::Unpolled`] to bound registry growth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Filters are only removed by `eth_uninstallFilter`.
    #[default]
    Never,
    /// Filters not polled for `ttl` are removed by a sweep every `interval`.
    Unpolled {
        /// Maximum time since the last poll (or since creation).
        ttl: Duration,
        /// Time between sweeps.
        interval: Duration,
    },
}

/// Configuration for the filter RPC server.
///
/// # Example
///
/// ```
/// use ethfilter_rpc::{EvictionPolicy, FilterRpcConfig};
///
/// let config = FilterRpcConfig::default();
/// assert_eq!(config.eviction, EvictionPolicy::Never);
/// assert_eq!(config.max_blocks_per_filter, 10_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterRpcConfig {
    /// Removal policy for unpolled filters.
    ///
    /// Default: [`EvictionPolicy::Never`].
    pub eviction: EvictionPolicy,

    /// Maximum number of live filters. `None` means unbounded.
    ///
    /// Default: `None`.
    pub max_filters: Option<usize>,

    /// Maximum block span of a historical log query.
    ///
    /// Default: `10_000`.
    pub max_blocks_per_filter: u64,

    /// Maximum number of logs returned by a historical log query.
    /// Set to `0` to disable the limit.
    ///
    /// Default: `20_000`.
    pub max_logs_per_response: usize,
}

impl Default for FilterRpcConfig {
    fn default() -> Self {
        Self {
            eviction: EvictionPolicy::Never,
            max_filters: None,
            max_blocks_per_filter: 10_000,
            max_logs_per_response: 20_000,
        }
    }
}

/// Filter server settings read from the environment.
///
/// Unset variables keep the [`FilterRpcConfig`] defaults.
///
/// # Environment Variables
///
/// - `FILTER_STALE_TTL_SECS` – evict filters unpolled for this long.
/// - `FILTER_CLEAN_INTERVAL_SECS` – eviction sweep interval.
/// - `FILTER_MAX_FILTERS` – maximum number of live filters.
/// - `FILTER_MAX_BLOCKS_PER_QUERY` – maximum `eth_getLogs` block span.
/// - `FILTER_MAX_LOGS_PER_RESPONSE` – maximum `eth_getLogs` result size.
#[derive(Debug, Clone, Default, serde::Deserialize, FromEnv)]
#[serde(rename_all = "camelCase")]
pub struct FilterEnvConfig {
    /// Seconds after the last poll at which a filter is evicted.
    #[from_env(
        var = "FILTER_STALE_TTL_SECS",
        desc = "Evict filters not polled for this many seconds",
        optional
    )]
    stale_ttl_secs: Option<u64>,
    /// Seconds between eviction sweeps.
    #[from_env(
        var = "FILTER_CLEAN_INTERVAL_SECS",
        desc = "Seconds between stale filter sweeps",
        optional
    )]
    clean_interval_secs: Option<u64>,
    /// Maximum number of live filters.
    #[from_env(var = "FILTER_MAX_FILTERS", desc = "Maximum number of live filters", optional)]
    max_filters: Option<u64>,
    /// Maximum block span of `eth_getLogs`.
    #[from_env(
        var = "FILTER_MAX_BLOCKS_PER_QUERY",
        desc = "Maximum block range of a log query",
        optional
    )]
    max_blocks_per_query: Option<u64>,
    /// Maximum number of logs per `eth_getLogs` response.
    #[from_env(
        var = "FILTER_MAX_LOGS_PER_RESPONSE",
        desc = "Maximum logs per log query response, 0 for unlimited",
        optional
    )]
    max_logs_per_response: Option<u64>,
}

impl FilterEnvConfig {
    /// The eviction policy described by the environment.
    pub fn eviction(&self) -> EvictionPolicy {
        match self.stale_ttl_secs {
            Some(ttl) => EvictionPolicy::Unpolled {
                ttl: Duration::from_secs(ttl),
                interval: self
                    .clean_interval_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_CLEAN_INTERVAL),
            },
            None => EvictionPolicy::Never,
        }
    }
}

impl From<FilterEnvConfig> for FilterRpcConfig {
    fn from(env: FilterEnvConfig) -> Self {
        let defaults = Self::default();
        Self {
            eviction: env.eviction(),
            max_filters: env.max_filters.map(|n| n as usize),
            max_blocks_per_filter: env
                .max_blocks_per_query
                .unwrap_or(defaults.max_blocks_per_filter),
            max_logs_per_response: env
                .max_logs_per_response
                .map(|n| n as usize)
                .unwrap_or(defaults.max_logs_per_response),
        }
    }
}
