//! Configuration types for forecast-dl

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for a fetch run
///
/// Groups the shared batching/transport knobs with the retry and tile
/// sub-configs. All fields have sensible defaults, so `FetchConfig::default()`
/// works out of the box; deserialization accepts any subset of fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Number of parallel chunk workers (None = available CPU parallelism)
    #[serde(default)]
    pub worker_count: Option<usize>,

    /// Targets per chunk (None = input length / worker count)
    #[serde(default)]
    pub chunk_size: Option<usize>,

    /// Per-request transport timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Retry behavior for single point/metadata requests
    #[serde(default)]
    pub retry: RetryConfig,

    /// Tile pipeline behavior
    #[serde(default)]
    pub tiles: TileConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            worker_count: None,
            chunk_size: None,
            request_timeout: default_request_timeout(),
            retry: RetryConfig::default(),
            tiles: TileConfig::default(),
        }
    }
}

/// Retry configuration for the flat (no-backoff) transport policy
///
/// This policy repeats a request back-to-back until a payload arrives. It is
/// deliberately distinct from the tile downloader's exponential backoff in
/// [`TileConfig`]; unifying the two would change observable request timing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per request (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Tile pipeline configuration (snapshot wait, batching, backoff)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileConfig {
    /// Tile jobs per chunk worker (default: 12)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Concurrent connections per chunk worker session (default: 10)
    #[serde(default = "default_connection_limit")]
    pub connection_limit: usize,

    /// Maximum download attempts per tile (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First inter-attempt delay; doubles after every failed attempt (default: 1 second)
    #[serde(default = "default_backoff_base", with = "duration_serde")]
    pub backoff_base: Duration,

    /// Delay between snapshot metadata polls (default: 15 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// How long past the snapshot timestamp to keep polling before abandoning
    /// the run (default: 300 seconds)
    #[serde(default = "default_max_wait", with = "duration_serde")]
    pub max_wait: Duration,

    /// Tile edge length in pixels, a path segment of every tile URL (default: 256)
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            connection_limit: default_connection_limit(),
            max_attempts: default_max_attempts(),
            backoff_base: default_backoff_base(),
            poll_interval: default_poll_interval(),
            max_wait: default_max_wait(),
            tile_size: default_tile_size(),
        }
    }
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    5
}

fn default_batch_size() -> usize {
    12
}

fn default_connection_limit() -> usize {
    10
}

fn default_backoff_base() -> Duration {
    Duration::from_secs(1)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_max_wait() -> Duration {
    Duration::from_secs(300)
}

fn default_tile_size() -> u32 {
    256
}

// Duration serialization helper (seconds as integer)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
