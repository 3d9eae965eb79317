//! # forecast-dl
//!
//! Backend library for fetching weather forecast and radar artifacts from
//! third-party providers and persisting them to local storage, with a
//! per-target success/failure report for every run.
//!
//! ## Design Philosophy
//!
//! - **Continue and report** - per-target failures become report rows, never
//!   aborted runs
//! - **Two-level parallelism** - chunked worker tasks, concurrent items inside
//!   each chunk
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding
//! - **Pluggable providers** - adapters only build URLs and unwrap response
//!   envelopes
//!
//! ## Quick Start
//!
//! ```no_run
//! use forecast_dl::{FetchConfig, HttpTransport, OpenWeather, Sensor, SensorFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FetchConfig::default();
//!     let transport = HttpTransport::new(&config)?;
//!     let provider = OpenWeather::new(transport, "api-token");
//!
//!     let sensors = vec![Sensor {
//!         id: "se-stockholm-01".to_string(),
//!         lon: 18.06,
//!         lat: 59.33,
//!         country: "SE".to_string(),
//!     }];
//!
//!     SensorFetcher::new(provider, config)
//!         .fetch_all(sensors, std::path::Path::new("./artifacts"))
//!         .await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Batched parallel dispatch
pub mod dispatch;
/// Error types
pub mod error;
/// Provider adapters for point-forecast services
pub mod providers;
/// Per-target outcome reporting
pub mod report;
/// Sensor forecast orchestration
pub mod sensors;
/// Snapshot-synchronized radar tile pipeline
pub mod tiles;
/// HTTP transport with flat retry
pub mod transport;
/// Core types shared across the engine
pub mod types;

// Re-export commonly used types
pub use config::{FetchConfig, RetryConfig, TileConfig};
pub use dispatch::{WorkerFailure, available_workers, batched, run_batched};
pub use error::{Error, Result};
pub use providers::{
    AccuWeather, Microsoft, OpenWeather, PointForecast, Vaisala, WeatherCompany,
};
pub use report::{FetchReport, REPORT_FILE};
pub use sensors::SensorFetcher;
pub use tiles::{
    FRAMES_PER_SNAPSHOT, Frame, PipelineOutcome, RadarFrames, SnapshotMetadata, TilePipeline,
};
pub use transport::HttpTransport;
pub use types::{Artifact, FetchResult, Sensor, TileJob};
