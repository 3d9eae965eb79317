//! Snapshot-synchronized radar tile pipeline.
//!
//! A run targets one snapshot timestamp: it polls the remote metadata until
//! the latest past observation matches that timestamp (bounded by
//! `tiles.max_wait`), generates the full tile-job grid for the snapshot, and
//! pushes the jobs through the batch dispatcher where each chunk downloads its
//! tiles under a connection-limited, backoff-retrying session. A run that
//! never sees its snapshot is abandoned quietly — no report, no downloads —
//! because the next scheduled run will simply target the next snapshot.

mod download;
mod jobs;

pub use jobs::{FRAMES_PER_SNAPSHOT, Frame, RadarFrames, SnapshotMetadata};

use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::FetchConfig;
use crate::dispatch::run_batched;
use crate::error::{Error, Result};
use crate::report::FetchReport;
use crate::transport::HttpTransport;
use crate::types::FetchResult;
use download::{TileFetchSettings, download_tile_chunk};

/// Largest accepted zoom level; the job count grows as `8 · 4^zoom`
const MAX_ZOOM: u8 = 12;

/// Terminal state of one pipeline run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The snapshot matched; tiles were downloaded and the report persisted
    Completed {
        /// Number of tile jobs generated
        total: usize,
        /// Number of tiles downloaded and persisted successfully
        downloaded: usize,
    },
    /// The snapshot never became available within the deadline, or its
    /// metadata could not be fetched; nothing was downloaded
    Abandoned,
}

/// Downloads the full tile grid of one radar snapshot once it is available
#[derive(Debug)]
pub struct TilePipeline {
    transport: HttpTransport,
    metadata_url: String,
    zoom: u8,
    config: FetchConfig,
}

impl TilePipeline {
    /// Pipeline polling `metadata_url` for snapshot availability.
    ///
    /// Returns a configuration error for zoom levels whose grid would be
    /// unreasonably large.
    pub fn new(metadata_url: impl Into<String>, zoom: u8, config: FetchConfig) -> Result<Self> {
        if zoom > MAX_ZOOM {
            return Err(Error::Config {
                message: format!("zoom {zoom} exceeds maximum {MAX_ZOOM}"),
                key: Some("zoom".to_string()),
            });
        }
        let transport = HttpTransport::new(&config)?;
        Ok(Self {
            transport,
            metadata_url: metadata_url.into(),
            zoom,
            config,
        })
    }

    /// Pipeline for the RainViewer private weather-maps feed
    pub fn rainviewer(token: &str, zoom: u8, config: FetchConfig) -> Result<Self> {
        Self::new(
            format!("https://api.rainviewer.com/private/{token}/weather-maps.json"),
            zoom,
            config,
        )
    }

    /// Run the pipeline for the snapshot identified by `snapshot_ts`,
    /// downloading under `dest_dir`.
    ///
    /// Blocks in the polling state until the snapshot appears or the deadline
    /// passes. Only a malformed frame set or a failure to persist the report
    /// produce an `Err`; per-tile failures are captured in the report.
    pub async fn run(&self, snapshot_ts: i64, dest_dir: &Path) -> Result<PipelineOutcome> {
        let Some((metadata, current)) = self.await_snapshot(snapshot_ts).await else {
            return Ok(PipelineOutcome::Abandoned);
        };

        let frames = jobs::ordered_frames(current, &metadata.radar.nowcast)?;
        let tile_jobs = jobs::generate_jobs(
            &metadata.host,
            &frames,
            snapshot_ts,
            self.zoom,
            self.config.tiles.tile_size,
            dest_dir,
        );
        let total = tile_jobs.len();
        info!(snapshot = snapshot_ts, total = total, "downloading tiles");

        std::fs::create_dir_all(dest_dir)?;
        let targets: Vec<String> = tile_jobs.iter().map(|j| j.url.clone()).collect();
        let settings = TileFetchSettings {
            request_timeout: self.config.request_timeout,
            connection_limit: self.config.tiles.connection_limit,
            max_attempts: self.config.tiles.max_attempts,
            backoff_base: self.config.tiles.backoff_base,
        };

        let results: Vec<FetchResult> = run_batched(
            tile_jobs,
            move |chunk| download_tile_chunk(chunk, settings.clone()),
            Some(self.config.tiles.batch_size),
            self.config.worker_count,
        )
        .await;

        let mut report = FetchReport::new();
        for (url, result) in targets.into_iter().zip(results) {
            report.record(url, result.ok(), None, None, result.status);
        }
        let downloaded = report.successes();
        info!(
            snapshot = snapshot_ts,
            downloaded = downloaded,
            errors = total - downloaded,
            "tile download finished"
        );
        report.persist(dest_dir)?;

        Ok(PipelineOutcome::Completed { total, downloaded })
    }

    /// Poll the metadata feed until the latest past observation matches the
    /// target snapshot. Returns `None` when the run should be abandoned.
    async fn await_snapshot(&self, snapshot_ts: i64) -> Option<(SnapshotMetadata, Frame)> {
        let deadline = snapshot_ts + self.config.tiles.max_wait.as_secs() as i64;
        loop {
            let metadata = match self.fetch_metadata().await {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(snapshot = snapshot_ts, error = %err, "abandoning run");
                    return None;
                }
            };

            let Some(current) = metadata.latest_observation().cloned() else {
                warn!(
                    snapshot = snapshot_ts,
                    "metadata carries no past observations, abandoning run"
                );
                return None;
            };

            if current.time == snapshot_ts {
                return Some((metadata, current));
            }

            if Utc::now().timestamp() > deadline {
                info!(snapshot = snapshot_ts, "snapshot is not available");
                return None;
            }

            info!(
                snapshot = snapshot_ts,
                latest = current.time,
                "waiting for snapshot"
            );
            tokio::time::sleep(self.config.tiles.poll_interval).await;
        }
    }

    async fn fetch_metadata(&self) -> Result<SnapshotMetadata> {
        let result = self.transport.get(&self.metadata_url).await;
        let Some(payload) = result.payload else {
            return Err(Error::Metadata {
                reason: result
                    .error_message
                    .or(result.error_kind)
                    .unwrap_or_else(|| "no payload".to_string()),
            });
        };
        Ok(serde_json::from_slice(&payload)?)
    }
}
