//! Sensor forecast orchestration — one artifact per geographic point.
//!
//! Fans a sensor list out through the batch dispatcher, persists each returned
//! artifact next to the others in the destination directory, and writes a
//! per-sensor fetching report once everything has settled. Individual sensor
//! failures (fetch, decode, or disk) are recorded and never abort the run.

use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::config::FetchConfig;
use crate::dispatch::run_batched;
use crate::error::Result;
use crate::providers::PointForecast;
use crate::report::FetchReport;
use crate::types::{Artifact, FetchResult, Sensor};

/// Fetches and persists one forecast artifact per sensor through a provider
/// adapter, then writes the run's fetching report.
pub struct SensorFetcher<P> {
    provider: Arc<P>,
    config: FetchConfig,
}

impl<P: PointForecast + 'static> SensorFetcher<P> {
    /// Orchestrator over `provider` with the given run configuration
    pub fn new(provider: P, config: FetchConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            config,
        }
    }

    /// Fetch every sensor's forecast and write artifacts plus the report under
    /// `dest_dir`.
    ///
    /// Artifacts land at `{dest_dir}/{sensor.id}.json`; re-running overwrites
    /// them in place. The report lists every sensor with its success flag and,
    /// on failure, the error kind and message.
    pub async fn fetch_all(&self, sensors: Vec<Sensor>, dest_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dest_dir)?;

        let ids: Vec<String> = sensors.iter().map(|s| s.id.clone()).collect();
        info!(sensors = ids.len(), dest = %dest_dir.display(), "fetching sensor forecasts");

        let provider = Arc::clone(&self.provider);
        let dest = dest_dir.to_path_buf();
        let results: Vec<FetchResult> = run_batched(
            sensors,
            move |chunk: Vec<Sensor>| {
                let provider = Arc::clone(&provider);
                let dest = dest.clone();
                async move {
                    join_all(
                        chunk
                            .iter()
                            .map(|sensor| process_sensor(provider.as_ref(), &dest, sensor)),
                    )
                    .await
                }
            },
            self.config.chunk_size,
            self.config.worker_count,
        )
        .await;

        let mut report = FetchReport::new();
        for (id, result) in ids.into_iter().zip(results) {
            let succeeded = result.error_kind.is_none() && result.artifact.is_some();
            report.record(id, succeeded, result.error_kind, result.error_message, None);
        }
        info!(
            total = report.len(),
            succeeded = report.successes(),
            "sensor fetch finished"
        );
        report.persist(dest_dir)
    }
}

/// Fetch one sensor's forecast and persist the artifact if one was produced.
///
/// A disk failure is folded into the returned result as a persistence error so
/// the sensor is reported failed without disturbing its chunk siblings.
async fn process_sensor<P: PointForecast + ?Sized>(
    provider: &P,
    dest: &Path,
    sensor: &Sensor,
) -> FetchResult {
    let mut result = provider.fetch_point(sensor.lon, sensor.lat).await;
    match &result.artifact {
        Some(artifact) => {
            let path = dest.join(format!("{}.json", sensor.id));
            if let Err(err) = write_artifact(&path, artifact).await {
                warn!(sensor = %sensor.id, error = %err, "failed to persist forecast artifact");
                result.set_persistence_failure(&err);
            }
        }
        None => {
            warn!(sensor = %sensor.id, "no forecast data for sensor");
        }
    }
    result
}

async fn write_artifact(path: &Path, artifact: &Artifact) -> std::io::Result<()> {
    match artifact {
        Artifact::Text(text) => tokio::fs::write(path, text).await,
        Artifact::Binary(bytes) => tokio::fs::write(path, bytes).await,
    }
}
