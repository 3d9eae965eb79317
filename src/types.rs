//! Core types shared across the fetch engine

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::dispatch::WorkerFailure;

/// A geographic measurement point to fetch one forecast artifact for
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    /// Stable identifier, used as the artifact file stem and report target
    pub id: String,
    /// Longitude in degrees
    pub lon: f64,
    /// Latitude in degrees
    pub lat: f64,
    /// ISO country name or code the sensor belongs to
    pub country: String,
}

/// A single tile download unit: remote URL plus local destination path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileJob {
    /// Fully assembled tile URL
    pub url: String,
    /// Destination file path; parent directories are created on demand
    pub dest: PathBuf,
}

/// A derived artifact ready to be persisted
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Artifact {
    /// JSON text (sensor forecast envelopes)
    Text(String),
    /// Raw bytes (tile images and other binary payloads)
    Binary(Vec<u8>),
}

/// Uniform outcome of one fetch, after its retry policy has terminated
///
/// Exactly one of `payload` (success) or `error_kind` (failure) is present in a
/// terminal result; intermediate attempts may momentarily carry neither.
/// `artifact` is filled in by provider adapters that derive a persistable value
/// from the raw payload.
#[derive(Clone, Debug, Default)]
pub struct FetchResult {
    /// HTTP status code of the final attempt, if a response was received
    pub status: Option<u16>,
    /// Raw response body on success
    pub payload: Option<Vec<u8>>,
    /// Short machine-readable failure label (e.g. "DownloadingError", "TimeoutError")
    pub error_kind: Option<String>,
    /// Human-readable failure detail
    pub error_message: Option<String>,
    /// Derived artifact to persist, when an adapter produced one
    pub artifact: Option<Artifact>,
}

impl FetchResult {
    /// Successful result carrying the response body
    pub fn success(status: u16, payload: Vec<u8>) -> Self {
        Self {
            status: Some(status),
            payload: Some(payload),
            ..Default::default()
        }
    }

    /// Failure result for a non-2xx HTTP response, status preserved
    pub fn http_failure(status: u16) -> Self {
        Self {
            status: Some(status),
            error_kind: Some("DownloadingError".to_string()),
            ..Default::default()
        }
    }

    /// Failure result for a transport-level error (timeout, connect, protocol)
    pub fn transport_failure(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_kind: Some(kind.into()),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Whether the final response carried a 2xx status
    pub fn ok(&self) -> bool {
        matches!(self.status, Some(code) if (200..300).contains(&code))
    }

    /// Record a persistence failure on an otherwise completed result
    ///
    /// Used when the fetch itself succeeded but writing the artifact or tile to
    /// disk failed; the target is then reported failed without aborting its batch.
    pub fn set_persistence_failure(&mut self, err: &std::io::Error) {
        self.error_kind = Some("PersistenceError".to_string());
        self.error_message = Some(err.to_string());
    }
}

impl From<WorkerFailure> for FetchResult {
    fn from(failure: WorkerFailure) -> Self {
        Self {
            error_kind: Some("WorkerFailure".to_string()),
            error_message: Some(failure.message),
            ..Default::default()
        }
    }
}
