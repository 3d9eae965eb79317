//! Provider adapters for point-forecast services.
//!
//! Each adapter only knows how to build the provider's URL from a coordinate
//! pair and how to wrap the raw response into the common position envelope;
//! retries, timeouts and error capture all live in
//! [`HttpTransport`](crate::transport::HttpTransport). Adapters hold no
//! mutable state and can be shared freely across chunk workers.

use async_trait::async_trait;

use crate::types::{Artifact, FetchResult};

mod accuweather;
mod microsoft;
mod openweather;
mod vaisala;
mod weather_company;

pub use accuweather::AccuWeather;
pub use microsoft::Microsoft;
pub use openweather::OpenWeather;
pub use vaisala::Vaisala;
pub use weather_company::WeatherCompany;

/// Capability to fetch one forecast artifact for a geographic point.
///
/// A successful result carries an [`Artifact`] holding JSON text of the shape
/// `{"position": {"lon": .., "lat": ..}, "payload": <provider JSON>}`.
#[async_trait]
pub trait PointForecast: Send + Sync {
    /// Fetch the forecast for one longitude/latitude pair.
    ///
    /// All failure modes are folded into the returned [`FetchResult`]; this
    /// method never panics or returns early on transport problems.
    async fn fetch_point(&self, lon: f64, lat: f64) -> FetchResult;
}

/// Wrap the raw provider payload into the position envelope and attach it as
/// the result's artifact. A payload that is not valid JSON marks the result
/// failed instead of propagating a parse error.
pub(crate) fn attach_envelope(result: &mut FetchResult, lon: f64, lat: f64) {
    let Some(payload) = result.payload.as_deref() else {
        return;
    };
    match envelope(lon, lat, payload) {
        Ok(text) => result.artifact = Some(Artifact::Text(text)),
        Err(err) => {
            result.error_kind = Some("SerializationError".to_string());
            result.error_message = Some(err.to_string());
        }
    }
}

fn envelope(lon: f64, lat: f64, payload: &[u8]) -> serde_json::Result<String> {
    let body: serde_json::Value = serde_json::from_slice(payload)?;
    serde_json::to_string(&serde_json::json!({
        "position": { "lon": lon, "lat": lat },
        "payload": body,
    }))
}
