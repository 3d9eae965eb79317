//! AccuWeather MinuteCast adapter.

use async_trait::async_trait;

use super::{PointForecast, attach_envelope};
use crate::transport::HttpTransport;
use crate::types::FetchResult;

const DEFAULT_BASE_URL: &str = "http://dataservice.accuweather.com";

/// AccuWeather MinuteCast client
pub struct AccuWeather {
    transport: HttpTransport,
    token: String,
    base_url: String,
}

impl AccuWeather {
    /// Adapter over `transport` authenticating with an API key
    pub fn new(transport: HttpTransport, token: impl Into<String>) -> Self {
        Self {
            transport,
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API host, e.g. for a proxy or a test server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl PointForecast for AccuWeather {
    async fn fetch_point(&self, lon: f64, lat: f64) -> FetchResult {
        let url = format!(
            "{}/forecasts/v1/minute?q={lat},{lon}&apikey={}",
            self.base_url, self.token
        );

        let mut result = self.transport.get(&url).await;
        if result.ok() {
            attach_envelope(&mut result, lon, lat);
        }
        result
    }
}
