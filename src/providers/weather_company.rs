//! The Weather Company fifteen-minute forecast adapter.

use async_trait::async_trait;

use super::{PointForecast, attach_envelope};
use crate::transport::HttpTransport;
use crate::types::FetchResult;

const DEFAULT_BASE_URL: &str = "https://api.weather.com";

/// Weather Company fifteen-minute forecast client
pub struct WeatherCompany {
    transport: HttpTransport,
    token: String,
    base_url: String,
}

impl WeatherCompany {
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
impl PointForecast for WeatherCompany {
    async fn fetch_point(&self, lon: f64, lat: f64) -> FetchResult {
        let url = format!(
            "{}/v3/wx/forecast/fifteenminute?geocode={lat},{lon}&units=s&language=en-US&format=json&apiKey={}",
            self.base_url, self.token
        );

        let mut result = self.transport.get(&url).await;
        if result.ok() {
            attach_envelope(&mut result, lon, lat);
        }
        result
    }
}
