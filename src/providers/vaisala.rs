//! Vaisala Xweather conditions adapter.

use async_trait::async_trait;

use super::{PointForecast, attach_envelope};
use crate::transport::HttpTransport;
use crate::types::FetchResult;

const DEFAULT_BASE_URL: &str = "https://data.api.xweather.com";

/// Vaisala Xweather minutely precipitation client
pub struct Vaisala {
    transport: HttpTransport,
    client_id: String,
    client_secret: String,
    base_url: String,
}

impl Vaisala {
    /// Adapter over `transport` authenticating with a client id/secret pair
    pub fn new(
        transport: HttpTransport,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
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
impl PointForecast for Vaisala {
    async fn fetch_point(&self, lon: f64, lat: f64) -> FetchResult {
        let url = format!(
            "{}/conditions/{lat},{lon}?filter=minutelyprecip&client_id={}&client_secret={}",
            self.base_url, self.client_id, self.client_secret
        );

        let mut result = self.transport.get(&url).await;
        if result.payload.is_some() {
            attach_envelope(&mut result, lon, lat);
        }
        result
    }
}
