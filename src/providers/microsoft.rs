//! Azure Maps minute forecast adapter.

use async_trait::async_trait;

use super::{PointForecast, attach_envelope};
use crate::transport::HttpTransport;
use crate::types::FetchResult;

const DEFAULT_BASE_URL: &str = "https://atlas.microsoft.com";

/// Azure Maps Weather minute-forecast client
///
/// <https://learn.microsoft.com/en-us/rest/api/maps/weather/get-minute-forecast>
pub struct Microsoft {
    transport: HttpTransport,
    client_id: String,
    subscription_key: String,
    base_url: String,
}

impl Microsoft {
    /// Adapter over `transport` authenticating with an Azure Maps client id
    /// and subscription key
    pub fn new(
        transport: HttpTransport,
        client_id: impl Into<String>,
        subscription_key: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            client_id: client_id.into(),
            subscription_key: subscription_key.into(),
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
impl PointForecast for Microsoft {
    async fn fetch_point(&self, lon: f64, lat: f64) -> FetchResult {
        let url = format!(
            "{}/weather/forecast/minute/json?api-version=1.1&query={lat},{lon}&interval=1&subscription-key={}",
            self.base_url, self.subscription_key
        );

        let mut result = self
            .transport
            .get_with_headers(&url, &[("x-ms-client-id", &self.client_id)])
            .await;
        if result.ok() {
            attach_envelope(&mut result, lon, lat);
        }
        result
    }
}
