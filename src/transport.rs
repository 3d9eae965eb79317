//! HTTP transport with a flat, bounded retry policy.
//!
//! Every request is attempted up to `max_attempts` times back-to-back; the
//! first attempt that produces a payload wins, otherwise the last attempt's
//! result is returned verbatim. No delay is inserted between attempts — that is
//! deliberate and distinct from the tile downloader's exponential backoff in
//! [`crate::tiles`]: point requests are cheap and their callers prefer fast
//! failure over timed recovery.
//!
//! Transport-level errors never propagate as `Err`; they are folded into the
//! returned [`FetchResult`] with the error's category as `error_kind`.

use std::future::Future;

use crate::config::FetchConfig;
use crate::error::Result;
use crate::types::FetchResult;

/// HTTP transport shared by provider adapters and the snapshot metadata poller
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    max_attempts: u32,
}

impl HttpTransport {
    /// Build a transport from the run configuration.
    ///
    /// The per-request timeout applies to each individual attempt, not to the
    /// whole retry sequence.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            max_attempts: config.retry.max_attempts,
        })
    }

    /// GET `url` under the retry policy
    pub async fn get(&self, url: &str) -> FetchResult {
        self.get_with_headers(url, &[]).await
    }

    /// GET `url` with extra request headers under the retry policy
    pub async fn get_with_headers(&self, url: &str, headers: &[(&str, &str)]) -> FetchResult {
        let client = &self.client;
        run_with_retries(self.max_attempts, move || {
            let mut request = client.get(url);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            execute(request, url)
        })
        .await
    }

    /// POST a JSON body to `url` under the retry policy
    pub async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> FetchResult {
        let client = &self.client;
        run_with_retries(self.max_attempts, move || {
            let mut request = client.post(url).json(body);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            execute(request, url)
        })
        .await
    }
}

/// Repeat `attempt` until it yields a payload, at most `max_attempts` times.
///
/// Returns the first result carrying a payload, or the result of the final
/// attempt exactly as produced — never a synthesized generic error. A
/// `max_attempts` of zero is treated as one.
pub async fn run_with_retries<F, Fut>(max_attempts: u32, mut attempt: F) -> FetchResult
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FetchResult>,
{
    let attempts = max_attempts.max(1);
    let mut last = FetchResult::default();
    for _ in 0..attempts {
        let result = attempt().await;
        if result.payload.is_some() {
            return result;
        }
        last = result;
    }
    last
}

/// Send one request and fold the outcome into a [`FetchResult`].
async fn execute(request: reqwest::RequestBuilder, url: &str) -> FetchResult {
    match request.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            if response.status().is_success() {
                match response.bytes().await {
                    Ok(body) => FetchResult::success(status, body.to_vec()),
                    Err(err) => {
                        FetchResult::transport_failure(error_category(&err), err.to_string())
                    }
                }
            } else {
                tracing::warn!(status = status, url = %url, "request rejected");
                FetchResult::http_failure(status)
            }
        }
        Err(err) => FetchResult::transport_failure(error_category(&err), err.to_string()),
    }
}

/// Short label for the class of a transport error, used as the report's
/// `error_kind` the way exception type names were before structured results.
pub(crate) fn error_category(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "TimeoutError"
    } else if err.is_connect() {
        "ConnectError"
    } else if err.is_body() || err.is_decode() {
        "BodyError"
    } else if err.is_request() {
        "RequestError"
    } else {
        "NetworkError"
    }
}
