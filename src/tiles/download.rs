//! Connection-limited tile downloading with exponential backoff.
//!
//! Each chunk worker opens one HTTP session and a semaphore capping its
//! concurrent connections, then drives its whole chunk concurrently. Every
//! tile retries independently: up to `max_attempts` attempts with the delay
//! starting at `backoff_base` and doubling after each failed attempt. The
//! permit is held only for the duration of a request, never across a backoff
//! sleep, so waiting tiles do not starve active ones.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::transport::error_category;
use crate::types::{FetchResult, TileJob};

/// Download settings one chunk worker needs
#[derive(Clone, Debug)]
pub(crate) struct TileFetchSettings {
    /// Per-attempt request timeout
    pub request_timeout: Duration,
    /// Concurrent connections allowed within this worker's session
    pub connection_limit: usize,
    /// Attempts per tile before giving up
    pub max_attempts: u32,
    /// First inter-attempt delay; doubles after every failed attempt
    pub backoff_base: Duration,
}

/// Download every tile of one chunk through a fresh connection-limited session.
///
/// Returns one result per job, in job order. Failures of any kind (HTTP,
/// transport, disk) are captured per tile and never abort the chunk.
pub(crate) async fn download_tile_chunk(
    jobs: Vec<TileJob>,
    settings: TileFetchSettings,
) -> Vec<FetchResult> {
    let client = match reqwest::Client::builder()
        .timeout(settings.request_timeout)
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            // Keep the one-result-per-job contract even if the session itself
            // cannot be constructed.
            let failure =
                FetchResult::transport_failure(error_category(&err), err.to_string());
            return jobs.iter().map(|_| failure.clone()).collect();
        }
    };
    let limiter = Arc::new(Semaphore::new(settings.connection_limit.max(1)));

    join_all(jobs.iter().map(|job| {
        let client = client.clone();
        let limiter = Arc::clone(&limiter);
        let settings = settings.clone();
        async move { download_one_tile(&client, &limiter, job, &settings).await }
    }))
    .await
}

/// Fetch one tile and persist it to its destination path.
async fn download_one_tile(
    client: &reqwest::Client,
    limiter: &Semaphore,
    job: &TileJob,
    settings: &TileFetchSettings,
) -> FetchResult {
    let mut result = fetch_with_backoff(client, limiter, &job.url, settings).await;

    if result.ok() {
        if let Some(payload) = result.payload.take() {
            match write_tile(&job.dest, &payload).await {
                Ok(()) => {
                    result.payload = Some(payload);
                    return result;
                }
                Err(err) => {
                    warn!(url = %job.url, error = %err, "failed to persist tile");
                    result.payload = Some(payload);
                    result.set_persistence_failure(&err);
                    return result;
                }
            }
        }
    }

    warn!(url = %job.url, "failed to download tile");
    result
}

/// GET `url` with exponential backoff, returning the first 200 response or the
/// last failed attempt's result after exhaustion.
async fn fetch_with_backoff(
    client: &reqwest::Client,
    limiter: &Semaphore,
    url: &str,
    settings: &TileFetchSettings,
) -> FetchResult {
    let attempts = settings.max_attempts.max(1);
    let mut delay = settings.backoff_base;
    let mut last = FetchResult::default();

    for attempt in 1..=attempts {
        let attempt_result = {
            let _permit = match limiter.acquire().await {
                Ok(permit) => permit,
                // The semaphore is never closed while a chunk runs; treat a
                // closed limiter as a terminal session failure anyway.
                Err(err) => {
                    return FetchResult::transport_failure("SessionError", err.to_string());
                }
            };

            match client.get(url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if status == 200 {
                        match response.bytes().await {
                            Ok(body) => return FetchResult::success(status, body.to_vec()),
                            Err(err) => FetchResult::transport_failure(
                                error_category(&err),
                                err.to_string(),
                            ),
                        }
                    } else {
                        FetchResult::http_failure(status)
                    }
                }
                Err(err) => {
                    FetchResult::transport_failure(error_category(&err), err.to_string())
                }
            }
        };

        warn!(
            url = %url,
            attempt = attempt,
            max_attempts = attempts,
            next_delay_secs = delay.as_secs_f64(),
            status = attempt_result.status,
            "tile download attempt failed"
        );
        last = attempt_result;

        if attempt < attempts {
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }
    last
}

async fn write_tile(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, payload).await
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> TileFetchSettings {
        TileFetchSettings {
            request_timeout: Duration::from_secs(5),
            connection_limit: 10,
            max_attempts: 5,
            backoff_base: Duration::from_millis(20),
        }
    }

    fn job(server: &MockServer, url_path: &str, dest: &Path) -> TileJob {
        TileJob {
            url: format!("{}{}", server.uri(), url_path),
            dest: dest.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn chunk_download_writes_tiles_creating_parent_dirs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, 0x50]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let jobs = vec![
            job(&server, "/a.png", &dir.path().join("_mask/1/0/0.png")),
            job(&server, "/b.png", &dir.path().join("_map/t10/1/0/0.png")),
        ];

        let results = download_tile_chunk(jobs, settings()).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(FetchResult::ok));
        assert_eq!(
            std::fs::read(dir.path().join("_mask/1/0/0.png")).unwrap(),
            vec![0x89, 0x50]
        );
        assert!(dir.path().join("_map/t10/1/0/0.png").exists());
    }

    #[tokio::test]
    async fn backoff_retries_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tile.png"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tile.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"img".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let start = Instant::now();
        let results = download_tile_chunk(
            vec![job(&server, "/tile.png", &dir.path().join("tile.png"))],
            settings(),
        )
        .await;
        let elapsed = start.elapsed();

        assert!(results[0].ok());
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
        // Two failed attempts sleep 20ms then 40ms before the third succeeds
        assert!(
            elapsed >= Duration::from_millis(60),
            "expected at least 60ms of backoff, got {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn exhaustion_returns_last_failure_after_four_backoff_gaps() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(5)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let start = Instant::now();
        let results = download_tile_chunk(
            vec![job(&server, "/gone.png", &dir.path().join("gone.png"))],
            settings(),
        )
        .await;
        let elapsed = start.elapsed();

        assert!(!results[0].ok());
        assert_eq!(results[0].status, Some(500));
        assert_eq!(results[0].error_kind.as_deref(), Some("DownloadingError"));
        assert!(!dir.path().join("gone.png").exists());
        // 5 attempts mean 4 inter-attempt gaps: 20 + 40 + 80 + 160 = 300ms
        assert!(
            elapsed >= Duration::from_millis(300),
            "expected doubling gaps totalling >= 300ms, got {elapsed:?}"
        );
        assert!(
            elapsed < Duration::from_secs(2),
            "no sleep may follow the final attempt, got {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn success_on_first_attempt_never_sleeps() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"img".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let slow_backoff = TileFetchSettings {
            backoff_base: Duration::from_secs(2),
            ..settings()
        };

        let start = Instant::now();
        let results = download_tile_chunk(
            vec![job(&server, "/fast.png", &dir.path().join("fast.png"))],
            slow_backoff,
        )
        .await;

        assert!(results[0].ok());
        assert!(
            start.elapsed() < Duration::from_secs(1),
            "a first-attempt success must not wait on the backoff schedule"
        );
    }

    #[tokio::test]
    async fn non_200_success_codes_are_not_accepted() {
        // The tile feed only ever serves full tiles; a 204 means something is
        // wrong upstream and must count as a failed attempt.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fast = TileFetchSettings {
            backoff_base: Duration::from_millis(1),
            max_attempts: 2,
            ..settings()
        };
        let results = download_tile_chunk(
            vec![job(&server, "/odd.png", &dir.path().join("odd.png"))],
            fast,
        )
        .await;

        assert_eq!(results[0].status, Some(204));
        assert_eq!(results[0].error_kind.as_deref(), Some("DownloadingError"));
        assert!(!dir.path().join("odd.png").exists());
    }

    #[tokio::test]
    async fn persistence_failure_is_recorded_per_tile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"img".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        // A directory squatting on the destination path makes the write fail
        std::fs::create_dir_all(dir.path().join("taken.png")).unwrap();

        let results = download_tile_chunk(
            vec![
                job(&server, "/x.png", &dir.path().join("taken.png")),
                job(&server, "/y.png", &dir.path().join("fine.png")),
            ],
            settings(),
        )
        .await;

        assert_eq!(results[0].error_kind.as_deref(), Some("PersistenceError"));
        assert!(results[1].ok(), "a sibling's disk failure must not spread");
        assert!(dir.path().join("fine.png").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn connection_limit_caps_session_concurrency() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"img".to_vec())
                    .set_delay(Duration::from_millis(50)),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let jobs: Vec<TileJob> = (0..6)
            .map(|i| {
                job(
                    &server,
                    &format!("/t{i}.png"),
                    &dir.path().join(format!("t{i}.png")),
                )
            })
            .collect();
        let tight = TileFetchSettings {
            connection_limit: 2,
            ..settings()
        };

        let start = Instant::now();
        let results = download_tile_chunk(jobs, tight).await;
        let elapsed = start.elapsed();

        assert!(results.iter().all(FetchResult::ok));
        // 6 requests of ~50ms through 2 permits need at least 3 waves
        assert!(
            elapsed >= Duration::from_millis(140),
            "two-permit session should serialize into waves, got {elapsed:?}"
        );
    }
}
