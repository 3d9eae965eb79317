//! Snapshot metadata model and tile job generation.

use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::TileJob;

/// Number of temporal frames a well-formed snapshot carries: one observation
/// plus six nowcasts.
pub const FRAMES_PER_SNAPSHOT: usize = 7;

/// One radar frame: a capture or forecast instant plus its URL path segment
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Frame {
    /// Unix timestamp of the frame
    pub time: i64,
    /// Path fragment joined onto the metadata host to address this frame's tiles
    pub path: String,
}

/// The `radar` section of the snapshot metadata
#[derive(Clone, Debug, Deserialize)]
pub struct RadarFrames {
    /// Observed frames, oldest first
    #[serde(default)]
    pub past: Vec<Frame>,
    /// Forecast frames, nearest first
    #[serde(default)]
    pub nowcast: Vec<Frame>,
}

/// Remote snapshot metadata document
#[derive(Clone, Debug, Deserialize)]
pub struct SnapshotMetadata {
    /// Base host all frame paths are relative to
    pub host: String,
    /// Available radar frames
    pub radar: RadarFrames,
}

impl SnapshotMetadata {
    /// The most recent past observation, if the feed carries any
    pub fn latest_observation(&self) -> Option<&Frame> {
        self.radar.past.iter().max_by_key(|f| f.time)
    }
}

/// Assemble the snapshot's frame list: the current observation plus every
/// nowcast frame, sorted by time ascending.
///
/// Any count other than [`FRAMES_PER_SNAPSHOT`] means the remote feed changed
/// shape; that is a configuration-level failure, not something to tolerate.
pub fn ordered_frames(current: Frame, nowcast: &[Frame]) -> Result<Vec<Frame>> {
    let mut frames = Vec::with_capacity(1 + nowcast.len());
    frames.push(current);
    frames.extend_from_slice(nowcast);
    frames.sort_by_key(|f| f.time);

    if frames.len() != FRAMES_PER_SNAPSHOT {
        return Err(Error::FrameCount {
            expected: FRAMES_PER_SNAPSHOT,
            actual: frames.len(),
        });
    }
    Ok(frames)
}

/// Generate every tile job for one snapshot.
///
/// For each coordinate of the `2^zoom × 2^zoom` grid this emits one mask job
/// plus one map job per frame. Map jobs are bucketed by the frame's offset from
/// the snapshot timestamp in whole minutes (`t0` for the observation itself).
/// The total is `(1 + frames.len()) · 4^zoom` jobs.
pub fn generate_jobs(
    host: &str,
    frames: &[Frame],
    snapshot_ts: i64,
    zoom: u8,
    tile_size: u32,
    dest: &Path,
) -> Vec<TileJob> {
    let side = 1usize << zoom;
    let mut jobs = Vec::with_capacity(side * side * (1 + frames.len()));

    for x in 0..side {
        for y in 0..side {
            jobs.push(TileJob {
                url: format!("{host}/v2/coverage/0/{tile_size}/{zoom}/{x}/{y}/0/0_0.png"),
                dest: dest
                    .join("_mask")
                    .join(zoom.to_string())
                    .join(x.to_string())
                    .join(format!("{y}.png")),
            });

            for frame in frames {
                let delta = (frame.time - snapshot_ts).div_euclid(60);
                jobs.push(TileJob {
                    url: format!(
                        "{host}{}/{tile_size}/{zoom}/{x}/{y}/0/0_0.png",
                        frame.path
                    ),
                    dest: dest
                        .join("_map")
                        .join(format!("t{delta}"))
                        .join(zoom.to_string())
                        .join(x.to_string())
                        .join(format!("{y}.png")),
                });
            }
        }
    }
    jobs
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn frame(time: i64) -> Frame {
        Frame {
            time,
            path: format!("/v2/radar/{time}"),
        }
    }

    fn seven_frames(ts: i64) -> Vec<Frame> {
        let mut frames = vec![frame(ts)];
        frames.extend((1..=6).map(|i| frame(ts + i * 600)));
        frames
    }

    #[test]
    fn job_count_is_eight_times_four_to_the_zoom() {
        let dest = PathBuf::from("/tmp/snap");
        for zoom in 0u8..=3 {
            let jobs = generate_jobs("http://host", &seven_frames(0), 0, zoom, 256, &dest);
            assert_eq!(
                jobs.len(),
                8 * 4usize.pow(zoom as u32),
                "zoom {zoom} must produce 8 * 4^zoom jobs"
            );
        }
    }

    #[test]
    fn zoom_one_produces_thirty_two_jobs() {
        let jobs = generate_jobs(
            "http://host",
            &seven_frames(0),
            0,
            1,
            256,
            Path::new("/tmp/snap"),
        );
        assert_eq!(jobs.len(), 32);
    }

    #[test]
    fn mask_job_shape() {
        let jobs = generate_jobs(
            "http://host",
            &seven_frames(0),
            0,
            1,
            256,
            Path::new("/snap"),
        );

        // x=1, y=0 block starts after the x=0 blocks (2 coordinates * 8 jobs each)
        let mask = &jobs[16];
        assert_eq!(mask.url, "http://host/v2/coverage/0/256/1/1/0/0/0_0.png");
        assert_eq!(mask.dest, PathBuf::from("/snap/_mask/1/1/0.png"));
    }

    #[test]
    fn map_jobs_are_bucketed_by_minutes_from_snapshot() {
        let ts = 1_700_000_000i64;
        let jobs = generate_jobs(
            "http://host",
            &seven_frames(ts),
            ts,
            0,
            256,
            Path::new("/snap"),
        );

        // one mask + 7 maps for the single zoom-0 coordinate
        assert_eq!(jobs.len(), 8);
        let map_dests: Vec<String> = jobs[1..]
            .iter()
            .map(|j| j.dest.display().to_string())
            .collect();
        assert_eq!(
            map_dests,
            vec![
                "/snap/_map/t0/0/0/0.png",
                "/snap/_map/t10/0/0/0.png",
                "/snap/_map/t20/0/0/0.png",
                "/snap/_map/t30/0/0/0.png",
                "/snap/_map/t40/0/0/0.png",
                "/snap/_map/t50/0/0/0.png",
                "/snap/_map/t60/0/0/0.png",
            ]
        );

        let first_map = &jobs[1];
        assert_eq!(
            first_map.url,
            format!("http://host/v2/radar/{ts}/256/0/0/0/0/0_0.png")
        );
    }

    #[test]
    fn ordered_frames_sorts_ascending_by_time() {
        let nowcast: Vec<Frame> = [600i64, 1800, 1200, 3600, 2400, 3000]
            .iter()
            .map(|&t| frame(t))
            .collect();

        let frames = ordered_frames(frame(0), &nowcast).unwrap();

        let times: Vec<i64> = frames.iter().map(|f| f.time).collect();
        assert_eq!(times, vec![0, 600, 1200, 1800, 2400, 3000, 3600]);
    }

    #[test]
    fn ordered_frames_rejects_short_frame_sets() {
        let nowcast: Vec<Frame> = (1..=4).map(|i| frame(i * 600)).collect();

        let err = ordered_frames(frame(0), &nowcast).unwrap_err();

        assert!(matches!(
            err,
            Error::FrameCount {
                expected: FRAMES_PER_SNAPSHOT,
                actual: 5
            }
        ));
    }

    #[test]
    fn ordered_frames_rejects_oversized_frame_sets() {
        let nowcast: Vec<Frame> = (1..=8).map(|i| frame(i * 600)).collect();
        assert!(ordered_frames(frame(0), &nowcast).is_err());
    }

    #[test]
    fn latest_observation_picks_max_time() {
        let metadata = SnapshotMetadata {
            host: "http://host".into(),
            radar: RadarFrames {
                past: vec![frame(100), frame(300), frame(200)],
                nowcast: vec![],
            },
        };
        assert_eq!(metadata.latest_observation().unwrap().time, 300);
    }

    #[test]
    fn latest_observation_empty_past_is_none() {
        let metadata = SnapshotMetadata {
            host: "http://host".into(),
            radar: RadarFrames {
                past: vec![],
                nowcast: vec![],
            },
        };
        assert!(metadata.latest_observation().is_none());
    }

    #[test]
    fn metadata_deserializes_from_remote_shape() {
        let json = r#"{
            "host": "https://tilecache.example.com",
            "radar": {
                "past": [{"time": 1700000000, "path": "/v2/radar/1700000000"}],
                "nowcast": [{"time": 1700000600, "path": "/v2/radar/nowcast_a"}]
            }
        }"#;

        let metadata: SnapshotMetadata = serde_json::from_str(json).unwrap();

        assert_eq!(metadata.host, "https://tilecache.example.com");
        assert_eq!(metadata.radar.past.len(), 1);
        assert_eq!(metadata.radar.nowcast[0].path, "/v2/radar/nowcast_a");
    }
}
