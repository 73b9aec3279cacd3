//! CameraSource - Physical and Synthetic Frame Capture
//!
//! ## Responsibilities
//!
//! - Locator parsing (device index vs network URL)
//! - One-frame-per-invocation ffmpeg capture with timeout
//! - Synthetic fallback feed when the physical source is unavailable
//!
//! Fallback is a first-class operating mode: once a unit switches to the
//! synthetic feed it never retries the physical source.

pub mod mock_feed;

pub use mock_feed::SyntheticFeed;

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use image::RgbImage;
use std::time::Duration;
use tokio::process::Command;

/// Capture geometry, fixed so the motion model has a stable shape
pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 480;

/// Raw captured frame, transient within one tick
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub captured_at: DateTime<Utc>,
}

/// A camera feed handle: either a physical source or the synthetic generator
pub enum CameraFeed {
    Device(DeviceFeed),
    Synthetic(SyntheticFeed),
}

impl CameraFeed {
    /// Open a physical feed and probe it with one capture.
    ///
    /// Probe failure means the locator is unavailable; the caller decides
    /// whether to fall back to the synthetic feed.
    pub async fn open(locator: &str, capture_timeout: Duration) -> Result<CameraFeed> {
        let device = DeviceFeed::new(locator, capture_timeout);
        device.capture().await?;
        tracing::info!(locator = %locator, "Physical camera source opened");
        Ok(CameraFeed::Device(device))
    }

    /// Synthetic generator feed
    pub fn synthetic() -> CameraFeed {
        CameraFeed::Synthetic(SyntheticFeed::new())
    }

    /// Read the next frame from this feed
    pub async fn read_frame(&mut self) -> Result<Frame> {
        match self {
            CameraFeed::Device(device) => device.capture().await,
            CameraFeed::Synthetic(feed) => Ok(feed.next_frame()),
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, CameraFeed::Synthetic(_))
    }
}

/// Physical capture via ffmpeg subprocess
pub struct DeviceFeed {
    input_args: Vec<String>,
    capture_timeout: Duration,
}

impl DeviceFeed {
    fn new(locator: &str, capture_timeout: Duration) -> Self {
        // Numeric locator is a local V4L2 device index, anything else is a
        // network URL. RTSP gets TCP transport (more reliable).
        let input_args: Vec<String> = if locator.chars().all(|c| c.is_ascii_digit()) {
            vec![
                "-f".into(),
                "v4l2".into(),
                "-i".into(),
                format!("/dev/video{}", locator),
            ]
        } else if locator.starts_with("rtsp://") {
            vec![
                "-rtsp_transport".into(),
                "tcp".into(),
                "-i".into(),
                locator.to_string(),
            ]
        } else {
            vec!["-i".into(), locator.to_string()]
        };

        Self {
            input_args,
            capture_timeout,
        }
    }

    /// Capture one frame.
    ///
    /// ffmpeg is spawned with kill_on_drop so a timeout cancellation also
    /// kills the process. Output is a single MJPEG frame on stdout, scaled
    /// to the fixed capture geometry, decoded into an RgbImage.
    async fn capture(&self) -> Result<Frame> {
        use std::process::Stdio;

        let scale = format!("scale={}:{}", FRAME_WIDTH, FRAME_HEIGHT);
        let child = Command::new("ffmpeg")
            .args(&self.input_args)
            .args([
                "-frames:v",
                "1",
                "-vf",
                scale.as_str(),
                "-f",
                "image2pipe",
                "-vcodec",
                "mjpeg",
                "-loglevel",
                "error",
                "-y",
                "-",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::SourceUnavailable(format!("ffmpeg spawn failed: {}", e)))?;

        let output = match tokio::time::timeout(self.capture_timeout, child.wait_with_output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(Error::SourceUnavailable(format!("ffmpeg failed: {}", e)));
            }
            Err(_) => {
                return Err(Error::SourceUnavailable(format!(
                    "capture timed out after {:?}",
                    self.capture_timeout
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::SourceUnavailable(format!(
                "ffmpeg failed: {}",
                stderr.trim()
            )));
        }

        if output.stdout.is_empty() {
            return Err(Error::SourceUnavailable("empty capture output".to_string()));
        }

        let image = image::load_from_memory(&output.stdout)
            .map_err(|e| Error::SourceUnavailable(format!("frame decode failed: {}", e)))?
            .to_rgb8();

        Ok(Frame {
            image,
            captured_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_feed_parses_numeric_locator_as_v4l2() {
        let feed = DeviceFeed::new("0", Duration::from_secs(5));
        assert_eq!(feed.input_args[0], "-f");
        assert_eq!(feed.input_args[1], "v4l2");
        assert_eq!(feed.input_args[3], "/dev/video0");
    }

    #[test]
    fn device_feed_uses_tcp_transport_for_rtsp() {
        let feed = DeviceFeed::new("rtsp://192.168.1.10/stream1", Duration::from_secs(5));
        assert_eq!(feed.input_args[0], "-rtsp_transport");
        assert_eq!(feed.input_args[1], "tcp");
    }

    #[tokio::test]
    async fn open_invalid_locator_reports_unavailable() {
        let result = CameraFeed::open("not-a-real-source://nowhere", Duration::from_secs(3)).await;
        assert!(matches!(result, Err(Error::SourceUnavailable(_))));
    }

    #[tokio::test]
    async fn synthetic_feed_always_reads() {
        let mut feed = CameraFeed::synthetic();
        assert!(feed.is_mock());
        let frame = feed.read_frame().await.unwrap();
        assert_eq!(frame.image.width(), FRAME_WIDTH);
        assert_eq!(frame.image.height(), FRAME_HEIGHT);
    }
}
