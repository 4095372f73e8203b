//! Frame acquisition.
//!
//! The production source grabs single JPEG frames by driving ffmpeg
//! against a capture device (or an operator-supplied input pipeline) with
//! a bounded timeout per grab. Tests substitute a scripted source.

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::config::ServerConfig;

/// Errors from a single frame grab. All of them are recoverable: the
/// worker degrades to the placeholder and retries on backoff.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("frame grab timed out")]
    Timeout,

    #[error("capture pipeline exited with {0}")]
    Pipeline(String),

    #[error("device error: {0}")]
    Device(#[from] std::io::Error),

    #[error("capture produced an empty frame")]
    EmptyFrame,
}

/// A source of JPEG frames
#[async_trait]
pub trait FrameSource: Send {
    /// Grab the next frame, bounded in time
    async fn grab(&mut self) -> Result<Vec<u8>, CaptureError>;

    /// Human-readable description of the source for logs
    fn describe(&self) -> String;
}

/// Grabs frames by running ffmpeg once per cycle
pub struct FfmpegSource {
    input_args: Vec<String>,
    timeout: Duration,
    description: String,
}

impl FfmpegSource {
    pub fn from_config(config: &ServerConfig) -> Self {
        let (input_args, description) = match &config.camera_pipeline {
            Some(pipeline) => (
                pipeline.split_whitespace().map(String::from).collect(),
                format!("pipeline `{pipeline}`"),
            ),
            None => (
                vec![
                    "-f".to_string(),
                    "v4l2".to_string(),
                    "-video_size".to_string(),
                    format!("{}x{}", config.camera_width, config.camera_height),
                    "-i".to_string(),
                    config.camera_device.clone(),
                ],
                format!("device {}", config.camera_device),
            ),
        };
        Self {
            input_args,
            timeout: config.capture_timeout,
            description,
        }
    }
}

#[async_trait]
impl FrameSource for FfmpegSource {
    async fn grab(&mut self) -> Result<Vec<u8>, CaptureError> {
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .args(&self.input_args)
            .args(["-frames:v", "1", "-f", "image2", "-c:v", "mjpeg", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            // An overrunning grab must not outlive its timeout window
            .kill_on_drop(true);

        let child = cmd.spawn()?;
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CaptureError::Timeout)??;

        if !output.status.success() {
            return Err(CaptureError::Pipeline(output.status.to_string()));
        }
        if output.stdout.is_empty() {
            return Err(CaptureError::EmptyFrame);
        }
        Ok(output.stdout)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Generate the flat "no signal" frame served while the device is down.
/// The kiosk overlays its own manual-entry message on top.
pub fn placeholder_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbImage::from_pixel(width, height, Rgb([60u8, 60, 60]));
    // Darker band across the middle so the frame reads as intentional
    let band_top = height / 3;
    let band_bottom = height * 2 / 3;
    for y in band_top..band_bottom {
        for x in 0..width {
            img.put_pixel(x, y, Rgb([45u8, 45, 45]));
        }
    }
    let mut buf = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 80);
    encoder
        .encode_image(&img)
        .expect("jpeg encoding of a generated frame cannot fail");
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_a_decodable_jpeg() {
        let bytes = placeholder_jpeg(640, 360);
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.width(), 640);
        assert_eq!(img.height(), 360);
    }

    #[test]
    fn test_ffmpeg_args_from_device_config() {
        let mut config = crate::config::test_support::config();
        config.camera_device = "/dev/video2".to_string();
        config.camera_pipeline = None;
        let source = FfmpegSource::from_config(&config);
        assert!(source.describe().contains("/dev/video2"));
        assert!(source.input_args.contains(&"-f".to_string()));
        assert!(source.input_args.contains(&"/dev/video2".to_string()));
    }

    #[test]
    fn test_pipeline_overrides_device() {
        let mut config = crate::config::test_support::config();
        config.camera_pipeline = Some("-f avfoundation -i 0".to_string());
        let source = FfmpegSource::from_config(&config);
        assert_eq!(
            source.input_args,
            vec!["-f", "avfoundation", "-i", "0"]
        );
    }
}
