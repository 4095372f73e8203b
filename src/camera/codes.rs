//! QR rendering and decoding for check-in codes.
//!
//! Intake renders a `PID|TOKEN` payload for the patient's phone or printed
//! slip; the kiosk camera decodes the same payload back out of captured
//! frames. Decode failures are the normal case; most frames carry no code.

use image::{GrayImage, Luma};
use qrcode::{Color, QrCode};

/// Pixels per QR module in rendered output
const MODULE_SCALE: u32 = 8;
/// Quiet-zone border, in modules
const QUIET_MODULES: u32 = 4;

/// Render a payload as a PNG QR image
pub fn render_qr_png(payload: &str) -> Result<Vec<u8>, QrRenderError> {
    let code = QrCode::new(payload.as_bytes()).map_err(QrRenderError::Encode)?;
    let width = code.width() as u32;
    let colors = code.to_colors();

    let side = (width + 2 * QUIET_MODULES) * MODULE_SCALE;
    let mut img = GrayImage::from_pixel(side, side, Luma([255u8]));
    for (i, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let mx = (i as u32 % width + QUIET_MODULES) * MODULE_SCALE;
        let my = (i as u32 / width + QUIET_MODULES) * MODULE_SCALE;
        for dy in 0..MODULE_SCALE {
            for dx in 0..MODULE_SCALE {
                img.put_pixel(mx + dx, my + dy, Luma([0u8]));
            }
        }
    }

    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(QrRenderError::Image)?;
    Ok(buf.into_inner())
}

/// Try to decode a QR code out of a captured frame.
///
/// Returns None for undecodable frames; that is not an error condition.
pub fn decode_frame(bytes: &[u8]) -> Option<String> {
    let img = image::load_from_memory(bytes).ok()?;
    let mut prepared = rqrr::PreparedImage::prepare(img.to_luma8());
    let grids = prepared.detect_grids();
    let (_meta, content) = grids.first()?.decode().ok()?;
    let content = content.trim();
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

/// QR rendering errors
#[derive(Debug, thiserror::Error)]
pub enum QrRenderError {
    #[error("QR encoding failed: {0}")]
    Encode(qrcode::types::QrError),
    #[error("image encoding failed: {0}")]
    Image(image::ImageError),
}
