mod cache;
mod codes;
mod source;
mod worker;

pub use cache::{FrameCache, LastScan};
pub use codes::{decode_frame, render_qr_png, QrRenderError};
pub use source::{placeholder_jpeg, CaptureError, FfmpegSource, FrameSource};
pub use worker::CameraWorker;
