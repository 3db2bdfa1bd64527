// codec.rs: JPEG + base64 encoding for transport, PNG for persistence.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, TimeZone};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::camera::Frame;

/// JPEG quality used when no setting overrides it.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Errors raised while encoding, decoding or saving images.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("jpeg encode failed: {0}")]
    Encode(String),
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("could not write {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("{0} already exists; saved photos are never overwritten")]
    AlreadyExists(PathBuf),
}

/// JPEG-compress a frame. Same pixels and quality give the same bytes.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, CodecError> {
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 {
        return Err(CodecError::Encode(format!("empty {w}x{h} frame")));
    }
    let mut jpeg_buf: Vec<u8> = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg_buf, quality.clamp(1, 100))
        .encode(frame.as_raw(), w, h, image::ExtendedColorType::Rgb8)
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(jpeg_buf)
}

/// JPEG-compress a frame and return the bytes as standard base64 text.
pub fn encode_base64_jpeg(frame: &Frame, quality: u8) -> Result<String, CodecError> {
    let jpeg = encode_jpeg(frame, quality)?;
    log::debug!(
        "Encoded {}x{} frame to {} JPEG bytes",
        frame.width(),
        frame.height(),
        jpeg.len()
    );
    Ok(BASE64.encode(&jpeg))
}

/// Inverse of `encode_base64_jpeg`, up to JPEG loss.
pub fn decode_base64_jpeg(text: &str) -> Result<RgbImage, CodecError> {
    let bytes = BASE64.decode(text.trim())?;
    image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)
        .map(|img| img.to_rgb8())
        .map_err(|e| CodecError::Decode(e.to_string()))
}

/// `photo_<YYYY-MM-DD_HH-MM-SS>.png` for the given instant.
pub fn photo_file_name<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("photo_{}.png", now.format("%Y-%m-%d_%H-%M-%S"))
}

/// Write a frame as PNG into `dir`, named after `now`. Returns the path.
///
/// The file is created exclusively: if a photo with the same name exists
/// (two captures in one second) nothing is written and `AlreadyExists` is
/// returned.
pub fn save_png<Tz>(frame: &Frame, dir: &Path, now: &DateTime<Tz>) -> Result<PathBuf, CodecError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let path = dir.join(photo_file_name(now));
    let io_err = |message: String| CodecError::Io {
        path: path.clone(),
        message,
    };

    let file = File::options()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                log::warn!("Not overwriting existing photo {}", path.display());
                CodecError::AlreadyExists(path.clone())
            } else {
                io_err(e.to_string())
            }
        })?;
    let mut writer = BufWriter::new(file);
    frame
        .write_to(&mut writer, ImageFormat::Png)
        .map_err(|e| io_err(e.to_string()))?;
    writer.flush().map_err(|e| io_err(e.to_string()))?;

    log::info!("Photo saved as {}", path.display());
    Ok(path)
}
