//! Conversions from raw camera buffers into RGB frames.
//!
//! V4L2 drivers hand back whatever layout they negotiated. We ask for YUYV
//! but accept packed RGB24 and Motion-JPEG too.

use image::{ImageFormat, RgbImage};

use super::camera::{DeviceError, Frame};

/// Raw buffer layouts a camera may deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// YUV 4:2:2 packed, `[Y0 U Y1 V]` per pixel pair.
    Yuyv,
    /// Packed 24-bit RGB.
    Rgb24,
    /// One JPEG image per buffer.
    Mjpeg,
}

impl PixelLayout {
    /// Map a V4L2 FourCC code to a supported layout.
    pub fn from_fourcc(code: [u8; 4]) -> Result<Self, DeviceError> {
        match &code {
            b"YUYV" => Ok(Self::Yuyv),
            b"RGB3" => Ok(Self::Rgb24),
            b"MJPG" => Ok(Self::Mjpeg),
            other => Err(DeviceError::FormatNotSupported(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    /// Bytes per line when the driver reports no stride.
    pub fn min_stride(self, width: u32) -> u32 {
        match self {
            Self::Yuyv => width.div_ceil(2) * 4,
            Self::Rgb24 => width * 3,
            Self::Mjpeg => 0,
        }
    }
}

/// Convert one raw buffer to an RGB frame.
pub fn to_frame(
    layout: PixelLayout,
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
) -> Result<Frame, DeviceError> {
    match layout {
        PixelLayout::Yuyv => yuyv_to_rgb(data, width, height, stride),
        PixelLayout::Rgb24 => rgb24_to_rgb(data, width, height, stride),
        PixelLayout::Mjpeg => image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map(|img| img.to_rgb8())
            .map_err(|e| DeviceError::Decode(e.to_string())),
    }
}

fn check_len(data: &[u8], stride: u32, height: u32) -> Result<(), DeviceError> {
    let needed = stride as usize * height as usize;
    if data.len() < needed {
        return Err(DeviceError::Decode(format!(
            "short buffer: {} bytes, expected {}",
            data.len(),
            needed
        )));
    }
    Ok(())
}

fn yuyv_to_rgb(data: &[u8], width: u32, height: u32, stride: u32) -> Result<Frame, DeviceError> {
    let stride = stride.max(PixelLayout::Yuyv.min_stride(width));
    check_len(data, stride, height)?;

    let mut frame = RgbImage::new(width, height);
    for (x, y, pixel) in frame.enumerate_pixels_mut() {
        // Each pixel pair shares one U and one V sample.
        let pair = (y * stride + (x & !1) * 2) as usize;
        let luma = if x % 2 == 0 { data[pair] } else { data[pair + 2] };
        let (r, g, b) = yuv_to_rgb(luma, data[pair + 1], data[pair + 3]);
        *pixel = image::Rgb([r, g, b]);
    }
    Ok(frame)
}

fn rgb24_to_rgb(data: &[u8], width: u32, height: u32, stride: u32) -> Result<Frame, DeviceError> {
    let row_len = PixelLayout::Rgb24.min_stride(width) as usize;
    if row_len == 0 || height == 0 {
        return Ok(RgbImage::new(width, height));
    }
    let stride = (stride as usize).max(row_len);
    check_len(data, stride as u32, height)?;

    let mut raw = Vec::with_capacity(row_len * height as usize);
    for row in data.chunks(stride).take(height as usize) {
        raw.extend_from_slice(&row[..row_len]);
    }
    RgbImage::from_raw(width, height, raw)
        .ok_or_else(|| DeviceError::Decode("RGB buffer does not match frame size".into()))
}

/// ITU-R BT.601 YUV to RGB, clamped to 0..=255.
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = f32::from(y);
    let u = f32::from(u) - 128.0;
    let v = f32::from(v) - 128.0;

    let r = 1.402f32.mul_add(v, y);
    let g = 0.714_14f32.mul_add(-v, 0.344_14f32.mul_add(-u, y));
    let b = 1.772f32.mul_add(u, y);

    let clamp = |val: f32| val.clamp(0.0, 255.0) as u8;
    (clamp(r), clamp(g), clamp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;

    #[test]
    fn fourcc_mapping() {
        assert_eq!(PixelLayout::from_fourcc(*b"YUYV").unwrap(), PixelLayout::Yuyv);
        assert_eq!(PixelLayout::from_fourcc(*b"RGB3").unwrap(), PixelLayout::Rgb24);
        assert_eq!(PixelLayout::from_fourcc(*b"MJPG").unwrap(), PixelLayout::Mjpeg);
        assert!(matches!(
            PixelLayout::from_fourcc(*b"H264"),
            Err(DeviceError::FormatNotSupported(code)) if code == "H264"
        ));
    }

    #[test]
    fn yuyv_grey_stays_grey() {
        // Neutral chroma (128) means R == G == B == Y.
        let data = [100, 128, 200, 128, 100, 128, 200, 128];
        let frame = to_frame(PixelLayout::Yuyv, &data, 2, 2, 4).unwrap();
        assert_eq!(frame.dimensions(), (2, 2));
        assert_eq!(frame.get_pixel(0, 0).0, [100, 100, 100]);
        assert_eq!(frame.get_pixel(1, 0).0, [200, 200, 200]);
        assert_eq!(frame.get_pixel(0, 1).0, [100, 100, 100]);
    }

    #[test]
    fn yuyv_clamps_out_of_range() {
        let (r, _, b) = yuv_to_rgb(255, 255, 255);
        assert_eq!(r, 255);
        assert_eq!(b, 255);
        let (r, g, b) = yuv_to_rgb(0, 128, 128);
        assert_eq!((r, g, b), (0, 0, 0));
    }

    #[test]
    fn yuyv_short_buffer_is_an_error() {
        let err = to_frame(PixelLayout::Yuyv, &[0; 6], 2, 2, 4).unwrap_err();
        assert!(matches!(err, DeviceError::Decode(_)));
    }

    #[test]
    fn rgb24_honours_stride_padding() {
        // 1x2 frame, rows padded to 4 bytes.
        let data = [1, 2, 3, 0, 4, 5, 6, 0];
        let frame = to_frame(PixelLayout::Rgb24, &data, 1, 2, 4).unwrap();
        assert_eq!(frame.get_pixel(0, 0).0, [1, 2, 3]);
        assert_eq!(frame.get_pixel(0, 1).0, [4, 5, 6]);
    }

    #[test]
    fn mjpeg_decodes_to_frame_size() {
        let src = RgbImage::from_pixel(16, 8, image::Rgb([10, 200, 30]));
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, 90)
            .encode(src.as_raw(), 16, 8, image::ExtendedColorType::Rgb8)
            .unwrap();

        let frame = to_frame(PixelLayout::Mjpeg, &jpeg, 0, 0, 0).unwrap();
        assert_eq!(frame.dimensions(), (16, 8));
    }

    #[test]
    fn mjpeg_garbage_is_decode_error() {
        let err = to_frame(PixelLayout::Mjpeg, b"not a jpeg", 0, 0, 0).unwrap_err();
        assert!(matches!(err, DeviceError::Decode(_)));
    }
}
