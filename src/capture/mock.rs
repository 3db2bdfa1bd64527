//! Mock camera for tests and for platforms without a camera backend.

use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use super::camera::{DeviceError, Frame, FrameSource, FrameStream};

/// Test pattern types for mock frame generation.
#[derive(Debug, Clone, Copy)]
pub enum TestPattern {
    /// Eight vertical colour bars.
    ColorBars,
    /// Solid colour.
    Solid(u8, u8, u8),
}

const BARS: [[u8; 3]; 8] = [
    [255, 255, 255],
    [255, 255, 0],
    [0, 255, 255],
    [0, 255, 0],
    [255, 0, 255],
    [255, 0, 0],
    [0, 0, 255],
    [0, 0, 0],
];

/// Mock camera with the same exclusive-ownership rules as a real device.
#[derive(Clone)]
pub struct MockCamera {
    width: u32,
    height: u32,
    pattern: TestPattern,
    /// Frames each stream delivers before failing. `None` never fails.
    fail_after: Option<u32>,
    in_use: Arc<AtomicBool>,
    opens: Arc<AtomicU32>,
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new(64, 48)
    }
}

impl MockCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pattern: TestPattern::ColorBars,
            fail_after: None,
            in_use: Arc::new(AtomicBool::new(false)),
            opens: Arc::new(AtomicU32::new(0)),
        }
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: TestPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Make every stream fail with a `DeviceError` after `frames` reads.
    #[must_use]
    pub fn failing_after(mut self, frames: u32) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// How many times the device has been opened.
    pub fn open_count(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Whether a stream currently holds the device.
    pub fn is_open(&self) -> bool {
        self.in_use.load(Ordering::SeqCst)
    }
}

impl FrameSource for MockCamera {
    type Stream = MockStream;

    fn open(&mut self) -> Result<Self::Stream, DeviceError> {
        if self.in_use.swap(true, Ordering::SeqCst) {
            return Err(DeviceError::Busy);
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(MockStream {
            frame: render(self.pattern, self.width, self.height),
            remaining: self.fail_after,
            in_use: Arc::clone(&self.in_use),
        })
    }

    fn describe(&self) -> String {
        format!("mock camera {}x{}", self.width, self.height)
    }
}

/// Stream handed out by `MockCamera`. Releases the camera on drop.
pub struct MockStream {
    frame: Frame,
    remaining: Option<u32>,
    in_use: Arc<AtomicBool>,
}

impl FrameStream for MockStream {
    fn next_frame(&mut self) -> Result<Frame, DeviceError> {
        match self.remaining.as_mut() {
            Some(0) => Err(DeviceError::Stream("mock camera disconnected".into())),
            Some(n) => {
                *n -= 1;
                Ok(self.frame.clone())
            }
            None => Ok(self.frame.clone()),
        }
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.in_use.store(false, Ordering::SeqCst);
    }
}

fn render(pattern: TestPattern, width: u32, height: u32) -> Frame {
    match pattern {
        TestPattern::Solid(r, g, b) => RgbImage::from_pixel(width, height, Rgb([r, g, b])),
        TestPattern::ColorBars => RgbImage::from_fn(width, height, |x, _| {
            let bar = (x * 8 / width.max(1)).min(7) as usize;
            Rgb(BARS[bar])
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_open_is_busy_until_release() {
        let mut cam = MockCamera::default();
        let stream = cam.open().unwrap();
        assert!(cam.is_open());
        assert!(matches!(cam.open(), Err(DeviceError::Busy)));

        drop(stream);
        assert!(!cam.is_open());
        assert!(cam.open().is_ok());
        assert_eq!(cam.open_count(), 2);
    }

    #[test]
    fn colour_bars_span_the_frame() {
        let mut stream = MockCamera::new(80, 10).open().unwrap();
        let frame = stream.next_frame().unwrap();
        assert_eq!(frame.dimensions(), (80, 10));
        assert_eq!(frame.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(frame.get_pixel(79, 9).0, [0, 0, 0]);
    }

    #[test]
    fn failing_stream_stops_iteration() {
        let stream = MockCamera::default().failing_after(1).open().unwrap();
        let results: Vec<_> = stream.frames().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
