// camera.rs: frame type, camera traits and the pull-based frame iterator.
//
// A `FrameSource` is something that can be opened (a physical camera, a
// mock). Opening yields a `FrameStream` that owns the device until it is
// dropped. `FrameStream::frames` turns a stream into a lazy iterator that
// ends after the first device error.

use image::RgbImage;
use std::iter::FusedIterator;

/// One still image read from a camera: a grid of 8-bit RGB pixels.
pub type Frame = RgbImage;

/// Errors raised while opening or reading a camera device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("camera {0} not found")]
    DeviceNotFound(u32),
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("camera is already in use")]
    Busy,
    #[error("pixel format {0} is not supported")]
    FormatNotSupported(String),
    #[error("could not read frame from camera: {0}")]
    Stream(String),
    #[error("could not decode camera frame: {0}")]
    Decode(String),
}

/// Something that can hand out exclusive frame streams.
pub trait FrameSource {
    /// The stream type returned by `open`. Dropping it releases the device.
    type Stream: FrameStream;

    /// Open the device. Only one stream may be live at a time.
    fn open(&mut self) -> Result<Self::Stream, DeviceError>;

    /// Human-readable device name for logs.
    fn describe(&self) -> String;
}

/// An open camera producing frames on demand.
pub trait FrameStream {
    /// Block until the next frame is available.
    fn next_frame(&mut self) -> Result<Frame, DeviceError>;

    /// Adapt this stream into an infinite, non-restartable iterator.
    fn frames(self) -> Frames<Self>
    where
        Self: Sized,
    {
        Frames { stream: Some(self) }
    }
}

/// Lazy sequence of frames pulled from a `FrameStream`.
///
/// Yields `Ok` frames until the device fails, then yields that error once
/// and ends. The stream is dropped at that point, so the device is released
/// and the iterator cannot be resumed; open the source again instead.
pub struct Frames<S> {
    stream: Option<S>,
}

impl<S> Frames<S> {
    /// Whether the underlying stream is still open.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl<S: FrameStream> Iterator for Frames<S> {
    type Item = Result<Frame, DeviceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let stream = self.stream.as_mut()?;
        match stream.next_frame() {
            Ok(frame) => Some(Ok(frame)),
            Err(e) => {
                self.stream = None;
                Some(Err(e))
            }
        }
    }
}

impl<S: FrameStream> FusedIterator for Frames<S> {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted {
        remaining: u32,
    }

    impl FrameStream for Scripted {
        fn next_frame(&mut self) -> Result<Frame, DeviceError> {
            if self.remaining == 0 {
                return Err(DeviceError::Stream("unplugged".into()));
            }
            self.remaining -= 1;
            Ok(RgbImage::new(4, 2))
        }
    }

    #[test]
    fn frames_end_after_first_error() {
        let mut frames = Scripted { remaining: 2 }.frames();
        assert!(frames.next().unwrap().is_ok());
        assert!(frames.next().unwrap().is_ok());
        assert!(frames.is_open());

        let err = frames.next().unwrap().unwrap_err();
        assert!(matches!(err, DeviceError::Stream(_)));
        assert!(!frames.is_open());
        assert!(frames.next().is_none());
        assert!(frames.next().is_none());
    }

    #[test]
    fn frames_are_lazy() {
        // Taking a prefix never touches frames beyond it.
        let taken: Vec<_> = Scripted { remaining: 3 }.frames().take(3).collect();
        assert_eq!(taken.len(), 3);
        assert!(taken.iter().all(|f| f.is_ok()));
    }

    #[test]
    fn device_error_messages() {
        assert_eq!(DeviceError::DeviceNotFound(2).to_string(), "camera 2 not found");
        assert_eq!(
            DeviceError::FormatNotSupported("H264".into()).to_string(),
            "pixel format H264 is not supported"
        );
    }
}
