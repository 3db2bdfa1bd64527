//! V4L2 camera backend using the `v4l` crate.

use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use super::camera::{DeviceError, Frame, FrameSource, FrameStream};
use super::pixel::{self, PixelLayout};

/// Number of mmap buffers queued with the driver.
const BUFFER_COUNT: u32 = 4;

/// A V4L2 capture device, e.g. index 0 for `/dev/video0`.
pub struct V4l2Camera {
    index: u32,
    width: u32,
    height: u32,
}

impl V4l2Camera {
    /// Describe a camera to open later. Nothing touches the device yet.
    pub fn new(index: u32, width: u32, height: u32) -> Self {
        Self {
            index,
            width,
            height,
        }
    }
}

impl FrameSource for V4l2Camera {
    type Stream = V4l2Stream;

    fn open(&mut self) -> Result<Self::Stream, DeviceError> {
        let device = Device::new(self.index as usize).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DeviceError::DeviceNotFound(self.index)
            } else {
                DeviceError::OpenFailed(e.to_string())
            }
        })?;

        let caps = device
            .query_caps()
            .map_err(|e| DeviceError::OpenFailed(e.to_string()))?;
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            return Err(DeviceError::OpenFailed(format!(
                "{} is not a video capture device",
                caps.card
            )));
        }

        let mut fmt = device
            .format()
            .map_err(|e| DeviceError::OpenFailed(e.to_string()))?;
        fmt.width = self.width;
        fmt.height = self.height;
        fmt.fourcc = FourCC::new(b"YUYV");
        // The driver may substitute a different size or layout.
        let fmt = device
            .set_format(&fmt)
            .map_err(|e| DeviceError::OpenFailed(e.to_string()))?;
        let layout = PixelLayout::from_fourcc(fmt.fourcc.repr)?;

        let stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| DeviceError::Stream(e.to_string()))?;

        log::info!(
            "Opened camera {} ({}) at {}x{} {:?}",
            self.index,
            caps.card,
            fmt.width,
            fmt.height,
            layout
        );

        Ok(V4l2Stream {
            stream,
            layout,
            width: fmt.width,
            height: fmt.height,
            stride: fmt.stride,
        })
    }

    fn describe(&self) -> String {
        format!("/dev/video{}", self.index)
    }
}

/// A streaming V4L2 device. Dropping it stops streaming and frees the
/// mmap buffers.
pub struct V4l2Stream {
    stream: Stream<'static>,
    layout: PixelLayout,
    width: u32,
    height: u32,
    stride: u32,
}

impl FrameStream for V4l2Stream {
    fn next_frame(&mut self) -> Result<Frame, DeviceError> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| DeviceError::Stream(e.to_string()))?;

        let used = (meta.bytesused as usize).min(buf.len());
        log::debug!("Frame {} ({} bytes)", meta.sequence, used);

        pixel::to_frame(self.layout, &buf[..used], self.width, self.height, self.stride)
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        log::info!("Camera released");
    }
}
