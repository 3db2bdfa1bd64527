/// The `capture` module covers everything between the camera and the bytes
/// we store or send: device access, pixel conversion and image encoding.
pub mod camera;
pub mod codec;
pub mod mock;
pub mod pixel;

#[cfg(target_os = "linux")]
pub mod v4l2;

pub use camera::{DeviceError, Frame, FrameSource, FrameStream, Frames};
pub use codec::CodecError;
