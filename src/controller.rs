// controller.rs: drives the capture session and its side effects.
//
// The session itself is pure state. This controller owns the camera, the
// live frame stream, the vision provider and the output directory, and
// applies the side effects each transition implies: the stream is closed
// on capture, the photo is written to disk, and the stream is reopened on
// reset.

use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;

use crate::ai::{AiError, VisionProvider};
use crate::capture::{codec, CodecError, DeviceError, Frame, FrameSource, FrameStream, Frames};
use crate::session::{CaptureSession, SessionError};

/// Anything a controller operation can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Analysis(#[from] AiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("camera is not streaming; reset to reopen it")]
    NotStreaming,
}

/// Result of a successful capture.
#[derive(Debug, Clone)]
pub struct Captured {
    /// Where the PNG copy of the photo was written.
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

pub struct CaptureController<S: FrameSource> {
    source: S,
    live: Option<Frames<S::Stream>>,
    /// Most recent preview frame; this is what a capture freezes.
    last_frame: Option<Frame>,
    provider: Arc<dyn VisionProvider>,
    session: CaptureSession,
    output_dir: PathBuf,
    jpeg_quality: u8,
}

impl<S: FrameSource> CaptureController<S> {
    /// Build a controller in the live state. The camera is not opened until
    /// `start` is called.
    pub fn new(
        source: S,
        provider: Arc<dyn VisionProvider>,
        output_dir: impl Into<PathBuf>,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            source,
            live: None,
            last_frame: None,
            provider,
            session: CaptureSession::new(),
            output_dir: output_dir.into(),
            jpeg_quality,
        }
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn is_streaming(&self) -> bool {
        self.live.as_ref().is_some_and(Frames::is_open)
    }

    /// Open the camera for live preview. Does nothing if it is already open
    /// or a photo is held.
    pub fn start(&mut self) -> Result<(), ControllerError> {
        if self.session.photo_taken() || self.is_streaming() {
            return Ok(());
        }
        let stream = self.source.open()?;
        log::info!("Live preview started on {}", self.source.describe());
        self.live = Some(stream.frames());
        Ok(())
    }

    /// Pull the next preview frame.
    ///
    /// On a device error the stream and the last preview frame are dropped;
    /// preview and capture fail with `NotStreaming` until `reset`.
    pub fn preview(&mut self) -> Result<&Frame, ControllerError> {
        let frame = self.read_live_frame()?;
        Ok(self.last_frame.insert(frame))
    }

    /// Freeze the current frame as the session photo, release the camera
    /// and save a PNG copy.
    ///
    /// If saving fails the photo stays captured and the error is returned.
    pub fn capture(&mut self) -> Result<Captured, ControllerError> {
        if self.session.photo_taken() {
            return Err(SessionError::AlreadyCaptured.into());
        }
        let frame = match self.last_frame.take() {
            Some(frame) => frame,
            None => self.read_live_frame()?,
        };

        self.stop();
        match std::mem::take(&mut self.session).capture(frame) {
            Ok(session) => self.session = session,
            Err(rejected) => {
                self.session = rejected.session;
                return Err(rejected.reason.into());
            }
        }

        let photo = self.session.photo().ok_or(SessionError::NoPhoto)?;
        let (width, height) = photo.dimensions();
        let path = codec::save_png(photo, &self.output_dir, &Local::now())?;
        Ok(Captured {
            path,
            width,
            height,
        })
    }

    /// Send the captured photo to the vision provider and store the reply.
    ///
    /// Blocks the caller for the whole round trip. On failure, whether in
    /// encoding or in the request, the stored result is cleared and the
    /// error is returned; the user may retry.
    pub async fn analyze(&mut self) -> Result<&str, ControllerError> {
        let photo = self.session.photo().ok_or(SessionError::NoPhoto)?;
        let outcome = match codec::encode_base64_jpeg(photo, self.jpeg_quality) {
            Ok(image_b64) => {
                log::info!("Analyzing photo with {}", self.provider.name());
                self.provider
                    .analyze_image(&image_b64)
                    .await
                    .map_err(ControllerError::from)
            }
            Err(e) => Err(ControllerError::from(e)),
        };

        let (result, error) = match outcome {
            Ok(text) => (Some(text), None),
            Err(e) => {
                log::error!("Analysis failed: {}", e);
                (None, Some(e))
            }
        };
        self.session = match std::mem::take(&mut self.session).record_analysis(result) {
            Ok(session) => session,
            Err(rejected) => rejected.session,
        };

        if let Some(e) = error {
            return Err(e);
        }
        self.session
            .analysis_result()
            .ok_or(ControllerError::Session(SessionError::NoPhoto))
    }

    /// Clear the session and reopen the camera.
    ///
    /// The session is cleared even if reopening fails; call `reset` again to
    /// retry the camera.
    pub fn reset(&mut self) -> Result<(), ControllerError> {
        self.session = std::mem::take(&mut self.session).reset();
        self.stop();
        self.start()
    }

    fn read_live_frame(&mut self) -> Result<Frame, ControllerError> {
        let live = self.live.as_mut().ok_or(ControllerError::NotStreaming)?;
        match live.next() {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(e)) => {
                log::error!("Could not get frame from the camera: {}", e);
                self.live = None;
                self.last_frame = None;
                Err(e.into())
            }
            None => {
                self.live = None;
                self.last_frame = None;
                Err(ControllerError::NotStreaming)
            }
        }
    }

    /// Release the camera. A frame previewed before this is never captured.
    fn stop(&mut self) {
        self.last_frame = None;
        if self.live.take().is_some() {
            log::info!("Live preview stopped");
        }
    }
}
