//! Capture session state machine.
//!
//! `CaptureSession` is a plain value. Each transition consumes the current
//! session and returns the next one; a rejected transition hands the
//! unchanged session back inside `Rejected` so nothing is lost.
//!
//! ```text
//! Live --capture(frame)--> Captured { analysis: None }
//! Captured --record_analysis(..)--> Captured { analysis: Some | None }
//! Captured --reset()--> Live
//! ```

use crate::capture::Frame;

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a photo is already captured; reset first")]
    AlreadyCaptured,
    #[error("no photo has been captured")]
    NoPhoto,
}

/// A refused transition together with the session it was applied to.
#[derive(Debug, thiserror::Error)]
#[error("{reason}")]
pub struct Rejected {
    pub session: CaptureSession,
    pub reason: SessionError,
}

/// The state of one capture-and-analyze cycle.
///
/// `photo` exists exactly when a photo has been taken; the enum makes any
/// other combination unrepresentable.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CaptureSession {
    /// Live preview, nothing captured.
    #[default]
    Live,
    /// A photo is frozen, optionally with the latest analysis text.
    Captured {
        photo: Frame,
        analysis: Option<String>,
    },
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::Live
    }

    pub fn photo_taken(&self) -> bool {
        matches!(self, Self::Captured { .. })
    }

    pub fn photo(&self) -> Option<&Frame> {
        match self {
            Self::Captured { photo, .. } => Some(photo),
            Self::Live => None,
        }
    }

    pub fn analysis_result(&self) -> Option<&str> {
        match self {
            Self::Captured { analysis, .. } => analysis.as_deref(),
            Self::Live => None,
        }
    }

    /// Freeze `frame` as the photo. Refused if a photo is already held; the
    /// stored photo is never overwritten.
    pub fn capture(self, frame: Frame) -> Result<Self, Rejected> {
        match self {
            Self::Live => Ok(Self::Captured {
                photo: frame,
                analysis: None,
            }),
            captured @ Self::Captured { .. } => Err(Rejected {
                session: captured,
                reason: SessionError::AlreadyCaptured,
            }),
        }
    }

    /// Store the outcome of an analysis. `None` records a failed attempt and
    /// clears any earlier result.
    pub fn record_analysis(self, result: Option<String>) -> Result<Self, Rejected> {
        match self {
            Self::Captured { photo, .. } => Ok(Self::Captured {
                photo,
                analysis: result,
            }),
            Self::Live => Err(Rejected {
                session: Self::Live,
                reason: SessionError::NoPhoto,
            }),
        }
    }

    /// Drop the photo and any result. A no-op while live.
    pub fn reset(self) -> Self {
        Self::Live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn frame(shade: u8) -> Frame {
        RgbImage::from_pixel(4, 3, Rgb([shade, shade, shade]))
    }

    #[test]
    fn starts_live_and_empty() {
        let s = CaptureSession::new();
        assert!(!s.photo_taken());
        assert!(s.photo().is_none());
        assert!(s.analysis_result().is_none());
        assert_eq!(s, CaptureSession::default());
    }

    #[test]
    fn capture_stores_the_frame() {
        let f = frame(10);
        let s = CaptureSession::new().capture(f.clone()).unwrap();
        assert!(s.photo_taken());
        assert_eq!(s.photo(), Some(&f));
        assert!(s.analysis_result().is_none());
    }

    #[test]
    fn second_capture_is_rejected_and_keeps_first_photo() {
        let first = frame(10);
        let s = CaptureSession::new().capture(first.clone()).unwrap();

        let rejected = s.capture(frame(200)).unwrap_err();
        assert_eq!(rejected.reason, SessionError::AlreadyCaptured);
        assert_eq!(rejected.session.photo(), Some(&first));
    }

    #[test]
    fn analysis_is_recorded_and_cleared_on_failure() {
        let s = CaptureSession::new()
            .capture(frame(1))
            .unwrap()
            .record_analysis(Some("Apple, 95, 19, 0, 0, 1, 25".into()))
            .unwrap();
        assert_eq!(s.analysis_result(), Some("Apple, 95, 19, 0, 0, 1, 25"));

        let s = s.record_analysis(None).unwrap();
        assert!(s.photo_taken());
        assert!(s.analysis_result().is_none());
    }

    #[test]
    fn analysis_without_photo_is_rejected() {
        let rejected = CaptureSession::new()
            .record_analysis(Some("x".into()))
            .unwrap_err();
        assert_eq!(rejected.reason, SessionError::NoPhoto);
        assert_eq!(rejected.session, CaptureSession::Live);
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let s = CaptureSession::new()
            .capture(frame(5))
            .unwrap()
            .record_analysis(Some("No food detected".into()))
            .unwrap()
            .reset();
        assert_eq!(s, CaptureSession::new());

        assert_eq!(CaptureSession::new().reset(), CaptureSession::new());
    }
}
