//! nutricam: capture a photo from a local camera and ask a vision model for a
//! nutrition estimate of the food in it.
//!
//! The workflow lives in [`controller::CaptureController`], which drives the
//! pure [`session::CaptureSession`] state machine, a [`capture::FrameSource`]
//! and an [`ai::VisionProvider`].

pub mod ai;
pub mod capture;
pub mod controller;
pub mod session;
pub mod settings;
