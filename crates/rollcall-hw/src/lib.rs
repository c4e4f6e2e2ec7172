//! rollcall-hw: camera access for attendance capture.
//!
//! Opens a V4L2 device and takes single RGB stills.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat};
pub use frame::FrameError;
