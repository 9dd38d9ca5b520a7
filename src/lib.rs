//! Acquisition session layer for hyperspectral line-scan cameras.
//!
//! This crate provides a safe, parameterized capture session over any device
//! backend implementing the [`CameraDriver`] contract: open a device, apply
//! a declarative [`SessionConfig`], start acquisition, pull frames into a
//! caller-owned 3-D buffer, and guarantee stop/close on every exit path.
//!
//! The hard parts of a camera stack (buffer management, triggering,
//! bit-packing, the acquisition state machine) live behind the driver
//! boundary. This layer adds exactly one piece of processing: a fixed
//! 90-degree rotation aligning the sensor's native readout axis with the
//! wavelength/line-pixel convention downstream consumers expect.
//!
//! ```
//! use std::sync::Arc;
//! use hsicam::{CameraSession, MockCamera, SessionConfig};
//!
//! # fn main() -> hsicam::CamResult<()> {
//! let driver = Arc::new(MockCamera::new());
//! let mut session = CameraSession::open(driver, SessionConfig::default())?;
//!
//! session.set_exposure(std::time::Duration::from_millis(10))?;
//! let frames = session.capture(3)?;
//! assert_eq!(frames.dim().2, 3);
//!
//! session.close()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod frame;
#[cfg(feature = "mock")]
pub mod mock;
pub mod session;

pub use config::{BinningMode, BitDepth, PixelFormat, SessionConfig};
pub use driver::{CameraDriver, DeviceHandle, DeviceSettings, RawFrame};
pub use error::{CamResult, CameraError};
pub use frame::FrameBuffer;
#[cfg(feature = "mock")]
pub use mock::MockCamera;
pub use session::{CameraSession, SessionState};
