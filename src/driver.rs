//! Device-driver contract consumed by the acquisition session.
//!
//! The session is written against [`CameraDriver`], not against any vendor
//! SDK. Implementations handle transport-specific details (vendor SDK, V4L2,
//! GenICam, ...); the in-process [`MockCamera`](crate::mock::MockCamera)
//! implements the same contract for tests and development.
//!
//! All methods are synchronous and may block. The session calls them from a
//! single thread; implementations must still be `Send + Sync` so a driver
//! instance can be shared between sessions targeting different physical
//! devices.

use chrono::{DateTime, Utc};
use ndarray::Array2;
use std::time::Duration;

use crate::config::{BinningMode, BitDepth, PixelFormat, SessionConfig};
use crate::error::CamResult;

/// Opaque handle to one open device.
///
/// Exclusively owned by the session that opened it. Drivers must refuse to
/// hand out a second handle for a device identifier that is already claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub i16);

/// Full parameter set applied once at session construction.
///
/// Field order matches the application order the session guarantees: crop
/// width, crop offset, exposure, gain, transfer format, bit depth, bit
/// packing, auto-exposure/gain, vertical binning factor and mode. A driver
/// backed by hardware that enforces dependent settings (e.g. format before
/// bit depth) should apply them in this order.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSettings {
    /// Sensor crop width in pixels.
    pub width: u32,
    /// Horizontal crop offset in pixels.
    pub offset_x: u32,
    /// Exposure duration in microseconds.
    pub exposure_us: u64,
    /// Analog gain in decibels.
    pub gain_db: f64,
    /// Raw pixel transfer format.
    pub pixel_format: PixelFormat,
    /// Output bit depth within the transfer format.
    pub bit_depth: BitDepth,
    /// Dense on-wire packing of sub-byte-aligned samples.
    pub bit_packing: bool,
    /// Automatic exposure/gain. Always disabled by the session.
    pub auto_exposure_gain: bool,
    /// Vertical binning factor (1 = no binning).
    pub vertical_binning: u32,
    /// Vertical binning combination mode.
    pub binning_mode: BinningMode,
}

impl From<&SessionConfig> for DeviceSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            width: config.crop_width,
            offset_x: config.crop_offset,
            exposure_us: config.exposure_ms.saturating_mul(1000),
            gain_db: config.gain_db,
            pixel_format: config.pixel_format,
            bit_depth: config.bit_depth,
            bit_packing: config.bit_packing,
            auto_exposure_gain: false,
            vertical_binning: config.vertical_binning,
            binning_mode: config.binning_mode,
        }
    }
}

/// One frame as delivered by the driver, in the sensor's native orientation.
///
/// `pixels` is shaped `(rows, cols)` as read off the sensor; the session
/// applies the axis rotation before the frame reaches the caller.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Monotonic frame counter since streaming started.
    pub frame_number: u64,
    /// Software timestamp taken when the frame completed.
    pub timestamp: DateTime<Utc>,
    /// Pixel data, `(rows, cols)`, sensor orientation.
    pub pixels: Array2<u16>,
}

impl RawFrame {
    /// Frame height in the sensor's native orientation.
    pub fn rows(&self) -> usize {
        self.pixels.nrows()
    }

    /// Frame width in the sensor's native orientation.
    pub fn cols(&self) -> usize {
        self.pixels.ncols()
    }
}

/// Contract every device backend must satisfy.
///
/// The session forwards each call directly and surfaces every error
/// unchanged; no retries, no caching. Errors use the kinds defined in
/// [`CameraError`](crate::error::CameraError).
pub trait CameraDriver: Send + Sync {
    /// Open the device matching `serial`, or the first available device when
    /// `serial` is `None`.
    ///
    /// # Errors
    /// `DeviceNotFound` if nothing matches, `DeviceBusy` if the identifier
    /// is already claimed.
    fn open(&self, serial: Option<&str>) -> CamResult<DeviceHandle>;

    /// Release an open handle.
    fn close(&self, handle: DeviceHandle) -> CamResult<()>;

    /// Apply the full settings block, in the order documented on
    /// [`DeviceSettings`].
    ///
    /// # Errors
    /// `InvalidParameter` if the device rejects a value (e.g. crop outside
    /// the sensor bounds).
    fn configure(&self, handle: DeviceHandle, settings: &DeviceSettings) -> CamResult<()>;

    /// Effective frame dimensions `(rows, cols)` after the hardware has
    /// adjusted the requested crop for alignment constraints.
    fn query_dimensions(&self, handle: DeviceHandle) -> CamResult<(u32, u32)>;

    /// Transition the device into its streaming state.
    ///
    /// # Errors
    /// `AcquisitionStart` if the device cannot begin streaming.
    fn start_streaming(&self, handle: DeviceHandle) -> CamResult<()>;

    /// Leave the streaming state.
    fn stop_streaming(&self, handle: DeviceHandle) -> CamResult<()>;

    /// Block until the next completed frame, or until `timeout` elapses.
    ///
    /// # Errors
    /// `FrameTimeout` when the wait window elapses without a frame.
    fn get_frame(&self, handle: DeviceHandle, timeout: Duration) -> CamResult<RawFrame>;

    /// Current exposure in microseconds, read live from the device.
    fn exposure_us(&self, handle: DeviceHandle) -> CamResult<u64>;

    /// Set exposure in microseconds.
    fn set_exposure_us(&self, handle: DeviceHandle, exposure_us: u64) -> CamResult<()>;

    /// Current analog gain in decibels, read live from the device.
    fn gain_db(&self, handle: DeviceHandle) -> CamResult<f64>;

    /// Set analog gain in decibels. Out-of-range values are rejected or
    /// clamped, whichever the device defines.
    fn set_gain_db(&self, handle: DeviceHandle, gain_db: f64) -> CamResult<()>;
}
