//! The acquisition session: guaranteed setup and teardown around a
//! streaming device.
//!
//! [`CameraSession::open`] owns the whole construction pipeline (open the
//! device, apply the settings block, read back the effective frame
//! dimensions, start streaming) and fails without leaking the handle if any
//! step goes wrong. Once constructed, the session is streaming and frames
//! can be pulled with [`CameraSession::capture`].
//!
//! Teardown runs on every exit path: explicitly via
//! [`CameraSession::close`], which stops streaming and releases the handle
//! exactly once and reports *all* teardown errors, or implicitly via `Drop`,
//! which runs the same sequence and logs failures. After teardown every
//! device operation fails with
//! [`SessionClosed`](CameraError::SessionClosed).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ndarray::{s, Array3};
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::driver::{CameraDriver, DeviceHandle, DeviceSettings};
use crate::error::{CamResult, CameraError};
use crate::frame::{rotate_cw, FrameBuffer};

/// Session lifecycle state.
///
/// `Unopened` and `Configured` are transient construction states;
/// [`CameraSession::open`] only ever returns a `Streaming` session.
/// `Closed` is terminal; there is no re-open, construct a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No device handle yet. Construction phase only; a constructed
    /// session never reports this state.
    Unopened,
    /// Settings applied, acquisition not yet started. Construction phase
    /// only; a constructed session never reports this state.
    Configured,
    /// Acquisition pipeline running; frames can be captured.
    Streaming,
    /// Torn down. Terminal.
    Closed,
}

/// Exclusive, parameterized handle to a frame-producing device.
///
/// Single-threaded and synchronous by design: `capture` blocks for the
/// whole frame sequence and nothing overlaps retrieval of frame `k+1` with
/// frame `k`. There is no cancellation primitive; the per-frame timeout
/// bounds every wait.
pub struct CameraSession {
    driver: Arc<dyn CameraDriver>,
    handle: Option<DeviceHandle>,
    config: SessionConfig,
    state: SessionState,
    rows: u32,
    cols: u32,
    frame_timeout: Duration,
}

impl CameraSession {
    /// Open the device named by `config.serial` (or the first available
    /// device), apply the full settings block, and start acquisition.
    ///
    /// The settings are applied in the documented order, including the
    /// configured gain: the gain field is honored at construction, not
    /// forced to zero. Effective frame dimensions are read back from the
    /// device afterwards, since the hardware may align the requested crop.
    ///
    /// On any failure after the device was opened, the handle is released
    /// before the error returns; a failed construction never leaks a
    /// claimed device.
    ///
    /// # Errors
    /// `DeviceNotFound` / `DeviceBusy` from the open step,
    /// `InvalidParameter` from the settings block, `AcquisitionStart` if
    /// the device cannot begin streaming.
    pub fn open(driver: Arc<dyn CameraDriver>, config: SessionConfig) -> CamResult<Self> {
        let handle = driver.open(config.serial.as_deref())?;
        info!(serial = ?config.serial, ?handle, "camera opened");

        let settings = DeviceSettings::from(&config);
        let configured = driver
            .configure(handle, &settings)
            .and_then(|()| driver.query_dimensions(handle));
        let (rows, cols) = match configured {
            Ok(dims) => dims,
            Err(err) => {
                Self::release_on_failed_open(&*driver, handle);
                return Err(err);
            }
        };
        debug!(rows, cols, "effective frame dimensions");

        if let Err(err) = driver.start_streaming(handle) {
            Self::release_on_failed_open(&*driver, handle);
            return Err(err);
        }
        info!(rows, cols, "acquisition started");

        // Frames cannot complete faster than the exposure; leave headroom
        // for readout and transfer on top of it.
        let frame_timeout =
            Duration::from_millis(config.exposure_ms.saturating_mul(2).saturating_add(500));

        Ok(Self {
            driver,
            handle: Some(handle),
            config,
            state: SessionState::Streaming,
            rows,
            cols,
            frame_timeout,
        })
    }

    fn release_on_failed_open(driver: &dyn CameraDriver, handle: DeviceHandle) {
        if let Err(err) = driver.close(handle) {
            warn!(?handle, %err, "failed to release device after failed open");
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Configuration this session was constructed with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Effective frame dimensions `(rows, cols)` reported by the device
    /// after crop alignment.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.rows, self.cols)
    }

    /// Per-frame wait window used by [`capture`](Self::capture).
    pub fn frame_timeout(&self) -> Duration {
        self.frame_timeout
    }

    /// Override the per-frame wait window. The default is derived from the
    /// configured exposure; lengthen it after raising exposure at runtime.
    pub fn set_frame_timeout(&mut self, timeout: Duration) {
        self.frame_timeout = timeout;
    }

    fn live_handle(&self) -> CamResult<DeviceHandle> {
        self.handle.ok_or(CameraError::SessionClosed)
    }

    /// Current exposure, read live from the device. No local cache: a
    /// concurrent writer through another path may be observed either
    /// before or after its write, depending on the device's latch.
    pub fn exposure(&self) -> CamResult<Duration> {
        let handle = self.live_handle()?;
        Ok(Duration::from_micros(self.driver.exposure_us(handle)?))
    }

    /// Set exposure. Propagates to the device immediately; whether an
    /// in-flight frame picks it up is device latching behavior, not a
    /// guarantee of this layer.
    pub fn set_exposure(&mut self, exposure: Duration) -> CamResult<()> {
        let handle = self.live_handle()?;
        let exposure_us = u64::try_from(exposure.as_micros())
            .map_err(|_| CameraError::InvalidParameter("exposure does not fit in u64 µs".into()))?;
        debug!(exposure_us, "setting exposure");
        self.driver.set_exposure_us(handle, exposure_us)
    }

    /// Current analog gain in decibels, read live from the device.
    pub fn gain_db(&self) -> CamResult<f64> {
        let handle = self.live_handle()?;
        self.driver.gain_db(handle)
    }

    /// Set analog gain in decibels. Out-of-range values are rejected or
    /// clamped by the device, whichever it defines; this layer does not
    /// enforce a range. Same latching caveat as [`set_exposure`](Self::set_exposure).
    pub fn set_gain_db(&mut self, gain_db: f64) -> CamResult<()> {
        let handle = self.live_handle()?;
        debug!(gain_db, "setting gain");
        self.driver.set_gain_db(handle, gain_db)
    }

    /// Capture `count` frames into a fresh buffer shaped
    /// `(cols, rows, count)`.
    ///
    /// Each raw frame is rotated 90 degrees clockwise so the buffer's first
    /// axis is wavelength and its second is line pixels. The call blocks
    /// until all frames arrive or one fails; on failure the whole call
    /// fails with [`CameraError::Capture`] and nothing captured so far is
    /// returned.
    ///
    /// # Errors
    /// `InvalidParameter` for `count == 0` (pinned behavior; an empty
    /// buffer is never returned), `SessionClosed` after teardown,
    /// `Capture` wrapping the driver error that aborted the sequence.
    pub fn capture(&mut self, count: usize) -> CamResult<FrameBuffer> {
        let handle = self.live_handle()?;
        if count == 0 {
            return Err(CameraError::InvalidParameter(
                "capture count must be at least 1".into(),
            ));
        }

        let rows = self.rows as usize;
        let cols = self.cols as usize;
        let mut buffer = Array3::<u16>::zeros((cols, rows, count));

        for index in 0..count {
            let raw = self
                .driver
                .get_frame(handle, self.frame_timeout)
                .map_err(|err| CameraError::Capture {
                    frame_index: index,
                    source: Box::new(err),
                })?;
            if raw.pixels.dim() != (rows, cols) {
                return Err(CameraError::Capture {
                    frame_index: index,
                    source: Box::new(CameraError::Device(format!(
                        "driver returned a {}x{} frame for a {rows}x{cols} session",
                        raw.rows(),
                        raw.cols()
                    ))),
                });
            }
            buffer
                .slice_mut(s![.., .., index])
                .assign(&rotate_cw(&raw.pixels));
        }

        debug!(count, "capture complete");
        Ok(buffer)
    }

    /// Stop acquisition and release the device handle, exactly once.
    ///
    /// Both teardown steps always run; every error they raise is collected
    /// into [`CameraError::Teardown`] so a failing stream stop cannot mask
    /// a failing handle release. A second `close` is a no-op.
    pub fn close(&mut self) -> CamResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        self.state = SessionState::Closed;

        let mut errors = Vec::new();
        if let Err(err) = self.driver.stop_streaming(handle) {
            warn!(%err, "failed to stop streaming during teardown");
            errors.push(err);
        }
        if let Err(err) = self.driver.close(handle) {
            warn!(%err, "failed to release device during teardown");
            errors.push(err);
        }

        if errors.is_empty() {
            info!("session closed");
            Ok(())
        } else {
            Err(CameraError::Teardown(errors))
        }
    }
}

// Manual impl: the driver trait object is opaque and carries no useful
// state of its own, so it is omitted from the output.
impl fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraSession")
            .field("state", &self.state)
            .field("handle", &self.handle)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("frame_timeout", &self.frame_timeout)
            .finish_non_exhaustive()
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(err) = self.close() {
                // In the drop path there is no caller to report to; an
                // in-flight error unwinding through here must not be
                // replaced, so the teardown failure is only logged.
                error!(%err, "camera session teardown failed in drop");
            }
        }
    }
}
