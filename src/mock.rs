//! In-process camera driver for tests and development.
//!
//! [`MockCamera`] implements the full [`CameraDriver`] contract against a
//! fixed synthetic sensor, so every session code path can run without
//! hardware: busy/not-found handling on open, crop validation and alignment
//! on configure, deterministic gradient frames, and scripted frame failures
//! for testing mid-sequence capture aborts.
//!
//! The mock models device-defined behaviors the session deliberately leaves
//! to the driver: gain is clamped to 0-24 dB, exposure is stored exactly
//! (zero quantization), and requested crop widths are aligned down to a
//! 4-pixel step the way real readout hardware does.

use chrono::Utc;
use ndarray::Array2;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::driver::{CameraDriver, DeviceHandle, DeviceSettings, RawFrame};
use crate::error::{CamResult, CameraError};

const DEFAULT_SERIAL: &str = "HS500-0001";
const DEFAULT_SENSOR_WIDTH: u32 = 2048;
const DEFAULT_SENSOR_HEIGHT: u32 = 1088;

const GAIN_MIN_DB: f64 = 0.0;
const GAIN_MAX_DB: f64 = 24.0;

/// Requested crop widths are aligned down to this step.
const WIDTH_STEP: u32 = 4;

struct DeviceState {
    serial: String,
    settings: Option<DeviceSettings>,
    exposure_us: u64,
    gain_db: f64,
    streaming: bool,
    frames_served: u64,
}

/// Synthetic camera backend implementing [`CameraDriver`].
pub struct MockCamera {
    sensor_width: u32,
    sensor_height: u32,
    serials: Vec<String>,
    states: Mutex<HashMap<i16, DeviceState>>,
    next_handle: Mutex<i16>,
    fail_on_frame: Mutex<Option<u64>>,
    fail_stop: Mutex<bool>,
    fail_close: Mutex<bool>,
    injected: Mutex<Option<Array2<u16>>>,
    noise: Mutex<Option<StdRng>>,
}

impl MockCamera {
    /// One device with the default 2048x1088 sensor.
    pub fn new() -> Self {
        Self::with_geometry(DEFAULT_SENSOR_WIDTH, DEFAULT_SENSOR_HEIGHT)
    }

    /// One device with a custom native sensor geometry.
    pub fn with_geometry(sensor_width: u32, sensor_height: u32) -> Self {
        Self {
            sensor_width,
            sensor_height,
            serials: vec![DEFAULT_SERIAL.to_string()],
            states: Mutex::new(HashMap::new()),
            next_handle: Mutex::new(1),
            fail_on_frame: Mutex::new(None),
            fail_stop: Mutex::new(false),
            fail_close: Mutex::new(false),
            injected: Mutex::new(None),
            noise: Mutex::new(None),
        }
    }

    /// Replace the set of connected device serials.
    pub fn with_serials(mut self, serials: &[&str]) -> Self {
        self.serials = serials.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Script the `n`-th frame request (1-based) to time out. One-shot:
    /// the flag clears after firing.
    pub fn fail_nth_frame(&self, n: u64) {
        *self.fail_on_frame.lock() = Some(n);
    }

    /// Script every subsequent `stop_streaming` call to fail.
    pub fn fail_stop_streaming(&self) {
        *self.fail_stop.lock() = true;
    }

    /// Script every subsequent `close` call to fail. The device stays
    /// claimed, matching hardware whose handle release genuinely failed.
    pub fn fail_close(&self) {
        *self.fail_close.lock() = true;
    }

    /// Serve this exact raw frame for every subsequent request instead of
    /// the generated gradient.
    pub fn inject_pattern(&self, pixels: Array2<u16>) {
        *self.injected.lock() = Some(pixels);
    }

    /// Add deterministic sensor noise on top of the gradient pattern.
    pub fn enable_noise(&self, seed: u64) {
        *self.noise.lock() = Some(StdRng::seed_from_u64(seed));
    }

    /// Settings most recently applied to the device with this serial, if
    /// it is open and configured.
    pub fn applied_settings(&self, serial: &str) -> Option<DeviceSettings> {
        self.states
            .lock()
            .values()
            .find(|state| state.serial == serial)
            .and_then(|state| state.settings.clone())
    }

    fn effective_dims(&self, settings: &DeviceSettings) -> (u32, u32) {
        let cols = if settings.width >= WIDTH_STEP {
            settings.width - settings.width % WIDTH_STEP
        } else {
            settings.width
        };
        let rows = self.sensor_height / settings.vertical_binning;
        (rows, cols)
    }

    fn with_state<T>(
        &self,
        handle: DeviceHandle,
        f: impl FnOnce(&mut DeviceState) -> CamResult<T>,
    ) -> CamResult<T> {
        let mut states = self.states.lock();
        let state = states
            .get_mut(&handle.0)
            .ok_or_else(|| CameraError::Device(format!("camera handle {handle:?} is not open")))?;
        f(state)
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraDriver for MockCamera {
    fn open(&self, serial: Option<&str>) -> CamResult<DeviceHandle> {
        let mut states = self.states.lock();
        let target = match serial {
            Some(s) => {
                if !self.serials.iter().any(|known| known == s) {
                    return Err(CameraError::DeviceNotFound {
                        serial: Some(s.to_string()),
                    });
                }
                if states.values().any(|state| state.serial == s) {
                    return Err(CameraError::DeviceBusy {
                        serial: Some(s.to_string()),
                    });
                }
                s.to_string()
            }
            None => {
                let free = self
                    .serials
                    .iter()
                    .find(|known| !states.values().any(|state| &state.serial == *known));
                match free {
                    Some(known) => known.clone(),
                    None if self.serials.is_empty() => {
                        return Err(CameraError::DeviceNotFound { serial: None })
                    }
                    None => return Err(CameraError::DeviceBusy { serial: None }),
                }
            }
        };

        let mut next = self.next_handle.lock();
        let handle = DeviceHandle(*next);
        *next += 1;

        states.insert(
            handle.0,
            DeviceState {
                serial: target.clone(),
                settings: None,
                exposure_us: 100_000,
                gain_db: 0.0,
                streaming: false,
                frames_served: 0,
            },
        );
        info!(serial = %target, ?handle, "mock camera opened");
        Ok(handle)
    }

    fn close(&self, handle: DeviceHandle) -> CamResult<()> {
        if *self.fail_close.lock() {
            return Err(CameraError::Device("handle release failed".into()));
        }
        let mut states = self.states.lock();
        match states.remove(&handle.0) {
            Some(state) => {
                info!(serial = %state.serial, ?handle, "mock camera closed");
                Ok(())
            }
            None => Err(CameraError::Device(format!(
                "camera handle {handle:?} is not open"
            ))),
        }
    }

    fn configure(&self, handle: DeviceHandle, settings: &DeviceSettings) -> CamResult<()> {
        self.with_state(handle, |state| {
            if settings.width == 0 {
                return Err(CameraError::InvalidParameter("crop width is zero".into()));
            }
            if settings.width + settings.offset_x > self.sensor_width {
                return Err(CameraError::InvalidParameter(format!(
                    "crop {}+{} exceeds sensor width {}",
                    settings.width, settings.offset_x, self.sensor_width
                )));
            }
            if settings.vertical_binning == 0 || settings.vertical_binning > self.sensor_height {
                return Err(CameraError::InvalidParameter(format!(
                    "vertical binning {} is unusable on a {}-row sensor",
                    settings.vertical_binning, self.sensor_height
                )));
            }
            if settings.exposure_us == 0 {
                return Err(CameraError::InvalidParameter(
                    "exposure must be positive".into(),
                ));
            }
            state.exposure_us = settings.exposure_us;
            state.gain_db = settings.gain_db.clamp(GAIN_MIN_DB, GAIN_MAX_DB);
            state.settings = Some(settings.clone());
            debug!(serial = %state.serial, ?settings, "mock camera configured");
            Ok(())
        })
    }

    fn query_dimensions(&self, handle: DeviceHandle) -> CamResult<(u32, u32)> {
        self.with_state(handle, |state| {
            Ok(match &state.settings {
                Some(settings) => self.effective_dims(settings),
                None => (self.sensor_height, self.sensor_width),
            })
        })
    }

    fn start_streaming(&self, handle: DeviceHandle) -> CamResult<()> {
        self.with_state(handle, |state| {
            if state.streaming {
                return Err(CameraError::AcquisitionStart(format!(
                    "camera {} is already streaming",
                    state.serial
                )));
            }
            state.streaming = true;
            info!(serial = %state.serial, "mock acquisition started");
            Ok(())
        })
    }

    fn stop_streaming(&self, handle: DeviceHandle) -> CamResult<()> {
        if *self.fail_stop.lock() {
            return Err(CameraError::Device("stream stop rejected".into()));
        }
        self.with_state(handle, |state| {
            state.streaming = false;
            info!(serial = %state.serial, "mock acquisition stopped");
            Ok(())
        })
    }

    fn get_frame(&self, handle: DeviceHandle, timeout: Duration) -> CamResult<RawFrame> {
        self.with_state(handle, |state| {
            if !state.streaming {
                return Err(CameraError::Device(format!(
                    "frame requested while camera {} is not streaming",
                    state.serial
                )));
            }

            let frame_number = state.frames_served + 1;
            {
                let mut fail = self.fail_on_frame.lock();
                if *fail == Some(frame_number) {
                    *fail = None;
                    return Err(CameraError::FrameTimeout {
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
            }

            let (rows, cols) = match &state.settings {
                Some(settings) => self.effective_dims(settings),
                None => (self.sensor_height, self.sensor_width),
            };
            let injected = self.injected.lock().clone();
            let pixels = match injected {
                Some(pattern) => pattern,
                None => {
                    let mut noise = self.noise.lock();
                    let width = cols as usize;
                    Array2::from_shape_fn((rows as usize, width), |(r, c)| {
                        let base = ((r * width + c) as u64 + frame_number) % 4096;
                        let jitter = noise.as_mut().map_or(0, |rng| rng.gen_range(0..8u64));
                        (base + jitter) as u16
                    })
                }
            };

            state.frames_served = frame_number;
            Ok(RawFrame {
                frame_number,
                timestamp: Utc::now(),
                pixels,
            })
        })
    }

    fn exposure_us(&self, handle: DeviceHandle) -> CamResult<u64> {
        self.with_state(handle, |state| Ok(state.exposure_us))
    }

    fn set_exposure_us(&self, handle: DeviceHandle, exposure_us: u64) -> CamResult<()> {
        self.with_state(handle, |state| {
            if exposure_us == 0 {
                return Err(CameraError::InvalidParameter(
                    "exposure must be positive".into(),
                ));
            }
            state.exposure_us = exposure_us;
            debug!(serial = %state.serial, exposure_us, "mock exposure set");
            Ok(())
        })
    }

    fn gain_db(&self, handle: DeviceHandle) -> CamResult<f64> {
        self.with_state(handle, |state| Ok(state.gain_db))
    }

    fn set_gain_db(&self, handle: DeviceHandle, gain_db: f64) -> CamResult<()> {
        self.with_state(handle, |state| {
            state.gain_db = gain_db.clamp(GAIN_MIN_DB, GAIN_MAX_DB);
            debug!(serial = %state.serial, gain_db = state.gain_db, "mock gain set");
            Ok(())
        })
    }
}
