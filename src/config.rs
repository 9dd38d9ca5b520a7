//! Session configuration.
//!
//! [`SessionConfig`] is the immutable value object supplied once at
//! construction. It can be built in code or deserialized from a TOML file:
//!
//! ```toml
//! serial = "HS500-0001"
//! crop_width = 896
//! crop_offset = 528
//! exposure_ms = 1000
//! gain_db = 0.0
//! pixel_format = "raw16"
//! bit_depth = "bpp12"
//! bit_packing = true
//! vertical_binning = 2
//! binning_mode = "sum"
//! ```
//!
//! Crop bounds are *not* validated here; a width/offset combination outside
//! the sensor's native pixel bounds is surfaced by the device as an
//! [`InvalidParameter`](crate::error::CameraError::InvalidParameter) error
//! when the session applies its settings.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::CamResult;

/// Raw pixel transfer format requested from the device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 8-bit raw sensor data.
    Raw8,
    /// 16-bit raw sensor data (container for 10/12-bit depths).
    #[default]
    Raw16,
}

/// Output bit depth of each sample inside the transfer format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitDepth {
    /// 8 bits per pixel.
    Bpp8,
    /// 10 bits per pixel.
    Bpp10,
    /// 12 bits per pixel.
    #[default]
    Bpp12,
    /// 16 bits per pixel.
    Bpp16,
}

/// How vertically binned pixels are combined into one output sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinningMode {
    /// Adjacent pixels are summed.
    #[default]
    Sum,
    /// Adjacent pixels are averaged.
    Average,
}

/// Immutable parameter set applied once when a session is constructed.
///
/// Defaults match a 12-bit line-scan sensor with a 896-pixel spectral crop
/// at offset 528, 1 s exposure, unity gain and 2x vertical sum binning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Device serial identifier; `None` opens the first available device.
    pub serial: Option<String>,
    /// Sensor crop width in pixels (spectral axis).
    pub crop_width: u32,
    /// Horizontal crop offset in pixels.
    pub crop_offset: u32,
    /// Exposure duration in milliseconds.
    pub exposure_ms: u64,
    /// Analog gain in decibels. Applied at construction like every other
    /// field; the device-defined range is commonly 0-24 dB.
    pub gain_db: f64,
    /// Raw pixel transfer format.
    pub pixel_format: PixelFormat,
    /// Output bit depth within the transfer format.
    pub bit_depth: BitDepth,
    /// Pack sub-byte-aligned samples into a dense on-wire representation.
    pub bit_packing: bool,
    /// Vertical binning factor (1 = no binning).
    pub vertical_binning: u32,
    /// Vertical binning combination mode.
    pub binning_mode: BinningMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            serial: None,
            crop_width: 896,
            crop_offset: 528,
            exposure_ms: 1000,
            gain_db: 0.0,
            pixel_format: PixelFormat::Raw16,
            bit_depth: BitDepth::Bpp12,
            bit_packing: true,
            vertical_binning: 2,
            binning_mode: BinningMode::Sum,
        }
    }
}

impl SessionConfig {
    /// Exposure as a [`Duration`].
    pub fn exposure(&self) -> Duration {
        Duration::from_millis(self.exposure_ms)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml_str(text: &str) -> CamResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration from a TOML file.
    pub fn from_toml_path(path: impl AsRef<Path>) -> CamResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
