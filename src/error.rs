//! Custom error types for the acquisition layer.
//!
//! This module defines the primary error type, `CameraError`, for the entire
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to classify everything that can go wrong between opening a
//! device and handing a frame buffer back to the caller.
//!
//! ## Error Hierarchy
//!
//! `CameraError` consolidates three groups of failures:
//!
//! - **Device-driver errors** (`DeviceNotFound`, `DeviceBusy`,
//!   `AcquisitionStart`, `FrameTimeout`, `InvalidParameter`, `Device`): raised
//!   by the [`CameraDriver`](crate::driver::CameraDriver) collaborator and
//!   surfaced to the caller unchanged. The session never retries or swallows
//!   them.
//! - **Session errors** (`Capture`, `SessionClosed`, `Teardown`): raised by
//!   the session itself. `Capture` wraps the driver error that aborted a
//!   multi-frame sequence, together with the index of the frame that failed.
//!   `Teardown` collects every error hit on the stop/close path so that a
//!   failing `stop_streaming` cannot mask a failing `close` (or vice versa).
//! - **Configuration errors** (`Config`, `Io`): TOML parsing and file access
//!   when loading a [`SessionConfig`](crate::config::SessionConfig) from disk.
//!
//! `CameraError` is the only error type in this crate; all public operations
//! return [`CamResult`].

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type CamResult<T> = std::result::Result<T, CameraError>;

/// All failure modes of the acquisition layer.
#[derive(Error, Debug)]
pub enum CameraError {
    /// No connected device matches the requested serial identifier.
    #[error("no camera found matching serial {serial:?}")]
    DeviceNotFound {
        /// Serial requested by the caller, `None` for "first available".
        serial: Option<String>,
    },

    /// The device exists but is already claimed by another session.
    #[error("camera {serial:?} is already claimed by another session")]
    DeviceBusy {
        /// Serial requested by the caller, `None` for "first available".
        serial: Option<String>,
    },

    /// The device refused to enter its streaming state.
    #[error("failed to start acquisition: {0}")]
    AcquisitionStart(String),

    /// The device produced no frame within the wait window.
    #[error("timed out after {timeout_ms} ms waiting for a frame")]
    FrameTimeout {
        /// Wait window that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// The device rejected a parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A multi-frame capture aborted mid-sequence. No partial buffer is
    /// returned; `frame_index` is the zero-based index of the frame that
    /// failed and `source` is the underlying driver error.
    #[error("capture failed at frame {frame_index}: {source}")]
    Capture {
        /// Zero-based index of the frame that failed.
        frame_index: usize,
        /// The driver error that aborted the sequence.
        #[source]
        source: Box<CameraError>,
    },

    /// A device operation was attempted after the session was torn down.
    #[error("session is closed")]
    SessionClosed,

    /// Teardown itself failed. Every error collected on the stop/close path
    /// is carried so that none masks another.
    #[error("session teardown failed with {} error(s)", .0.len())]
    Teardown(Vec<CameraError>),

    /// Driver fault with no narrower classification.
    #[error("device error: {0}")]
    Device(String),

    /// Configuration file could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CameraError::DeviceBusy {
            serial: Some("HS500-0001".into()),
        };
        assert!(err.to_string().contains("HS500-0001"));

        let err = CameraError::InvalidParameter("gain out of range".into());
        assert_eq!(err.to_string(), "invalid parameter: gain out of range");
    }

    #[test]
    fn test_capture_error_carries_source() {
        let err = CameraError::Capture {
            frame_index: 2,
            source: Box::new(CameraError::FrameTimeout { timeout_ms: 2500 }),
        };
        assert!(err.to_string().contains("frame 2"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_teardown_error_collects_all() {
        let err = CameraError::Teardown(vec![
            CameraError::Device("stream stop rejected".into()),
            CameraError::Device("handle release failed".into()),
        ]);
        assert!(err.to_string().contains("2 error(s)"));
    }
}
