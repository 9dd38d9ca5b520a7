//! Session lifecycle: construction, teardown ordering, runtime parameters.

use std::sync::Arc;
use std::time::Duration;

use hsicam::{CameraError, CameraSession, MockCamera, SessionConfig, SessionState};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[test]
fn test_open_then_close_reaches_closed() {
    init_tracing();
    let driver = Arc::new(MockCamera::new());
    let mut session = CameraSession::open(driver, SessionConfig::default()).unwrap();
    assert_eq!(session.state(), SessionState::Streaming);

    session.close().unwrap();
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn test_close_is_idempotent() {
    init_tracing();
    let driver = Arc::new(MockCamera::new());
    let mut session = CameraSession::open(driver, SessionConfig::default()).unwrap();
    session.close().unwrap();
    // Second close is a documented no-op, not a second error class.
    session.close().unwrap();
}

#[test]
fn test_teardown_errors_are_collected() {
    init_tracing();
    let driver = Arc::new(MockCamera::new());
    let mut session = CameraSession::open(driver.clone(), SessionConfig::default()).unwrap();

    // Both teardown steps fail; close must surface both, neither masking
    // the other.
    driver.fail_stop_streaming();
    driver.fail_close();
    match session.close().unwrap_err() {
        CameraError::Teardown(errors) => assert_eq!(errors.len(), 2),
        other => panic!("expected Teardown, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Closed);

    // Teardown ran exactly once; a second close is still the documented
    // no-op even after a failed teardown.
    session.close().unwrap();
}

#[test]
fn test_operations_after_close_fail_closed() {
    init_tracing();
    let driver = Arc::new(MockCamera::new());
    let mut session = CameraSession::open(driver, SessionConfig::default()).unwrap();
    session.close().unwrap();

    assert!(matches!(
        session.capture(1).unwrap_err(),
        CameraError::SessionClosed
    ));
    assert!(matches!(
        session.exposure().unwrap_err(),
        CameraError::SessionClosed
    ));
    assert!(matches!(
        session.set_gain_db(3.0).unwrap_err(),
        CameraError::SessionClosed
    ));
}

#[test]
fn test_second_session_on_same_serial_is_busy() {
    init_tracing();
    let driver = Arc::new(MockCamera::new());
    let mut config = SessionConfig::default();
    config.serial = Some("HS500-0001".into());

    let _first = CameraSession::open(driver.clone(), config.clone()).unwrap();
    let err = CameraSession::open(driver, config).unwrap_err();
    assert!(matches!(err, CameraError::DeviceBusy { .. }));
}

#[test]
fn test_unknown_serial_not_found() {
    init_tracing();
    let driver = Arc::new(MockCamera::new());
    let mut config = SessionConfig::default();
    config.serial = Some("HS500-9999".into());
    let err = CameraSession::open(driver, config).unwrap_err();
    assert!(matches!(err, CameraError::DeviceNotFound { .. }));
}

#[test]
fn test_failed_configure_releases_the_device() {
    init_tracing();
    let driver = Arc::new(MockCamera::new());
    let mut bad = SessionConfig::default();
    bad.crop_width = 2048;
    bad.crop_offset = 1; // one pixel past the sensor edge
    let err = CameraSession::open(driver.clone(), bad).unwrap_err();
    assert!(matches!(err, CameraError::InvalidParameter(_)));

    // The handle claimed during the failed construction was released, so a
    // valid session can open the same device immediately.
    let session = CameraSession::open(driver, SessionConfig::default()).unwrap();
    assert_eq!(session.state(), SessionState::Streaming);
}

#[test]
fn test_drop_releases_the_device() {
    init_tracing();
    let driver = Arc::new(MockCamera::new());
    {
        let _session = CameraSession::open(driver.clone(), SessionConfig::default()).unwrap();
    }
    // Teardown ran in drop; the device is free again.
    assert!(CameraSession::open(driver, SessionConfig::default()).is_ok());
}

#[test]
fn test_effective_dimensions_reflect_binning() {
    init_tracing();
    let driver = Arc::new(MockCamera::new());
    let session = CameraSession::open(driver, SessionConfig::default()).unwrap();
    // 2048x1088 sensor, 896-px crop, 2x vertical binning.
    assert_eq!(session.dimensions(), (544, 896));
}

#[test]
fn test_exposure_round_trip() {
    init_tracing();
    let driver = Arc::new(MockCamera::new());
    let mut session = CameraSession::open(driver, SessionConfig::default()).unwrap();

    for millis in [1u64, 1000, 4000] {
        let requested = Duration::from_millis(millis);
        session.set_exposure(requested).unwrap();
        // The mock stores exposure exactly; quantization tolerance is zero.
        assert_eq!(session.exposure().unwrap(), requested);
    }
}

#[test]
fn test_gain_round_trip_and_device_clamp() {
    init_tracing();
    let driver = Arc::new(MockCamera::new());
    let mut session = CameraSession::open(driver, SessionConfig::default()).unwrap();

    session.set_gain_db(6.5).unwrap();
    assert_eq!(session.gain_db().unwrap(), 6.5);

    // Out-of-range values are clamped by the device, not by this layer.
    session.set_gain_db(30.0).unwrap();
    assert_eq!(session.gain_db().unwrap(), 24.0);
}

#[test]
fn test_configured_gain_is_applied_at_construction() {
    init_tracing();
    let driver = Arc::new(MockCamera::new());
    let mut config = SessionConfig::default();
    config.gain_db = 12.0;
    let session = CameraSession::open(driver.clone(), config).unwrap();
    assert_eq!(session.gain_db().unwrap(), 12.0);

    let applied = driver.applied_settings("HS500-0001").unwrap();
    assert_eq!(applied.gain_db, 12.0);
    assert!(!applied.auto_exposure_gain);
}
