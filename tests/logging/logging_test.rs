//! Tests for `src/logging.rs`.

use hirebot::logging::{masked_phone, LoggingGuard};

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_production_creates_logs_dir() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("logs");
    assert!(!logs_dir.exists());

    // The global subscriber can be installed once per process, so only the
    // directory is checked.
    let _result = hirebot::logging::init_production(&logs_dir);
    assert!(logs_dir.exists(), "logs directory should be created");
}

#[test]
fn init_cli_twice_is_harmless() {
    hirebot::logging::init_cli();
    hirebot::logging::init_cli();
}

#[test]
fn masked_phone_ignores_formatting() {
    assert_eq!(masked_phone("(555) 123-4567"), "***4567");
}
