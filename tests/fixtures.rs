#![allow(dead_code)]
use std::path::PathBuf;

use std::sync::Once;

static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .is_test(true)
            .init();
    });
}

pub fn samples_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("samples")
        .canonicalize()
        .unwrap()
}

pub fn info_sample() -> PathBuf {
    samples_dir().join("info.xml")
}

pub fn check_events_ok_sample() -> PathBuf {
    samples_dir().join("check-events-ok.xml")
}

pub fn check_events_invalid_sample() -> PathBuf {
    samples_dir().join("check-events-invalid.xml")
}

pub fn model_data_sample() -> PathBuf {
    samples_dir().join("model-data.xml")
}

pub fn sessions_sample() -> PathBuf {
    samples_dir().join("sessions.xml")
}

pub fn truncated_model_data_sample() -> PathBuf {
    samples_dir().join("model-data-truncated.xml")
}

pub fn unknown_root_sample() -> PathBuf {
    samples_dir().join("daemon-status.xml")
}
