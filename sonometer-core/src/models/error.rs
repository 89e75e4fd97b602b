use thiserror::Error;

/// Errors raised by the acquisition engine and the control surface.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SonometerError {
    #[error("a stream is already active")]
    AlreadyStreaming,

    #[error("no active stream")]
    NotStreaming,

    #[error("busy: {0}")]
    Busy(String),

    #[error("timed out waiting for the callback lock")]
    Timeout,

    #[error("sampling interval {0} s is below the minimum of {1} s")]
    InvalidInterval(f64, f64),

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("invalid device: {0}")]
    InvalidDevice(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("driver error: {0}")]
    Driver(String),

    #[error("storage error: {0}")]
    StorageError(String),
}
