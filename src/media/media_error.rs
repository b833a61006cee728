use thiserror::Error;

use crate::track::TrackKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("no capture device with id '{0}'")]
    DeviceNotFound(String),
    #[error("device '{device_id}' captures {actual}, not {expected}")]
    KindMismatch {
        device_id: String,
        expected: TrackKind,
        actual: TrackKind,
    },
    #[error("failed to start capture: {0}")]
    CaptureFailed(String),
}
