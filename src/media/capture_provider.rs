use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::{
    log::log_msg::now_millis,
    media::{device_info::DeviceInfo, media_error::MediaError},
    track::TrackKind,
};

/// Source of local media. Hardware access lives behind this trait.
pub trait CaptureProvider: Send + Sync {
    fn list_devices(&self) -> Vec<DeviceInfo>;

    /// # Errors
    /// `MediaError::DeviceNotFound` for an unknown id, `CaptureFailed` when
    /// the device cannot be opened.
    fn start_capture(&self, device_id: &str) -> Result<CaptureHandle, MediaError>;

    fn find_device(&self, device_id: &str) -> Option<DeviceInfo> {
        self.list_devices().into_iter().find(|d| d.id == device_id)
    }
}

/// A running capture. Stopping it, or dropping every clone, ends the capture.
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    device_id: String,
    kind: TrackKind,
    started_at_ms: u128,
    active: Arc<AtomicBool>,
}

impl CaptureHandle {
    pub fn new(device_id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            device_id: device_id.into(),
            kind,
            started_at_ms: now_millis(),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub const fn kind(&self) -> TrackKind {
        self.kind
    }

    pub const fn started_at_ms(&self) -> u128 {
        self.started_at_ms
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}
