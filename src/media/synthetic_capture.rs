use crate::{
    media::{
        capture_provider::{CaptureHandle, CaptureProvider},
        device_info::DeviceInfo,
        media_error::MediaError,
    },
    track::TrackKind,
};

pub const SYNTHETIC_CAMERA_ID: &str = "synthetic-camera-0";
pub const SYNTHETIC_MICROPHONE_ID: &str = "synthetic-mic-0";

/// Capture provider backed by generated media, one camera and one microphone.
#[derive(Debug, Clone)]
pub struct SyntheticCaptureProvider {
    devices: Vec<DeviceInfo>,
}

impl SyntheticCaptureProvider {
    pub fn new() -> Self {
        Self {
            devices: vec![
                DeviceInfo::new(SYNTHETIC_CAMERA_ID, "Synthetic test pattern", TrackKind::Video),
                DeviceInfo::new(SYNTHETIC_MICROPHONE_ID, "Synthetic tone", TrackKind::Audio),
            ],
        }
    }

    /// Provider without devices, as on a machine with no camera or microphone.
    pub fn empty() -> Self {
        Self {
            devices: Vec::new(),
        }
    }
}

impl Default for SyntheticCaptureProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureProvider for SyntheticCaptureProvider {
    fn list_devices(&self) -> Vec<DeviceInfo> {
        self.devices.clone()
    }

    fn start_capture(&self, device_id: &str) -> Result<CaptureHandle, MediaError> {
        let device = self
            .devices
            .iter()
            .find(|d| d.id == device_id)
            .ok_or_else(|| MediaError::DeviceNotFound(device_id.to_owned()))?;
        Ok(CaptureHandle::new(device.id.as_str(), device.kind))
    }
}
