//! Media collaborators: capture devices and codec availability.

pub mod capture_provider;
pub mod codec_factory;
pub mod device_info;
pub mod media_error;
pub mod synthetic_capture;

pub use capture_provider::{CaptureHandle, CaptureProvider};
pub use codec_factory::{BuiltinCodecFactory, CodecFactory};
pub use device_info::DeviceInfo;
pub use media_error::MediaError;
pub use synthetic_capture::SyntheticCaptureProvider;
