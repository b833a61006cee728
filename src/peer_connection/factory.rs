use std::sync::Arc;

use crate::{
    config::RtcConfiguration,
    log::LogSink,
    media::{
        BuiltinCodecFactory, CaptureHandle, CaptureProvider, CodecFactory, DeviceInfo,
        SyntheticCaptureProvider,
    },
    peer_connection::peer_connection::PeerConnection,
    rtc_error::RtcError,
    sink_info,
    transport::{self, IceTransport},
};

/// Holds the collaborators shared by every connection it creates: capture
/// provider, codec factory, transport and log sink.
#[derive(Clone)]
pub struct PeerConnectionFactory {
    log: Arc<dyn LogSink>,
    transport: Arc<dyn IceTransport>,
    capture: Arc<dyn CaptureProvider>,
    codecs: Arc<dyn CodecFactory>,
}

impl PeerConnectionFactory {
    /// Creates a factory from explicit collaborators.
    ///
    /// # Parameters
    /// - `log`: sink shared by the factory and every connection.
    /// - `transport`: gathers candidates and runs connectivity checks.
    /// - `capture`: source of devices for `add_track_from_device`.
    /// - `codecs`: decides which track kinds may be added.
    pub fn new(
        log: Arc<dyn LogSink>,
        transport: Arc<dyn IceTransport>,
        capture: Arc<dyn CaptureProvider>,
        codecs: Arc<dyn CodecFactory>,
    ) -> Self {
        Self {
            log,
            transport,
            capture,
            codecs,
        }
    }

    /// Transport and codecs picked from `config`, synthetic capture devices.
    pub fn from_config(config: &RtcConfiguration, log: Arc<dyn LogSink>) -> Self {
        Self::new(
            log,
            transport::from_config(&config.transport),
            Arc::new(SyntheticCaptureProvider::new()),
            Arc::new(BuiltinCodecFactory::from_config(&config.media)),
        )
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn IceTransport>) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn with_capture_provider(mut self, capture: Arc<dyn CaptureProvider>) -> Self {
        self.capture = capture;
        self
    }

    pub fn transport(&self) -> &Arc<dyn IceTransport> {
        &self.transport
    }

    pub fn list_devices(&self) -> Vec<DeviceInfo> {
        self.capture.list_devices()
    }

    /// Starts a capture outside any connection.
    ///
    /// # Errors
    /// `RtcError::Media` when the device is unknown or fails to start.
    pub fn start_capture(&self, device_id: &str) -> Result<CaptureHandle, RtcError> {
        let handle = self.capture.start_capture(device_id)?;
        sink_info!(self.log, "[MEDIA] capture started on '{device_id}'");
        Ok(handle)
    }

    /// Creates a connection in `Stable`/`New`/`New` with no tracks.
    ///
    /// # Errors
    /// `RtcError::Config` for an invalid configuration or when called outside
    /// a tokio runtime.
    pub fn create_peer_connection(
        &self,
        config: RtcConfiguration,
    ) -> Result<PeerConnection, RtcError> {
        PeerConnection::new(
            config,
            Arc::clone(&self.log),
            Arc::clone(&self.transport),
            Arc::clone(&self.capture),
            Arc::clone(&self.codecs),
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::{
        log::{LogLevel, MemoryLogSink, NoopLogSink},
        media::synthetic_capture::SYNTHETIC_CAMERA_ID,
        peer_connection::{IceGatheringState, PeerConnectionState, SignalingState},
        track::TrackKind,
    };

    fn factory() -> PeerConnectionFactory {
        PeerConnectionFactory::from_config(&RtcConfiguration::default(), Arc::new(NoopLogSink))
    }

    #[tokio::test]
    async fn new_connection_starts_stable_and_empty() {
        let pc = factory()
            .create_peer_connection(RtcConfiguration::default())
            .unwrap();
        assert_eq!(pc.signaling_state(), SignalingState::Stable);
        assert_eq!(pc.connection_state(), PeerConnectionState::New);
        assert_eq!(pc.ice_gathering_state(), IceGatheringState::New);
        assert!(pc.list_tracks().is_empty());
        assert!(pc.local_description().await.is_none());
    }

    #[test]
    fn requires_a_runtime() {
        let err = factory()
            .create_peer_connection(RtcConfiguration::default())
            .err()
            .unwrap();
        assert!(matches!(err, RtcError::Config(_)));
    }

    #[tokio::test]
    async fn rejects_invalid_configuration() {
        let mut config = RtcConfiguration::default();
        config.ice.max_pairs = 0;
        let err = factory().create_peer_connection(config).err().unwrap();
        assert!(matches!(err, RtcError::Config(_)));
    }

    #[tokio::test]
    async fn unsupported_kinds_are_refused() {
        let mut config = RtcConfiguration::default();
        config.media.enabled_kinds = vec![TrackKind::Audio];
        let pc = PeerConnectionFactory::from_config(&config, Arc::new(NoopLogSink))
            .create_peer_connection(config)
            .unwrap();
        assert_eq!(
            pc.add_track(TrackKind::Video, "s"),
            Err(RtcError::UnsupportedKind(TrackKind::Video))
        );
        assert!(pc.add_track(TrackKind::Audio, "s").is_ok());
    }

    #[test]
    fn start_capture_logs_and_returns_active_handle() {
        let sink = Arc::new(MemoryLogSink::new());
        let factory =
            PeerConnectionFactory::from_config(&RtcConfiguration::default(), sink.clone());
        assert!(!factory.list_devices().is_empty());

        let handle = factory.start_capture(SYNTHETIC_CAMERA_ID).unwrap();
        assert!(handle.is_active());
        assert!(sink.contains(LogLevel::Info, "capture started"));
        assert!(factory.start_capture("nope").is_err());
    }
}
