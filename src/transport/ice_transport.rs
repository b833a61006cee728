use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    ice::IceCandidate,
    negotiation::SessionDescription,
    transport::{transport_error::TransportError, transport_event::TransportEvent},
};

/// Transport / ICE agent collaborator.
///
/// `gather` discovers local candidates for the sections of `local` and reports
/// them on `events`, finishing with [`TransportEvent::GatheringComplete`]. Later
/// link changes are reported on the same channel for as long as it is open.
#[async_trait]
pub trait IceTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn gather(
        &self,
        local: &SessionDescription,
        events: UnboundedSender<TransportEvent>,
    ) -> Result<(), TransportError>;

    /// Runs one connectivity check between a local and a remote candidate.
    async fn try_connect(
        &self,
        local: &IceCandidate,
        remote: &IceCandidate,
    ) -> Result<(), TransportError>;
}
