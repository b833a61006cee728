use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    ice::IceCandidate,
    negotiation::SessionDescription,
    transport::{
        ice_transport::IceTransport, transport_error::TransportError,
        transport_event::TransportEvent,
    },
};

/// Stands in when no transport is present: gathering finds nothing and every
/// connectivity check fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

#[async_trait]
impl IceTransport for NullTransport {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn gather(
        &self,
        _local: &SessionDescription,
        events: UnboundedSender<TransportEvent>,
    ) -> Result<(), TransportError> {
        events
            .send(TransportEvent::GatheringComplete)
            .map_err(|_| TransportError::Closed)
    }

    async fn try_connect(
        &self,
        _local: &IceCandidate,
        remote: &IceCandidate,
    ) -> Result<(), TransportError> {
        Err(TransportError::Unreachable(remote.candidate().to_owned()))
    }
}
