use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{
        Mutex,
        atomic::{AtomicU16, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    ice::{CandidateLine, IceCandidate},
    negotiation::SessionDescription,
    transport::{
        ice_transport::IceTransport, transport_error::TransportError,
        transport_event::TransportEvent,
    },
};

const FIRST_PORT: u16 = 50_000;
const TRANSPORT_UDP: &str = "udp";
const RTP_COMPONENT: u8 = 1;

/// In-process transport: one host candidate on 127.0.0.1 per section, and
/// checks that succeed for compatible pairs whose remote end is a loopback
/// address.
pub struct LoopbackTransport {
    connect_delay: Duration,
    next_port: AtomicU16,
    links: Mutex<Vec<UnboundedSender<TransportEvent>>>,
}

impl LoopbackTransport {
    pub fn new(connect_delay: Duration) -> Self {
        Self {
            connect_delay,
            next_port: AtomicU16::new(FIRST_PORT),
            links: Mutex::new(Vec::new()),
        }
    }

    /// Reports `sdp_mid` as lost to every connection gathered on this transport.
    pub fn drop_link(&self, sdp_mid: &str) {
        self.broadcast(&TransportEvent::LinkLost {
            sdp_mid: sdp_mid.to_owned(),
        });
    }

    pub fn restore_link(&self, sdp_mid: &str) {
        self.broadcast(&TransportEvent::LinkRestored {
            sdp_mid: sdp_mid.to_owned(),
        });
    }

    pub fn fail_link(&self, sdp_mid: &str) {
        self.broadcast(&TransportEvent::LinkFailed {
            sdp_mid: sdp_mid.to_owned(),
        });
    }

    /// Number of connections still listening for link changes.
    pub fn link_count(&self) -> usize {
        self.links.lock().map_or(0, |links| links.len())
    }

    fn broadcast(&self, event: &TransportEvent) {
        if let Ok(mut links) = self.links.lock() {
            links.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    fn next_address(&self) -> SocketAddr {
        let port = self.next_port.fetch_add(1, Ordering::Relaxed);
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[async_trait]
impl IceTransport for LoopbackTransport {
    fn name(&self) -> &'static str {
        "loopback"
    }

    async fn gather(
        &self,
        local: &SessionDescription,
        events: UnboundedSender<TransportEvent>,
    ) -> Result<(), TransportError> {
        for (index, section) in local.sections().iter().enumerate() {
            let line = CandidateLine::host(self.next_address(), TRANSPORT_UDP, RTP_COMPONENT);
            let index = u32::try_from(index)
                .map_err(|_| TransportError::Gathering("too many media sections".into()))?;
            let candidate = IceCandidate::new(line.to_string(), section.mid(), index);
            events
                .send(TransportEvent::CandidateGathered(candidate))
                .map_err(|_| TransportError::Closed)?;
        }
        events
            .send(TransportEvent::GatheringComplete)
            .map_err(|_| TransportError::Closed)?;
        if let Ok(mut links) = self.links.lock() {
            links.retain(|tx| !tx.is_closed());
            links.push(events);
        }
        Ok(())
    }

    async fn try_connect(
        &self,
        local: &IceCandidate,
        remote: &IceCandidate,
    ) -> Result<(), TransportError> {
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        let (Some(l), Some(r)) = (local.parsed(), remote.parsed()) else {
            return Err(TransportError::Unreachable(remote.candidate().to_owned()));
        };
        if l.compatible_with(&r) && r.address.ip().is_loopback() {
            Ok(())
        } else {
            Err(TransportError::Unreachable(r.address.to_string()))
        }
    }
}
