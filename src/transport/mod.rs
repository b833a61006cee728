//! Transport / ICE agent collaborators, selected from configuration.

pub mod ice_transport;
pub mod loopback_transport;
pub mod null_transport;
pub mod transport_error;
pub mod transport_event;

use std::{sync::Arc, time::Duration};

pub use ice_transport::IceTransport;
pub use loopback_transport::LoopbackTransport;
pub use null_transport::NullTransport;
pub use transport_error::TransportError;
pub use transport_event::TransportEvent;

use crate::config::{TransportConfig, TransportMode};

/// Builds the transport named by `config.mode`.
pub fn from_config(config: &TransportConfig) -> Arc<dyn IceTransport> {
    match config.mode {
        TransportMode::Loopback => Arc::new(LoopbackTransport::new(Duration::from_millis(
            config.connect_delay_ms,
        ))),
        TransportMode::None => Arc::new(NullTransport),
    }
}
