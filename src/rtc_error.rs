use thiserror::Error;

use crate::{
    config::ConfigError, media::MediaError, negotiation::SdpType,
    peer_connection::SignalingState, signaling::SignalingError, track::TrackKind,
    transport::TransportError,
};

/// Error returned by every public peer connection operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RtcError {
    #[error("{op} not allowed in signaling state {state:?}{}", type_suffix(.sdp_type))]
    InvalidState {
        op: &'static str,
        state: SignalingState,
        sdp_type: Option<SdpType>,
    },
    #[error("{0} not found")]
    NotFound(String),
    #[error("malformed description: {0}")]
    MalformedDescription(String),
    #[error(
        "candidate for sdpMid '{sdp_mid}' / sdpMLineIndex {sdp_mline_index} matches none of the {sections} remote media sections"
    )]
    UnknownMediaSection {
        sdp_mid: String,
        sdp_mline_index: u32,
        sections: usize,
    },
    #[error("peer connection is closed")]
    Closed,
    #[error("invalid track kind '{0}'")]
    InvalidKind(String),
    #[error("no codec available for {0} tracks")]
    UnsupportedKind(TrackKind),
    #[error("media source error: {0}")]
    Media(#[from] MediaError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("signaling error: {0}")]
    Signaling(#[from] SignalingError),
}

fn type_suffix(sdp_type: &Option<SdpType>) -> String {
    sdp_type.map_or_else(String::new, |t| format!(" (description type {t})"))
}

impl From<ConfigError> for RtcError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
