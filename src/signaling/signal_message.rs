use serde::{Deserialize, Serialize};

use crate::{
    ice::IceCandidate,
    negotiation::{SessionDescription, SessionDescriptionInit},
    rtc_error::RtcError,
    signaling::signaling_error::SignalingError,
};

/// Body of a relayed message: a description in its `{type, sdp}` form or a
/// candidate in its `{candidate, sdpMid, sdpMLineIndex}` form.
///
/// # Example
/// ```
/// use peerlink::{IceCandidate, signaling::SignalMessage};
///
/// let signal = SignalMessage::from(IceCandidate::new("candidate:1 1 udp 1 127.0.0.1 5000 typ host", "0", 0));
/// let json = signal.to_json().unwrap();
/// assert_eq!(SignalMessage::from_json(&json).unwrap(), signal);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalMessage {
    Description(SessionDescriptionInit),
    Candidate(IceCandidate),
}

impl SignalMessage {
    /// # Errors
    /// `SignalingError::Malformed` if serialization fails.
    pub fn to_json(&self) -> Result<String, SignalingError> {
        serde_json::to_string(self).map_err(|e| SignalingError::Malformed(e.to_string()))
    }

    /// # Errors
    /// `SignalingError::Malformed` for JSON that is neither form.
    pub fn from_json(json: &str) -> Result<Self, SignalingError> {
        serde_json::from_str(json).map_err(|e| SignalingError::Malformed(e.to_string()))
    }

    /// Parses the carried description.
    ///
    /// # Errors
    /// `MalformedDescription` for invalid SDP or a candidate body.
    pub fn into_description(self) -> Result<SessionDescription, RtcError> {
        match self {
            Self::Description(init) => SessionDescription::try_from(init),
            Self::Candidate(_) => Err(RtcError::MalformedDescription(
                "expected a description, got a candidate".into(),
            )),
        }
    }
}

impl From<&SessionDescription> for SignalMessage {
    fn from(desc: &SessionDescription) -> Self {
        Self::Description(desc.to_init())
    }
}

impl From<IceCandidate> for SignalMessage {
    fn from(candidate: IceCandidate) -> Self {
        Self::Candidate(candidate)
    }
}
