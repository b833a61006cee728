use serde::{Deserialize, Serialize};

use crate::{ice::candidate_line::CandidateLine, rtc_error::RtcError};

/// A candidate as exchanged over signaling:
/// `{"candidate": "...", "sdpMid": "0", "sdpMLineIndex": 0}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    candidate: String,
    #[serde(default)]
    sdp_mid: String,
    #[serde(rename = "sdpMLineIndex")]
    sdp_mline_index: u32,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>, sdp_mid: impl Into<String>, sdp_mline_index: u32) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: sdp_mid.into(),
            sdp_mline_index,
        }
    }

    /// Opaque connectivity string.
    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    /// Empty when the sender only gave the m-line index.
    pub fn sdp_mid(&self) -> &str {
        &self.sdp_mid
    }

    pub const fn sdp_mline_index(&self) -> u32 {
        self.sdp_mline_index
    }

    /// The connectivity string in structured form, when it follows the
    /// `a=candidate` grammar.
    pub fn parsed(&self) -> Option<CandidateLine> {
        self.candidate.parse().ok()
    }

    #[must_use]
    pub(crate) fn with_mid(mut self, sdp_mid: &str) -> Self {
        sdp_mid.clone_into(&mut self.sdp_mid);
        self
    }

    /// # Errors
    /// `RtcError::MalformedDescription` if serialization fails.
    pub fn to_json(&self) -> Result<String, RtcError> {
        serde_json::to_string(self).map_err(|e| RtcError::MalformedDescription(e.to_string()))
    }

    /// # Errors
    /// `RtcError::MalformedDescription` for invalid JSON.
    pub fn from_json(json: &str) -> Result<Self, RtcError> {
        serde_json::from_str(json)
            .map_err(|e| RtcError::MalformedDescription(format!("invalid candidate JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn json_uses_browser_field_names() {
        let c = IceCandidate::new("candidate:1 1 udp 5 10.0.0.1 9 typ host", "0", 0);
        let json = c.to_json().unwrap();
        assert!(json.contains("\"sdpMid\":\"0\""));
        assert!(json.contains("\"sdpMLineIndex\":0"));
        assert_eq!(IceCandidate::from_json(&json).unwrap(), c);
    }

    #[test]
    fn missing_mid_defaults_to_empty() {
        let c = IceCandidate::from_json(r#"{"candidate":"opaque","sdpMLineIndex":1}"#).unwrap();
        assert_eq!(c.sdp_mid(), "");
        assert_eq!(c.sdp_mline_index(), 1);
        assert!(c.parsed().is_none());
    }

    #[test]
    fn negative_index_is_rejected() {
        assert!(IceCandidate::from_json(r#"{"candidate":"x","sdpMid":"0","sdpMLineIndex":-1}"#).is_err());
    }
}
