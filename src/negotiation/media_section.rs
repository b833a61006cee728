use serde::{Deserialize, Serialize};

use crate::{
    negotiation::direction::Direction,
    track::{TrackId, TrackKind},
};

/// One media section (`m=` block) of a session description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSection {
    mid: String,
    kind: TrackKind,
    track_id: Option<TrackId>,
    stream_id: Option<String>,
    direction: Direction,
    ice_ufrag: String,
    ice_pwd: String,
    /// `sha-256` fingerprint value, empty when the peer sent none.
    fingerprint: String,
}

impl MediaSection {
    /// Creates a section with no track and empty transport attributes.
    ///
    /// # Parameters
    /// - `mid`: media id; negotiated sections use their index.
    /// - `kind`: audio or video.
    /// - `direction`: direction attribute of the section.
    ///
    /// # Example
    /// ```rust
    /// use peerlink::{TrackKind, negotiation::{Direction, MediaSection}};
    ///
    /// let section = MediaSection::new("0", TrackKind::Video, Direction::SendRecv)
    ///     .with_track("cam", "video-1")
    ///     .with_transport("ufrag", "pwd", "AB:CD");
    /// assert_eq!(section.track_id(), Some("video-1"));
    /// assert!(!section.is_inactive());
    /// ```
    pub fn new(mid: impl Into<String>, kind: TrackKind, direction: Direction) -> Self {
        Self {
            mid: mid.into(),
            kind,
            track_id: None,
            stream_id: None,
            direction,
            ice_ufrag: String::new(),
            ice_pwd: String::new(),
            fingerprint: String::new(),
        }
    }

    /// Attaches the sending track and its stream (`a=msid`).
    #[must_use]
    pub fn with_track(mut self, stream_id: impl Into<String>, track_id: impl Into<String>) -> Self {
        self.stream_id = Some(stream_id.into());
        self.track_id = Some(track_id.into());
        self
    }

    /// Sets the ICE credentials and DTLS fingerprint carried by the section.
    #[must_use]
    pub fn with_transport(
        mut self,
        ice_ufrag: impl Into<String>,
        ice_pwd: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        self.ice_ufrag = ice_ufrag.into();
        self.ice_pwd = ice_pwd.into();
        self.fingerprint = fingerprint.into();
        self
    }

    pub fn mid(&self) -> &str {
        &self.mid
    }

    pub const fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn track_id(&self) -> Option<&str> {
        self.track_id.as_deref()
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref()
    }

    pub const fn direction(&self) -> Direction {
        self.direction
    }

    pub fn ice_ufrag(&self) -> &str {
        &self.ice_ufrag
    }

    pub fn ice_pwd(&self) -> &str {
        &self.ice_pwd
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub const fn is_inactive(&self) -> bool {
        matches!(self.direction, Direction::Inactive)
    }
}
