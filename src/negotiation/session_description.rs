use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    negotiation::{direction::Direction, media_section::MediaSection, sdp_type::SdpType},
    rtc_error::RtcError,
    sdp::{
        Sdp,
        addr_type::AddrType,
        attribute::Attribute,
        connection::Connection,
        media::{Media, MediaKind},
        origin::Origin,
    },
    track::TrackKind,
};

const DEFAULT_PORT: u16 = 9;
const REJECTED_PORT: u16 = 0;
const DEFAULT_PROTO: &str = "UDP/TLS/RTP/SAVPF";
const DEFAULT_NET_TYPE: &str = "IN";
const DEFAULT_CONN_ADDR: &str = "0.0.0.0";
const SESSION_NAME: &str = "-";
const FINGERPRINT_ALGORITHM: &str = "sha-256";
const VIDEO_PAYLOAD: (&str, &str) = ("96", "96 VP8/90000");
const AUDIO_PAYLOAD: (&str, &str) = ("111", "111 opus/48000/2");

/// JSON signaling form of a description: `{"type": "offer", "sdp": "v=0..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptionInit {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    #[serde(default)]
    pub sdp: String,
}

/// An immutable offer, answer, provisional answer or rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    sdp_type: SdpType,
    session_id: u64,
    session_version: u64,
    sections: Vec<MediaSection>,
}

impl SessionDescription {
    pub const fn new(sdp_type: SdpType, sections: Vec<MediaSection>) -> Self {
        Self {
            sdp_type,
            session_id: 0,
            session_version: 0,
            sections,
        }
    }

    /// A rollback request. It carries no sections.
    pub const fn rollback() -> Self {
        Self::new(SdpType::Rollback, Vec::new())
    }

    #[must_use]
    pub(crate) fn with_session(mut self, session_id: u64, session_version: u64) -> Self {
        self.session_id = session_id;
        self.session_version = session_version;
        self
    }

    pub const fn sdp_type(&self) -> SdpType {
        self.sdp_type
    }

    pub fn sections(&self) -> &[MediaSection] {
        &self.sections
    }

    pub fn section(&self, mid: &str) -> Option<&MediaSection> {
        self.sections.iter().find(|s| s.mid() == mid)
    }

    pub fn mids(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(MediaSection::mid)
    }

    pub const fn session_version(&self) -> u64 {
        self.session_version
    }

    /// ICE username fragment of the first section, if any.
    pub fn ice_ufrag(&self) -> Option<&str> {
        self.sections.first().map(MediaSection::ice_ufrag)
    }

    /// Rejects duplicate mids.
    pub(crate) fn check_unique_mids(&self) -> Result<(), RtcError> {
        let mut seen = HashSet::new();
        for mid in self.mids() {
            if !seen.insert(mid) {
                return Err(RtcError::MalformedDescription(format!(
                    "duplicate mid '{mid}'"
                )));
            }
        }
        Ok(())
    }

    /// Rejects descriptions with no sections or duplicate mids.
    pub(crate) fn check_sections(&self) -> Result<(), RtcError> {
        if self.sections.is_empty() {
            return Err(RtcError::MalformedDescription(format!(
                "{} has no media sections",
                self.sdp_type
            )));
        }
        self.check_unique_mids()
    }

    /// Checks that `self` answers `offer`: same mids and kinds in the same order.
    pub(crate) fn check_answers(&self, offer: &Self) -> Result<(), RtcError> {
        let shape = |d: &Self| {
            d.sections
                .iter()
                .map(|s| (s.mid().to_owned(), s.kind()))
                .collect::<Vec<_>>()
        };
        if shape(self) == shape(offer) {
            return Ok(());
        }
        Err(RtcError::MalformedDescription(format!(
            "answer mids [{}] do not match offer mids [{}]",
            self.mids().collect::<Vec<_>>().join(", "),
            offer.mids().collect::<Vec<_>>().join(", ")
        )))
    }

    /// Renders SDP text. A rollback renders as an empty string.
    pub fn to_sdp(&self) -> String {
        if self.sdp_type == SdpType::Rollback {
            return String::new();
        }
        let mut sdp = Sdp::new(
            Origin::anonymous(self.session_id, self.session_version),
            SESSION_NAME,
        );
        if !self.sections.is_empty() {
            let mids: Vec<&str> = self.mids().collect();
            sdp.attrs
                .push(Attribute::new("group", format!("BUNDLE {}", mids.join(" "))));
        }
        let setup = if self.sdp_type == SdpType::Offer {
            "actpass"
        } else {
            "active"
        };
        sdp.media = self
            .sections
            .iter()
            .map(|s| section_to_media(s, setup))
            .collect();
        sdp.encode()
    }

    /// Parses SDP text produced by [`to_sdp`](Self::to_sdp) or by another
    /// endpoint speaking the same subset.
    ///
    /// # Errors
    /// `RtcError::MalformedDescription` when the text is not valid SDP, a
    /// section is neither audio nor video, or lacks a mid or ICE credentials.
    pub fn from_sdp(sdp_type: SdpType, text: &str) -> Result<Self, RtcError> {
        if sdp_type == SdpType::Rollback {
            return Ok(Self::rollback());
        }
        let sdp = Sdp::parse(text)
            .map_err(|e| RtcError::MalformedDescription(format!("invalid SDP: {e}")))?;

        let sections = sdp
            .media
            .iter()
            .enumerate()
            .map(|(idx, m)| media_to_section(&sdp, idx, m))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(sdp_type, sections)
            .with_session(sdp.origin.session_id(), sdp.origin.session_version()))
    }

    pub fn to_init(&self) -> SessionDescriptionInit {
        SessionDescriptionInit {
            sdp_type: self.sdp_type,
            sdp: self.to_sdp(),
        }
    }

    /// # Errors
    /// `RtcError::MalformedDescription` if serialization fails.
    pub fn to_json(&self) -> Result<String, RtcError> {
        serde_json::to_string(&self.to_init())
            .map_err(|e| RtcError::MalformedDescription(e.to_string()))
    }

    /// # Errors
    /// `RtcError::MalformedDescription` for invalid JSON or invalid SDP.
    pub fn from_json(json: &str) -> Result<Self, RtcError> {
        let init: SessionDescriptionInit = serde_json::from_str(json)
            .map_err(|e| RtcError::MalformedDescription(format!("invalid JSON: {e}")))?;
        Self::try_from(init)
    }
}

impl TryFrom<SessionDescriptionInit> for SessionDescription {
    type Error = RtcError;

    fn try_from(init: SessionDescriptionInit) -> Result<Self, Self::Error> {
        Self::from_sdp(init.sdp_type, &init.sdp)
    }
}

const fn payload_for(kind: TrackKind) -> (&'static str, &'static str) {
    match kind {
        TrackKind::Audio => AUDIO_PAYLOAD,
        TrackKind::Video => VIDEO_PAYLOAD,
    }
}

fn section_to_media(section: &MediaSection, setup: &str) -> Media {
    let kind = match section.kind() {
        TrackKind::Audio => MediaKind::Audio,
        TrackKind::Video => MediaKind::Video,
    };
    let port = if section.is_inactive() {
        REJECTED_PORT
    } else {
        DEFAULT_PORT
    };
    let (pt, rtpmap) = payload_for(section.kind());

    let mut media = Media::new(kind, port, DEFAULT_PROTO, vec![pt.to_owned()]);
    media.set_connection(Some(Connection::new(
        DEFAULT_NET_TYPE,
        AddrType::IP4,
        DEFAULT_CONN_ADDR,
    )));
    media.add_attr(Attribute::new("mid", section.mid().to_owned()));
    media.add_attr(Attribute::new("ice-ufrag", section.ice_ufrag().to_owned()));
    media.add_attr(Attribute::new("ice-pwd", section.ice_pwd().to_owned()));
    if !section.fingerprint().is_empty() {
        media.add_attr(Attribute::new(
            "fingerprint",
            format!("{FINGERPRINT_ALGORITHM} {}", section.fingerprint()),
        ));
    }
    media.add_attr(Attribute::new("setup", setup.to_owned()));
    media.add_attr(Attribute::flag(section.direction().as_str()));
    if let (Some(stream), Some(track)) = (section.stream_id(), section.track_id()) {
        media.add_attr(Attribute::new("msid", format!("{stream} {track}")));
    }
    media.add_attr(Attribute::flag("rtcp-mux"));
    media.add_attr(Attribute::new("rtpmap", rtpmap.to_owned()));
    media
}

fn media_to_section(sdp: &Sdp, idx: usize, media: &Media) -> Result<MediaSection, RtcError> {
    let malformed = |what: &str| RtcError::MalformedDescription(format!("section {idx}: {what}"));

    let kind = match media.kind() {
        MediaKind::Audio => TrackKind::Audio,
        MediaKind::Video => TrackKind::Video,
        other => return Err(malformed(&format!("unsupported media kind '{other}'"))),
    };
    let mid = media.attr_value("mid").ok_or_else(|| malformed("missing a=mid"))?;
    let direction = media
        .attrs()
        .iter()
        .find_map(|a| a.key().parse::<Direction>().ok())
        .unwrap_or_default();

    // ICE and fingerprint attributes may sit at session level.
    let lookup = |key: &str| media.attr_value(key).or_else(|| sdp.attr_value(key));
    let ufrag = lookup("ice-ufrag").ok_or_else(|| malformed("missing a=ice-ufrag"))?;
    let pwd = lookup("ice-pwd").ok_or_else(|| malformed("missing a=ice-pwd"))?;
    let fingerprint = lookup("fingerprint")
        .and_then(|v| v.split_once(' '))
        .map_or("", |(_algo, value)| value.trim());

    let mut section =
        MediaSection::new(mid, kind, direction).with_transport(ufrag, pwd, fingerprint);
    if let Some((stream, track)) = media.attr_value("msid").and_then(|v| v.split_once(' ')) {
        section = section.with_track(stream, track);
    }
    Ok(section)
}
