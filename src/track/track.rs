use crate::track::track_kind::TrackKind;

/// Registry generated track id, `<kind>-<n>`, e.g. `video-1`.
pub type TrackId = String;
/// Caller chosen stream id, carried in `a=msid`.
pub type StreamId = String;

/// A local media track.
///
/// Tracks are created and owned by a [`TrackRegistry`](crate::track::TrackRegistry);
/// callers get clones through `list_tracks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    id: TrackId,
    kind: TrackKind,
    enabled: bool,
    stream_id: StreamId,
    /// Capture device feeding this track, when it was added from one.
    device_id: Option<String>,
}

impl Track {
    pub(crate) fn new(id: TrackId, kind: TrackKind, stream_id: StreamId) -> Self {
        Self {
            id,
            kind,
            enabled: true,
            stream_id,
            device_id: None,
        }
    }

    /// Unique id within the owning registry. Never reused.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Muted tracks stay negotiated; only the media flow is affected.
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Capture device feeding the track, if it was added from one.
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_device_id(&mut self, device_id: Option<String>) {
        self.device_id = device_id;
    }
}
