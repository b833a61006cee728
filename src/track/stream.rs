use crate::track::track::{StreamId, TrackId};

/// A named group of tracks; new tracks are appended at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    id: StreamId,
    track_ids: Vec<TrackId>,
}

impl Stream {
    pub(crate) fn new(id: StreamId) -> Self {
        Self {
            id,
            track_ids: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Member tracks in the order they were added.
    pub fn track_ids(&self) -> &[TrackId] {
        &self.track_ids
    }

    pub(crate) fn push(&mut self, track_id: TrackId) {
        self.track_ids.push(track_id);
    }

    /// Detaches `track_id`; the remaining ids keep their order.
    pub(crate) fn detach(&mut self, track_id: &str) -> bool {
        let before = self.track_ids.len();
        self.track_ids.retain(|t| t != track_id);
        self.track_ids.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.track_ids.is_empty()
    }
}
