use crate::{
    rtc_error::RtcError,
    track::{
        stream::Stream,
        track::{Track, TrackId},
        track_kind::TrackKind,
    },
};

/// Owns the local tracks of one peer connection.
///
/// Tracks are kept in insertion order, which is the order the negotiator
/// lays out new media sections in. Ids are never reused, even after removal.
#[derive(Debug, Default)]
pub struct TrackRegistry {
    tracks: Vec<Track>,
    streams: Vec<Stream>,
    next_id: u64,
}

impl TrackRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a track of `kind` and appends it to `stream_id`, creating the
    /// stream if it does not exist yet.
    ///
    /// # Parameters
    /// - `kind`: audio or video.
    /// - `stream_id`: stream the track joins.
    ///
    /// # Example
    /// ```rust
    /// use peerlink::{TrackKind, track::TrackRegistry};
    ///
    /// let mut reg = TrackRegistry::new();
    /// let video = reg.add_track(TrackKind::Video, "cam");
    /// let audio = reg.add_track(TrackKind::Audio, "cam");
    /// assert_eq!(reg.stream("cam").unwrap().track_ids(), [video, audio]);
    /// ```
    pub fn add_track(&mut self, kind: TrackKind, stream_id: &str) -> TrackId {
        self.next_id += 1;
        let id = format!("{kind}-{}", self.next_id);

        match self.streams.iter_mut().find(|s| s.id() == stream_id) {
            Some(stream) => stream.push(id.clone()),
            None => {
                let mut stream = Stream::new(stream_id.to_owned());
                stream.push(id.clone());
                self.streams.push(stream);
            }
        }
        self.tracks
            .push(Track::new(id.clone(), kind, stream_id.to_owned()));
        id
    }

    /// Same as [`add_track`](Self::add_track) with the kind given as text.
    ///
    /// # Errors
    /// `RtcError::InvalidKind` if `kind` is neither `"audio"` nor `"video"`.
    pub fn add_track_str(&mut self, kind: &str, stream_id: &str) -> Result<TrackId, RtcError> {
        let kind: TrackKind = kind.parse()?;
        Ok(self.add_track(kind, stream_id))
    }

    /// Detaches the track from its stream and destroys it. A stream left
    /// without tracks is dropped as well.
    ///
    /// # Errors
    /// `RtcError::NotFound` if no track has this id.
    pub fn remove_track(&mut self, track_id: &str) -> Result<Track, RtcError> {
        let idx = self
            .tracks
            .iter()
            .position(|t| t.id() == track_id)
            .ok_or_else(|| RtcError::NotFound(format!("track '{track_id}'")))?;
        let track = self.tracks.remove(idx);

        if let Some(stream) = self
            .streams
            .iter_mut()
            .find(|s| s.id() == track.stream_id())
        {
            stream.detach(track_id);
        }
        self.streams.retain(|s| !s.is_empty());
        Ok(track)
    }

    /// Enables or mutes a track without renegotiating.
    ///
    /// # Errors
    /// `RtcError::NotFound` if no track has this id.
    pub fn set_enabled(&mut self, track_id: &str, enabled: bool) -> Result<(), RtcError> {
        self.get_mut(track_id)?.set_enabled(enabled);
        Ok(())
    }

    pub(crate) fn set_device(&mut self, track_id: &str, device_id: &str) -> Result<(), RtcError> {
        self.get_mut(track_id)?
            .set_device_id(Some(device_id.to_owned()));
        Ok(())
    }

    /// Tracks in insertion order.
    pub fn list_tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Owned copy of the current track list, taken once per description.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Track> {
        self.tracks.clone()
    }

    pub fn get(&self, track_id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id() == track_id)
    }

    pub fn stream(&self, stream_id: &str) -> Option<&Stream> {
        self.streams.iter().find(|s| s.id() == stream_id)
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Releases every track and stream.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.streams.clear();
    }

    fn get_mut(&mut self, track_id: &str) -> Result<&mut Track, RtcError> {
        self.tracks
            .iter_mut()
            .find(|t| t.id() == track_id)
            .ok_or_else(|| RtcError::NotFound(format!("track '{track_id}'")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn add_track_creates_stream_and_keeps_order() {
        let mut reg = TrackRegistry::new();
        let v = reg.add_track(TrackKind::Video, "s1");
        let a = reg.add_track(TrackKind::Audio, "s1");
        let b = reg.add_track(TrackKind::Audio, "s2");

        let ids: Vec<&str> = reg.list_tracks().iter().map(Track::id).collect();
        assert_eq!(ids, vec![v.as_str(), a.as_str(), b.as_str()]);
        assert_eq!(reg.streams().len(), 2);
        assert_eq!(reg.stream("s1").unwrap().track_ids(), [v.clone(), a.clone()]);
        assert_eq!(reg.get(&b).unwrap().stream_id(), "s2");
        assert!(reg.get(&v).unwrap().enabled());
    }

    #[test]
    fn add_track_str_rejects_unknown_kind() {
        let mut reg = TrackRegistry::new();
        assert_eq!(
            reg.add_track_str("screen", "s1"),
            Err(RtcError::InvalidKind("screen".into()))
        );
        assert!(reg.is_empty());
        assert!(reg.streams().is_empty());
    }

    #[test]
    fn remove_track_detaches_from_stream() {
        let mut reg = TrackRegistry::new();
        let v = reg.add_track(TrackKind::Video, "s1");
        let a = reg.add_track(TrackKind::Audio, "s1");

        let removed = reg.remove_track(&v).unwrap();
        assert_eq!(removed.kind(), TrackKind::Video);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.stream("s1").unwrap().track_ids(), [a.clone()]);

        reg.remove_track(&a).unwrap();
        assert!(reg.stream("s1").is_none(), "empty stream should be dropped");
    }

    #[test]
    fn remove_unknown_track_is_not_found() {
        let mut reg = TrackRegistry::new();
        reg.add_track(TrackKind::Audio, "s1");
        assert!(matches!(
            reg.remove_track("video-99"),
            Err(RtcError::NotFound(_))
        ));
        assert_eq!(reg.len(), 1, "failed removal must leave other tracks alone");
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let mut reg = TrackRegistry::new();
        let first = reg.add_track(TrackKind::Audio, "s1");
        reg.remove_track(&first).unwrap();
        let second = reg.add_track(TrackKind::Audio, "s1");
        assert_ne!(first, second);
    }

    #[test]
    fn set_enabled_toggles_flag() {
        let mut reg = TrackRegistry::new();
        let a = reg.add_track(TrackKind::Audio, "s1");
        reg.set_enabled(&a, false).unwrap();
        assert!(!reg.get(&a).unwrap().enabled());
        assert!(matches!(
            reg.set_enabled("nope", true),
            Err(RtcError::NotFound(_))
        ));
    }

    proptest! {
        #[test]
        fn list_tracks_preserves_insertion_order_with_unique_ids(
            ops in proptest::collection::vec((any::<bool>(), 0u8..4), 0..64)
        ) {
            let mut reg = TrackRegistry::new();
            let mut expected = Vec::new();
            for (is_video, stream) in ops {
                let kind = if is_video { TrackKind::Video } else { TrackKind::Audio };
                expected.push(reg.add_track(kind, &format!("s{stream}")));
            }

            let listed: Vec<String> = reg.list_tracks().iter().map(|t| t.id().to_owned()).collect();
            prop_assert_eq!(&listed, &expected);

            let unique: HashSet<&String> = listed.iter().collect();
            prop_assert_eq!(unique.len(), listed.len());
        }
    }
}
