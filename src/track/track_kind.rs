use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::rtc_error::RtcError;

/// Kind of a media track.
///
/// Parses from and renders to the lowercase tokens used in SDP and JSON.
///
/// # Example
/// ```rust
/// use peerlink::TrackKind;
///
/// assert_eq!("video".parse::<TrackKind>(), Ok(TrackKind::Video));
/// assert_eq!(TrackKind::Audio.to_string(), "audio");
/// assert!("data".parse::<TrackKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackKind {
    type Err = RtcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            other => Err(RtcError::InvalidKind(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_kinds_only() {
        assert_eq!("audio".parse::<TrackKind>(), Ok(TrackKind::Audio));
        assert_eq!("video".parse::<TrackKind>(), Ok(TrackKind::Video));
        assert_eq!(
            "Video".parse::<TrackKind>(),
            Err(RtcError::InvalidKind("Video".into()))
        );
        assert!("data".parse::<TrackKind>().is_err());
    }
}
