use crate::{config::MediaConfig, track::TrackKind};

/// Tells which track kinds can be encoded. Encoding itself lives elsewhere.
pub trait CodecFactory: Send + Sync {
    fn supports(&self, kind: TrackKind) -> bool;

    /// Codec name advertised for `kind`, if supported.
    fn codec_name(&self, kind: TrackKind) -> Option<&'static str>;
}

/// Factory advertising VP8 video and Opus audio for the enabled kinds.
#[derive(Debug, Clone)]
pub struct BuiltinCodecFactory {
    enabled: Vec<TrackKind>,
}

impl BuiltinCodecFactory {
    pub fn new(enabled: Vec<TrackKind>) -> Self {
        Self { enabled }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(config.enabled_kinds.clone())
    }
}

impl Default for BuiltinCodecFactory {
    fn default() -> Self {
        Self::from_config(&MediaConfig::default())
    }
}

impl CodecFactory for BuiltinCodecFactory {
    fn supports(&self, kind: TrackKind) -> bool {
        self.enabled.contains(&kind)
    }

    fn codec_name(&self, kind: TrackKind) -> Option<&'static str> {
        if !self.supports(kind) {
            return None;
        }
        Some(match kind {
            TrackKind::Audio => "opus",
            TrackKind::Video => "VP8",
        })
    }
}
