use std::fmt;

use crate::negotiation::SdpType;

/// Which side a description being applied belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionSide {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignalingState {
    #[default]
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Closed,
}

impl SignalingState {
    /// State reached by applying a description of `sdp_type` on `side`, or
    /// `None` when that transition is not legal from `self`.
    pub const fn next(self, side: DescriptionSide, sdp_type: SdpType) -> Option<Self> {
        use DescriptionSide::{Local, Remote};
        use SignalingState::{Closed, HaveLocalOffer, HaveRemoteOffer, Stable};

        match (self, side, sdp_type) {
            (Closed, _, _) | (_, _, SdpType::Pranswer) => None,
            (Stable | HaveLocalOffer, Local, SdpType::Offer) => Some(HaveLocalOffer),
            (HaveRemoteOffer, Local, SdpType::Answer) => Some(Stable),
            (Stable | HaveRemoteOffer, Remote, SdpType::Offer) => Some(HaveRemoteOffer),
            (HaveLocalOffer, Remote, SdpType::Answer) => Some(Stable),
            (HaveLocalOffer | HaveRemoteOffer, _, SdpType::Rollback) => Some(Stable),
            _ => None,
        }
    }

    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stable => "stable",
            Self::HaveLocalOffer => "have-local-offer",
            Self::HaveRemoteOffer => "have-remote-offer",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}
