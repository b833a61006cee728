//! Session Description Negotiator: offers, answers and their SDP/JSON forms.

pub mod credentials;
pub mod direction;
pub mod media_section;
pub mod negotiator;
pub mod sdp_type;
pub mod session_description;

pub use credentials::IceCredentials;
pub use direction::Direction;
pub use media_section::MediaSection;
pub use negotiator::{Applied, Negotiator, OfferOptions};
pub use sdp_type::SdpType;
pub use session_description::{SessionDescription, SessionDescriptionInit};
