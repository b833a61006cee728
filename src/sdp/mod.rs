//! SDP (Session Description Protocol) text model.
//!
//! Only the subset needed to carry a negotiated session is modelled:
//! `v=`, `o=`, `s=`, `c=`, `t=`, `m=` and `a=` lines. Anything else is kept
//! verbatim in `extra_lines` so parsing and re-encoding do not lose it.

pub mod addr_type;
pub mod attribute;
pub mod connection;
pub mod media;
pub mod origin;
pub mod sdp_error;
pub mod sdpc;

pub use sdp_error::SdpError;
pub use sdpc::Sdp;
