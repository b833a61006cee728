//! Track Registry: local media tracks grouped into streams.

pub mod stream;
#[allow(clippy::module_inception)]
pub mod track;
pub mod track_kind;
pub mod track_registry;

pub use stream::Stream;
pub use track::{Track, TrackId};
pub use track_kind::TrackKind;
pub use track_registry::TrackRegistry;
