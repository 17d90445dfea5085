pub mod session;
pub mod sink;
pub mod source;

pub use session::PlaybackSession;
pub use sink::{AudioSink, RodioSink, SinkFactory};
pub use source::{HttpTrackSource, TrackSource};
