//! Progress synchronisation for one playback session.

mod session;

pub use session::PlaybackSession;
