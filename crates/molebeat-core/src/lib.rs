//! Beat detection and playback synchronization for molebeat.
//!
//! [`OfflineBeatAnalyzer`] turns a decoded buffer into a [`BeatTimeline`] once;
//! [`LiveBeatSynchronizer`] then matches that timeline against the live playback
//! position, one poll per game-loop tick.

pub mod analyzer;
pub mod buffer;
pub mod clock;
pub mod config;
pub mod error;
pub mod spectrum;
pub mod sync;
pub mod ticker;
pub mod timeline;

pub use analyzer::{detect_beats, OfflineBeatAnalyzer};
pub use buffer::AudioBuffer;
pub use clock::{PlaybackClock, WallClock};
pub use config::{AnalysisConfig, BlockPlan};
pub use error::{AnalysisError, BufferError, TimelineError};
pub use spectrum::{SpectralBlock, SpectralTransform};
pub use sync::{BeatEvent, LiveBeatSynchronizer, SyncCursor, Tick, DEFAULT_TRIGGER_WINDOW};
pub use ticker::{drive, BeatDispatcher, PeriodicTicker, Ticker};
pub use timeline::BeatTimeline;
