//! Domain types shared by the player and its collaborators

mod engine;
mod ids;
mod playback_data;
mod preferences;
mod track;

pub use engine::{EngineEvent, ProcessingState};
pub use ids::{CollectionId, TrackId};
pub use playback_data::{PlaybackData, StreamFormat, VALIDITY_SAFETY_MARGIN};
pub use preferences::{AudioQuality, LoopMode};
pub use track::Track;
