mod clip;
mod player;
mod recorder;

pub use clip::AudioClip;
pub use player::{EffectPlayer, PlaybackSettings, PlaybackState, Selection};
pub use recorder::{Recorder, RecorderSettings, RecordingPhase};
