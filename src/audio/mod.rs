//! Audio module for decoding and playing back recordings.
//!
//! Playback goes to the default output device through cpal (with rubato resampling)
//! or to `ffplay`; WAV decoding and exact durations come from hound.

mod clip;
mod playback;

pub use clip::wav_duration;
pub use playback::{CommandPlayer, DevicePlayer, Playback, QuietPlayback};
