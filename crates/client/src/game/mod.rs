mod bot;
mod controller;
mod playback;
mod sounds;

pub use bot::Bot;
pub use controller::{ControllerEvent, ControllerMode};
pub use playback::Playback;
pub use sounds::{SoundCue, SoundDetector, server_cues};
