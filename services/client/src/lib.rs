pub mod client;
pub mod config;
pub mod playback;

pub use client::{ChatbotClient, RecordStream};
pub use playback::{AudioClip, AudioSink, CommandSink, DirectorySink, PlaybackQueue, run_player};
