//! Procedural audio for the strategy game: every sound effect and the
//! background music are synthesized at runtime, no audio assets are loaded.
//!
//! Construct a [`SoundEngine`] over an [`AudioHost`], call
//! [`SoundEngine::initialize`] after the first user interaction, then fire
//! effects from game events.

pub mod config;
pub mod dsp;
pub mod effects;
pub mod engine;
pub mod error;
pub mod graph;
pub mod mix;
pub mod offline;
pub mod scheduler;
pub mod score;
pub mod sequencer;
pub mod synth;

pub use config::EngineConfig;
pub use dsp::oscillator::Waveform;
pub use effects::SoundEffect;
pub use engine::SoundEngine;
pub use error::AudioError;
pub use graph::{AudioGraph, AudioHost, GraphState, VoiceNode, VoiceSource};
pub use mix::{Channel, MixState};
pub use offline::OfflineHost;
pub use score::{BATTLE_THEME, MelodyNote, MelodyScore};
pub use sequencer::RunState;
pub use synth::{GlideConfig, NoiseConfig, VoiceConfig};

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

