//! Host audio graph capability.
//!
//! The engine never talks to an audio device directly. A host provides an
//! [`AudioHost`] that opens an [`AudioGraph`]; the graph owns the output clock
//! and turns [`VoiceNode`]s into sound.

use std::future::Future;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::dsp::envelope::{Envelope, Glide};
use crate::dsp::oscillator::Waveform;
use crate::error::AudioError;
use crate::mix::Channel;

/// Power state of an audio graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    Running,
    /// Created but not producing sound until resumed.
    Suspended,
    Closed,
}

/// Sound source feeding a voice.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceSource {
    /// Periodic waveform, optionally gliding to another frequency.
    Periodic {
        waveform: Waveform,
        frequency: f64,
        glide: Option<Glide>,
    },
    /// Raw sample buffer at the graph's sample rate.
    Buffer { samples: Arc<[f32]> },
}

/// One fully described voice: source, gain envelope, and placement on the
/// graph timeline. The graph creates the source and its gain node, connects
/// them to the destination, and starts/stops the source at the given times.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceNode {
    pub source: VoiceSource,
    pub envelope: Envelope,
    /// Start time on the graph clock, in seconds.
    pub start: f64,
    /// Length in seconds.
    pub duration: f64,
    pub channel: Channel,
}

impl VoiceNode {
    /// Effective amplitude the envelope peaks at.
    pub fn peak_amplitude(&self) -> f64 {
        self.envelope.peak()
    }

    /// Base frequency for periodic voices.
    pub fn frequency(&self) -> Option<f64> {
        match &self.source {
            VoiceSource::Periodic { frequency, .. } => Some(*frequency),
            VoiceSource::Buffer { .. } => None,
        }
    }

    /// Waveform for periodic voices.
    pub fn waveform(&self) -> Option<Waveform> {
        match &self.source {
            VoiceSource::Periodic { waveform, .. } => Some(*waveform),
            VoiceSource::Buffer { .. } => None,
        }
    }

    /// True for buffer voices, which carry noise.
    pub fn is_noise(&self) -> bool {
        matches!(self.source, VoiceSource::Buffer { .. })
    }
}

/// An open audio output graph.
pub trait AudioGraph: Send + 'static {
    /// Current time of the output clock, in seconds.
    fn current_time(&self) -> f64;

    fn sample_rate(&self) -> u32;

    fn state(&self) -> GraphState;

    /// Resume a suspended graph. Sound cannot be produced until this completes.
    fn resume(&mut self) -> impl Future<Output = Result<(), AudioError>> + Send;

    /// Start a voice. Voices mix additively; there is no cap on how many run at once.
    fn start_voice(&mut self, voice: VoiceNode);

    /// Release the graph. Further voices are dropped.
    fn close(&mut self);
}

/// Factory for audio graphs, supplied by the host environment.
pub trait AudioHost: Send + Sync + 'static {
    type Graph: AudioGraph;

    /// Acquire a graph. Failure means audio is unavailable on this host.
    fn open(&self, config: &EngineConfig) -> Result<Self::Graph, AudioError>;
}
