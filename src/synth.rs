//! Tone synthesizer: turns voice requests into graph voices.
//!
//! Every call is fire-and-forget: the voice is placed on the graph timeline
//! at the current output time and the call returns immediately. Calls made
//! while the engine is not ready are silent no-ops.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::dsp::envelope::{Envelope, Glide};
use crate::dsp::noise::white_noise;
use crate::dsp::oscillator::Waveform;
use crate::engine::{EngineState, Lifecycle, SoundEngine};
use crate::graph::{AudioGraph, AudioHost, VoiceNode, VoiceSource};
use crate::mix::Channel;

/// A single periodic tone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Frequency in Hz, must be positive.
    pub frequency: f64,
    /// Length in seconds, must be positive.
    pub duration: f64,
    pub waveform: Waveform,
    /// Requested amplitude, clamped to [0, 1].
    pub amplitude: f64,
}

impl VoiceConfig {
    pub const fn new(frequency: f64, duration: f64, waveform: Waveform, amplitude: f64) -> Self {
        VoiceConfig {
            frequency,
            duration,
            waveform,
            amplitude,
        }
    }
}

/// A burst of white noise with an exponential decay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    pub duration: f64,
    pub amplitude: f64,
}

impl NoiseConfig {
    pub const fn new(duration: f64, amplitude: f64) -> Self {
        NoiseConfig {
            duration,
            amplitude,
        }
    }
}

/// A single tone whose frequency slides exponentially over its duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlideConfig {
    pub from: f64,
    pub to: f64,
    pub duration: f64,
    pub waveform: Waveform,
    pub amplitude: f64,
}

impl GlideConfig {
    pub const fn new(from: f64, to: f64, duration: f64, waveform: Waveform, amplitude: f64) -> Self {
        GlideConfig {
            from,
            to,
            duration,
            waveform,
            amplitude,
        }
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl<H: AudioHost> SoundEngine<H> {
    /// Play a tone on the sound effect channel.
    pub fn generate_tone(&self, voice: VoiceConfig) {
        self.generate_tone_on(voice, Channel::Sfx);
    }

    /// Play a tone on the given channel.
    pub fn generate_tone_on(&self, voice: VoiceConfig, channel: Channel) {
        if !positive(voice.frequency) || !positive(voice.duration) {
            debug!(?voice, "ignoring tone with invalid parameters");
            return;
        }
        let attack = self.inner.config.attack_seconds;
        self.start_voice(channel, voice.amplitude, voice.duration, |peak, _| {
            (
                VoiceSource::Periodic {
                    waveform: voice.waveform,
                    frequency: voice.frequency,
                    glide: None,
                },
                Envelope::AttackRelease { peak, attack },
            )
        });
    }

    /// Play a noise burst on the sound effect channel.
    pub fn generate_noise(&self, noise: NoiseConfig) {
        if !positive(noise.duration) {
            debug!(?noise, "ignoring noise with invalid duration");
            return;
        }
        let floor = self.inner.config.noise_floor;
        let seed = self.next_noise_seed();
        self.start_voice(Channel::Sfx, noise.amplitude, noise.duration, |start, sample_rate| {
            let samples: Arc<[f32]> = white_noise(noise.duration, sample_rate, seed).into();
            (
                VoiceSource::Buffer { samples },
                Envelope::ExponentialDecay { start, floor },
            )
        });
    }

    /// Play a tone on the sound effect channel whose frequency slides
    /// exponentially from `from` to `to`.
    pub fn generate_glide(&self, glide: GlideConfig) {
        if !positive(glide.from) || !positive(glide.to) || !positive(glide.duration) {
            debug!(?glide, "ignoring glide with invalid parameters");
            return;
        }
        let attack = self.inner.config.attack_seconds;
        self.start_voice(Channel::Sfx, glide.amplitude, glide.duration, |peak, _| {
            (
                VoiceSource::Periodic {
                    waveform: glide.waveform,
                    frequency: glide.from,
                    glide: Some(Glide {
                        from: glide.from,
                        to: glide.to,
                    }),
                },
                Envelope::AttackRelease { peak, attack },
            )
        });
    }

    fn start_voice<B>(&self, channel: Channel, requested: f64, duration: f64, build: B)
    where
        B: FnOnce(f64, u32) -> (VoiceSource, Envelope),
    {
        let mut state = self.inner.state.lock();
        start_voice_in(&mut state, channel, requested, duration, build);
    }
}

/// Start a voice at the current output time on an already locked engine.
///
/// `build` gets the effective amplitude and the graph sample rate. Returns
/// `false` when the engine is not ready.
pub(crate) fn start_voice_in<G, B>(
    state: &mut EngineState<G>,
    channel: Channel,
    requested: f64,
    duration: f64,
    build: B,
) -> bool
where
    G: AudioGraph,
    B: FnOnce(f64, u32) -> (VoiceSource, Envelope),
{
    let amplitude = state.mix.effective_amplitude(requested, channel);
    let Lifecycle::Ready(graph) = &mut state.lifecycle else {
        debug!("audio not ready; voice skipped");
        return false;
    };
    let (source, envelope) = build(amplitude, graph.sample_rate());
    let node = VoiceNode {
        source,
        envelope,
        start: graph.current_time(),
        duration,
        channel,
    };
    trace!(?channel, amplitude, start = node.start, "voice");
    graph.start_voice(node);
    true
}
