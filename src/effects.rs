//! Sound effect library: fixed, hand-composed note sequences per game event.
//!
//! Firing an effect schedules each note relative to the call. Effects never
//! block or queue and may overlap with each other and with the music.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dsp::oscillator::Waveform::{self, Sawtooth, Sine, Square, Triangle};
use crate::engine::SoundEngine;
use crate::graph::AudioHost;
use crate::synth::{GlideConfig, NoiseConfig, VoiceConfig};

/// Discrete game events that have a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoundEffect {
    Attack,
    Victory,
    Defeat,
    Placement,
    TurnChange,
    ContinentBonus,
    Error,
    Click,
}

/// What one note of an effect plays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectVoice {
    Tone(VoiceConfig),
    Noise(NoiseConfig),
    Glide(GlideConfig),
}

/// One note of an effect, `offset_ms` after the trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectNote {
    pub offset_ms: u64,
    pub voice: EffectVoice,
}

const fn tone(offset_ms: u64, frequency: f64, duration: f64, waveform: Waveform, amplitude: f64) -> EffectNote {
    EffectNote {
        offset_ms,
        voice: EffectVoice::Tone(VoiceConfig::new(frequency, duration, waveform, amplitude)),
    }
}

const fn noise(offset_ms: u64, duration: f64, amplitude: f64) -> EffectNote {
    EffectNote {
        offset_ms,
        voice: EffectVoice::Noise(NoiseConfig::new(duration, amplitude)),
    }
}

// Clash of steel: a noise hit over low square/saw stabs.
const ATTACK: &[EffectNote] = &[
    noise(0, 0.1, 0.3),
    tone(0, 150.0, 0.1, Square, 0.3),
    tone(50, 100.0, 0.15, Sawtooth, 0.25),
    tone(100, 80.0, 0.1, Square, 0.2),
];

// Ascending C major arpeggio.
const VICTORY: &[EffectNote] = &[
    tone(0, 523.25, 0.3, Sine, 0.3),
    tone(100, 659.25, 0.3, Sine, 0.3),
    tone(200, 783.99, 0.3, Sine, 0.3),
    tone(300, 1046.50, 0.5, Sine, 0.3),
];

const DEFEAT: &[EffectNote] = &[EffectNote {
    offset_ms: 0,
    voice: EffectVoice::Glide(GlideConfig::new(400.0, 100.0, 0.8, Sawtooth, 0.3)),
}];

const PLACEMENT: &[EffectNote] = &[
    tone(0, 600.0, 0.08, Triangle, 0.25),
    tone(40, 900.0, 0.06, Sine, 0.15),
];

const TURN_CHANGE: &[EffectNote] = &[
    tone(0, 440.0, 0.15, Triangle, 0.2),
    tone(150, 554.37, 0.2, Triangle, 0.2),
];

const CONTINENT_BONUS: &[EffectNote] = &[
    tone(0, 659.25, 0.15, Sine, 0.25),
    tone(80, 783.99, 0.15, Sine, 0.25),
    tone(160, 987.77, 0.15, Sine, 0.25),
    tone(240, 1318.51, 0.4, Sine, 0.3),
    tone(240, 659.25, 0.4, Triangle, 0.15),
];

const ERROR: &[EffectNote] = &[
    tone(0, 200.0, 0.15, Square, 0.2),
    tone(150, 150.0, 0.2, Square, 0.2),
];

const CLICK: &[EffectNote] = &[tone(0, 1000.0, 0.03, Sine, 0.1)];

impl SoundEffect {
    pub const ALL: [SoundEffect; 8] = [
        SoundEffect::Attack,
        SoundEffect::Victory,
        SoundEffect::Defeat,
        SoundEffect::Placement,
        SoundEffect::TurnChange,
        SoundEffect::ContinentBonus,
        SoundEffect::Error,
        SoundEffect::Click,
    ];

    /// The effect's notes in trigger order.
    pub fn notes(self) -> &'static [EffectNote] {
        match self {
            SoundEffect::Attack => ATTACK,
            SoundEffect::Victory => VICTORY,
            SoundEffect::Defeat => DEFEAT,
            SoundEffect::Placement => PLACEMENT,
            SoundEffect::TurnChange => TURN_CHANGE,
            SoundEffect::ContinentBonus => CONTINENT_BONUS,
            SoundEffect::Error => ERROR,
            SoundEffect::Click => CLICK,
        }
    }

    /// Time from trigger until the last note ends, in seconds.
    pub fn length(self) -> f64 {
        self.notes()
            .iter()
            .map(|n| {
                let duration = match n.voice {
                    EffectVoice::Tone(v) => v.duration,
                    EffectVoice::Noise(v) => v.duration,
                    EffectVoice::Glide(v) => v.duration,
                };
                n.offset_ms as f64 / 1000.0 + duration
            })
            .fold(0.0, f64::max)
    }
}

impl<H: AudioHost> SoundEngine<H> {
    /// Fire an effect. Notes at offset 0 start now, later ones on timers.
    pub fn play_effect(&self, effect: SoundEffect) {
        if !self.is_ready() {
            debug!(?effect, "audio not ready; effect skipped");
            return;
        }
        debug!(?effect, "effect");
        for note in effect.notes() {
            if note.offset_ms == 0 {
                self.play_effect_voice(note.voice);
                continue;
            }
            let engine = Arc::downgrade(&self.inner);
            let voice = note.voice;
            // Detached: individual notes are not cancellable.
            let _ = self
                .inner
                .scheduler
                .schedule_after(Duration::from_millis(note.offset_ms), move || {
                    if let Some(inner) = engine.upgrade() {
                        SoundEngine { inner }.play_effect_voice(voice);
                    }
                });
        }
    }

    fn play_effect_voice(&self, voice: EffectVoice) {
        match voice {
            EffectVoice::Tone(v) => self.generate_tone(v),
            EffectVoice::Noise(v) => self.generate_noise(v),
            EffectVoice::Glide(v) => self.generate_glide(v),
        }
    }

    /// Combat: a noise burst under descending square and sawtooth tones.
    pub fn play_attack_sound(&self) {
        self.play_effect(SoundEffect::Attack);
    }

    /// Territory captured: rising C major arpeggio.
    pub fn play_victory_sound(&self) {
        self.play_effect(SoundEffect::Victory);
    }

    /// Territory lost: falling sawtooth glide.
    pub fn play_defeat_sound(&self) {
        self.play_effect(SoundEffect::Defeat);
    }

    /// Army placed on a territory.
    pub fn play_placement_sound(&self) {
        self.play_effect(SoundEffect::Placement);
    }

    /// A new player's turn begins.
    pub fn play_turn_change_sound(&self) {
        self.play_effect(SoundEffect::TurnChange);
    }

    /// Continent bonus awarded.
    pub fn play_bonus_sound(&self) {
        self.play_effect(SoundEffect::ContinentBonus);
    }

    /// Invalid action.
    pub fn play_error_sound(&self) {
        self.play_effect(SoundEffect::Error);
    }

    /// UI click.
    pub fn play_click_sound(&self) {
        self.play_effect(SoundEffect::Click);
    }
}
