//! Amplitude envelopes and frequency glides.
//!
//! Both are pure functions of the time elapsed since the voice started, so
//! a host can evaluate them per sample or translate them into its own
//! parameter automation.

use serde::{Deserialize, Serialize};

/// Gain shape applied to a voice over its duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Envelope {
    /// Linear ramp 0 -> `peak` over `attack` seconds, then linear ramp back
    /// to 0 at the end of the voice.
    AttackRelease { peak: f64, attack: f64 },
    /// Exponential decay from `start` towards `floor` over the whole voice.
    ExponentialDecay { start: f64, floor: f64 },
}

impl Envelope {
    /// Highest level this envelope reaches.
    pub fn peak(&self) -> f64 {
        match *self {
            Envelope::AttackRelease { peak, .. } => peak,
            Envelope::ExponentialDecay { start, .. } => start,
        }
    }

    /// Level at `t` seconds into a voice lasting `duration` seconds.
    /// Outside [0, duration] the level is 0.
    pub fn level_at(&self, t: f64, duration: f64) -> f64 {
        if t < 0.0 || t > duration || duration <= 0.0 {
            return 0.0;
        }
        match *self {
            Envelope::AttackRelease { peak, attack } => {
                let attack = attack.clamp(0.0, duration);
                if t < attack {
                    peak * t / attack
                } else if duration > attack {
                    peak * (duration - t) / (duration - attack)
                } else {
                    peak
                }
            }
            Envelope::ExponentialDecay { start, floor } => {
                if start <= 0.0 {
                    return 0.0;
                }
                let floor = floor.min(start).max(f64::MIN_POSITIVE);
                start * (floor / start).powf(t / duration)
            }
        }
    }
}

/// Exponential frequency ramp, `from` -> `to` over the voice duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Glide {
    pub from: f64,
    pub to: f64,
}

impl Glide {
    /// Frequency at `t` seconds into a voice lasting `duration` seconds.
    pub fn frequency_at(&self, t: f64, duration: f64) -> f64 {
        if duration <= 0.0 || t <= 0.0 {
            return self.from;
        }
        let progress = (t / duration).min(1.0);
        self.from * (self.to / self.from).powf(progress)
    }
}
