//! Mixer state: master, music and sfx volumes.

use serde::{Deserialize, Serialize};

/// Clamp a gain into [0, 1]. NaN is treated as silence.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Which volume channel a voice is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Music,
    Sfx,
}

/// The three independently settable volumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixState {
    master_volume: f64,
    music_volume: f64,
    sfx_volume: f64,
}

impl MixState {
    /// Build a mix from the three volumes, each clamped to [0, 1].
    pub fn new(master: f64, music: f64, sfx: f64) -> Self {
        MixState {
            master_volume: clamp_unit(master),
            music_volume: clamp_unit(music),
            sfx_volume: clamp_unit(sfx),
        }
    }

    /// Gain applied to every voice.
    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    /// Gain of the background melody.
    pub fn music_volume(&self) -> f64 {
        self.music_volume
    }

    /// Gain of sound effects.
    pub fn sfx_volume(&self) -> f64 {
        self.sfx_volume
    }

    /// Set the master gain, clamped to [0, 1].
    pub fn set_master_volume(&mut self, volume: f64) {
        self.master_volume = clamp_unit(volume);
    }

    /// Set the music gain, clamped to [0, 1].
    pub fn set_music_volume(&mut self, volume: f64) {
        self.music_volume = clamp_unit(volume);
    }

    /// Set the sound effect gain, clamped to [0, 1].
    pub fn set_sfx_volume(&mut self, volume: f64) {
        self.sfx_volume = clamp_unit(volume);
    }

    /// Volume of the given channel, before the master gain.
    pub fn channel_volume(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Music => self.music_volume,
            Channel::Sfx => self.sfx_volume,
        }
    }

    /// Amplitude actually applied to a voice: requested x channel x master,
    /// each factor clamped to [0, 1] first.
    pub fn effective_amplitude(&self, requested: f64, channel: Channel) -> f64 {
        clamp_unit(requested) * self.channel_volume(channel) * self.master_volume
    }
}
