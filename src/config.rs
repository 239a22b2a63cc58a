//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.
//! Field names follow the camelCase style of the game's JSON settings.

use serde::{Deserialize, Serialize};

use crate::error::AudioError;
use crate::mix::clamp_unit;

/// Longest attack or rest accepted, in seconds. Larger values fall back to defaults.
pub const MAX_TIMING_SECONDS: f64 = 3600.0;

fn usable_seconds(value: f64) -> bool {
    value.is_finite() && (0.0..=MAX_TIMING_SECONDS).contains(&value)
}

/// Tunable constants of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Output sample rate requested from the host, in Hz.
    pub sample_rate: u32,
    /// Initial master volume. Also the level restored by unmuting.
    pub master_volume: f64,
    /// Initial music channel volume.
    pub music_volume: f64,
    /// Initial sound effect channel volume.
    pub sfx_volume: f64,
    /// Linear attack window applied to every tone, in seconds.
    pub attack_seconds: f64,
    /// Level noise bursts decay towards. Exponential decay never reaches 0.
    pub noise_floor: f64,
    /// Silence between two iterations of the background melody, in seconds.
    pub melody_rest_seconds: f64,
    /// Seed for the noise generator. `None` draws fresh entropy per burst.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 44100,
            master_volume: 0.7,
            music_volume: 0.3,
            sfx_volume: 0.5,
            attack_seconds: 0.01,
            noise_floor: 0.01,
            melody_rest_seconds: 2.0,
            noise_seed: None,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON. Volumes are clamped to [0, 1].
    pub fn from_json(json: &str) -> Result<Self, AudioError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Clamp volumes into [0, 1] and replace unusable timing values with defaults.
    pub fn normalized(mut self) -> Self {
        let defaults = EngineConfig::default();
        self.master_volume = clamp_unit(self.master_volume);
        self.music_volume = clamp_unit(self.music_volume);
        self.sfx_volume = clamp_unit(self.sfx_volume);
        if self.sample_rate == 0 {
            self.sample_rate = defaults.sample_rate;
        }
        if !usable_seconds(self.attack_seconds) {
            self.attack_seconds = defaults.attack_seconds;
        }
        if !(self.noise_floor.is_finite() && self.noise_floor > 0.0) {
            self.noise_floor = defaults.noise_floor;
        }
        if !usable_seconds(self.melody_rest_seconds) {
            self.melody_rest_seconds = defaults.melody_rest_seconds;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn camel_case_fields() {
        let config = EngineConfig::from_json(
            r#"{ "masterVolume": 0.5, "melodyRestSeconds": 1.5, "noiseSeed": 7 }"#,
        )
        .unwrap();
        assert_eq!(config.master_volume, 0.5);
        assert_eq!(config.melody_rest_seconds, 1.5);
        assert_eq!(config.noise_seed, Some(7));
        assert_eq!(config.sample_rate, 44100);
    }

    #[test]
    fn volumes_are_clamped() {
        let config =
            EngineConfig::from_json(r#"{ "masterVolume": 3.0, "sfxVolume": -1.0 }"#).unwrap();
        assert_eq!(config.master_volume, 1.0);
        assert_eq!(config.sfx_volume, 0.0);
    }

    #[test]
    fn bad_timing_falls_back() {
        let config =
            EngineConfig::from_json(r#"{ "sampleRate": 0, "noiseFloor": 0.0 }"#).unwrap();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.noise_floor, 0.01);
    }

    #[test]
    fn oversized_timing_falls_back() {
        let config = EngineConfig::from_json(
            r#"{ "melodyRestSeconds": 1e30, "attackSeconds": 1e300 }"#,
        )
        .unwrap();
        assert_eq!(config.melody_rest_seconds, 2.0);
        assert_eq!(config.attack_seconds, 0.01);

        let config = EngineConfig::from_json(r#"{ "melodyRestSeconds": 3600.0 }"#).unwrap();
        assert_eq!(config.melody_rest_seconds, MAX_TIMING_SECONDS);
    }

    #[test]
    fn invalid_json_is_config_error() {
        let err = EngineConfig::from_json("{ masterVolume").unwrap_err();
        assert!(matches!(err, AudioError::Config(_)));
    }
}
