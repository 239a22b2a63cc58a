//! Sound engine: owns the audio graph, the mix, and the music loop.
//!
//! The engine is an explicitly constructed handle. Clone it and hand it to
//! whichever game components need to trigger sounds; all clones drive the
//! same graph. Audio is a non-critical enhancement, so every failure
//! degrades to silence: nothing here returns an error to the game.

use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::dsp::envelope::Envelope;
use crate::dsp::oscillator::Waveform;
use crate::graph::{AudioGraph, AudioHost, GraphState, VoiceSource};
use crate::mix::{Channel, MixState};
use crate::scheduler::Scheduler;
use crate::score::{BATTLE_THEME, MelodyNote, MelodyScore};
use crate::sequencer::{RunState, Sequencer};
use crate::synth::start_voice_in;

/// Amplitude of the melody's fundamental voice.
const MELODY_AMPLITUDE: f64 = 0.15;
/// Amplitude of the harmony voice, a fifth above the fundamental.
const HARMONY_AMPLITUDE: f64 = 0.1;
const HARMONY_RATIO: f64 = 1.5;

pub(crate) enum Lifecycle<G> {
    Uninitialized,
    /// Graph acquired or being resumed; not yet producing sound.
    Initializing,
    Ready(G),
}

pub(crate) struct EngineState<G> {
    pub(crate) lifecycle: Lifecycle<G>,
    pub(crate) mix: MixState,
    pub(crate) muted: bool,
    pub(crate) sequencer: Sequencer,
    noise_bursts: u64,
}

pub(crate) struct Inner<H: AudioHost> {
    pub(crate) host: H,
    pub(crate) config: EngineConfig,
    pub(crate) scheduler: Scheduler,
    pub(crate) score: MelodyScore,
    pub(crate) state: Mutex<EngineState<H::Graph>>,
}

/// Procedural audio engine for the game.
pub struct SoundEngine<H: AudioHost> {
    pub(crate) inner: Arc<Inner<H>>,
}

impl<H: AudioHost> Clone for SoundEngine<H> {
    fn clone(&self) -> Self {
        SoundEngine {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: AudioHost> SoundEngine<H> {
    /// Create an uninitialized engine playing the default battle theme.
    ///
    /// Timers run on the tokio runtime current at construction, or on the
    /// one current at the time of each call when constructed outside a runtime.
    pub fn new(host: H, config: EngineConfig) -> Self {
        Self::with_score(host, config, MelodyScore::default())
    }

    /// Create an engine looping `score` as its background music. A score that
    /// cannot be played is replaced by the battle theme.
    pub fn with_score(host: H, config: EngineConfig, score: MelodyScore) -> Self {
        Self::with_scheduler(host, config, score, Scheduler::new())
    }

    /// Like [`SoundEngine::with_score`], with timers driven by `scheduler`.
    pub fn with_scheduler(
        host: H,
        config: EngineConfig,
        score: MelodyScore,
        scheduler: Scheduler,
    ) -> Self {
        let config = config.normalized();
        let score = if score.is_playable() {
            score
        } else {
            warn!(notes = score.len(), "Melody score has invalid notes. Using the battle theme.");
            BATTLE_THEME
        };
        let mix = MixState::new(config.master_volume, config.music_volume, config.sfx_volume);
        SoundEngine {
            inner: Arc::new(Inner {
                host,
                config,
                scheduler,
                score,
                state: Mutex::new(EngineState {
                    lifecycle: Lifecycle::Uninitialized,
                    mix,
                    muted: false,
                    sequencer: Sequencer::new(),
                    noise_bursts: 0,
                }),
            }),
        }
    }

    /// The normalized config this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Acquire the audio graph and start the background music.
    ///
    /// Idempotent: a no-op when already ready or initializing. A graph that
    /// starts suspended is resumed first. If the host has no audio, or resume
    /// fails, the engine stays uninitialized and every later call is silent.
    pub async fn initialize(&self) {
        {
            let mut state = self.inner.state.lock();
            if !matches!(state.lifecycle, Lifecycle::Uninitialized) {
                return;
            }
            state.lifecycle = Lifecycle::Initializing;
        }

        let mut graph = match self.inner.host.open(&self.inner.config) {
            Ok(graph) => graph,
            Err(e) => {
                warn!("Failed to create audio graph: {e}. Audio disabled.");
                self.reset_lifecycle();
                return;
            }
        };

        if graph.state() == GraphState::Suspended {
            debug!("audio graph suspended, resuming");
            if let Err(e) = graph.resume().await {
                warn!("Failed to resume audio graph: {e}. Audio disabled.");
                graph.close();
                self.reset_lifecycle();
                return;
            }
        }

        let muted = {
            let mut state = self.inner.state.lock();
            if !matches!(state.lifecycle, Lifecycle::Initializing) {
                // Disposed while resuming.
                graph.close();
                return;
            }
            info!(sample_rate = graph.sample_rate(), "audio ready");
            state.lifecycle = Lifecycle::Ready(graph);
            state.muted
        };

        if !muted {
            self.play_background_music();
        }
    }

    fn reset_lifecycle(&self) {
        let mut state = self.inner.state.lock();
        if matches!(state.lifecycle, Lifecycle::Initializing) {
            state.lifecycle = Lifecycle::Uninitialized;
        }
    }

    /// Stop the music and release the graph. `initialize` may be called again.
    pub fn dispose(&self) {
        let mut state = self.inner.state.lock();
        state.sequencer.stop();
        if let Lifecycle::Ready(graph) = &mut state.lifecycle {
            graph.close();
            info!("audio disposed");
        }
        state.lifecycle = Lifecycle::Uninitialized;
    }

    /// True once a graph is acquired and running.
    pub fn is_ready(&self) -> bool {
        matches!(self.inner.state.lock().lifecycle, Lifecycle::Ready(_))
    }

    // ── Music ───────────────────────────────────────────────

    /// Start the background melody loop, restarting it if already playing.
    pub fn play_background_music(&self) {
        let mut state = self.inner.state.lock();
        if !matches!(state.lifecycle, Lifecycle::Ready(_)) {
            debug!("audio not ready; music not started");
            return;
        }
        let engine = Arc::downgrade(&self.inner);
        let rest = Duration::from_secs_f64(self.inner.config.melody_rest_seconds);
        state.sequencer.start(
            &self.inner.scheduler,
            self.inner.score,
            rest,
            move |note, token| play_melody_note(&engine, note, token),
        );
    }

    /// Stop the melody loop. Notes already sounding play out.
    pub fn stop_background_music(&self) {
        self.inner.state.lock().sequencer.stop();
    }

    /// Whether the melody loop is running.
    pub fn music_state(&self) -> RunState {
        self.inner.state.lock().sequencer.run_state()
    }

    /// Melody passes started so far.
    pub fn music_iterations(&self) -> u64 {
        self.inner.state.lock().sequencer.iterations_started()
    }

    // ── Mixer ───────────────────────────────────────────────

    /// Set the master volume, clamped to [0, 1]. Applies to voices started afterwards.
    pub fn set_master_volume(&self, volume: f64) {
        self.inner.state.lock().mix.set_master_volume(volume);
    }

    /// Set the music channel volume, clamped to [0, 1].
    pub fn set_music_volume(&self, volume: f64) {
        self.inner.state.lock().mix.set_music_volume(volume);
    }

    /// Set the sound effect channel volume, clamped to [0, 1].
    pub fn set_sfx_volume(&self, volume: f64) {
        self.inner.state.lock().mix.set_sfx_volume(volume);
    }

    /// Snapshot of the current volumes.
    pub fn mix(&self) -> MixState {
        self.inner.state.lock().mix
    }

    /// Muting zeroes the master volume and tears down the music loop;
    /// effects keep triggering at zero gain. Unmuting restores the configured
    /// master volume and restarts the music.
    pub fn set_mute(&self, muted: bool) {
        {
            let mut state = self.inner.state.lock();
            state.muted = muted;
            if muted {
                state.mix.set_master_volume(0.0);
                state.sequencer.stop();
                debug!("muted");
                return;
            }
            state.mix.set_master_volume(self.inner.config.master_volume);
        }
        debug!("unmuted");
        self.play_background_music();
    }

    /// True while muted.
    pub fn is_muted(&self) -> bool {
        self.inner.state.lock().muted
    }

    /// Seed for the next noise burst, distinct per burst when a base seed is configured.
    pub(crate) fn next_noise_seed(&self) -> Option<u64> {
        let base = self.inner.config.noise_seed?;
        let mut state = self.inner.state.lock();
        state.noise_bursts += 1;
        Some(base.wrapping_add(state.noise_bursts))
    }
}

/// Emit one melody note: the fundamental on a triangle and a sine a fifth
/// above, both on the music channel. Skipped if the loop was stopped.
fn play_melody_note<H: AudioHost>(engine: &Weak<Inner<H>>, note: MelodyNote, token: &CancellationToken) {
    let Some(inner) = engine.upgrade() else {
        token.cancel();
        return;
    };
    let mut state = inner.state.lock();
    // Checked under the lock `stop` takes, so no note slips past a stop.
    if token.is_cancelled() {
        return;
    }
    let attack = inner.config.attack_seconds;
    for (waveform, frequency, amplitude) in [
        (Waveform::Triangle, note.frequency, MELODY_AMPLITUDE),
        (Waveform::Sine, note.frequency * HARMONY_RATIO, HARMONY_AMPLITUDE),
    ] {
        start_voice_in(&mut state, Channel::Music, amplitude, note.duration, |peak, _| {
            (
                VoiceSource::Periodic {
                    waveform,
                    frequency,
                    glide: None,
                },
                Envelope::AttackRelease { peak, attack },
            )
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::OfflineHost;
    use crate::score::MelodyNote;

    const NOTES: &[MelodyNote] = &[
        MelodyNote { frequency: 220.0, duration: 0.5 },
        MelodyNote { frequency: 330.0, duration: 0.5 },
        MelodyNote { frequency: 440.0, duration: 1.0 },
    ];
    const SHORT: MelodyScore = MelodyScore::new(NOTES);

    fn engine(host: &OfflineHost) -> SoundEngine<OfflineHost> {
        SoundEngine::with_score(host.clone(), EngineConfig::default(), SHORT)
    }

    fn music_voices(host: &OfflineHost) -> Vec<crate::graph::VoiceNode> {
        host.voices()
            .into_iter()
            .filter(|v| v.channel == Channel::Music)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn initialize_is_idempotent() {
        let host = OfflineHost::new();
        let engine = engine(&host);
        engine.initialize().await;
        engine.initialize().await;
        assert!(engine.is_ready());
        assert_eq!(host.opened_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_initialize_opens_one_graph() {
        let host = OfflineHost::suspended();
        let engine = engine(&host);
        tokio::join!(engine.initialize(), engine.initialize());
        assert!(engine.is_ready());
        assert_eq!(host.opened_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn suspended_graph_is_resumed_before_ready() {
        let host = OfflineHost::suspended();
        let engine = engine(&host);
        engine.initialize().await;
        assert!(engine.is_ready());
        assert_eq!(engine.music_state(), RunState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_host_degrades_to_silence() {
        let host = OfflineHost::unavailable();
        let engine = engine(&host);
        engine.initialize().await;
        assert!(!engine.is_ready());

        engine.play_victory_sound();
        engine.play_attack_sound();
        engine.play_background_music();
        engine.set_mute(false);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(host.voice_count(), 0);
        assert_eq!(engine.music_state(), RunState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_failure_leaves_engine_uninitialized() {
        let host = OfflineHost::resume_fails();
        let engine = engine(&host);
        engine.initialize().await;
        assert!(!engine.is_ready());
        assert_eq!(host.closed_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn play_before_initialize_is_silent() {
        let host = OfflineHost::new();
        let engine = engine(&host);
        for effect in crate::effects::SoundEffect::ALL {
            engine.play_effect(effect);
        }
        engine.generate_noise(crate::synth::NoiseConfig::new(0.1, 0.5));
        engine.play_background_music();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(host.voice_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn initialize_starts_melody_with_harmony() {
        let host = OfflineHost::new();
        let engine = engine(&host);
        engine.initialize().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let voices = music_voices(&host);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].waveform(), Some(Waveform::Triangle));
        assert_eq!(voices[0].frequency(), Some(220.0));
        assert_eq!(voices[1].waveform(), Some(Waveform::Sine));
        assert_eq!(voices[1].frequency(), Some(330.0));
        let mix = engine.mix();
        let expected = MELODY_AMPLITUDE * mix.music_volume() * mix.master_volume();
        assert!((voices[0].peak_amplitude() - expected).abs() < 1e-12);
    }

    #[tokio::test(start_paused = true)]
    async fn second_iteration_after_rest() {
        let host = OfflineHost::new();
        let engine = engine(&host);
        engine.initialize().await;

        // D = 2.0 s plus a 2 s rest.
        tokio::time::sleep(Duration::from_millis(4100)).await;
        let voices = music_voices(&host);
        assert_eq!(voices.len(), 8);
        let second_pass = voices[6].start;
        assert!(second_pass >= 4.0 && second_pass < 4.0 + 0.005, "{second_pass}");
        assert_eq!(voices[6].frequency(), Some(220.0));
        assert_eq!(engine.music_iterations(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_notes() {
        let host = OfflineHost::new();
        let engine = engine(&host);
        engine.initialize().await;
        tokio::time::sleep(Duration::from_millis(600)).await;
        engine.stop_background_music();
        let played = music_voices(&host).len();
        assert_eq!(played, 4);

        // Longer than one full pass plus rest.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(music_voices(&host).len(), played);
        assert_eq!(engine.music_state(), RunState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_music_keeps_one_loop() {
        let host = OfflineHost::new();
        let engine = engine(&host);
        engine.initialize().await;
        engine.play_background_music();
        engine.play_background_music();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(music_voices(&host).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn mute_silences_effects_and_stops_music() {
        let host = OfflineHost::new();
        let engine = engine(&host);
        engine.initialize().await;
        engine.set_mute(true);
        assert!(engine.is_muted());
        assert_eq!(engine.mix().master_volume(), 0.0);
        assert_eq!(engine.music_state(), RunState::Stopped);

        host.clear_voices();
        engine.play_click_sound();
        let voices = host.voices();
        assert_eq!(voices.len(), 1, "effects still trigger while muted");
        assert_eq!(voices[0].peak_amplitude(), 0.0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(music_voices(&host).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unmute_restores_default_master_and_music() {
        let host = OfflineHost::new();
        let engine = engine(&host);
        engine.initialize().await;
        engine.set_master_volume(0.2);
        engine.set_mute(true);
        engine.set_mute(false);
        assert!(!engine.is_muted());
        assert_eq!(engine.mix().master_volume(), EngineConfig::default().master_volume);
        assert_eq!(engine.music_state(), RunState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn initialize_while_muted_keeps_music_off() {
        let host = OfflineHost::new();
        let engine = engine(&host);
        engine.set_mute(true);
        engine.initialize().await;
        assert!(engine.is_ready());
        assert_eq!(engine.music_state(), RunState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_releases_graph_and_allows_reinit() {
        let host = OfflineHost::new();
        let engine = engine(&host);
        engine.initialize().await;
        engine.dispose();
        assert!(!engine.is_ready());
        assert_eq!(engine.music_state(), RunState::Stopped);
        assert_eq!(host.closed_count(), 1);

        host.clear_voices();
        engine.play_click_sound();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(host.voice_count(), 0);

        engine.initialize().await;
        assert!(engine.is_ready());
        assert_eq!(host.opened_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn volume_changes_apply_to_next_voice() {
        let host = OfflineHost::new();
        let engine = engine(&host);
        engine.initialize().await;
        engine.stop_background_music();
        engine.set_master_volume(2.0);
        engine.set_sfx_volume(0.5);
        assert_eq!(engine.mix().master_volume(), 1.0);

        host.clear_voices();
        engine.generate_tone(crate::synth::VoiceConfig::new(440.0, 0.2, Waveform::Sine, 0.8));
        assert!((host.voices()[0].peak_amplitude() - 0.4).abs() < 1e-12);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_tone_is_ignored() {
        let host = OfflineHost::new();
        let engine = engine(&host);
        engine.initialize().await;
        engine.stop_background_music();
        host.clear_voices();
        engine.generate_tone(crate::synth::VoiceConfig::new(0.0, 0.2, Waveform::Sine, 0.5));
        engine.generate_tone(crate::synth::VoiceConfig::new(440.0, f64::NAN, Waveform::Sine, 0.5));
        assert_eq!(host.voice_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn seeded_noise_differs_per_burst() {
        let host = OfflineHost::new();
        let config = EngineConfig {
            noise_seed: Some(9),
            ..EngineConfig::default()
        };
        let engine = SoundEngine::with_score(host.clone(), config, SHORT);
        engine.initialize().await;
        engine.stop_background_music();
        host.clear_voices();
        engine.generate_noise(crate::synth::NoiseConfig::new(0.05, 0.5));
        engine.generate_noise(crate::synth::NoiseConfig::new(0.05, 0.5));
        let voices = host.voices();
        match (&voices[0].source, &voices[1].source) {
            (VoiceSource::Buffer { samples: a }, VoiceSource::Buffer { samples: b }) => {
                assert_eq!(a.len(), b.len());
                assert_ne!(a, b);
            }
            other => panic!("expected noise buffers, got {other:?}"),
        }
        assert!(matches!(voices[0].envelope, Envelope::ExponentialDecay { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_during_resume_closes_fresh_graph() {
        let host = OfflineHost::suspended();
        let engine = engine(&host);
        let mut init = Box::pin(engine.initialize());
        let mut cx = std::task::Context::from_waker(std::task::Waker::noop());
        assert!(init.as_mut().poll(&mut cx).is_pending(), "resume should yield once");
        assert_eq!(host.opened_count(), 1);

        engine.dispose();
        init.await;
        assert!(!engine.is_ready());
        assert_eq!(host.closed_count(), 1);
        assert_eq!(engine.music_state(), RunState::Stopped);

        engine.initialize().await;
        assert!(engine.is_ready());
        assert_eq!(host.opened_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_rest_does_not_abort_initialize() {
        let host = OfflineHost::new();
        let config = EngineConfig::from_json(r#"{ "melodyRestSeconds": 1e30 }"#).unwrap();
        let engine = SoundEngine::with_score(host.clone(), config, SHORT);
        engine.initialize().await;
        assert!(engine.is_ready());
        assert_eq!(engine.config().melody_rest_seconds, 2.0);
        assert_eq!(engine.music_state(), RunState::Playing);

        tokio::time::sleep(Duration::from_millis(4100)).await;
        assert_eq!(engine.music_iterations(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_score_falls_back_to_battle_theme() {
        const BROKEN: &[MelodyNote] = &[
            MelodyNote { frequency: 220.0, duration: -0.5 },
            MelodyNote { frequency: 330.0, duration: 0.5 },
        ];
        let host = OfflineHost::new();
        let engine =
            SoundEngine::with_score(host.clone(), EngineConfig::default(), MelodyScore::new(BROKEN));
        engine.initialize().await;
        assert_eq!(engine.music_state(), RunState::Playing);

        tokio::time::sleep(Duration::from_secs(5)).await;
        let voices = music_voices(&host);
        let first = BATTLE_THEME.notes()[0].frequency;
        assert_eq!(voices[0].frequency(), Some(first));
        assert!(voices.len() > 2, "loop kept playing: {}", voices.len());
        assert_eq!(engine.music_state(), RunState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn rendered_session_is_audible() {
        let host = OfflineHost::new();
        let engine = engine(&host);
        engine.initialize().await;
        engine.play_victory_sound();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let samples = host.render(1.0);
        assert_eq!(samples.len(), 44100);
        assert!(samples.iter().any(|s| s.abs() > 0.01));
        assert!(samples.iter().all(|s| s.abs() <= 1.0));
    }
}
