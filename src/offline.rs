//! Offline host: an in-process audio graph that records voices on a timeline
//! and renders them to samples on demand.
//!
//! The graph clock is the tokio clock, so a paused test runtime drives it
//! deterministically.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::dsp::mixer::Mixer;
use crate::dsp::voice::Voice;
use crate::error::AudioError;
use crate::graph::{AudioGraph, AudioHost, GraphState, VoiceNode};

/// How a freshly opened graph behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostMode {
    Running,
    StartsSuspended,
    ResumeFails,
    Unavailable,
}

#[derive(Debug, Default)]
struct Timeline {
    /// Voices tagged with the session (graph number, from 1) that started them.
    voices: Vec<(usize, VoiceNode)>,
    opened: usize,
    closed: usize,
    sample_rate: u32,
}

/// Host handing out [`OfflineGraph`]s that share one recorded timeline.
#[derive(Debug, Clone)]
pub struct OfflineHost {
    mode: HostMode,
    timeline: Arc<Mutex<Timeline>>,
}

impl OfflineHost {
    /// Graphs open running.
    pub fn new() -> Self {
        Self::with_mode(HostMode::Running)
    }

    /// Graphs start suspended and need a resume before they run.
    pub fn suspended() -> Self {
        Self::with_mode(HostMode::StartsSuspended)
    }

    /// Graphs start suspended and refuse to resume.
    pub fn resume_fails() -> Self {
        Self::with_mode(HostMode::ResumeFails)
    }

    /// Opening a graph always fails, as on a machine without audio.
    pub fn unavailable() -> Self {
        Self::with_mode(HostMode::Unavailable)
    }

    fn with_mode(mode: HostMode) -> Self {
        OfflineHost {
            mode,
            timeline: Arc::new(Mutex::new(Timeline::default())),
        }
    }

    /// Every voice started on any graph of this host, in start order.
    pub fn voices(&self) -> Vec<VoiceNode> {
        self.timeline
            .lock()
            .voices
            .iter()
            .map(|(_, voice)| voice.clone())
            .collect()
    }

    /// Number of voices recorded across all sessions.
    pub fn voice_count(&self) -> usize {
        self.timeline.lock().voices.len()
    }

    /// Forget every recorded voice.
    pub fn clear_voices(&self) {
        self.timeline.lock().voices.clear();
    }

    /// Number of graphs opened so far.
    pub fn opened_count(&self) -> usize {
        self.timeline.lock().opened
    }

    /// Number of graphs closed so far.
    pub fn closed_count(&self) -> usize {
        self.timeline.lock().closed
    }

    /// Render `seconds` of the latest session, from its graph time 0, to mono samples.
    ///
    /// Each graph has its own clock, so voices from graphs opened earlier are
    /// left out of the render.
    pub fn render(&self, seconds: f64) -> Vec<f32> {
        let (voices, sample_rate) = {
            let timeline = self.timeline.lock();
            let voices: Vec<VoiceNode> = timeline
                .voices
                .iter()
                .filter(|(session, _)| *session == timeline.opened)
                .map(|(_, voice)| voice.clone())
                .collect();
            (voices, timeline.sample_rate.max(1))
        };
        render_timeline(&voices, seconds, sample_rate)
    }

    /// Render `seconds` of the latest session as a 16-bit mono WAV file.
    #[cfg(feature = "wav")]
    pub fn render_wav(&self, seconds: f64) -> Result<Vec<u8>, AudioError> {
        let sample_rate = self.timeline.lock().sample_rate.max(1);
        let samples = self.render(seconds);
        crate::dsp::renderer::encode_wav(&samples, sample_rate)
    }
}

impl Default for OfflineHost {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioHost for OfflineHost {
    type Graph = OfflineGraph;

    fn open(&self, config: &EngineConfig) -> Result<OfflineGraph, AudioError> {
        if self.mode == HostMode::Unavailable {
            return Err(AudioError::HostUnavailable(
                "no audio output on this host".to_string(),
            ));
        }
        let session = {
            let mut timeline = self.timeline.lock();
            timeline.opened += 1;
            timeline.sample_rate = config.sample_rate;
            timeline.opened
        };
        let state = match self.mode {
            HostMode::Running => GraphState::Running,
            _ => GraphState::Suspended,
        };
        debug!(sample_rate = config.sample_rate, ?state, "offline graph opened");
        Ok(OfflineGraph {
            epoch: Instant::now(),
            sample_rate: config.sample_rate,
            state,
            resume_fails: self.mode == HostMode::ResumeFails,
            session,
            timeline: Arc::clone(&self.timeline),
        })
    }
}

/// Graph opened by [`OfflineHost`].
#[derive(Debug)]
pub struct OfflineGraph {
    epoch: Instant,
    sample_rate: u32,
    state: GraphState,
    resume_fails: bool,
    session: usize,
    timeline: Arc<Mutex<Timeline>>,
}

impl AudioGraph for OfflineGraph {
    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn state(&self) -> GraphState {
        self.state
    }

    async fn resume(&mut self) -> Result<(), AudioError> {
        match self.state {
            GraphState::Closed => Err(AudioError::Closed),
            GraphState::Running => Ok(()),
            GraphState::Suspended if self.resume_fails => Err(AudioError::ResumeFailed(
                "output device refused to start".to_string(),
            )),
            GraphState::Suspended => {
                tokio::task::yield_now().await;
                self.state = GraphState::Running;
                Ok(())
            }
        }
    }

    fn start_voice(&mut self, voice: VoiceNode) {
        if self.state == GraphState::Closed {
            return;
        }
        trace!(start = voice.start, duration = voice.duration, "voice started");
        self.timeline.lock().voices.push((self.session, voice));
    }

    fn close(&mut self) {
        if self.state != GraphState::Closed {
            self.state = GraphState::Closed;
            self.timeline.lock().closed += 1;
        }
    }
}

/// Mix `voices` into `seconds` of mono output, block by block.
pub fn render_timeline(voices: &[VoiceNode], seconds: f64, sample_rate: u32) -> Vec<f32> {
    let rate = sample_rate as f64;
    let total_samples = (seconds.max(0.0) * rate) as usize;

    let mut scheduled: Vec<(usize, &VoiceNode)> = voices
        .iter()
        .map(|v| ((v.start.max(0.0) * rate).round() as usize, v))
        .collect();
    scheduled.sort_by_key(|(start, _)| *start);

    let block_size = 128;
    let mut mixer = Mixer::new();
    let mut active: Vec<(usize, Voice)> = Vec::new();
    let mut output = Vec::with_capacity(total_samples);
    let mut next_idx = 0;

    let mut block_start = 0;
    while block_start < total_samples {
        let block_end = (block_start + block_size).min(total_samples);

        while next_idx < scheduled.len() && scheduled[next_idx].0 < block_end {
            let (start, node) = scheduled[next_idx];
            active.push((start, Voice::new(node, rate)));
            next_idx += 1;
        }

        mixer.clear(block_end - block_start);
        for (start, voice) in active.iter_mut() {
            let offset = start.saturating_sub(block_start);
            for i in offset..mixer.len() {
                mixer.add(i, voice.next_sample());
            }
        }
        output.extend(mixer.output());

        active.retain(|(_, v)| !v.is_finished());
        block_start = block_end;
    }

    output
}
