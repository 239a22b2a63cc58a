//! Voice: renders one [`VoiceNode`] sample by sample.

use std::sync::Arc;

use crate::dsp::envelope::{Envelope, Glide};
use crate::dsp::oscillator::Oscillator;
use crate::graph::{VoiceNode, VoiceSource};

enum Source {
    Oscillator {
        osc: Oscillator,
        glide: Option<Glide>,
    },
    Buffer {
        samples: Arc<[f32]>,
    },
}

/// A playing voice: source shaped by its gain envelope.
pub struct Voice {
    source: Source,
    envelope: Envelope,
    duration: f64,
    sample_rate: f64,
    /// Samples rendered so far.
    position: usize,
    total_samples: usize,
}

impl Voice {
    pub fn new(node: &VoiceNode, sample_rate: f64) -> Self {
        let source = match &node.source {
            VoiceSource::Periodic {
                waveform,
                frequency,
                glide,
            } => Source::Oscillator {
                osc: Oscillator::new(*waveform, *frequency, sample_rate),
                glide: *glide,
            },
            VoiceSource::Buffer { samples } => Source::Buffer {
                samples: Arc::clone(samples),
            },
        };
        Voice {
            source,
            envelope: node.envelope,
            duration: node.duration,
            sample_rate,
            position: 0,
            total_samples: (node.duration.max(0.0) * sample_rate).round() as usize,
        }
    }

    /// Generate the next sample. Silent once the voice has finished.
    pub fn next_sample(&mut self) -> f64 {
        if self.is_finished() {
            return 0.0;
        }
        let t = self.position as f64 / self.sample_rate;
        let raw = match &mut self.source {
            Source::Oscillator { osc, glide } => {
                if let Some(glide) = glide {
                    osc.frequency = glide.frequency_at(t, self.duration);
                }
                osc.next_sample()
            }
            Source::Buffer { samples } => samples.get(self.position).copied().unwrap_or(0.0) as f64,
        };
        let gain = self.envelope.level_at(t, self.duration);
        self.position += 1;
        raw * gain
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.total_samples
    }
}
