//! Mixer: sums voice outputs into a block, soft-clipped at the destination.

/// A summing mixer that accumulates audio from multiple voices.
#[derive(Debug, Clone, Default)]
pub struct Mixer {
    buffer: Vec<f64>,
}

impl Mixer {
    pub fn new() -> Self {
        Mixer { buffer: Vec::new() }
    }

    /// Prepare a buffer of `num_samples` filled with zeros.
    pub fn clear(&mut self, num_samples: usize) {
        self.buffer.clear();
        self.buffer.resize(num_samples, 0.0);
    }

    /// Add a sample at the given index.
    pub fn add(&mut self, index: usize, sample: f64) {
        if let Some(slot) = self.buffer.get_mut(index) {
            *slot += sample;
        }
    }

    /// The mixed block with soft clipping applied.
    pub fn output(&self) -> impl Iterator<Item = f32> + '_ {
        self.buffer.iter().map(|&s| soft_clip(s) as f32)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// tanh soft clipper, keeps heavily layered voices inside [-1, 1].
fn soft_clip(x: f64) -> f64 {
    x.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer() {
        let mut m = Mixer::new();
        m.clear(128);
        assert_eq!(m.len(), 128);
        assert!(m.output().all(|s| s == 0.0));
    }

    #[test]
    fn accumulates_samples() {
        let mut m = Mixer::new();
        m.clear(4);
        m.add(0, 0.5);
        m.add(0, 0.3);
        m.add(1, 1.0);
        m.add(9, 1.0);
        let out: Vec<f32> = m.output().collect();
        assert!((out[0] - soft_clip(0.8) as f32).abs() < 1e-6);
        assert!((out[1] - soft_clip(1.0) as f32).abs() < 1e-6);
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn soft_clip_prevents_overflow() {
        let mut m = Mixer::new();
        m.clear(1);
        for _ in 0..100 {
            m.add(0, 1.0);
        }
        let out: Vec<f32> = m.output().collect();
        assert!(out[0].abs() <= 1.0, "got {}", out[0]);
    }
}
