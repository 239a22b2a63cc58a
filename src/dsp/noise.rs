//! White noise buffers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fill a buffer of `duration` seconds with white noise, every sample drawn
/// independently and uniformly from [-1, 1].
///
/// With a seed the output is reproducible; without one fresh OS entropy is used.
pub fn white_noise(duration: f64, sample_rate: u32, seed: Option<u64>) -> Vec<f32> {
    let num_samples = (duration.max(0.0) * sample_rate as f64) as usize;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    (0..num_samples)
        .map(|_| rng.random_range(-1.0f32..=1.0))
        .collect()
}
