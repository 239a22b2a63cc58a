//! DSP building blocks: pure Rust sample generation.
//!
//! The offline host renders with these; a real host may instead translate
//! [`envelope::Envelope`] and [`envelope::Glide`] into its own automation.

pub mod envelope;
pub mod mixer;
pub mod noise;
pub mod oscillator;
#[cfg(feature = "wav")]
pub mod renderer;
pub mod voice;
