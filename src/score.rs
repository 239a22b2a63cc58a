//! Background melody score.

use std::time::Duration;

/// One note of a melody: fundamental frequency in Hz and length in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MelodyNote {
    pub frequency: f64,
    pub duration: f64,
}

const fn note(frequency: f64, duration: f64) -> MelodyNote {
    MelodyNote {
        frequency,
        duration,
    }
}

/// An ordered, immutable sequence of notes played back to back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MelodyScore {
    notes: &'static [MelodyNote],
}

const BATTLE_THEME_NOTES: &[MelodyNote] = &[
    note(440.00, 0.4),
    note(523.25, 0.4),
    note(659.25, 0.4),
    note(587.33, 0.4),
    note(523.25, 0.4),
    note(493.88, 0.4),
    note(440.00, 0.8),
    note(329.63, 0.4),
    note(440.00, 0.4),
    note(523.25, 0.4),
    note(493.88, 0.4),
    note(392.00, 0.4),
    note(440.00, 1.2),
];

/// A minor march used as the in-game background loop.
pub const BATTLE_THEME: MelodyScore = MelodyScore::new(BATTLE_THEME_NOTES);

impl MelodyScore {
    pub const fn new(notes: &'static [MelodyNote]) -> Self {
        MelodyScore { notes }
    }

    pub fn notes(&self) -> &'static [MelodyNote] {
        self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Length of one pass through the score, in seconds.
    pub fn total_duration(&self) -> f64 {
        self.notes.iter().map(|n| n.duration).sum()
    }

    /// True when every note has a positive finite frequency and a
    /// non-negative finite duration, and one pass fits in a [`Duration`].
    pub fn is_playable(&self) -> bool {
        self.notes.iter().all(|n| {
            n.frequency.is_finite()
                && n.frequency > 0.0
                && n.duration.is_finite()
                && n.duration >= 0.0
        }) && Duration::try_from_secs_f64(self.total_duration()).is_ok()
    }

    /// Every note paired with its start offset from the beginning of the pass.
    /// Stops early at the first offset that is not a valid [`Duration`].
    pub fn timed_notes(&self) -> impl Iterator<Item = (Duration, MelodyNote)> + '_ {
        self.notes.iter().scan(0.0f64, |elapsed, n| {
            let offset = Duration::try_from_secs_f64(*elapsed).ok()?;
            *elapsed += n.duration;
            Some((offset, *n))
        })
    }
}

impl Default for MelodyScore {
    fn default() -> Self {
        BATTLE_THEME
    }
}
