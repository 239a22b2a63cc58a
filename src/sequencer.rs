//! Music sequencer: loops a [`MelodyScore`] with a rest between passes.
//!
//! The loop is a cooperative task. Before every note it checks its
//! cancellation token, so stopping mid-pass suppresses the rest of that pass.
//! Notes already handed to the graph keep sounding.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::scheduler::{ScheduledTask, Scheduler};
use crate::score::{MelodyNote, MelodyScore};

/// Whether the background loop is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Stopped,
    Playing,
}

/// Owns the running melody task, if any. At most one loop runs at a time.
#[derive(Debug, Default)]
pub struct Sequencer {
    run_state: RunState,
    token: Option<CancellationToken>,
    task: Option<ScheduledTask>,
    iterations: Arc<AtomicU64>,
}

impl Sequencer {
    /// A stopped sequencer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a loop is running.
    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Passes started since this sequencer was created.
    pub fn iterations_started(&self) -> u64 {
        self.iterations.load(Ordering::SeqCst)
    }

    /// Start looping `score`, replacing any loop already running.
    ///
    /// `play_note` receives each note together with the loop's token; it is
    /// called from the sequencer task. Returns `false` if the score is not
    /// playable or no runtime was available to run the loop.
    pub fn start<F>(
        &mut self,
        scheduler: &Scheduler,
        score: MelodyScore,
        rest: Duration,
        play_note: F,
    ) -> bool
    where
        F: FnMut(MelodyNote, &CancellationToken) + Send + 'static,
    {
        self.stop();
        let score_length = match Duration::try_from_secs_f64(score.total_duration()) {
            Ok(length) if score.is_playable() => length,
            _ => {
                debug!("melody score not playable; loop not started");
                return false;
            }
        };

        let token = CancellationToken::new();
        let task = scheduler.spawn(run_loop(
            score,
            score_length.saturating_add(rest),
            token.clone(),
            Arc::clone(&self.iterations),
            play_note,
        ));
        match task {
            Some(task) => {
                debug!(notes = score.len(), "melody loop started");
                self.token = Some(token);
                self.task = Some(task);
                self.run_state = RunState::Playing;
                true
            }
            None => false,
        }
    }

    /// Stop the loop and cancel its pending iteration.
    pub fn stop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        if let Some(task) = self.task.take() {
            task.cancel();
            debug!("melody loop stopped");
        }
        self.run_state = RunState::Stopped;
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop<F>(
    score: MelodyScore,
    pass_length: Duration,
    token: CancellationToken,
    iterations: Arc<AtomicU64>,
    mut play_note: F,
) where
    F: FnMut(MelodyNote, &CancellationToken) + Send + 'static,
{
    loop {
        let pass_start = Instant::now();
        let pass = iterations.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(pass, "melody pass");

        for (offset, note) in score.timed_notes() {
            if !wait_until(&token, pass_start.checked_add(offset)).await {
                return;
            }
            if token.is_cancelled() {
                return;
            }
            play_note(note, &token);
        }

        if !wait_until(&token, pass_start.checked_add(pass_length)).await {
            return;
        }
    }
}

/// Sleep until `deadline`, or forever when it lies past the clock's range.
/// Returns `false` once `token` is cancelled.
async fn wait_until(token: &CancellationToken, deadline: Option<Instant>) -> bool {
    match deadline {
        Some(deadline) => tokio::select! {
            biased;
            _ = token.cancelled() => false,
            _ = sleep_until(deadline) => true,
        },
        None => {
            token.cancelled().await;
            false
        }
    }
}
