use thiserror::Error;

/// Errors produced by the audio engine and its host collaborators.
///
/// Lifecycle and playback paths never surface these to game code: they are
/// logged and the engine degrades to silence. Only the configuration and
/// export helpers return them directly.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The host could not provide an audio output graph.
    #[error("audio host unavailable: {0}")]
    HostUnavailable(String),
    /// The graph started suspended and could not be resumed.
    #[error("failed to resume audio graph: {0}")]
    ResumeFailed(String),
    /// The graph was already closed.
    #[error("audio graph is closed")]
    Closed,
    /// The config JSON could not be parsed.
    #[error("invalid engine config: {0}")]
    Config(#[from] serde_json::Error),
    /// Encoding a WAV export failed.
    #[cfg(feature = "wav")]
    #[error("wav export failed: {0}")]
    Wav(#[from] hound::Error),
}
