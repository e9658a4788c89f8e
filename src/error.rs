/// Errors surfaced by the library.
///
/// Every failure path resolves to one of these; nothing panics across a
/// public boundary. The variants matter to callers because they propagate
/// differently: a `Transport` failure before any streamed result triggers
/// the single-shot fallback, while `Configuration` and `Playback` are always
/// user-visible and leave the system idle with no artifact.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required credential or input is missing. Raised before any network
    /// call is made.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network or HTTP-level failure talking to a provider.
    #[error("request failed: {0}")]
    Transport(String),

    /// The provider answered, but the payload was not in the expected shape.
    #[error("unexpected response: {0}")]
    MalformedResponse(String),

    /// Audio decode or playback failure.
    #[error("playback error: {0}")]
    Playback(String),

    /// A bounded wait elapsed.
    #[error("timed out waiting for {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl Error {
    /// True for failures that should never be retried or hidden from the
    /// user by a fallback path.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}
