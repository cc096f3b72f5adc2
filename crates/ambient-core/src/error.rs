/// Failures the engine reports to its immediate caller.
///
/// None of these are fatal to the host application: callers are expected to
/// carry on in silence and retry on a later user gesture.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("audio output unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("audio device refused to resume: {0}")]
    ResumeRefused(String),
    #[error("audio graph error: {0}")]
    Graph(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
