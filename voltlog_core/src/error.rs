use thiserror::Error;

/// Pipeline failure taxonomy.
///
/// Per-frame parse failures never appear here: a malformed line is a
/// `frame::Frame::Discarded` and the loop continues. Everything in this
/// enum either drives the state machine (`LinkLost`, `Timeout`) or is
/// fatal (`LinkUnavailable`, `Config`, the rest).
#[derive(Debug, Error, Clone)]
pub enum PipelineError {
    #[error("could not connect after {attempts} attempts")]
    LinkUnavailable { attempts: u32 },
    #[error("link lost mid-stream")]
    LinkLost,
    #[error("timeout waiting for a frame")]
    Timeout,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("link error: {0}")]
    Link(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::Io(e.to_string())
    }
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
