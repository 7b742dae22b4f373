use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    /// Transport dropped mid-stream; the caller may reconnect.
    #[error("link disconnected")]
    Disconnected,
    /// No complete frame arrived within the read timeout.
    #[error("link read timeout")]
    Timeout,
    /// Could not open the port at all.
    #[error("port unavailable: {0}")]
    Unavailable(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
