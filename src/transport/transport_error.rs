use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("remote candidate unreachable: {0}")]
    Unreachable(String),
    #[error("connectivity check timed out")]
    Timeout,
    #[error("gathering failed: {0}")]
    Gathering(String),
    #[error("transport closed")]
    Closed,
}
