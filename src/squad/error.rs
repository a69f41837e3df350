//! Error kinds surfaced by the squad runtime.

use std::error::Error;
use std::fmt;

/// The runtime's unified error type. Every fallible squad operation returns
/// `Result<T, RuntimeError>`; transport- and decode-level failures from a
/// model invoker are wrapped rather than propagated as opaque boxed errors,
/// so callers can match on kind.
#[derive(Debug)]
pub enum RuntimeError {
    /// The underlying HTTP/model transport failed (connection, timeout at
    /// the wire level, non-2xx status).
    TransportFailure(String),
    /// A model response could not be decoded into the expected shape.
    DecodeFailure(String),
    /// An agent's own execution failed after exhausting retries.
    AgentFailure { agent: String, reason: String },
    /// An agent or loop did not complete within its configured deadline.
    DeadlineExceeded { agent: String, seconds: u64 },
    /// The runtime, squad, or workflow configuration is invalid.
    ConfigurationError(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::TransportFailure(msg) => write!(f, "transport failure: {msg}"),
            RuntimeError::DecodeFailure(msg) => write!(f, "decode failure: {msg}"),
            RuntimeError::AgentFailure { agent, reason } => {
                write!(f, "agent '{agent}' failed: {reason}")
            }
            RuntimeError::DeadlineExceeded { agent, seconds } => {
                write!(f, "agent '{agent}' exceeded its {seconds}s deadline")
            }
            RuntimeError::ConfigurationError(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl Error for RuntimeError {}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
