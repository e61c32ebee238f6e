//! Error types for action dispatch.

use thiserror::Error;

/// Every way a single dispatch can fail. The `Display` text is what the
/// caller sees as the response envelope's `message`.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The inbound body is not a valid action envelope.
    #[error("{0}")]
    Decode(String),
    /// The `action` discriminant is not one the broker serves.
    #[error("invalid action")]
    UnknownAction(String),
    /// The discriminant names a payload the envelope does not carry.
    #[error("missing {0} payload")]
    MissingPayload(&'static str),
    /// The authentication capability answered 401.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// The authentication capability accepted the call but flagged an error.
    #[error("{0}")]
    Unauthorized(String),
    /// Any other downstream failure, with a message naming the capability.
    #[error("{0}")]
    Downstream(String),
}

impl DispatchError {
    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::Decode(_) => 400,
            DispatchError::UnknownAction(_) => 400,
            DispatchError::MissingPayload(_) => 400,
            DispatchError::InvalidCredentials => 401,
            DispatchError::Unauthorized(_) => 401,
            DispatchError::Downstream(_) => 400,
        }
    }
}
