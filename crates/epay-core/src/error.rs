use crate::state_machine::CallbackState;

/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("encoding error: {0}")]
    Encoding(#[source] Box<CoreError>),

    #[error("checksum mismatch: expected {expected}, received {received}")]
    ChecksumMismatch { expected: String, received: String },

    #[error("decoding error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("unsupported payment page: {0}")]
    UnsupportedPage(String),

    #[error("unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    #[error("invalid callback state transition from {from} to {to}")]
    InvalidStateTransition {
        from: CallbackState,
        to: CallbackState,
    },
}
