use std::fmt;

use crate::error::CoreError;

/// The stages a single callback passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CallbackState {
    /// Raw form values received, nothing checked yet.
    Received,
    /// The checksum matched the payload.
    ChecksumVerified,
    /// The payload was base64-decoded.
    Decoded,
    /// The records were parsed without issues.
    Parsed,
    /// The payment handler is running.
    HandlerInvoked,
    /// Answered `OK`. Final state.
    RepliedOk,
    /// Answered `NO` (unknown invoice). Final state.
    RepliedNo,
    /// Answered `ERR`. Final state.
    RepliedErr,
}

impl CallbackState {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::RepliedOk | Self::RepliedNo | Self::RepliedErr)
    }
}

impl fmt::Display for CallbackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "Received"),
            Self::ChecksumVerified => write!(f, "ChecksumVerified"),
            Self::Decoded => write!(f, "Decoded"),
            Self::Parsed => write!(f, "Parsed"),
            Self::HandlerInvoked => write!(f, "HandlerInvoked"),
            Self::RepliedOk => write!(f, "RepliedOk"),
            Self::RepliedNo => write!(f, "RepliedNo"),
            Self::RepliedErr => write!(f, "RepliedErr"),
        }
    }
}

/// Events that move a callback between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackEvent {
    ChecksumMatched,
    ChecksumMismatched,
    PayloadDecoded,
    DecodeFailed,
    FieldsParsed,
    ParseFailed,
    HandlerCalled,
    HandlerSucceeded,
    InvoiceUnknown,
    HandlerFailed,
}

/// Callback lifecycle transitions.
///
/// Valid transitions:
/// - Received → ChecksumVerified (ChecksumMatched)
/// - Received → RepliedErr (ChecksumMismatched)
/// - ChecksumVerified → Decoded (PayloadDecoded)
/// - ChecksumVerified → RepliedErr (DecodeFailed)
/// - Decoded → Parsed (FieldsParsed)
/// - Decoded → RepliedErr (ParseFailed)
/// - Parsed → HandlerInvoked (HandlerCalled)
/// - HandlerInvoked → RepliedOk (HandlerSucceeded)
/// - HandlerInvoked → RepliedNo (InvoiceUnknown)
/// - HandlerInvoked → RepliedErr (HandlerFailed)
pub struct CallbackStateMachine;

impl CallbackStateMachine {
    /// Attempt a state transition based on an event.
    pub fn transition(
        current: CallbackState,
        event: CallbackEvent,
    ) -> Result<CallbackState, CoreError> {
        use CallbackEvent as E;
        use CallbackState as S;

        let new_state = match (current, event) {
            (S::Received, E::ChecksumMatched) => S::ChecksumVerified,
            (S::Received, E::ChecksumMismatched) => S::RepliedErr,

            (S::ChecksumVerified, E::PayloadDecoded) => S::Decoded,
            (S::ChecksumVerified, E::DecodeFailed) => S::RepliedErr,

            (S::Decoded, E::FieldsParsed) => S::Parsed,
            (S::Decoded, E::ParseFailed) => S::RepliedErr,

            (S::Parsed, E::HandlerCalled) => S::HandlerInvoked,

            (S::HandlerInvoked, E::HandlerSucceeded) => S::RepliedOk,
            (S::HandlerInvoked, E::InvoiceUnknown) => S::RepliedNo,
            (S::HandlerInvoked, E::HandlerFailed) => S::RepliedErr,

            _ => {
                let target = match event {
                    E::ChecksumMatched => S::ChecksumVerified,
                    E::PayloadDecoded => S::Decoded,
                    E::FieldsParsed => S::Parsed,
                    E::HandlerCalled => S::HandlerInvoked,
                    E::HandlerSucceeded => S::RepliedOk,
                    E::InvoiceUnknown => S::RepliedNo,
                    E::ChecksumMismatched
                    | E::DecodeFailed
                    | E::ParseFailed
                    | E::HandlerFailed => S::RepliedErr,
                };
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    to: target,
                });
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_state,
            event = ?event,
            "callback state transition"
        );

        Ok(new_state)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: CallbackState, event: CallbackEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
