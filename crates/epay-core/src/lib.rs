pub mod error;
pub mod types;
pub mod encoding;
pub mod checksum;
pub mod payment_request;
pub mod callback;
pub mod state_machine;
pub mod client;
pub mod config;

pub use error::CoreError;
pub use types::{Currency, Environment, Language, PaymentPage, PaymentStatus};
pub use checksum::{sign, verify};
pub use payment_request::{PaymentOption, PaymentRequest, PaymentRequestBuilder};
pub use callback::{
    parse_callback, process_callback, CallbackOutcome, CallbackReply, HandlerError, ParseIssue,
    ParsedCallback, Payment, PaymentHandler, ReplyStatus,
};
pub use state_machine::{CallbackEvent, CallbackState, CallbackStateMachine};
pub use client::{EpayClient, EpayClientBuilder};
pub use config::GatewayConfig;
