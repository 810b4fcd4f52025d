use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors surfaced to the host application.
///
/// `Transport` and `GatewayRejected` never cross the session boundary as
/// bare errors; the session maps them into a `Retry` or `Failure` terminal
/// status and attaches them to the completion event. `ProtocolViolation`
/// is returned directly to the caller that misused the API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaymentError {
    #[error("transport error talking to gateway: {0}")]
    Transport(String),
    #[error("gateway rejected the payment: {0}")]
    GatewayRejected(String),
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("callback does not match any pending transaction")]
    CallbackMismatch,
    #[error("payment cancelled by host application")]
    CancelledByHost,
    #[error("user context was cleared while the payment was pending")]
    ContextCleared,
    #[error("timed out waiting for user interaction")]
    InteractionTimeout,
    #[error("authorization exceeded the limit of {0} interaction rounds")]
    InteractionLimitExceeded(usize),
    #[error("authorization data unavailable: {0}")]
    AuthorizationData(String),
    #[error("validation error: {0}")]
    Validation(String),
}

/// Error returned by the gateway port.
///
/// `Transport` covers network failures and timeouts and is retryable;
/// `Rejected` is an explicit permanent denial by the gateway.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("rejected: {0}")]
    Rejected(String),
}
