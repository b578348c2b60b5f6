//! # Error types used by the broker.
//!
//! [`BrokerError`] covers every failure the broker reports at its
//! boundary. None of them are retried internally; all are surfaced
//! synchronously to the calling path (producer, subscriber, or
//! responder).
//!
//! Transports map errors onto their native status codes via
//! [`BrokerError::code`]; `as_label` provides a short stable label for
//! logs and metrics.

use thiserror::Error;

/// Transport-facing error category.
///
/// The broker itself is transport-agnostic; a binding translates these
/// categories into its own codes (gRPC statuses, HTTP codes, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The broker is at capacity.
    ResourceExhausted,
    /// A channel was observed closed; the call cannot complete.
    Aborted,
    /// The referenced request no longer exists (or never did).
    DeadlineExceeded,
    /// The payload does not fit the original request.
    InvalidArgument,
    /// Forwarding to the subscriber's stream failed.
    Internal,
    /// The caller's own context ended the call.
    Cancelled,
}

/// Errors produced by the broker.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The pending table is full; the notification was not dispatched
    /// and no fan-out occurred.
    #[error("max number of pending notifications exceeded")]
    PendingLimitExceeded,

    /// A response channel or subscriber queue was observed closed,
    /// typically because the broker shut down or the subscription was
    /// evicted.
    #[error("channel closed")]
    Aborted,

    /// A response referenced an unknown request id. Covers both ids that
    /// never existed and requests already resolved or cancelled; the
    /// caller cannot distinguish the two, and both are benign.
    #[error("invalid or late response to notification")]
    StaleResponse,

    /// A response's shape does not match the original request. The
    /// pending entry is left untouched.
    #[error("response does not match the original request")]
    InvalidResponse,

    /// Forwarding a notification to the subscriber's stream failed; the
    /// subscription is torn down.
    #[error("sending notification failed: {reason}")]
    DeliveryFailed {
        /// What the sink reported.
        reason: String,
    },

    /// The caller's context was cancelled while the call was in flight.
    #[error("context canceled")]
    Canceled,
}

impl BrokerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::PendingLimitExceeded => "pending_limit_exceeded",
            BrokerError::Aborted => "aborted",
            BrokerError::StaleResponse => "stale_response",
            BrokerError::InvalidResponse => "invalid_response",
            BrokerError::DeliveryFailed { .. } => "delivery_failed",
            BrokerError::Canceled => "canceled",
        }
    }

    /// Returns the transport-facing category of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BrokerError::PendingLimitExceeded => ErrorCode::ResourceExhausted,
            BrokerError::Aborted => ErrorCode::Aborted,
            BrokerError::StaleResponse => ErrorCode::DeadlineExceeded,
            BrokerError::InvalidResponse => ErrorCode::InvalidArgument,
            BrokerError::DeliveryFailed { .. } => ErrorCode::Internal,
            BrokerError::Canceled => ErrorCode::Cancelled,
        }
    }
}
