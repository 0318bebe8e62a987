//! Errors raised while talking to the Heketi service.

use thiserror::Error;

use super::Method;
use super::token::TokenError;

/// Errors raised by the signed client and the job poller.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum HeketiError {
    /// Raised when the HTTP exchange itself fails.
    #[error("Heketi {method} {url} failed: {message}")]
    Transport {
        /// Request verb.
        method: Method,
        /// Absolute request URL.
        url: String,
        /// Error reported by the HTTP stack.
        message: String,
    },
    /// Raised when the service answers with a 4xx or 5xx status.
    #[error("Heketi {method} {url} returned HTTP {status}: {body}")]
    Http {
        /// Request verb.
        method: Method,
        /// Absolute request URL.
        url: String,
        /// Status code.
        status: u16,
        /// Response body, usually the server's error text.
        body: String,
    },
    /// Raised when an async submission is answered with a non-error status
    /// other than `202 Accepted`.
    #[error("Unexpected Heketi async {method} status {status}")]
    UnexpectedAsyncStatus {
        /// Request verb of the submission.
        method: Method,
        /// Status code received.
        status: u16,
    },
    /// Raised when the job queue answers with a non-error status outside the
    /// async protocol.
    #[error("Unexpected Heketi async queue status {status}")]
    UnexpectedQueueStatus {
        /// Status code received.
        status: u16,
    },
    /// Raised when a response that must redirect lacks a `Location` header.
    #[error("Heketi response with status {status} has no Location header")]
    MissingLocation {
        /// Status code of the response missing the header.
        status: u16,
    },
    /// Raised when a response body cannot be decoded.
    #[error("failed to decode {context} response: {message}")]
    Decode {
        /// What was being decoded, for example `cluster list`.
        context: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when a request body cannot be serialised.
    #[error("failed to encode request body: {message}")]
    Encode {
        /// Serialiser error message.
        message: String,
    },
    /// Raised when a request token cannot be minted.
    #[error("failed to sign request: {0}")]
    Token(#[from] TokenError),
    /// Raised when a job is still pending after the configured wait bound.
    #[error("Heketi job {locator} still pending after {waited_secs}s")]
    PollTimeout {
        /// Queue locator being polled.
        locator: String,
        /// Seconds spent polling before giving up.
        waited_secs: u64,
    },
    /// Raised when polling is interrupted by a cancellation request.
    #[error("Heketi job {locator} polling cancelled")]
    Cancelled {
        /// Queue locator being polled.
        locator: String,
    },
}
