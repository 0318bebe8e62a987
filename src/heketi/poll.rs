//! Heketi asynchronous job protocol.
//!
//! State-changing requests are answered with `202 Accepted` and a `Location`
//! header naming a queue resource. Polling that resource yields:
//!
//! - `200` with `X-Pending`: the job is still running;
//! - `200` without `X-Pending`: done, result inline;
//! - `204`: done, no payload;
//! - `303`: done, result at the new `Location`.
//!
//! Anything else fails the job.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time::sleep;

use super::client::{SignedClient, encode_body};
use super::transport::{HttpResponse, HttpTransport, Method};
use super::HeketiError;
use crate::cancel::CancelToken;

/// Pause between queue polls when no override is configured.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

const PENDING_HEADER: &str = "x-pending";
const LOCATION_HEADER: &str = "location";

/// Polling cadence and bound.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    /// Pause between queue polls.
    pub interval: Duration,
    /// Give up with [`HeketiError::PollTimeout`] after this long. `None`
    /// polls until the service reports a terminal state.
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            max_wait: None,
        }
    }
}

/// Interpretation of a single queue response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum QueueStep {
    /// The job finished; this response is the result.
    Complete,
    /// The job finished; the result lives at this location.
    SeeOther(String),
    /// The job is still running.
    Pending,
    /// The response falls outside the protocol.
    Unexpected,
}

/// Classifies a queue response.
///
/// # Errors
///
/// Returns [`HeketiError::MissingLocation`] for a `303` without `Location`.
pub fn classify(response: &HttpResponse) -> Result<QueueStep, HeketiError> {
    match response.status {
        204 => Ok(QueueStep::Complete),
        303 => location(response).map(|target| QueueStep::SeeOther(target.to_owned())),
        200 if response.header(PENDING_HEADER).is_some() => Ok(QueueStep::Pending),
        200 => Ok(QueueStep::Complete),
        _ => Ok(QueueStep::Unexpected),
    }
}

fn location(response: &HttpResponse) -> Result<&str, HeketiError> {
    response
        .header(LOCATION_HEADER)
        .ok_or(HeketiError::MissingLocation {
            status: response.status,
        })
}

/// Submits async operations and waits for their terminal response.
#[derive(Debug)]
pub struct JobPoller<T> {
    client: SignedClient<T>,
    policy: PollPolicy,
    cancel: CancelToken,
}

impl<T: HttpTransport> JobPoller<T> {
    /// Wraps `client` with the default policy and a token nobody cancels.
    #[must_use]
    pub fn new(client: SignedClient<T>) -> Self {
        Self {
            client,
            policy: PollPolicy::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Overrides the polling policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Checks `cancel` before every poll.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the wrapped client for synchronous calls.
    #[must_use]
    pub const fn client(&self) -> &SignedClient<T> {
        &self.client
    }

    /// Submits `method path` and polls until the job completes.
    ///
    /// # Errors
    ///
    /// Returns [`HeketiError::Http`] when the submission or a poll is
    /// answered with 4xx/5xx, [`HeketiError::UnexpectedAsyncStatus`] when the
    /// submission is not accepted, [`HeketiError::UnexpectedQueueStatus`] for
    /// out-of-protocol queue responses, [`HeketiError::PollTimeout`] once the
    /// configured bound elapses and [`HeketiError::Cancelled`] when the
    /// cancel token fires.
    pub async fn submit(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<HttpResponse, HeketiError> {
        let response = self.client.request(method, path, body).await?;
        if response.status != 202 {
            self.client.error_for_status(method, path, &response)?;
            return Err(HeketiError::UnexpectedAsyncStatus {
                method,
                status: response.status,
            });
        }

        let locator = self.client.path_from_location(location(&response)?).to_owned();
        self.poll(&locator).await
    }

    /// Submits `POST path` with a JSON body; see [`JobPoller::submit`].
    ///
    /// # Errors
    ///
    /// See [`JobPoller::submit`]; also [`HeketiError::Encode`].
    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<HttpResponse, HeketiError> {
        let value = encode_body(body)?;
        self.submit(Method::Post, path, Some(value)).await
    }

    /// Submits `DELETE path`; see [`JobPoller::submit`].
    ///
    /// # Errors
    ///
    /// See [`JobPoller::submit`].
    pub async fn delete(&self, path: &str) -> Result<HttpResponse, HeketiError> {
        self.submit(Method::Delete, path, None).await
    }

    async fn poll(&self, locator: &str) -> Result<HttpResponse, HeketiError> {
        let started = Instant::now();
        loop {
            if self.cancel.is_cancelled() {
                return Err(HeketiError::Cancelled {
                    locator: locator.to_owned(),
                });
            }

            let response = self.client.get(locator).await?;
            match classify(&response)? {
                QueueStep::Complete => return Ok(response),
                QueueStep::SeeOther(target) => {
                    let path = self.client.path_from_location(&target);
                    return self.client.get(path).await;
                }
                QueueStep::Pending => {}
                QueueStep::Unexpected => {
                    self.client
                        .error_for_status(Method::Get, locator, &response)?;
                    return Err(HeketiError::UnexpectedQueueStatus {
                        status: response.status,
                    });
                }
            }

            if let Some(max_wait) = self.policy.max_wait
                && started.elapsed() >= max_wait
            {
                return Err(HeketiError::PollTimeout {
                    locator: locator.to_owned(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            sleep(self.policy.interval).await;
        }
    }
}
