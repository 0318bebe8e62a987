//! Transport decorator that keeps an ordered log of every exchange.
//!
//! The binary wraps its transport in [`RecordingTransport`] under `--debug`
//! and dumps the [`CallLog`] on exit, successful or not.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use super::transport::{
    HttpRequest, HttpResponse, HttpTransport, TransportError, TransportFuture,
};

/// One recorded exchange.
#[derive(Clone, Debug, PartialEq)]
pub struct CallRecord {
    /// Request as handed to the transport.
    pub request: HttpRequest,
    /// Response, or the transport failure.
    pub outcome: Result<HttpResponse, TransportError>,
}

/// Shared, ordered log of recorded exchanges. Clones share storage.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    entries: Rc<RefCell<Vec<CallRecord>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every record in call order.
    #[must_use]
    pub fn entries(&self) -> Vec<CallRecord> {
        self.entries.borrow().clone()
    }

    /// Returns the number of recorded exchanges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Renders the log as numbered request/response pairs.
    ///
    /// Authorization header values are redacted.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (index, record) in self.entries.borrow().iter().enumerate() {
            let request = &record.request;
            writeln!(out, "{index} {} {}", request.method, request.url).ok();
            for (name, value) in &request.headers {
                let shown = if name.eq_ignore_ascii_case("authorization") {
                    "<redacted>"
                } else {
                    value.as_str()
                };
                writeln!(out, "  > {name}: {shown}").ok();
            }
            if let Some(ref body) = request.body {
                writeln!(out, "  > {body}").ok();
            }
            match record.outcome {
                Ok(ref response) => {
                    writeln!(out, "  < HTTP {}", response.status).ok();
                    for (name, value) in &response.headers {
                        writeln!(out, "  < {name}: {value}").ok();
                    }
                    if !response.body.is_empty() {
                        writeln!(out, "  < {}", response.body).ok();
                    }
                }
                Err(ref err) => {
                    writeln!(out, "  ! {err}").ok();
                }
            }
        }
        out
    }

    fn push(&self, record: CallRecord) {
        self.entries.borrow_mut().push(record);
    }
}

/// Wraps a transport and appends every exchange to a [`CallLog`].
#[derive(Clone, Debug)]
pub struct RecordingTransport<T> {
    inner: T,
    log: CallLog,
}

impl<T: HttpTransport> RecordingTransport<T> {
    /// Wraps `inner` with a fresh log.
    #[must_use]
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            log: CallLog::new(),
        }
    }

    /// Returns a handle to the shared log.
    #[must_use]
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl<T: HttpTransport> HttpTransport for RecordingTransport<T> {
    fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            let outcome = self.inner.send(request.clone()).await;
            self.log.push(CallRecord {
                request,
                outcome: outcome.clone(),
            });
            outcome
        })
    }
}
