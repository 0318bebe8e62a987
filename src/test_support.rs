//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::rc::Rc;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, MutexGuard};

use crate::heketi::{HttpRequest, HttpResponse, HttpTransport, TransportError, TransportFuture};
use crate::remote::{CommandOutput, CommandRunner, ExecError};
use crate::report::{Reporter, SharedReporter};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }

    /// Returns the final argument, which carries the shell command.
    #[must_use]
    pub fn shell_command(&self) -> String {
        self.args
            .last()
            .map(|arg| arg.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes a successful exit status with empty output.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes a successful exit status that prints `stdout`.
    pub fn push_stdout(&self, stdout: impl Into<String>) {
        self.push_output(Some(0), stdout, "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), "", "simulated failure");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ExecError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| ExecError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Scripted HTTP transport that answers requests in FIFO order.
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransport {
    responses: Rc<RefCell<VecDeque<Result<HttpResponse, TransportError>>>>,
    requests: Rc<RefCell<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    /// Creates a transport with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `response`.
    pub fn push(&self, response: HttpResponse) {
        self.responses.borrow_mut().push_back(Ok(response));
    }

    /// Queues a `200 OK` with a JSON body.
    pub fn push_json(&self, body: &serde_json::Value) {
        self.push(HttpResponse::new(200).with_body(body.to_string()));
    }

    /// Queues a `202 Accepted` pointing at `location`.
    pub fn push_accepted(&self, location: &str) {
        self.push(HttpResponse::new(202).with_header("Location", location));
    }

    /// Queues a `200 OK` carrying the `X-Pending` marker.
    pub fn push_pending(&self) {
        self.push(HttpResponse::new(200).with_header("X-Pending", "true"));
    }

    /// Queues a `204 No Content`.
    pub fn push_no_content(&self) {
        self.push(HttpResponse::new(204));
    }

    /// Queues a `303 See Other` pointing at `location`.
    pub fn push_see_other(&self, location: &str) {
        self.push(HttpResponse::new(303).with_header("Location", location));
    }

    /// Queues a transport-level failure.
    pub fn push_transport_error(&self, message: &str) {
        self.responses.borrow_mut().push_back(Err(TransportError {
            message: message.to_owned(),
        }));
    }

    /// Queues the exchanges of an async job that completes with a `303`
    /// redirect to `result_path`, whose `GET` returns `body`.
    pub fn push_async_result(&self, queue: &str, result_path: &str, body: &serde_json::Value) {
        self.push_accepted(queue);
        self.push_see_other(result_path);
        self.push_json(body);
    }

    /// Queues the exchanges of an async job that completes with `204`.
    pub fn push_async_done(&self, queue: &str) {
        self.push_accepted(queue);
        self.push_no_content();
    }

    /// Returns a snapshot of every request sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    /// Returns the number of responses not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.responses.borrow().len()
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
        let url = request.url.clone();
        self.requests.borrow_mut().push(request);
        let next = self.responses.borrow_mut().pop_front();
        Box::pin(async move {
            next.unwrap_or_else(|| {
                Err(TransportError {
                    message: format!("no scripted response available for {url}"),
                })
            })
        })
    }
}

/// Reporter that keeps every message for later assertions.
#[derive(Clone, Debug, Default)]
pub struct RecordingReporter {
    messages: Arc<StdMutex<Vec<String>>>,
}

impl RecordingReporter {
    /// Creates an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a shared handle suitable for component constructors.
    #[must_use]
    pub fn shared(&self) -> SharedReporter {
        Arc::new(self.clone())
    }

    /// Returns a snapshot of the recorded messages.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, message: &str) {
        if let Ok(mut guard) = self.messages.lock() {
            guard.push(message.to_owned());
        }
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and cleans up variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
