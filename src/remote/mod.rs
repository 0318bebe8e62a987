//! Shell command execution on the local machine or a remote host over SSH.
//!
//! Commands targeting `localhost` run through `sh -c`; every other host is
//! reached with the system `ssh` client. Unless the configured login is
//! already root, commands are wrapped in `sudo sh -c '<command>'` with the
//! original command quoted as a single shell word.

use std::ffi::OsString;

use camino::Utf8PathBuf;
use shell_escape::unix::escape;

use crate::report::{self, SharedReporter};

mod error;
mod types;
mod util;

pub use error::ExecError;
pub use types::{CommandOutput, CommandRunner, ProcessCommandRunner, RemoteOutput};
pub use util::expand_tilde;

/// Host name that selects the local shell instead of SSH.
pub const LOCALHOST: &str = "localhost";

/// Default SSH client binary.
pub const DEFAULT_SSH_BIN: &str = "ssh";

const LOCAL_SHELL: &str = "sh";

/// Login and privilege settings shared by every host in a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShellSettings {
    /// Path to the `ssh` executable.
    pub ssh_bin: String,
    /// Login user passed with `-l`; SSH picks its default when unset.
    pub user: Option<String>,
    /// Identity file passed with `-i`. Supports `~/` expansion.
    pub identity_file: Option<Utf8PathBuf>,
    /// Whether the login already has root privileges. When `false`,
    /// commands are escalated through `sudo`.
    pub root: bool,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            ssh_bin: DEFAULT_SSH_BIN.to_owned(),
            user: None,
            identity_file: None,
            root: false,
        }
    }
}

/// Runs commands on a target host and fails on non-zero exit.
#[derive(Clone, Debug)]
pub struct RemoteExecutor<R: CommandRunner> {
    settings: ShellSettings,
    runner: R,
    reporter: SharedReporter,
}

impl RemoteExecutor<ProcessCommandRunner> {
    /// Convenience constructor that wires the real process runner.
    #[must_use]
    pub fn with_process_runner(settings: ShellSettings) -> Self {
        Self::new(settings, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> RemoteExecutor<R> {
    /// Creates an executor that reports nothing.
    #[must_use]
    pub fn new(settings: ShellSettings, runner: R) -> Self {
        Self {
            settings,
            runner,
            reporter: report::silent(),
        }
    }

    /// Replaces the progress reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: SharedReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Returns the settings used to build invocations.
    #[must_use]
    pub const fn settings(&self) -> &ShellSettings {
        &self.settings
    }

    /// Executes `command` on `host` and returns its captured output.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Spawn`] when the shell or SSH client cannot be
    /// started and [`ExecError::CommandFailure`] when the command exits with
    /// a non-zero status or without one.
    pub fn execute(&self, host: &str, command: &str) -> Result<RemoteOutput, ExecError> {
        let effective = self.privileged(command);
        self.reporter
            .report(&format!("Running on {host}: {effective}"));

        let (program, args) = self.invocation(host, &effective);
        let output = self.runner.run(&program, &args)?;
        if !output.stdout.is_empty() {
            self.reporter
                .report(&format!("Command output: {}", output.stdout));
        }

        if output.is_success() {
            return Ok(RemoteOutput {
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        let status_text = output
            .code
            .map_or_else(|| String::from("unknown"), |code| code.to_string());
        Err(ExecError::CommandFailure {
            host: host.to_owned(),
            command: render_command_line(&program, &args),
            exit_code: output.code,
            status_text,
            stderr: output.stderr,
        })
    }

    fn privileged(&self, command: &str) -> String {
        if self.settings.root {
            command.to_owned()
        } else {
            format!("sudo sh -c {}", escape(command.into()))
        }
    }

    fn invocation(&self, host: &str, command: &str) -> (String, Vec<OsString>) {
        if host == LOCALHOST {
            return (
                LOCAL_SHELL.to_owned(),
                vec![OsString::from("-c"), OsString::from(command)],
            );
        }

        let mut args = Vec::new();
        if let Some(ref user) = self.settings.user {
            args.push(OsString::from("-l"));
            args.push(OsString::from(user));
        }
        if let Some(ref identity_file) = self.settings.identity_file {
            args.push(OsString::from("-i"));
            args.push(OsString::from(expand_tilde(identity_file)));
        }
        args.push(OsString::from(host));
        args.push(OsString::from(command));
        (self.settings.ssh_bin.clone(), args)
    }
}

fn render_command_line(program: &str, args: &[OsString]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(program.to_owned());
    parts.extend(args.iter().map(|arg| arg.to_string_lossy().into_owned()));
    parts.join(" ")
}
