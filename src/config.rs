//! Configuration loading via `ortho-config` and the immutable run [`Config`].
//!
//! [`ToolConfig`] carries defaults layered from configuration files and
//! `HEKETI_SETUP_*` environment variables. The CLI seeds a [`ConfigBuilder`]
//! from it, applies its flags, and builds the validated [`Config`] handed to
//! the orchestrator.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::heketi::{DEFAULT_RETRY_INTERVAL, DEFAULT_SERVICE_URL, PollPolicy};
use crate::heketi::token::DEFAULT_TOKEN_LIFETIME;
use crate::remote::{DEFAULT_SSH_BIN, ShellSettings};

/// Login used on storage hosts when none is configured.
pub const DEFAULT_SSH_USER: &str = "heketi";

/// Workflow selected on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    /// Create loop devices and register them with Heketi.
    Setup,
    /// Remove volumes, devices, nodes, and the cluster, then reclaim loop
    /// devices.
    Teardown,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Setup => "setup",
            Self::Teardown => "teardown",
        })
    }
}

/// Defaults derived from configuration files and environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "HEKETI_SETUP")]
pub struct ToolConfig {
    /// Heketi service URL.
    #[ortho_config(default = DEFAULT_SERVICE_URL.to_owned())]
    pub service_url: String,
    /// Shared secret used to sign request tokens. Requests are unsigned
    /// when absent.
    pub jwt_key: Option<String>,
    /// Login user on storage hosts.
    #[ortho_config(default = DEFAULT_SSH_USER.to_owned())]
    pub ssh_user: String,
    /// SSH identity file. Supports `~/` expansion.
    pub ssh_key: Option<String>,
    /// Path to the `ssh` executable.
    #[ortho_config(default = DEFAULT_SSH_BIN.to_owned())]
    pub ssh_bin: String,
    /// Whether the login user already has root privileges.
    #[ortho_config(default = false)]
    pub root: bool,
    /// Pause between async job polls, in milliseconds.
    #[ortho_config(default = 1000)]
    pub poll_interval_ms: u64,
    /// Give up on a pending job after this many seconds. Unbounded when
    /// absent.
    pub poll_timeout_secs: Option<u64>,
    /// Validity window of request tokens, in seconds.
    #[ortho_config(default = 300)]
    pub token_lifetime_secs: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl ToolConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to heketi-setup.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("heketi-setup")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::Invalid`] when the poll interval is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.service_url,
            &FieldMetadata::new(
                "Heketi service URL",
                "HEKETI_SETUP_SERVICE_URL",
                "service_url",
            ),
        )?;
        Self::require_field(
            &self.ssh_bin,
            &FieldMetadata::new("SSH client binary", "HEKETI_SETUP_SSH_BIN", "ssh_bin"),
        )?;
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: String::from("poll_interval_ms"),
                reason: String::from("must be greater than zero"),
            });
        }
        Ok(())
    }

    /// Starts a [`ConfigBuilder`] seeded with these defaults.
    #[must_use]
    pub fn config_builder(&self, action: Action) -> ConfigBuilder {
        ConfigBuilder::new(action)
            .service_url(&self.service_url)
            .jwt_key(self.jwt_key.clone())
            .ssh_user(Some(self.ssh_user.clone()))
            .ssh_key(self.ssh_key.clone().map(Utf8PathBuf::from))
            .ssh_bin(&self.ssh_bin)
            .root(self.root)
            .poll_interval(Duration::from_millis(self.poll_interval_ms))
            .poll_timeout(self.poll_timeout_secs.map(Duration::from_secs))
            .token_lifetime(Duration::from_secs(self.token_lifetime_secs))
    }
}

/// Immutable inputs for one setup or teardown run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Workflow to run.
    pub action: Action,
    /// Cluster to use. Setup creates one when unset; teardown requires it.
    pub cluster: Option<String>,
    /// Storage hosts, in processing order.
    pub hosts: Vec<String>,
    /// Loop devices to create per host during setup.
    pub devices: u32,
    /// Backing file size passed to `truncate -s`, for example `10G`.
    pub size: Option<String>,
    /// Heketi service URL.
    pub service_url: String,
    /// Shared secret for request tokens.
    pub jwt_key: Option<String>,
    /// Login and privilege settings for host commands.
    pub shell: ShellSettings,
    /// Async job polling cadence and bound.
    pub poll: PollPolicy,
    /// Validity window of request tokens.
    pub token_lifetime: Duration,
}

impl Config {
    /// Starts a builder with library defaults.
    #[must_use]
    pub fn builder(action: Action) -> ConfigBuilder {
        ConfigBuilder::new(action)
    }

    /// Returns the first host named more than once.
    #[must_use]
    pub fn repeated_host(&self) -> Option<&str> {
        let mut seen = BTreeSet::new();
        self.hosts
            .iter()
            .map(String::as_str)
            .find(|host| !seen.insert(*host))
    }

    /// Checks that the fields the selected action relies on are present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] naming the flag to pass, or
    /// [`ConfigError::Invalid`] for malformed values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hosts.is_empty() {
            return Err(missing("storage host", "HOST"));
        }
        if self.hosts.iter().any(|host| host.is_empty()) {
            return Err(ConfigError::Invalid {
                field: String::from("host"),
                reason: String::from("host names must not be blank"),
            });
        }
        if let Some(host) = self.repeated_host() {
            return Err(ConfigError::Invalid {
                field: String::from("host"),
                reason: format!("{host} is listed more than once"),
            });
        }
        if self.service_url.is_empty() {
            return Err(missing("Heketi service URL", "--heketi"));
        }
        if self.jwt_key.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Invalid {
                field: String::from("jwt_key"),
                reason: String::from("signing key must not be blank"),
            });
        }
        if self.poll.interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: String::from("poll_interval"),
                reason: String::from("must be greater than zero"),
            });
        }

        match self.action {
            Action::Setup => {
                if self.size.is_none() {
                    return Err(missing("device size", "--size"));
                }
                if self.devices == 0 {
                    return Err(missing("device count", "--devices"));
                }
            }
            Action::Teardown => {
                if self.cluster.is_none() {
                    return Err(missing("cluster to tear down", "--cluster"));
                }
            }
        }
        Ok(())
    }
}

fn missing(description: &str, flag: &str) -> ConfigError {
    ConfigError::MissingField(format!("missing {description}: pass {flag}"))
}

/// Builder for [`Config`] that trims inputs and validates on build.
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    action: Action,
    cluster: Option<String>,
    hosts: Vec<String>,
    devices: u32,
    size: Option<String>,
    service_url: String,
    jwt_key: Option<String>,
    shell: ShellSettings,
    poll: PollPolicy,
    token_lifetime: Duration,
}

impl ConfigBuilder {
    /// Creates a builder with library defaults for `action`.
    #[must_use]
    pub fn new(action: Action) -> Self {
        Self {
            action,
            cluster: None,
            hosts: Vec::new(),
            devices: 0,
            size: None,
            service_url: DEFAULT_SERVICE_URL.to_owned(),
            jwt_key: None,
            shell: ShellSettings {
                user: Some(DEFAULT_SSH_USER.to_owned()),
                ..ShellSettings::default()
            },
            poll: PollPolicy {
                interval: DEFAULT_RETRY_INTERVAL,
                max_wait: None,
            },
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
        }
    }

    /// Sets the cluster id.
    #[must_use]
    pub fn cluster(mut self, value: Option<String>) -> Self {
        self.cluster = value;
        self
    }

    /// Sets the storage hosts.
    #[must_use]
    pub fn hosts(mut self, value: Vec<String>) -> Self {
        self.hosts = value;
        self
    }

    /// Sets the number of loop devices per host.
    #[must_use]
    pub const fn devices(mut self, value: u32) -> Self {
        self.devices = value;
        self
    }

    /// Sets the backing file size.
    #[must_use]
    pub fn size(mut self, value: Option<String>) -> Self {
        self.size = value;
        self
    }

    /// Sets the Heketi service URL.
    #[must_use]
    pub fn service_url(mut self, value: impl Into<String>) -> Self {
        self.service_url = value.into();
        self
    }

    /// Sets the token signing key.
    #[must_use]
    pub fn jwt_key(mut self, value: Option<String>) -> Self {
        self.jwt_key = value;
        self
    }

    /// Sets the SSH login user.
    #[must_use]
    pub fn ssh_user(mut self, value: Option<String>) -> Self {
        self.shell.user = value;
        self
    }

    /// Sets the SSH identity file.
    #[must_use]
    pub fn ssh_key(mut self, value: Option<Utf8PathBuf>) -> Self {
        self.shell.identity_file = value;
        self
    }

    /// Sets the SSH client binary.
    #[must_use]
    pub fn ssh_bin(mut self, value: impl Into<String>) -> Self {
        self.shell.ssh_bin = value.into();
        self
    }

    /// Marks the login as root-capable, disabling `sudo` wrapping.
    #[must_use]
    pub const fn root(mut self, value: bool) -> Self {
        self.shell.root = value;
        self
    }

    /// Sets the pause between job polls.
    #[must_use]
    pub const fn poll_interval(mut self, value: Duration) -> Self {
        self.poll.interval = value;
        self
    }

    /// Bounds how long a single job may stay pending.
    #[must_use]
    pub const fn poll_timeout(mut self, value: Option<Duration>) -> Self {
        self.poll.max_wait = value;
        self
    }

    /// Sets the token validity window.
    #[must_use]
    pub const fn token_lifetime(mut self, value: Duration) -> Self {
        self.token_lifetime = value;
        self
    }

    /// Builds and validates the [`Config`], trimming string inputs and
    /// treating blank optional values as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when [`Config::validate`] rejects the result.
    pub fn build(self) -> Result<Config, ConfigError> {
        let config = Config {
            action: self.action,
            cluster: trimmed(self.cluster),
            hosts: self
                .hosts
                .into_iter()
                .map(|host| host.trim().to_owned())
                .collect(),
            devices: self.devices,
            size: trimmed(self.size),
            service_url: self.service_url.trim().to_owned(),
            jwt_key: self.jwt_key,
            shell: ShellSettings {
                user: trimmed(self.shell.user),
                ..self.shell
            },
            poll: self.poll,
            token_lifetime: self.token_lifetime,
        };
        config.validate()?;
        Ok(config)
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a field holds an unusable value.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Field that failed validation.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
