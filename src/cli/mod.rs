//! Command-line interface definitions for the `heketi-setup` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Parser, ValueEnum};

/// Top-level CLI for the `heketi-setup` binary.
#[derive(Debug, Parser)]
#[command(
    name = "heketi-setup",
    about = "Set up or tear down a Heketi GlusterFS cluster on loop devices",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Storage hosts to manage; `localhost` runs commands in a local shell.
    #[arg(required = true, value_name = "HOST")]
    pub(crate) hosts: Vec<String>,
    /// Report every host command and Heketi exchange.
    #[arg(short = 'v', long)]
    pub(crate) verbose: bool,
    /// Heketi service URL [default: http://localhost:8080].
    #[arg(short = 'H', long, value_name = "URL")]
    pub(crate) heketi: Option<String>,
    /// Size of each loop device created, for example `10G`.
    #[arg(short = 's', long, value_name = "SIZE")]
    pub(crate) size: Option<String>,
    /// Number of loop devices created per host.
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub(crate) devices: Option<u32>,
    /// Heketi cluster to use.
    #[arg(short = 'c', long, value_name = "ID")]
    pub(crate) cluster: Option<String>,
    /// Key used to sign Heketi request tokens.
    #[arg(short = 'j', long, value_name = "KEY")]
    pub(crate) jwt: Option<String>,
    /// User with which hosts are managed [default: heketi].
    #[arg(short = 'u', long, value_name = "USER")]
    pub(crate) user: Option<String>,
    /// SSH key used to log in to remote hosts.
    #[arg(short = 'k', long, value_name = "PATH")]
    pub(crate) key: Option<String>,
    /// The login user already has root privileges.
    #[arg(long)]
    pub(crate) root: bool,
    /// Workflow to run.
    #[arg(short = 'A', long, value_enum, default_value_t = ActionArg::Setup)]
    pub(crate) action: ActionArg,
    /// Dump every Heketi request and response to stderr on exit.
    #[arg(short = 'D', long)]
    pub(crate) debug: bool,
    /// Pause between async job polls, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub(crate) poll_interval_ms: Option<u64>,
    /// Give up on a pending async job after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub(crate) poll_timeout_secs: Option<u64>,
}

/// Values accepted by `--action`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum ActionArg {
    /// Create loop devices and register them with Heketi.
    Setup,
    /// Remove the cluster and reclaim its loop devices.
    Teardown,
}
