//! Binary entry point for the `heketi-setup` CLI.

mod cli;

use std::io::{self, Write};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use heketi_setup::heketi::{
    CallLog, HttpTransport, JobPoller, RecordingTransport, ReqwestTransport, SignedClient,
    TokenSigner,
};
use heketi_setup::{
    Action, CancelToken, Config, ConfigError, Outcome, ProvisionError, Provisioner,
    RemoteExecutor, SharedReporter, ToolConfig, TracingReporter, report,
};

use cli::{ActionArg, Cli};


#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to initialise logging: {0}")]
    Logging(String),
    #[error("failed to build HTTP client: {0}")]
    Transport(String),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

impl From<ActionArg> for Action {
    fn from(value: ActionArg) -> Self {
        match value {
            ActionArg::Setup => Self::Setup,
            ActionArg::Teardown => Self::Teardown,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let exit_code = match execute(cli).await {
        Ok(outcome) => {
            write_outcome(io::stdout(), &outcome);
            0
        }
        Err(err) => {
            write_error(io::stderr(), &err);
            1
        }
    };

    process::exit(exit_code);
}

async fn execute(cli: Cli) -> Result<Outcome, CliError> {
    init_tracing(cli.verbose)?;
    let defaults = ToolConfig::load_without_cli_args()?;
    defaults.validate()?;
    let config = build_config(&cli, &defaults)?;

    let cancel = CancelToken::new();
    spawn_interrupt_handler(cancel.clone());
    let reporter: SharedReporter = if cli.verbose {
        Arc::new(TracingReporter)
    } else {
        report::silent()
    };

    let transport =
        ReqwestTransport::new().map_err(|err| CliError::Transport(err.message))?;
    if cli.debug {
        let recording = RecordingTransport::new(transport);
        let log = recording.log();
        let result = provision(recording, &config, cancel, reporter).await;
        write_call_log(io::stderr(), &log);
        result
    } else {
        provision(transport, &config, cancel, reporter).await
    }
}

fn init_tracing(verbose: bool) -> Result<(), CliError> {
    let level = if verbose { Level::INFO } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| CliError::Logging(err.to_string()))
}

fn spawn_interrupt_handler(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(target: "heketi_setup", "interrupt received, stopping before the next step");
            cancel.cancel();
        }
    });
}

/// Merges CLI flags over layered defaults. Flags win when given.
fn build_config(cli: &Cli, defaults: &ToolConfig) -> Result<Config, CliError> {
    let user = cli.user.as_ref().unwrap_or(&defaults.ssh_user);
    let key = cli.key.as_ref().or(defaults.ssh_key.as_ref());
    let poll_interval_ms = cli.poll_interval_ms.unwrap_or(defaults.poll_interval_ms);
    let poll_timeout_secs = cli.poll_timeout_secs.or(defaults.poll_timeout_secs);

    let config = defaults
        .config_builder(cli.action.into())
        .hosts(cli.hosts.clone())
        .cluster(cli.cluster.clone())
        .devices(cli.devices.unwrap_or_default())
        .size(cli.size.clone())
        .service_url(cli.heketi.as_ref().unwrap_or(&defaults.service_url))
        .jwt_key(cli.jwt.clone().or_else(|| defaults.jwt_key.clone()))
        .ssh_user(Some(user.clone()))
        .ssh_key(key.map(Utf8PathBuf::from))
        .root(cli.root || defaults.root)
        .poll_interval(Duration::from_millis(poll_interval_ms))
        .poll_timeout(poll_timeout_secs.map(Duration::from_secs))
        .build()?;
    Ok(config)
}

async fn provision<T: HttpTransport>(
    transport: T,
    config: &Config,
    cancel: CancelToken,
    reporter: SharedReporter,
) -> Result<Outcome, CliError> {
    let mut client =
        SignedClient::new(&config.service_url, transport).with_reporter(reporter.clone());
    if let Some(ref key) = config.jwt_key {
        client = client.with_signer(TokenSigner::new(key).with_lifetime(config.token_lifetime));
    }
    let poller = JobPoller::new(client)
        .with_policy(config.poll)
        .with_cancel_token(cancel.clone());
    let executor =
        RemoteExecutor::with_process_runner(config.shell.clone()).with_reporter(reporter.clone());
    let provisioner = Provisioner::new(poller, executor)
        .with_cancel_token(cancel)
        .with_reporter(reporter);

    Ok(provisioner.run(config).await?)
}

fn write_outcome(mut target: impl Write, outcome: &Outcome) {
    let written = match outcome {
        Outcome::Setup(summary) => writeln!(
            target,
            "Cluster {}: added {} nodes with {} devices",
            summary.cluster,
            summary.nodes.len(),
            summary.devices
        ),
        Outcome::Teardown(summary) => writeln!(
            target,
            "Cluster {} removed: {} volumes, {} devices, {} nodes",
            summary.cluster, summary.volumes, summary.devices, summary.nodes
        ),
    };
    written.ok();
}

fn write_call_log(mut target: impl Write, log: &CallLog) {
    target.write_all(log.render().as_bytes()).ok();
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
