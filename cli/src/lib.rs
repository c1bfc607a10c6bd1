mod catalog_cmd;
mod check_cmd;
mod obtain_cmd;

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use clap::Parser;
use pkauth_core::Authority;
use pkauth_core::Config;
use pkauth_core::ProcessSelector;

pub use catalog_cmd::DescribeCommand;
pub use check_cmd::CheckCommand;
pub use obtain_cmd::ObtainCommand;

/// Query and obtain authorization for privileged actions.
#[derive(Debug, Parser)]
#[clap(author, version, bin_name = "pkauth")]
pub struct Cli {
    #[clap(flatten)]
    pub overrides: ConfigOverrides,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Print every action the authorization service knows, one per line.
    List,

    /// Print the metadata of one action.
    Describe(DescribeCommand),

    /// Check which actions a process is authorized for right now.
    ///
    /// Exits 0 only if every requested action is authorized.
    Check(CheckCommand),

    /// Obtain authorization for one action, prompting if necessary.
    ///
    /// Exits 0 when granted, 1 when denied and 2 when no answer could be
    /// obtained.
    Obtain(ObtainCommand),
}

/// Settings that take precedence over the config file.
#[derive(Debug, Default, Args)]
pub struct ConfigOverrides {
    /// Config file to read instead of `$PKAUTH_CONFIG` or
    /// `/etc/pkauth/config.toml`.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Socket of the authority bridge.
    #[arg(long, value_name = "PATH", global = true)]
    pub socket: Option<PathBuf>,

    /// Deadline for catalog and check calls to the authorization service.
    #[arg(long = "timeout-ms", value_name = "MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Deadline for the agent dialog and the local helper prompt.
    #[arg(long = "interactive-timeout-ms", value_name = "MS", global = true)]
    pub interactive_timeout_ms: Option<u64>,
}

impl ConfigOverrides {
    pub fn load(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from_path(path)?,
            None => Config::load().context("failed to load pkauth config")?,
        };
        if let Some(socket) = &self.socket {
            config.socket_path = socket.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(interactive_timeout_ms) = self.interactive_timeout_ms {
            config.interactive_timeout_ms = interactive_timeout_ms;
        }
        Ok(config)
    }
}

/// The process a check or escalation is about. Defaults to `pkauth` itself.
#[derive(Debug, Default, Args)]
pub struct SubjectArgs {
    /// Act for this process instead.
    #[arg(long, value_name = "PID", conflicts_with = "parent")]
    pub pid: Option<u32>,

    /// Act for the parent process, e.g. when run from a setuid wrapper.
    #[arg(long)]
    pub parent: bool,
}

impl SubjectArgs {
    pub fn selector(&self) -> ProcessSelector {
        match (self.pid, self.parent) {
            (Some(pid), _) => ProcessSelector::Pid(pid),
            (None, true) => ProcessSelector::Parent,
            (None, false) => ProcessSelector::Current,
        }
    }
}

/// Runs `cli` and returns the process exit code.
pub async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = cli.overrides.load()?;
    tracing::debug!("using authority bridge at {}", config.socket_path.display());
    let authority = Authority::from_config(&config);

    match cli.command {
        Command::List => catalog_cmd::run_list(&authority).await,
        Command::Describe(cmd) => cmd.run(&authority).await,
        Command::Check(cmd) => cmd.run(&authority).await,
        Command::Obtain(cmd) => cmd.run(&authority).await,
    }
}
