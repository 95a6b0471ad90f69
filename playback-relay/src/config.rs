//! Command line and environment configuration.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use relay_device::UpnpConfig;
use relay_discovery::{DiscoveryOptions, MEDIA_RENDERER};
use relay_queue::{PollerConfig, ProcessingPolicy, SqsConfig, MAX_BATCH_SIZE, MAX_WAIT_TIME};

use crate::command::Command;
use crate::logging::LogFormat;

pub const DEFAULT_DEVICE_NAME: &str = "Living Room TV";

/// Playback relay
///
/// Long-polls a queue for PAUSE/RESUME commands and applies them to a media
/// renderer on the local network.
#[derive(Parser, Debug)]
#[command(name = "playback-relay")]
#[command(version, about)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RELAY_LOG_LEVEL and RUST_LOG take precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact, env = "RELAY_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the queue and forward commands to the renderer until interrupted
    Run(RunArgs),
    /// Put a command on the queue
    Send(SendArgs),
    /// List renderers found on the local network
    Devices(DevicesArgs),
}

#[derive(Args, Debug, Clone)]
pub struct QueueArgs {
    /// URL of the command queue
    #[arg(long, env = "RELAY_QUEUE_URL")]
    pub queue_url: String,

    /// AWS region; defaults to the provider chain
    #[arg(long, env = "RELAY_REGION")]
    pub region: Option<String>,

    /// Named AWS profile to load credentials from
    #[arg(long, env = "RELAY_PROFILE")]
    pub profile: Option<String>,

    /// Alternate queue endpoint, e.g. a local emulator
    #[arg(long, env = "RELAY_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,
}

impl QueueArgs {
    pub fn sqs_config(&self) -> SqsConfig {
        SqsConfig {
            queue_url: self.queue_url.clone(),
            region: self.region.clone(),
            profile: self.profile.clone(),
            endpoint_url: self.endpoint_url.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.queue_url.trim().is_empty() {
            bail!("Queue URL must not be empty");
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct DiscoveryArgs {
    /// Discovery timeout in seconds
    #[arg(long, default_value = "3", env = "RELAY_DISCOVERY_TIMEOUT")]
    pub discovery_timeout: u64,

    /// SSDP search target
    #[arg(long, default_value = MEDIA_RENDERER, env = "RELAY_SEARCH_TARGET")]
    pub search_target: String,
}

impl DiscoveryArgs {
    pub fn options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            search_target: self.search_target.clone(),
            timeout: Duration::from_secs(self.discovery_timeout),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.discovery_timeout == 0 {
            bail!("Discovery timeout must be positive");
        }
        if self.search_target.trim().is_empty() {
            bail!("Search target must not be empty");
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Friendly name of the renderer to control (exact match)
    #[arg(long, default_value = DEFAULT_DEVICE_NAME, env = "RELAY_DEVICE_NAME")]
    pub device_name: String,

    #[command(flatten)]
    pub queue: QueueArgs,

    #[command(flatten)]
    pub discovery: DiscoveryArgs,

    /// Which messages of a batch are executed (latest-only, all)
    #[arg(long, default_value = "latest-only", env = "RELAY_POLICY")]
    pub policy: ProcessingPolicy,

    /// Long-poll wait per receive in seconds (1-20)
    #[arg(long, default_value = "20", env = "RELAY_WAIT_TIME")]
    pub wait_time: u64,

    /// Messages requested per receive (1-10)
    #[arg(long, default_value = "10", env = "RELAY_MAX_MESSAGES")]
    pub max_messages: usize,

    /// Seconds to wait for a renderer to answer after connecting
    #[arg(long, default_value = "10", env = "RELAY_READY_TIMEOUT")]
    pub ready_timeout: u64,
}

impl RunArgs {
    pub fn validate(&self) -> Result<()> {
        if self.device_name.trim().is_empty() {
            bail!("Device name must not be empty");
        }

        self.queue.validate()?;
        self.discovery.validate()?;

        if !(1..=MAX_BATCH_SIZE).contains(&self.max_messages) {
            bail!(
                "Invalid max messages {}: must be between 1 and {}",
                self.max_messages,
                MAX_BATCH_SIZE
            );
        }

        // A zero wait turns every idle receive into an immediate retry.
        if !(1..=MAX_WAIT_TIME.as_secs()).contains(&self.wait_time) {
            bail!(
                "Invalid wait time {}s: must be between 1 and {}s",
                self.wait_time,
                MAX_WAIT_TIME.as_secs()
            );
        }

        if self.ready_timeout == 0 {
            bail!("Ready timeout must be positive");
        }

        Ok(())
    }
}

/// Commands that can be enqueued from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SendCommand {
    Pause,
    Resume,
}

impl From<SendCommand> for Command {
    fn from(command: SendCommand) -> Self {
        match command {
            SendCommand::Pause => Command::Pause,
            SendCommand::Resume => Command::Resume,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SendArgs {
    #[arg(value_enum)]
    pub command: SendCommand,

    #[command(flatten)]
    pub queue: QueueArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DevicesArgs {
    /// Print the device list as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub discovery: DiscoveryArgs,
}

impl Cli {
    /// Validate command line arguments
    pub fn validate(&self) -> Result<()> {
        match self.log_level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                bail!(
                    "Invalid log level '{}'. Valid levels: error, warn, info, debug, trace",
                    self.log_level
                );
            }
        }

        match &self.command {
            Commands::Run(args) => args.validate(),
            Commands::Send(args) => args.queue.validate(),
            Commands::Devices(args) => args.discovery.validate(),
        }
    }
}

/// Settings for the `run` command
#[derive(Debug, Clone)]
pub struct Config {
    pub device_name: String,
    pub upnp: UpnpConfig,
    pub queue: SqsConfig,
    pub poller: PollerConfig,
}

impl From<RunArgs> for Config {
    fn from(args: RunArgs) -> Self {
        Self {
            upnp: UpnpConfig {
                discovery: args.discovery.options(),
                ready_timeout: Duration::from_secs(args.ready_timeout),
                ..UpnpConfig::default()
            },
            queue: args.queue.sqs_config(),
            poller: PollerConfig {
                max_messages: args.max_messages,
                wait_time: Duration::from_secs(args.wait_time),
                policy: args.policy,
            },
            device_name: args.device_name,
        }
    }
}
