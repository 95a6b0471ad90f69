use anyhow::{Context, Result};
use clap::Parser;
use relay_device::{DeviceController, UpnpBackend};
use relay_queue::SqsQueue;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use playback_relay::command::Command;
use playback_relay::config::{Cli, Commands, DevicesArgs, SendArgs};
use playback_relay::{logging, Config, Relay};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.validate().context("Invalid configuration")?;

    logging::init_logging(cli.log_format, &cli.log_level.to_lowercase())
        .context("Failed to initialize logging")?;

    match cli.command {
        Commands::Run(args) => run(Config::from(args)).await,
        Commands::Send(args) => send(args).await,
        Commands::Devices(args) => list_devices(args).await,
    }
}

async fn run(config: Config) -> Result<()> {
    info!(
        device = %config.device_name,
        queue_url = %config.queue.queue_url,
        policy = %config.poller.policy,
        "starting playback relay"
    );

    let queue = SqsQueue::connect(&config.queue).await;
    let controller = DeviceController::new(config.device_name.clone(), UpnpBackend::new(config.upnp.clone()));
    let mut relay = Relay::new(queue, controller, config.poller.clone());

    relay.probe().await;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested, finishing current batch");
                shutdown.cancel();
            }
            Err(e) => warn!(error = %e, "could not listen for Ctrl-C"),
        }
    });

    relay.run(&cancel).await.context("Queue polling stopped")?;

    info!("playback relay stopped");
    Ok(())
}

async fn send(args: SendArgs) -> Result<()> {
    let queue = SqsQueue::connect(&args.queue.sqs_config()).await;
    let command = Command::from(args.command);

    let id = queue
        .send(command.as_wire())
        .await
        .with_context(|| format!("Failed to send {}", command))?;

    info!(%command, id = %id, queue_url = %queue.queue_url(), "command queued");
    println!("{}", id);
    Ok(())
}

async fn list_devices(args: DevicesArgs) -> Result<()> {
    let options = args.discovery.options();
    let devices = tokio::task::spawn_blocking(move || relay_discovery::discover(&options))
        .await
        .context("Discovery task failed")?
        .context("Discovery failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("No renderers found");
        return Ok(());
    }

    println!("Found {} renderer(s):", devices.len());
    for device in &devices {
        let room = device.room_name.as_deref().unwrap_or("-");
        println!(
            "  {} [{}] {} at {}:{} ({})",
            device.name, room, device.model_name, device.host, device.port, device.id
        );
    }
    Ok(())
}
