use clap::Parser;
use color_eyre::Result;
use serial_bridge::{
    bridge::SerialBridge,
    cli,
    component::{self, Component},
    config::Config,
    logging,
    uart::SerialUart,
};
use tracing::{debug, error, info};

#[cfg(unix)]
async fn hangup() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    signal(SignalKind::hangup())?.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn hangup() -> std::io::Result<()> {
    std::future::pending().await
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = cli::Cli::parse();

    if let Some(command) = cli.command {
        cli::handle_command(command)?;

        return Ok(());
    }

    logging::init(cli.log_level, cli.log_dir.map(|dir| (cli.log_level, dir))).await;

    let config = if let Some(config_path) = cli.config {
        debug!(?config_path, "Config from path");
        Config::new_from_path(config_path)?
    } else {
        debug!("Default config");
        Config::default()
    };
    config.validate()?;

    let mut uart = SerialUart::open(&config.uart)?;
    let mut bridge = SerialBridge::new(&mut uart, config.network).set_port(config.port);
    let mut components: [&mut dyn Component; 1] = [&mut bridge];

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C, quitting")
        }
        _ = hangup() => {
            info!("Told to hang up, quitting")
        }
        _ = component::run(&mut components, config.tick_interval()) => {
            error!("Scheduler returned");
            return Err(color_eyre::eyre::eyre!("Scheduler stopped unexpectedly"));
        }
    }

    Ok(())
}
