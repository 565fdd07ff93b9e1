//! `flowscope`: live terminal topology for a multi-uplink dispatch proxy.
//!
//! Polls the appliance's status API and draws internet → load balancers →
//! gateway → clients, with particles flowing along each link in proportion
//! to its traffic.
//!
//! Logs go to a file (default `/tmp/flowscope.log`) so they never corrupt
//! the terminal.

mod action;
mod app;
mod canvas;
mod component;
mod data_bridge;
mod event;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, bail};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use flowscope_api::ApplianceClient;
use flowscope_config::{Config, load_config, load_config_from};

use crate::app::App;

/// Live traffic topology for a dispatch proxy appliance.
#[derive(Parser, Debug)]
#[command(name = "flowscope", version, about)]
struct Cli {
    /// Appliance web UI URL (e.g., http://192.168.1.1:8090)
    #[arg(short = 'u', long)]
    url: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Seconds between data refreshes
    #[arg(long)]
    refresh_secs: Option<u64>,

    /// Initial animation speed multiplier (0.25 to 4)
    #[arg(long)]
    speed: Option<f64>,

    /// Directory of device icons (`<kind>.txt`)
    #[arg(long)]
    icons: Option<PathBuf>,

    /// Do not ask the appliance to name client devices
    #[arg(long)]
    no_lookup: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log file path
    #[arg(long, default_value = "/tmp/flowscope.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-only tracing. The returned guard flushes on drop; hold it until exit.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "flowscope={log_level},flowscope_core={log_level},flowscope_api={log_level}"
        ))
    });

    let log_dir = cli
        .log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(std::path::Path::new("."));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("flowscope.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

/// Config file and environment, then CLI flags on top.
fn load_settings(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            load_config_from(path)?
        }
        None => load_config()?,
    };

    if let Some(url) = &cli.url {
        config.appliance.url.clone_from(url);
    }
    if let Some(secs) = cli.refresh_secs {
        config.display.refresh_interval_secs = secs;
    }
    if let Some(speed) = cli.speed {
        config.display.animation_speed = speed;
    }
    if let Some(dir) = &cli.icons {
        config.display.icon_dir = Some(dir.clone());
    }
    if cli.no_lookup {
        config.display.identity_lookup = false;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tui::install_hooks()?;
    let _log_guard = setup_tracing(&cli);

    let config = load_settings(&cli)?;
    if cli.print_config {
        print!("{}", config.to_toml_redacted()?);
        return Ok(());
    }

    let client = ApplianceClient::new(config.base_url()?, &config.transport_config())?;
    if let Some((username, password)) = config.credentials()? {
        client
            .login(&username, &password)
            .await
            .wrap_err("login to the appliance failed")?;
        info!(%username, "logged in");
    }

    info!(url = %client.base_url(), "starting flowscope");
    let mut app = App::new(client, config.engine_config());
    app.run().await
}
