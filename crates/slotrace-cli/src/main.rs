use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use slotrace_cli::{
    cli::{Cli, Command},
    console,
};
use slotrace_runtime::RaceController;

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command() {
        Command::Ports => {
            let ports = slotrace_sensor::available_ports()?;
            if ports.is_empty() {
                println!("no serial ports found");
            }
            for port in ports {
                println!("{port}");
            }
        }
        Command::Run => {
            std::fs::create_dir_all(&cli.data_dir)?;
            info!(dir = %cli.data_dir.display(), "loading race data");
            let controller = Arc::new(RaceController::new(cli.controller_config()));
            console::run(controller).await?;
        }
    }

    Ok(())
}
