use std::path::PathBuf;

use clap::{Parser, Subcommand};

use slotrace_runtime::ControllerConfig;
use slotrace_sensor::{SensorConfig, DEFAULT_BAUD_RATE};
use slotrace_time::CountdownConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding drivers.json, results.json and settings.json.
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Length of the start countdown in seconds.
    #[arg(long, default_value_t = 5)]
    pub countdown_secs: u64,

    /// Baud rate of the lap sensor.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the interactive race console (default).
    Run,
    /// List the serial ports the lap sensor could be attached to.
    Ports,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            data_dir: self.data_dir.clone(),
            countdown: CountdownConfig::seconds(self.countdown_secs),
            sensor: SensorConfig {
                baud_rate: self.baud,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
