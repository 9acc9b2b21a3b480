use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
    select,
    sync::broadcast::error::RecvError,
};
use tracing::{info, warn};

use slotrace_core::{format_seconds, RaceEvent, RaceOutcome};
use slotrace_runtime::RaceController;

use crate::commands::{self, ConsoleCommand, HELP};
use crate::render::{render_board, render_drivers, render_event};

/// What the console does after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Keep reading commands, printing the line if any
    Continue(Option<String>),
    Quit,
}

impl Reply {
    fn line(text: impl Into<String>) -> Self {
        Reply::Continue(Some(text.into()))
    }
}

/// Run the interactive console until `quit`, end of input or ctrl-c
pub async fn run(controller: Arc<RaceController>) -> Result<()> {
    let mut events = controller.subscribe();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    let settings = controller.settings();
    write_stdout(&format!(
        "*** slotrace ready, sensor on {}, {} drivers, `help` for commands",
        settings.serial_port,
        controller.list_drivers().len()
    ))
    .await?;

    loop {
        select! {
            line = stdin.next_line() => {
                let Some(line) = line.context("failed to read console input")? else {
                    break;
                };
                if !handle_line(&controller, &line).await? {
                    break;
                }
            }
            event = events.recv() => {
                if !handle_event(event).await? {
                    break;
                }
            }
            ctrl_c = tokio::signal::ctrl_c() => {
                handle_ctrl_c(ctrl_c);
                break;
            }
        }
    }

    shutdown(controller).await;
    Ok(())
}

async fn handle_line(controller: &RaceController, line: &str) -> Result<bool> {
    let command = match commands::parse(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Ok(true),
        Err(err) => {
            write_stderr(&format!("!!! {err}")).await?;
            return Ok(true);
        }
    };

    match execute(controller, command)? {
        Reply::Continue(Some(text)) => write_stdout(&text).await?,
        Reply::Continue(None) => {}
        Reply::Quit => return Ok(false),
    }
    Ok(true)
}

async fn handle_event(event: Result<RaceEvent, RecvError>) -> Result<bool> {
    match event {
        Ok(event) => {
            if let Some(line) = render_event(&event) {
                write_stdout(&line).await?;
            }
            Ok(true)
        }
        Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, "console fell behind race events");
            Ok(true)
        }
        Err(RecvError::Closed) => Ok(false),
    }
}

/// Apply one command to the controller
///
/// Rejections from the controller are shown to the operator; only output
/// failures end the console.
pub fn execute(controller: &RaceController, command: ConsoleCommand) -> Result<Reply> {
    let reply = match command {
        ConsoleCommand::Add(name) => match controller.add_driver(&name) {
            Ok(driver) => Reply::line(format!("added {driver}")),
            Err(err) => Reply::line(format!("!!! {err}")),
        },
        ConsoleCommand::Remove(name) => match controller.remove_driver(&name) {
            Ok(true) => Reply::line(format!("removed {name}")),
            Ok(false) => Reply::line(format!("{name} is not on the roster")),
            Err(err) => Reply::line(format!("!!! {err}")),
        },
        ConsoleCommand::Drivers => Reply::line(render_drivers(&controller.list_drivers())),
        ConsoleCommand::Port(None) => Reply::line(format!("sensor port: {}", controller.settings().serial_port)),
        ConsoleCommand::Port(Some(port)) => match controller.set_serial_port(&port) {
            Ok(()) => Reply::line(format!("sensor port set to {}", port.trim())),
            Err(err) => Reply::line(format!("!!! {err}")),
        },
        ConsoleCommand::Ports => match slotrace_sensor::available_ports() {
            Ok(ports) if ports.is_empty() => Reply::line("no serial ports found"),
            Ok(ports) => Reply::line(ports.join("\n")),
            Err(err) => Reply::line(format!("!!! {err}")),
        },
        ConsoleCommand::Penalty(None) => Reply::line(format!(
            "early start penalty: {}s",
            controller.settings().early_start_penalty
        )),
        ConsoleCommand::Penalty(Some(secs)) => match controller.set_early_start_penalty(secs) {
            Ok(()) => Reply::line(format!("early start penalty set to {secs}s")),
            Err(err) => Reply::line(format!("!!! {err}")),
        },
        ConsoleCommand::Race { laps, driver } => match controller.start_race(&driver, laps) {
            Ok(()) => Reply::Continue(None),
            Err(err) => Reply::line(format!("!!! {err}")),
        },
        ConsoleCommand::Disqualify => {
            if controller.disqualify() {
                Reply::Continue(None)
            } else {
                Reply::line("no race running")
            }
        }
        ConsoleCommand::Board => Reply::line(render_board(&controller.ranked_results())),
        ConsoleCommand::Export => {
            let rows = controller.export_results();
            Reply::line(serde_json::to_string_pretty(&rows).context("failed to encode results")?)
        }
        ConsoleCommand::Help => Reply::line(HELP),
        ConsoleCommand::Quit => Reply::Quit,
    };
    Ok(reply)
}

async fn shutdown(controller: Arc<RaceController>) {
    if controller.disqualify() {
        info!("stopping the running race before exit");
    }

    let outcome = tokio::task::spawn_blocking(move || controller.wait_idle()).await;
    match outcome {
        Ok(Some(outcome)) => {
            if let Some(best) = outcome_best(&outcome) {
                info!(best = %format_seconds(best), "last race finished");
            }
        }
        Ok(None) => {}
        Err(error) => warn!(?error, "race worker did not shut down cleanly"),
    }
}

fn outcome_best(outcome: &RaceOutcome) -> Option<f64> {
    match outcome {
        RaceOutcome::Finished { best_lap, .. } => Some(*best_lap),
        _ => None,
    }
}

fn handle_ctrl_c(result: io::Result<()>) {
    if let Err(error) = result {
        warn!(?error, "ctrl-c handler failed");
    }
}

async fn write_stdout(line: &str) -> io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

async fn write_stderr(line: &str) -> io::Result<()> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(line.as_bytes()).await?;
    stderr.write_all(b"\n").await?;
    stderr.flush().await
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use slotrace_runtime::ControllerConfig;

    use super::*;

    fn controller(tag: &str) -> (RaceController, PathBuf) {
        let dir = std::env::temp_dir().join(format!("slotrace-cli-{}-{tag}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        (RaceController::new(ControllerConfig::in_dir(&dir)), dir)
    }

    fn text(reply: Reply) -> String {
        match reply {
            Reply::Continue(Some(text)) => text,
            other => panic!("expected output, got {other:?}"),
        }
    }

    #[test]
    fn test_roster_commands() {
        let (controller, dir) = controller("roster");

        assert_eq!(text(execute(&controller, ConsoleCommand::Add("Jim".into())).unwrap()), "added Jim");
        assert!(text(execute(&controller, ConsoleCommand::Add("Jim".into())).unwrap()).starts_with("!!!"));
        assert_eq!(text(execute(&controller, ConsoleCommand::Drivers).unwrap()), "  Jim");
        assert_eq!(
            text(execute(&controller, ConsoleCommand::Remove("Jim".into())).unwrap()),
            "removed Jim"
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_settings_commands() {
        let (controller, dir) = controller("settings");

        execute(&controller, ConsoleCommand::Penalty(Some(4))).unwrap();
        execute(&controller, ConsoleCommand::Port(Some("/dev/ttyUSB0".into()))).unwrap();

        let settings = controller.settings();
        assert_eq!(settings.early_start_penalty, 4);
        assert_eq!(settings.serial_port, "/dev/ttyUSB0");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_race_rejections_are_printed() {
        let (controller, dir) = controller("race");

        let reply = execute(
            &controller,
            ConsoleCommand::Race {
                laps: 3,
                driver: "Ghost".into(),
            },
        )
        .unwrap();
        assert!(text(reply).starts_with("!!! Invalid input"));
        assert_eq!(
            text(execute(&controller, ConsoleCommand::Disqualify).unwrap()),
            "no race running"
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_export_is_json() {
        let (controller, dir) = controller("export");
        let driver = controller.add_driver("Jim").unwrap();
        controller.stores().leaderboard.upsert(&driver, 4.5, 4.5).unwrap();

        let json = text(execute(&controller, ConsoleCommand::Export).unwrap());
        let rows: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(rows[0]["rank"], 1);
        assert_eq!(rows[0]["driver"], "Jim");
        assert_eq!(rows[0]["best_time"], 4.5);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_quit() {
        let (controller, dir) = controller("quit");
        assert_eq!(execute(&controller, ConsoleCommand::Quit).unwrap(), Reply::Quit);
        let _ = std::fs::remove_dir_all(dir);
    }
}
