//! Console command parsing
//!
//! One command per line. Driver names run to the end of the line, so they
//! may contain spaces.

use thiserror::Error;

/// A parsed console line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    Add(String),
    Remove(String),
    Drivers,
    /// Show the configured port, or set it
    Port(Option<String>),
    /// Show the early-start penalty, or set it in whole seconds
    Penalty(Option<u32>),
    Race { laps: u32, driver: String },
    Disqualify,
    Board,
    Export,
    Ports,
    Help,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command `{0}`, try `help`")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("`{0}` is not a whole number of {1}")]
    InvalidNumber(String, &'static str),
}

pub const HELP: &str = "\
commands:
  add <driver>            add a driver to the roster
  remove <driver>         remove a driver and their results
  drivers                 list the roster
  port [name]             show or set the sensor serial port
  ports                   list serial ports on this machine
  penalty [seconds]       show or set the early-start penalty
  race <laps> <driver>    start a race
  dq                      disqualify the running race
  board                   show the leaderboard
  export                  print the ranked leaderboard as JSON
  help                    show this text
  quit                    leave (disqualifies a running race)";

/// Parse one input line; blank lines yield `None`
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "add" => ConsoleCommand::Add(required(rest, "add <driver>")?),
        "remove" | "rm" => ConsoleCommand::Remove(required(rest, "remove <driver>")?),
        "drivers" => ConsoleCommand::Drivers,
        "port" => ConsoleCommand::Port(optional(rest)),
        "ports" => ConsoleCommand::Ports,
        "penalty" => match optional(rest) {
            Some(secs) => ConsoleCommand::Penalty(Some(number(&secs, "seconds")?)),
            None => ConsoleCommand::Penalty(None),
        },
        "race" => {
            let usage = "race <laps> <driver>";
            let (laps, driver) = rest.split_once(char::is_whitespace).ok_or(ParseError::Usage(usage))?;
            ConsoleCommand::Race {
                laps: number(laps, "laps")?,
                driver: required(driver, usage)?,
            }
        }
        "dq" | "disqualify" => ConsoleCommand::Disqualify,
        "board" | "results" => ConsoleCommand::Board,
        "export" => ConsoleCommand::Export,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        _ => return Err(ParseError::UnknownCommand(verb.to_string())),
    };
    Ok(Some(command))
}

fn required(rest: &str, usage: &'static str) -> Result<String, ParseError> {
    optional(rest).ok_or(ParseError::Usage(usage))
}

fn optional(rest: &str) -> Option<String> {
    let rest = rest.trim();
    (!rest.is_empty()).then(|| rest.to_string())
}

fn number(text: &str, unit: &'static str) -> Result<u32, ParseError> {
    text.trim()
        .parse()
        .map_err(|_| ParseError::InvalidNumber(text.trim().to_string(), unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line() {
        assert_eq!(parse("   \n"), Ok(None));
    }

    #[test]
    fn test_driver_names_keep_spaces() {
        assert_eq!(
            parse("add Juan Manuel Fangio"),
            Ok(Some(ConsoleCommand::Add("Juan Manuel Fangio".into())))
        );
        assert_eq!(
            parse("race 5 Juan Manuel Fangio"),
            Ok(Some(ConsoleCommand::Race {
                laps: 5,
                driver: "Juan Manuel Fangio".into()
            }))
        );
    }

    #[test]
    fn test_verbs_are_case_insensitive() {
        assert_eq!(parse("DQ"), Ok(Some(ConsoleCommand::Disqualify)));
        assert_eq!(parse("Board"), Ok(Some(ConsoleCommand::Board)));
    }

    #[test]
    fn test_optional_arguments() {
        assert_eq!(parse("port"), Ok(Some(ConsoleCommand::Port(None))));
        assert_eq!(
            parse("port /dev/ttyUSB0"),
            Ok(Some(ConsoleCommand::Port(Some("/dev/ttyUSB0".into()))))
        );
        assert_eq!(parse("penalty 3"), Ok(Some(ConsoleCommand::Penalty(Some(3)))));
    }

    #[test]
    fn test_negative_penalty_rejected() {
        assert_eq!(
            parse("penalty -2"),
            Err(ParseError::InvalidNumber("-2".into(), "seconds"))
        );
    }

    #[test]
    fn test_race_usage_errors() {
        assert!(matches!(parse("race"), Err(ParseError::Usage(_))));
        assert!(matches!(parse("race 3"), Err(ParseError::Usage(_))));
        assert!(matches!(parse("race three Jim"), Err(ParseError::InvalidNumber(_, "laps"))));
        assert!(matches!(parse("add"), Err(ParseError::Usage(_))));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(parse("launch"), Err(ParseError::UnknownCommand("launch".into())));
    }
}
