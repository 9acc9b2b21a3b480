//! Console rendering of race events and the leaderboard

use slotrace_core::{format_seconds, Driver, RaceEvent, RaceOutcome, RacePhase, RaceResult};

/// One console line for `event`; `None` for events the console skips
pub fn render_event(event: &RaceEvent) -> Option<String> {
    let line = match event {
        RaceEvent::PhaseChanged { phase } => match phase {
            RacePhase::Countdown => "*** get ready".to_string(),
            RacePhase::EarlyStart => "!!! early start, penalty on lap 1".to_string(),
            RacePhase::Racing => "*** racing".to_string(),
            _ => return None,
        },
        RaceEvent::CountdownTick { seconds_remaining } => format!("    {seconds_remaining}"),
        RaceEvent::Go { .. } => "*** GO".to_string(),
        RaceEvent::LapCompleted { driver, lap, penalty } => {
            let mut line = format!("    lap {} {}: {}s", lap.lap_number(), driver, format_seconds(lap.duration));
            if *penalty > 0.0 {
                line.push_str(&format!(" (incl. {}s penalty)", format_seconds(*penalty)));
            }
            line
        }
        RaceEvent::ResultCommitted { .. } => return None,
        RaceEvent::Fault { error } => format!("!!! {error}"),
        RaceEvent::SessionEnded { driver, outcome } => render_outcome(driver, outcome),
    };
    Some(line)
}

fn render_outcome(driver: &Driver, outcome: &RaceOutcome) -> String {
    match outcome {
        RaceOutcome::Finished {
            laps,
            best_lap,
            last_lap,
        } => format!(
            "*** {driver} finished {laps} laps, best {}s, last {}s",
            format_seconds(*best_lap),
            format_seconds(*last_lap)
        ),
        RaceOutcome::Disqualified { laps_completed } => {
            format!("*** {driver} disqualified after {laps_completed} laps")
        }
        RaceOutcome::Aborted { error } => format!("!!! race for {driver} aborted: {error}"),
    }
}

/// Leaderboard table, fastest first
pub fn render_board(results: &[RaceResult]) -> String {
    if results.is_empty() {
        return "no results yet".to_string();
    }

    let width = results
        .iter()
        .map(|r| r.driver.as_str().chars().count())
        .max()
        .unwrap_or(0)
        .max("Driver".len());

    let mut out = format!("{:>4}  {:<width$}  {:>10}  {:>10}", "Rank", "Driver", "Last", "Best");
    for (idx, result) in results.iter().enumerate() {
        out.push('\n');
        out.push_str(&format!(
            "{:>4}  {:<width$}  {:>10}  {:>10}",
            idx + 1,
            result.driver.as_str(),
            result.display_last(),
            result.display_best(),
        ));
    }
    out
}

/// Roster listing, one driver per line
pub fn render_drivers(drivers: &[Driver]) -> String {
    if drivers.is_empty() {
        return "no drivers yet".to_string();
    }
    drivers
        .iter()
        .map(|d| format!("  {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}
