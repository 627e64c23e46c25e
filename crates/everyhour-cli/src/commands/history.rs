//! Read-only views over the check-in history.

use std::path::PathBuf;

use chrono::Utc;
use everyhour_core::{CheckinLedger, Config, Zone};

use super::{init_logging, open_coordinator, print_json, runtime, CmdResult};

fn load_ledger() -> Result<(CheckinLedger, Zone), Box<dyn std::error::Error>> {
    init_logging("warn");
    let config = Config::load()?;
    let (coordinator, _db) = open_coordinator(&config)?;
    let ledger = runtime()?.block_on(coordinator.ledger())?;
    Ok((ledger, config.zone()))
}

pub fn log(limit: usize, json: bool) -> CmdResult {
    let (ledger, zone) = load_ledger()?;
    if json {
        let recent: Vec<_> = ledger.recent(limit).collect();
        return print_json(&recent);
    }
    if ledger.history().is_empty() {
        println!("No check-ins yet.");
        return Ok(());
    }
    for entry in ledger.recent(limit) {
        println!("{}  {}", zone.format(entry.timestamp, "%Y-%m-%d %H:%M"), entry.label());
    }
    Ok(())
}

pub fn timeline(days: usize) -> CmdResult {
    let (ledger, zone) = load_ledger()?;
    let (today, _) = zone.date_hour(Utc::now());
    println!("Today: {}h", ledger.hours_on(today, zone));

    for day in ledger.day_activity(zone, days) {
        let blocks: String = (0..24)
            .map(|hour| if day.is_active(hour) { '#' } else { '.' })
            .collect();
        println!("{}  {}", day.day, blocks);
    }
    Ok(())
}

pub fn export(output: Option<PathBuf>, save: bool) -> CmdResult {
    let (ledger, zone) = load_ledger()?;
    let json = serde_json::to_string_pretty(ledger.history())?;

    let path = match (output, save) {
        (Some(path), _) => path,
        (None, true) => PathBuf::from(format!(
            "everyhour-checkins-{}.json",
            zone.format(Utc::now(), "%Y-%m-%d")
        )),
        (None, false) => {
            println!("{json}");
            return Ok(());
        }
    };

    std::fs::write(&path, json)?;
    eprintln!("Exported {} entries to {}.", ledger.history().len(), path.display());
    Ok(())
}
