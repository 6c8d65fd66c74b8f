//! Output formatting and persistence for area statistics.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::spatial::{TownStat, TownStatsReport};
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Logs a report using Rust's debug pretty-print format.
pub fn print_pretty(report: &TownStatsReport) {
    debug!("{:#?}", report);
}

/// Logs any serializable result as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One CSV row per area per aggregation run.
#[derive(Debug, Serialize)]
struct TownStatRow<'a> {
    timestamp: DateTime<Utc>,
    attitude_threshold: f64,
    name: &'a str,
    user_count: usize,
    low_attitude_count: usize,
    commute_change_count: usize,
    low_attitude_pct: f64,
    commute_change_pct: f64,
}

impl<'a> TownStatRow<'a> {
    fn new(report: &TownStatsReport, stat: &'a TownStat) -> Self {
        TownStatRow {
            timestamp: report.generated_at,
            attitude_threshold: report.attitude_threshold,
            name: &stat.name,
            user_count: stat.user_count,
            low_attitude_count: stat.low_attitude_count,
            commute_change_count: stat.commute_change_count,
            low_attitude_pct: stat.low_attitude_pct(),
            commute_change_pct: stat.commute_change_pct(),
        }
    }
}

/// Appends every area of `report` as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_town_stats(path: &str, report: &TownStatsReport) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = report.areas.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for stat in &report.areas {
        writer.serialize(TownStatRow::new(report, stat))?;
    }
    writer.flush()?;

    Ok(())
}
