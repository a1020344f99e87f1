//! Helpers shared by the command modules.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

use doselog_core::journal::{readable_number, TimeDisplayOption};
use doselog_core::{Config, DoseClass, Ingestion, SubstanceCatalog, SubstanceLookup};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Parse a time argument: RFC 3339, `YYYY-MM-DD HH:MM` in local time, or `now`.
/// A missing argument means now.
pub fn parse_time(input: Option<&str>) -> Result<DateTime<Utc>, String> {
    let Some(input) = input.map(str::trim) else {
        return Ok(Utc::now());
    };
    if input.eq_ignore_ascii_case("now") {
        return Ok(Utc::now());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or_else(|| format!("Time '{input}' does not exist in the local time zone"));
        }
    }
    Err(format!(
        "Invalid time: '{input}'. Use RFC 3339 or 'YYYY-MM-DD HH:MM'"
    ))
}

/// Config plus the substance catalog it points at.
pub fn load_config_and_catalog() -> Result<(Config, SubstanceCatalog), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let catalog = config.load_catalog()?;
    Ok((config, catalog))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn format_local(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// `2h 05m`, `45m`, `3d 4h`.
pub fn format_span(seconds: i64) -> String {
    let seconds = seconds.abs();
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}

pub fn dose_class(catalog: &SubstanceCatalog, ingestion: &Ingestion) -> Option<DoseClass> {
    let roa = catalog.get_roa(&ingestion.substance_name, ingestion.route)?;
    roa.dose.as_ref()?.classify(ingestion.dose?, &ingestion.units)
}

/// Time column for the ingestion at `index` (ingestions oldest first).
pub fn time_label(
    option: TimeDisplayOption,
    ingestions: &[Ingestion],
    index: usize,
    now: DateTime<Utc>,
) -> String {
    let time = ingestions[index].time;
    match option {
        TimeDisplayOption::Regular => format_local(time),
        TimeDisplayOption::RelativeToNow => format!("{} ago", format_span((now - time).num_seconds())),
        TimeDisplayOption::RelativeToStart => {
            format!("+{}", format_span((time - ingestions[0].time).num_seconds()))
        }
        TimeDisplayOption::TimeBetween => match index.checked_sub(1) {
            Some(previous) => format!(
                "+{}",
                format_span((time - ingestions[previous].time).num_seconds())
            ),
            None => format_local(time),
        },
    }
}

/// Print one line per ingestion, oldest first.
pub fn print_ingestions(
    ingestions: &[Ingestion],
    catalog: &SubstanceCatalog,
    option: TimeDisplayOption,
    now: DateTime<Utc>,
) {
    for (index, ingestion) in ingestions.iter().enumerate() {
        let class = dose_class(catalog, ingestion)
            .map(|c| format!(" {}", c.dot_string()))
            .unwrap_or_default();
        let consumer = ingestion
            .consumer_name
            .as_deref()
            .map(|c| format!(" [{c}]"))
            .unwrap_or_default();
        println!(
            "  #{:<4} {:<18} {} {} {}{class}{consumer}",
            ingestion.id,
            time_label(option, ingestions, index, now),
            ingestion.substance_name,
            ingestion.route,
            ingestion.dose_text(),
        );
        if let Some(notes) = ingestion.notes.as_deref().filter(|n| !n.is_empty()) {
            println!("        {notes}");
        }
    }
}

pub fn dose_or_unknown(dose: Option<f64>, units: &str) -> String {
    match dose {
        Some(dose) => format!("{} {units}", readable_number(dose)),
        None => "unknown".to_string(),
    }
}
