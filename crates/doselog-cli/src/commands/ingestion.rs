use chrono::{Local, Utc};
use clap::Subcommand;

use doselog_core::journal::{experience_to_add_to, TimeDisplayOption};
use doselog_core::views::{recent_suggestions, MAX_SUGGESTION_DAYS};
use doselog_core::{
    AdministrationRoute, Config, Database, IngestionStore, NewExperience, NewIngestion,
    SubstanceLookup, ValidationError,
};

use crate::common::{
    dose_or_unknown, format_local, load_config_and_catalog, parse_time, print_ingestions, print_json,
    CliResult,
};

#[derive(Subcommand)]
pub enum IngestionAction {
    /// Log an ingestion
    Add {
        /// Substance name
        substance: String,
        /// Route of administration (oral, insufflated, ...)
        route: AdministrationRoute,
        /// Dose amount; omit for an unknown dose
        #[arg(long)]
        dose: Option<f64>,
        /// Dose units (default: the catalog's units for this route)
        #[arg(long)]
        units: Option<String>,
        /// The dose is an estimate
        #[arg(long)]
        estimate: bool,
        /// Standard deviation of an estimated dose
        #[arg(long, requires = "estimate")]
        deviation: Option<f64>,
        /// Time taken (RFC 3339 or "YYYY-MM-DD HH:MM", default now)
        #[arg(long)]
        time: Option<String>,
        /// Experience to add to (default: a recent one, or a new one)
        #[arg(long)]
        experience: Option<i64>,
        /// Who took it, if not you
        #[arg(long)]
        consumer: Option<String>,
        /// Notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List ingestions, newest first
    List {
        /// Only this experience
        #[arg(long)]
        experience: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an ingestion
    Delete {
        /// Ingestion ID
        id: i64,
    },
    /// Recently used substances and doses
    Suggest {
        /// How far back to look, in days
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(i64).range(1..=MAX_SUGGESTION_DAYS))]
        days: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: IngestionAction) -> CliResult {
    let db = Database::open()?;

    match action {
        IngestionAction::Add {
            substance,
            route,
            dose,
            units,
            estimate,
            deviation,
            time,
            experience,
            consumer,
            notes,
        } => {
            let (config, catalog) = load_config_and_catalog()?;
            let time = parse_time(time.as_deref())?;

            let units = match units {
                Some(units) => units,
                None => catalog
                    .get_roa(&substance, route)
                    .and_then(|roa| roa.dose.as_ref())
                    .map(|dose| dose.units.clone())
                    .ok_or_else(|| format!("no known units for {substance} {route}; pass --units"))?,
            };

            let experience_id = match experience {
                Some(id) => {
                    db.get_experience(id)?
                        .ok_or(ValidationError::UnknownExperience(id))?;
                    id
                }
                None => {
                    let candidates = db.experiences_with_last_ingestion()?;
                    match experience_to_add_to(
                        &candidates,
                        time,
                        config.journal.hours_to_separate_ingestions,
                    )? {
                        Some(candidate) => candidate.experience_id,
                        None => {
                            let title = time.with_timezone(&Local).format("%b %-d, %Y").to_string();
                            db.insert_experience(&NewExperience {
                                title,
                                text: String::new(),
                                sort_date: time,
                            })?
                        }
                    }
                }
            };

            let name = catalog
                .get_substance(&substance)
                .map(|s| s.name.clone())
                .unwrap_or(substance);
            let id = db.insert_ingestion(&NewIngestion {
                experience_id,
                substance_name: name,
                time,
                route,
                dose,
                is_dose_an_estimate: estimate,
                estimated_dose_standard_deviation: deviation,
                units,
                notes,
                consumer_name: consumer,
            })?;
            println!("Ingestion added: {id} (experience {experience_id})");
        }
        IngestionAction::List { experience, json } => {
            let ingestions = match experience {
                Some(id) => {
                    let mut list = db.ingestions_for_experience(id)?;
                    list.reverse();
                    list
                }
                None => db.all_ingestions()?,
            };
            if json {
                return print_json(&ingestions);
            }
            if ingestions.is_empty() {
                println!("No ingestions.");
                return Ok(());
            }
            let (_, catalog) = load_config_and_catalog()?;
            print_ingestions(&ingestions, &catalog, TimeDisplayOption::Regular, Utc::now());
        }
        IngestionAction::Delete { id } => {
            db.delete_ingestion(id)?;
            println!("Ingestion deleted: {id}");
        }
        IngestionAction::Suggest { days, json } => {
            let config = Config::load()?;
            let suggestions = recent_suggestions(
                &db,
                Utc::now(),
                days,
                config.journal.suggestions_per_substance,
            )?;
            if json {
                return print_json(&suggestions);
            }
            if suggestions.is_empty() {
                println!("No recent ingestions.");
            }
            for suggestion in &suggestions {
                let doses: Vec<String> = suggestion
                    .doses
                    .iter()
                    .map(|d| {
                        let estimate = if d.is_estimate { "~" } else { "" };
                        format!("{estimate}{}", dose_or_unknown(d.dose, &d.units))
                    })
                    .collect();
                println!(
                    "{} {} (last {}): {}",
                    suggestion.substance_name,
                    suggestion.route,
                    format_local(suggestion.last_ingested_time),
                    doses.join(", ")
                );
            }
        }
    }
    Ok(())
}
