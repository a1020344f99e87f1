use chrono::Utc;
use clap::Subcommand;
use serde::Serialize;

use doselog_core::journal::is_current_experience;
use doselog_core::{
    Database, Experience, Ingestion, IngestionStore, NewExperience, ValidationError,
};

use crate::common::{format_local, load_config_and_catalog, parse_time, print_ingestions, print_json, CliResult};

#[derive(Subcommand)]
pub enum ExperienceAction {
    /// Create an experience
    Create {
        /// Title
        title: String,
        /// Free-form notes
        #[arg(long, default_value = "")]
        text: String,
        /// Sort date (RFC 3339 or "YYYY-MM-DD HH:MM", default now)
        #[arg(long)]
        date: Option<String>,
    },
    /// List experiences, newest first
    List {
        /// Only favorites
        #[arg(long)]
        favorites: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show an experience with its ingestions
    Show {
        /// Experience ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark or unmark an experience as favorite
    Favorite {
        /// Experience ID
        id: i64,
        /// Remove the favorite mark
        #[arg(long)]
        off: bool,
    },
    /// Delete an experience and its ingestions
    Delete {
        /// Experience ID
        id: i64,
    },
}

#[derive(Serialize)]
struct ExperienceDetail<'a> {
    experience: &'a Experience,
    ingestions: &'a [Ingestion],
}

pub fn run(action: ExperienceAction) -> CliResult {
    let db = Database::open()?;

    match action {
        ExperienceAction::Create { title, text, date } => {
            let sort_date = parse_time(date.as_deref())?;
            let id = db.insert_experience(&NewExperience {
                title,
                text,
                sort_date,
            })?;
            println!("Experience created: {id}");
        }
        ExperienceAction::List { favorites, json } => {
            let experiences: Vec<Experience> = db
                .list_experiences()?
                .into_iter()
                .filter(|e| !favorites || e.is_favorite)
                .collect();
            if json {
                return print_json(&experiences);
            }
            if experiences.is_empty() {
                println!("No experiences.");
            }
            for experience in &experiences {
                let star = if experience.is_favorite { "*" } else { " " };
                println!(
                    "{star} #{:<4} {}  {}",
                    experience.id,
                    format_local(experience.sort_date),
                    experience.title
                );
            }
        }
        ExperienceAction::Show { id, json } => {
            let experience = db
                .get_experience(id)?
                .ok_or(ValidationError::UnknownExperience(id))?;
            let ingestions = db.ingestions_for_experience(id)?;
            if json {
                return print_json(&ExperienceDetail {
                    experience: &experience,
                    ingestions: &ingestions,
                });
            }

            let (config, catalog) = load_config_and_catalog()?;
            let now = Utc::now();
            let is_current =
                is_current_experience(&ingestions, now, config.journal.hours_to_separate_ingestions)?;
            let option = config.timeline.time_display.resolve(is_current);

            println!("{}", experience.title);
            println!("  Date: {}", format_local(experience.sort_date));
            if experience.is_favorite {
                println!("  Favorite");
            }
            if !experience.text.is_empty() {
                println!("  {}", experience.text);
            }
            println!("Ingestions:");
            if ingestions.is_empty() {
                println!("  (none)");
            }
            print_ingestions(&ingestions, &catalog, option, now);
        }
        ExperienceAction::Favorite { id, off } => {
            db.update_experience_favorite(id, !off)?;
            println!("ok");
        }
        ExperienceAction::Delete { id } => {
            db.delete_experience(id)?;
            println!("Experience deleted: {id}");
        }
    }
    Ok(())
}
