//! Effect timeline command.

use chrono::Utc;
use clap::Args;
use serde::Serialize;

use doselog_core::journal::{filter_by_consumer, is_current_experience};
use doselog_core::timeline::{RenderedLine, SkipReason};
use doselog_core::views::experience_timelines;
use doselog_core::{Database, EffectTimelines, Experience, HeightMode, IngestionStore, ValidationError};

use crate::common::{load_config_and_catalog, print_ingestions, print_json, CliResult};

#[derive(Args)]
pub struct TimelineArgs {
    /// Experience ID
    pub experience_id: i64,
    /// Show another consumer's ingestions
    #[arg(long)]
    pub consumer: Option<String>,
    /// Scale all substances to the highest curve
    #[arg(long, conflicts_with = "independent")]
    pub shared: bool,
    /// Scale each substance to its own maximum
    #[arg(long)]
    pub independent: bool,
    /// Chart width in columns
    #[arg(long)]
    pub width: Option<usize>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct TimelineOutput<'a> {
    experience: &'a Experience,
    timelines: &'a EffectTimelines,
    lines: Vec<RenderedLine>,
}

fn skip_text(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::UnknownSubstance => "not in the substance catalog",
        SkipReason::UnknownRoute => "no data for this route",
        SkipReason::IncompleteDuration => "duration data incomplete",
    }
}

pub fn run(args: TimelineArgs) -> CliResult {
    let (config, catalog) = load_config_and_catalog()?;
    let db = Database::open()?;
    let experience = db
        .get_experience(args.experience_id)?
        .ok_or(ValidationError::UnknownExperience(args.experience_id))?;

    let height_mode = if args.independent {
        HeightMode::Independent
    } else if args.shared {
        HeightMode::Shared
    } else {
        config.height_mode()
    };
    let consumer = args.consumer.as_deref();
    let timelines = experience_timelines(&db, &catalog, experience.id, consumer, height_mode)?;

    if args.json {
        return print_json(&TimelineOutput {
            experience: &experience,
            timelines: &timelines,
            lines: timelines.render(),
        });
    }

    let width = args.width.unwrap_or(config.timeline.chart_width);
    println!("{}", experience.title);
    print!("{}", timelines.render_ascii_chart(width));
    for skipped in &timelines.skipped {
        println!(
            "  no timeline for {} {}: {}",
            skipped.substance_name,
            skipped.route,
            skip_text(skipped.reason)
        );
    }

    let ingestions = filter_by_consumer(&db.ingestions_for_experience(experience.id)?, consumer);
    let now = Utc::now();
    let is_current =
        is_current_experience(&ingestions, now, config.journal.hours_to_separate_ingestions)?;
    let option = config.timeline.time_display.resolve(is_current);
    println!();
    print_ingestions(&ingestions, &catalog, option, now);
    Ok(())
}
