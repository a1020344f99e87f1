use clap::Subcommand;
use serde::Serialize;

use doselog_core::substance::{DoseRange, RoaDose};
use doselog_core::{AdministrationRoute, DoseClass};

use crate::common::{load_config_and_catalog, print_json, CliResult};

#[derive(Subcommand)]
pub enum DoseAction {
    /// Classify a dose against the catalog's ranges
    Classify {
        /// Substance name
        substance: String,
        /// Route of administration
        route: AdministrationRoute,
        /// Dose amount
        dose: f64,
        /// Dose units
        units: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Describe the dose classes
    Explain,
}

#[derive(Serialize)]
struct Classification<'a> {
    substance: &'a str,
    route: AdministrationRoute,
    dose: f64,
    units: &'a str,
    class: Option<DoseClass>,
    ranges: &'a RoaDose,
}

fn range_text(min: Option<f64>, max: Option<f64>, units: &str) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("{min}-{max} {units}"),
        (Some(min), None) => format!("{min}+ {units}"),
        (None, Some(max)) => format!("up to {max} {units}"),
        (None, None) => "-".to_string(),
    }
}

fn dose_range_text(range: Option<DoseRange>, units: &str) -> String {
    let range = range.unwrap_or_default();
    range_text(range.min, range.max, units)
}

pub fn run(action: DoseAction) -> CliResult {
    match action {
        DoseAction::Classify {
            substance,
            route,
            dose,
            units,
            json,
        } => {
            let (_, catalog) = load_config_and_catalog()?;
            let found = catalog.require(&substance)?;
            let ranges = found
                .get_roa(route)
                .and_then(|roa| roa.dose.as_ref())
                .ok_or_else(|| format!("no dose information for {} {route}", found.name))?;
            let class = ranges.classify(dose, &units);

            if json {
                return print_json(&Classification {
                    substance: &found.name,
                    route,
                    dose,
                    units: &units,
                    class,
                    ranges,
                });
            }
            match class {
                Some(class) => println!(
                    "{} {route} {dose} {units}: {class} {}",
                    found.name,
                    class.dot_string()
                ),
                None if !ranges.units.eq_ignore_ascii_case(&units) => {
                    return Err(format!(
                        "units '{units}' do not match the catalog's '{}'",
                        ranges.units
                    )
                    .into())
                }
                None => println!("{} {route} {dose} {units}: unclassified", found.name),
            }
            println!(
                "  threshold {}, light {}, common {}, strong {}, heavy {}",
                range_text(ranges.threshold, None, &ranges.units),
                dose_range_text(ranges.light, &ranges.units),
                dose_range_text(ranges.common, &ranges.units),
                dose_range_text(ranges.strong, &ranges.units),
                range_text(ranges.heavy, None, &ranges.units),
            );
        }
        DoseAction::Explain => {
            for class in DoseClass::ALL {
                println!("{} {class}: {}", class.dot_string(), class.description());
            }
        }
    }
    Ok(())
}
