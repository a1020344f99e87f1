use clap::Args;
use serde::Serialize;

use doselog_core::substance::search::SearchFilter;
use doselog_core::views::search_substances;
use doselog_core::{Database, SubstanceLookup};

use crate::common::{load_config_and_catalog, print_json, CliResult};

#[derive(Args)]
pub struct SearchArgs {
    /// Name or common name to look for
    pub query: Option<String>,
    /// Require a category (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<String>,
    /// Include substances outside the "common" category
    #[arg(long)]
    pub all: bool,
    /// Only substances you have logged
    #[arg(long)]
    pub used: bool,
    /// List every category instead of searching
    #[arg(long, conflicts_with_all = ["query", "categories", "used", "all"])]
    pub list_categories: bool,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct SearchHit<'a> {
    name: &'a str,
    common_names: &'a [String],
    categories: &'a [String],
}

pub fn run(args: SearchArgs) -> CliResult {
    let (_, catalog) = load_config_and_catalog()?;

    if args.list_categories {
        let categories = catalog.all_categories();
        if args.json {
            return print_json(&categories);
        }
        for category in categories {
            println!("{category}");
        }
        return Ok(());
    }

    let db = Database::open()?;
    let mut filter = if args.all {
        SearchFilter::none()
    } else {
        SearchFilter::default()
    };
    for category in &args.categories {
        filter.require(category);
    }
    filter.only_used = args.used;

    let query = args.query.as_deref().unwrap_or("");
    let found = search_substances(&db, &catalog, &filter, query)?;

    if args.json {
        let hits: Vec<SearchHit> = found
            .iter()
            .map(|s| SearchHit {
                name: &s.name,
                common_names: &s.common_names,
                categories: &s.categories,
            })
            .collect();
        return print_json(&hits);
    }
    if found.is_empty() {
        println!("No matching substances.");
    }
    for substance in found {
        let also = if substance.common_names.is_empty() {
            String::new()
        } else {
            format!(" ({})", substance.common_names.join(", "))
        };
        println!("{}{also}  [{}]", substance.name, substance.categories.join(", "));
    }
    Ok(())
}
