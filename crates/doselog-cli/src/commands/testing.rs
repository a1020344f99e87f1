use clap::Args;

use doselog_core::testing::TestingServiceDirectory;

use crate::common::{print_json, CliResult};

#[derive(Args)]
pub struct TestingArgs {
    /// Country, city or service name to look for
    pub query: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: TestingArgs) -> CliResult {
    let found = TestingServiceDirectory::bundled().search(args.query.as_deref().unwrap_or(""));
    if args.json {
        return print_json(&found);
    }
    if found.is_empty() {
        println!("No testing services found.");
        return Ok(());
    }
    for country in &found {
        println!("{}", country.country);
        for service in &country.services {
            println!("  {} ({})  {}", service.name, service.city, service.url);
        }
    }
    Ok(())
}
