use chrono::Utc;
use clap::Args;

use doselog_core::stats::ChartBucket;
use doselog_core::views::period_stats;
use doselog_core::{Config, Database, StatsPeriod};

use crate::common::{dose_or_unknown, format_local, print_json, CliResult};

#[derive(Args)]
pub struct StatsArgs {
    /// Period: days30, days365 or years (default from config)
    #[arg(long)]
    pub period: Option<StatsPeriod>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn print_buckets(title: &str, buckets: &[ChartBucket]) {
    println!("\n{title}:");
    let max = buckets.iter().map(ChartBucket::total).max().unwrap_or(0).max(1);
    for bucket in buckets.iter().filter(|b| b.total() > 0) {
        let bar = "#".repeat(((bucket.total() * 30 + max - 1) / max) as usize);
        let top = bucket
            .counts
            .first()
            .map(|c| c.substance_name.as_str())
            .unwrap_or("");
        println!("  {:<8} {bar:<30} {} ({top})", bucket.label, bucket.total());
    }
}

pub fn run(args: StatsArgs) -> CliResult {
    let config = Config::load()?;
    let db = Database::open()?;
    let period = args.period.unwrap_or(config.stats.default_period);
    let stats = period_stats(&db, period, Utc::now())?;

    if args.json {
        return print_json(&stats);
    }

    println!("Stats for the last {period} (since {})", format_local(stats.start));
    if stats.is_empty() {
        println!("  No ingestions in this period.");
        return Ok(());
    }
    for substance in &stats.ingestion_stats {
        let routes: Vec<String> = substance
            .route_counts
            .iter()
            .map(|r| format!("{} {}", r.count, r.route))
            .collect();
        let total = match &substance.total_dose {
            Some(total) => {
                let estimate = if total.is_estimate { "~" } else { "" };
                format!("{estimate}{}", dose_or_unknown(Some(total.dose), &total.units))
            }
            None => "unknown".to_string(),
        };
        println!(
            "  {}: {}x ({}), total {total}",
            substance.substance_name,
            substance.ingestion_count,
            routes.join(", ")
        );
    }
    print_buckets("Ingestions", &stats.ingestion_chart_buckets);
    print_buckets("Experiences", &stats.experience_chart_buckets);
    Ok(())
}
