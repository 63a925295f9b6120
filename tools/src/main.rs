//! rfv-runner: headless RFV segmentation runner.
//!
//! Usage:
//!   rfv-runner --db deals.db --start 2024-01-01 --end 2024-01-31
//!   rfv-runner --demo 500 --seed 7 --as-of 2024-07-01 --json
//!   rfv-runner --db deals.db --seller s-01 --metrics-only

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rfv_core::{
    demo,
    engine::{Analysis, SegmentationEngine},
    filters::SegmentFilters,
    ingest::parse_timestamp,
    warning::DataWarning,
    CancelSignal, EngineConfig, SqliteStore,
};
use std::env;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let demo_customers = parse_arg(&args, "--demo", 0usize);
    let seed = parse_arg(&args, "--seed", 42u64);
    let json = args.iter().any(|a| a == "--json");
    let metrics_only = args.iter().any(|a| a == "--metrics-only");

    let as_of: DateTime<Utc> = match flag_value(&args, "--as-of") {
        Some(raw) => parse_timestamp(raw).with_context(|| format!("--as-of: cannot parse '{raw}'"))?,
        None => Utc::now(),
    };

    let mut filters = SegmentFilters::all();
    filters.start = parse_date(&args, "--start")?;
    filters.end = parse_date(&args, "--end")?;
    if let Some(funnel) = flag_value(&args, "--funnel") {
        filters = filters.with_funnel(funnel);
    }
    if let Some(seller) = flag_value(&args, "--seller") {
        filters = filters.with_seller(seller);
    }
    if let Some(origin) = flag_value(&args, "--origin") {
        filters = filters.with_origin(origin);
    }

    if !json {
        println!("RFV segmentation: rfv-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  as_of:     {as_of}");
        if demo_customers > 0 {
            println!("  demo:      {demo_customers} customer(s), seed {seed}");
        }
        println!();
    }

    let store = if db == ":memory:" {
        SqliteStore::in_memory()?
    } else {
        SqliteStore::open(db)?
    };
    store.migrate()?;

    if demo_customers > 0 {
        demo::seed_store(&store, seed, demo_customers, as_of.date_naive())?;
    }

    let config = load_config(data_dir)?;
    let engine = SegmentationEngine::new(store, config)?;
    let analysis = engine.analyze(&filters, as_of, &CancelSignal::never()).await?;

    match (json, metrics_only) {
        (true, true) => println!("{}", serde_json::to_string_pretty(&analysis.metrics())?),
        (true, false) => println!("{}", serde_json::to_string_pretty(&analysis.report())?),
        (false, true) => print_metrics(&analysis),
        (false, false) => {
            print_metrics(&analysis);
            print_segments(&analysis);
            print_top_customers(&analysis, 10);
        }
    }
    if !json {
        print_warnings(&analysis.warnings);
    }

    Ok(())
}

/// `{data_dir}/rfv/engine.json` if present, built-in defaults otherwise.
fn load_config(data_dir: &str) -> Result<EngineConfig> {
    if Path::new(data_dir).join("rfv").join("engine.json").exists() {
        EngineConfig::load(data_dir)
    } else {
        log::warn!("No rfv/engine.json under {data_dir}; using built-in defaults");
        Ok(EngineConfig::default_test())
    }
}

fn print_metrics(analysis: &Analysis) {
    let m = analysis.metrics();
    println!("=== METRICS ===");
    println!("  run_id:          {}", analysis.run_id);
    println!("  customers:       {}", m.total_customers);
    println!("  transactions:    {}", analysis.metrics.total_transactions);
    println!("  revenue:         {:.2}", m.revenue);
    println!("  average ticket:  {:.2}", m.average_ticket);
    println!("  active:          {}", m.active_count);
    println!("  needs attention: {}", m.attention_count);
    println!("  dormant:         {}", analysis.metrics.cohorts.dormant);
    println!("  at risk:         {}", m.at_risk_count);
    println!("  new:             {}", m.new_count);
    println!();
}

fn print_segments(analysis: &Analysis) {
    println!("=== SEGMENTS ===");
    if analysis.is_empty() {
        println!("  (No customers in window)");
        println!();
        return;
    }
    for s in analysis.metrics.segments.iter().filter(|s| s.customers > 0) {
        println!(
            "  {:<24} {:>6} | {:>5.1}% | Revenue: {:.2}",
            s.label,
            s.customers,
            s.share_of_customers * 100.0,
            s.revenue
        );
    }
    println!();

    println!("=== SCORE DISTRIBUTION (1..5) ===");
    let d = &analysis.metrics.distribution;
    println!("  recency:   {:?}", d.recency.0);
    println!("  frequency: {:?}", d.frequency.0);
    println!("  monetary:  {:?}", d.monetary.0);
    println!();
}

fn print_top_customers(analysis: &Analysis, limit: usize) {
    if analysis.is_empty() {
        return;
    }
    println!("=== TOP {limit} CUSTOMERS BY REVENUE ===");
    for c in analysis.customers.iter().take(limit) {
        println!(
            "  {:<28} {} {:<18} | {:>3} purchase(s) | {:>4} day(s) | {:.2}",
            c.customer_name.as_deref().unwrap_or(c.profile.customer_key.id()),
            c.rfv_code(),
            c.segment.label(),
            c.profile.frequency,
            c.profile.recency_days,
            c.profile.total_monetary
        );
    }
    println!();
}

fn print_warnings(warnings: &[DataWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!("=== WARNINGS ===");
    for w in warnings {
        match w {
            DataWarning::PartialFetch { query, pages_fetched, rows_fetched, reason } => println!(
                "  PARTIAL  {query}: {rows_fetched} row(s) over {pages_fetched} page(s) before: {reason}"
            ),
            DataWarning::Cancelled { query, pages_fetched, rows_fetched } => println!(
                "  CANCEL   {query}: stopped after {pages_fetched} page(s), {rows_fetched} row(s)"
            ),
            DataWarning::LookupUnavailable { query, reason } => {
                println!("  LOOKUP   {query}: {reason} (names omitted)")
            }
            DataWarning::MalformedRecords { invalid_amounts, undated } => println!(
                "  DATA     {invalid_amounts} unparseable amount(s), {undated} undated deal(s)"
            ),
        }
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_date(args: &[String], flag: &str) -> Result<Option<NaiveDate>> {
    flag_value(args, flag)
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("{flag}: expected YYYY-MM-DD, got '{raw}'"))
        })
        .transpose()
}
