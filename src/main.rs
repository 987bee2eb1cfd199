use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use vahan_insights::{
    derive_growth, write_csv, Analytics, GeneratorConfig, GrowthMetric, SeriesGenerator, Store,
};

const DEFAULT_DB_PATH: &str = "vehicle_data.db";
const DEFAULT_CSV_PATH: &str = "vehicle_data.csv";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("analyze");
    let db_path = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

    match command {
        "generate" => run_generate(&db_path),
        "analyze" => run_analyze(&db_path),
        other => {
            eprintln!("Unknown command '{}'", other);
            eprintln!("Usage: vahan-insights [generate|analyze] [db-path]");
            std::process::exit(1);
        }
    }
}

fn run_generate(db_path: &Path) -> Result<()> {
    println!("Vahan Insights - Dataset Generation");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = GeneratorConfig::default();
    println!(
        "\nGenerating synthetic registrations {} .. {} (seed {})...",
        config.start, config.end, config.random_seed
    );
    let generator = SeriesGenerator::new(config).context("Invalid generator configuration")?;
    let raw = generator.generate()?;
    println!("✓ Generated {} raw records", raw.len());

    println!("\nCalculating growth metrics...");
    let records = derive_growth(&raw).context("Growth derivation failed")?;
    println!("✓ Derived YoY/QoQ growth for {} records", records.len());

    println!("\nSaving to {}...", db_path.display());
    let mut store = Store::open(db_path).context("Failed to open database")?;
    // regenerating replaces any previous dataset
    store.clear().context("Failed to clear previous dataset")?;
    let loaded = store.load(&records).context("Failed to load records")?;
    println!("✓ Loaded {} records (period/category/entity indexed)", loaded);

    let csv_path = db_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(DEFAULT_CSV_PATH);
    write_csv(&csv_path, &records).context("CSV backup failed")?;
    println!("✓ CSV backup written to {}", csv_path.display());

    println!("\n✓ Dataset generation completed");
    Ok(())
}

fn run_analyze(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        eprintln!("Database not found: {}", db_path.display());
        eprintln!("Run: vahan-insights generate");
        std::process::exit(1);
    }

    let store = Store::open(db_path).context("Failed to open database")?;
    let analytics = Analytics::new(&store);

    let Some(range) = store.date_range()? else {
        println!("Database is empty - run: vahan-insights generate");
        return Ok(());
    };

    println!("Vehicle Registration Market Analysis");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Analysis period: {} to {}\n", range.0, range.1);

    // 1. Market size
    println!("MARKET SIZE BY CATEGORY");
    let summary = analytics.category_summary(range)?;
    let market_total: i64 = summary.iter().map(|s| s.total_count).sum();
    for row in &summary {
        let share = row.total_count as f64 / market_total as f64 * 100.0;
        println!(
            "  {}: {} registrations ({:.1}%), {} manufacturers",
            row.category, row.total_count, share, row.manufacturer_count
        );
    }
    println!("  Total market size: {} registrations\n", market_total);

    // 2. Growth leaders
    println!("TOP YoY GROWTH PERFORMERS");
    for leader in analytics.growth_leaders(range, GrowthMetric::Yoy)?.iter().take(5) {
        println!(
            "  {} ({}): {:.1}% YoY",
            leader.manufacturer, leader.category, leader.avg_growth
        );
    }
    println!();

    // 3. Market leadership per category
    println!("MARKET LEADERSHIP");
    for category in store.categories()? {
        let shares = analytics.market_share(range, category)?;
        if let Some(leader) = shares.first() {
            println!(
                "  {} leader: {} ({:.1}%)",
                category, leader.manufacturer, leader.share
            );
        }
    }
    println!();

    // 4. Dataset summary
    println!("DATASET SUMMARY");
    println!("  Total records: {}", store.record_count()?);
    println!("  Manufacturers: {}", store.manufacturers(None)?.len());
    println!("  Granularity: monthly, with YoY/QoQ growth");

    Ok(())
}
