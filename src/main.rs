use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod db;
mod models;
mod movement;
mod pattern;
mod recommend;
mod report;
mod segments;
mod summaries;
mod trend;

use models::{SegmentScheme, Term};

#[derive(Parser)]
#[command(name = "tier-progression")]
#[command(about = "Tier progression analytics for fellowship classroom observations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import observations from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Aggregate tier mix statistics
    Stats {
        #[arg(long)]
        term: Option<Term>,
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        school_level: Option<String>,
        #[arg(long)]
        fellowship_year: Option<String>,
        /// Slice by school-level or fellowship-year
        #[arg(long)]
        segment: Option<SegmentScheme>,
        #[arg(long)]
        json: bool,
    },
    /// Classify term-to-term movements
    Movements {
        #[arg(long)]
        segment: Option<SegmentScheme>,
        #[arg(long)]
        json: bool,
    },
    /// Detect multi-term trajectory patterns
    Patterns {
        #[arg(long)]
        segment: Option<SegmentScheme>,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        segment: Option<SegmentScheme>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} observations from {}.", csv.display());
        }
        Commands::Stats {
            term,
            domain,
            school_level,
            fellowship_year,
            segment,
            json,
        } => {
            let records = db::fetch_observations(
                &pool,
                term,
                domain.as_deref(),
                school_level.as_deref(),
                fellowship_year.as_deref(),
            )
            .await?;
            let stats = aggregate::aggregate(&records, segment)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else if stats.is_empty() {
                println!("No observations found for this selection.");
            } else {
                println!("Tier mix by term and domain:");
                for stat in &stats {
                    println!(
                        "- {} {} ({}): n={} T1 {:.1}% / T2 {:.1}% / T3 {:.1}%, index {:.2}, avg {:.2}",
                        stat.term,
                        stat.domain,
                        stat.segment.as_deref().unwrap_or("Overall"),
                        stat.count,
                        stat.tier_pct[0],
                        stat.tier_pct[1],
                        stat.tier_pct[2],
                        stat.dominant_index,
                        stat.domain_avg
                    );
                }
            }
        }
        Commands::Movements { segment, json } => {
            let records = db::fetch_observations(&pool, None, None, None, None).await?;
            let stats = aggregate::aggregate(&records, segment)?;
            let movements = movement::classify_movements(&stats, &Term::ORDER);

            if json {
                println!("{}", serde_json::to_string_pretty(&movements)?);
            } else if movements.is_empty() {
                println!("Insufficient data: movements need two consecutive terms.");
            } else {
                println!("Term-to-term movements:");
                for record in &movements {
                    println!(
                        "- {} ({}) {} → {}: {} (T3 {:+.1} pp, index {:+.2})",
                        record.domain,
                        record.segment.as_deref().unwrap_or("Overall"),
                        record.from_term,
                        record.to_term,
                        record.movement,
                        record.tier3_delta,
                        record.index_delta
                    );
                }
            }
        }
        Commands::Patterns { segment, json } => {
            let records = db::fetch_observations(&pool, None, None, None, None).await?;
            let stats = aggregate::aggregate(&records, segment)?;
            let patterns = pattern::detect_domain_patterns(&stats, &Term::ORDER);

            if json {
                println!("{}", serde_json::to_string_pretty(&patterns)?);
            } else if patterns.is_empty() {
                println!("Insufficient data: patterns need three terms.");
            } else {
                println!("Trajectory patterns:");
                for domain_pattern in &patterns {
                    println!(
                        "- {} ({}): {} ({:.1}% → {:.1}% → {:.1}%)",
                        domain_pattern.domain,
                        domain_pattern.segment.as_deref().unwrap_or("Overall"),
                        domain_pattern.label,
                        domain_pattern.tier3_series[0],
                        domain_pattern.tier3_series[1],
                        domain_pattern.tier3_series[2]
                    );
                }
            }
        }
        Commands::Report { segment, out } => {
            let records = db::fetch_observations(&pool, None, None, None, None).await?;
            let overall = aggregate::aggregate(&records, None)?;
            let segmented = match segment {
                Some(scheme) => Some(aggregate::aggregate(&records, Some(scheme))?),
                None => None,
            };

            let report = report::build_report(
                segment,
                chrono::Utc::now().date_naive(),
                &records,
                &overall,
                segmented.as_deref(),
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
