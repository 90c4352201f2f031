use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod error;
mod models;
mod ranking;
mod registry;
mod report;
mod roster;
mod scoring;
mod service;
mod store;

use registry::CalculatorRegistry;

#[derive(Parser)]
#[command(name = "trail-rankings")]
#[command(about = "Knowledge-trail leaderboards for Stream classes", long_about = None)]
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
    /// Import submissions and feedback from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Compute leaderboards for a class's ranked trails
    Rank {
        #[arg(long)]
        class_id: Uuid,
        /// Restrict to specific trail ids (repeatable)
        #[arg(long = "trail")]
        trails: Vec<Uuid>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Print the full leaderboards as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown leaderboard report
    Report {
        #[arg(long)]
        class_id: Uuid,
        #[arg(long = "trail")]
        trails: Vec<Uuid>,
        #[arg(long, default_value = "rankings.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
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
            store::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            store::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = store::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} submissions from {}.", csv.display());
        }
        Commands::Rank {
            class_id,
            trails,
            limit,
            json,
        } => {
            let registry = CalculatorRegistry::with_defaults()?;
            let filter = (!trails.is_empty()).then_some(trails.as_slice());
            match service::rankings_for_class(&pool, &registry, class_id, filter).await {
                Ok(leaderboards) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&leaderboards)?);
                    } else {
                        print_leaderboards(&leaderboards, limit);
                    }
                }
                Err(err) if err.is_not_found() => {
                    println!("No rankings available: {err}.");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Report {
            class_id,
            trails,
            out,
        } => {
            let registry = CalculatorRegistry::with_defaults()?;
            let filter = (!trails.is_empty()).then_some(trails.as_slice());
            match service::rankings_for_class(&pool, &registry, class_id, filter).await {
                Ok(leaderboards) => {
                    let report = report::build_report(class_id, &leaderboards);
                    std::fs::write(&out, report)?;
                    println!("Report written to {}.", out.display());
                }
                Err(err) if err.is_not_found() => {
                    println!("No rankings available: {err}.");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    Ok(())
}

fn print_leaderboards(leaderboards: &[models::TrailLeaderboard], limit: usize) {
    for leaderboard in leaderboards {
        println!("Leaderboard for \"{}\":", leaderboard.trail_name);
        for result in leaderboard.rankings.iter().take(limit) {
            let sub_scores = result
                .breakdown
                .iter()
                .map(|d| format!("{} {:.1}", d.dimension, d.points))
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "- #{} {} ({}) with {:.1} points ({}), {}/{} submitted, avg grade {:.1}",
                result.place,
                result.student_name,
                result.student_email,
                result.composite_score,
                sub_scores,
                result.submitted_count,
                result.task_count,
                result.average_grade
            );
        }
        for skipped in leaderboard.unscored.iter() {
            println!("- {} not scored: {}", skipped.student_name, skipped.reason);
        }
        println!();
    }
}
