mod config;
mod db;
mod fetcher;
mod parser;
mod pipeline;
mod postback;

use std::time::Instant;

use clap::{Parser, Subcommand};

use config::Config;
use fetcher::HttpFetcher;

#[derive(Parser)]
#[command(name = "etrack_scraper", about = "Development application scraper for the eTrack planning portal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the portal's result pages and upsert applications
    Run {
        /// Max result pages to walk (default: all)
        #[arg(short = 'n', long)]
        pages: Option<usize>,
        /// SQLite database path
        #[arg(long)]
        db: Option<String>,
        /// Pause between fetches, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Show store statistics
    Stats {
        #[arg(long)]
        db: Option<String>,
    },
    /// List stored applications, newest scrape first
    List {
        #[arg(long)]
        db: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { pages, db, delay_ms } => {
            let mut cfg = Config::default();
            if let Some(db) = db {
                cfg.db_path = db;
            }
            if let Some(ms) = delay_ms {
                cfg.delay_ms = ms;
            }

            let conn = db::connect(&cfg.db_path)?;
            let fetcher = HttpFetcher::new()?;
            let stats = pipeline::run(&cfg, &fetcher, &conn, pages).await?;
            println!(
                "Done: {} pages ({} failed), {} candidates, {} saved, {} without address, {} errors.",
                stats.pages,
                stats.pages_failed,
                stats.candidates,
                stats.saved,
                stats.no_address,
                stats.failed
            );
            Ok(())
        }
        Commands::Stats { db } => {
            let conn = db::connect(db.as_deref().unwrap_or(&Config::default().db_path))?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Applications:   {}", s.total);
            println!("With lodgement: {}", s.with_received_date);
            println!(
                "Last scraped:   {}",
                s.last_scraped.as_deref().unwrap_or("never")
            );
            Ok(())
        }
        Commands::List { db, limit, json } => {
            let conn = db::connect(db.as_deref().unwrap_or(&Config::default().db_path))?;
            db::init_schema(&conn)?;
            let rows = db::fetch_applications(&conn, limit)?;
            if rows.is_empty() {
                println!("No applications stored. Run 'run' first.");
                return Ok(());
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }

            println!(
                "{:>3} | {:<12} | {:<40} | {:<10} | {:<10}",
                "#", "Reference", "Address", "Received", "Scraped"
            );
            println!("{}", "-".repeat(88));
            for (i, r) in rows.iter().enumerate() {
                let received = if r.date_received.is_empty() {
                    "-"
                } else {
                    &r.date_received
                };
                println!(
                    "{:>3} | {:<12} | {:<40} | {:<10} | {:<10}",
                    i + 1,
                    r.council_reference,
                    truncate(&r.address, 40),
                    received,
                    r.date_scraped
                );
            }
            println!("\n{} applications", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
