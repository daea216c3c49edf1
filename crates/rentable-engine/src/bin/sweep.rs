//! Manual sweep runner.
//!
//! Runs one hold-expiration pass (and optionally one retention pass)
//! against a database file, then exits. Intended for cron and for
//! operators poking at a stuck deployment.
//!
//! ```text
//! Usage: sweep --db <path> [--retention] [--batch <n>]
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rentable_db::{Database, DbConfig};
use rentable_engine::{
    BookingService, EngineConfig, HoldSweeper, MemoryGateway, RetentionSweeper,
};

struct Args {
    db_path: PathBuf,
    run_retention: bool,
    batch_size: Option<i64>,
}

fn print_usage() {
    eprintln!("Usage: sweep --db <path> [--retention] [--batch <n>]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <path>    SQLite database file (required)");
    eprintln!("  --retention    Also purge long-expired reservations");
    eprintln!("  --batch <n>    Max rows per pass (default 100)");
}

fn parse_args() -> Result<Args, String> {
    let mut db_path: Option<PathBuf> = None;
    let mut run_retention = false;
    let mut batch_size: Option<i64> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                let value = args.next().ok_or("--db requires a path")?;
                db_path = Some(PathBuf::from(value));
            }
            "--retention" => run_retention = true,
            "--batch" => {
                let value = args.next().ok_or("--batch requires a number")?;
                let parsed = value
                    .parse::<i64>()
                    .map_err(|_| format!("invalid batch size: {value}"))?;
                if parsed <= 0 {
                    return Err("batch size must be positive".to_string());
                }
                batch_size = Some(parsed);
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(Args {
        db_path: db_path.ok_or("--db is required")?,
        run_retention,
        batch_size,
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("Error: {message}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(err) = run(args).await {
        eprintln!("Sweep failed: {err}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::new(DbConfig::new(&args.db_path)).await?;

    let mut config = EngineConfig::default();
    if let Some(batch) = args.batch_size {
        config = config.with_sweep_batch_size(batch);
    }

    // No live gateway from the CLI; provider-side voids are picked up by
    // the service's own sweeps.
    let gateway = Arc::new(MemoryGateway::new());
    let booking = BookingService::new(db.clone(), config.clone(), gateway.clone(), gateway);

    let now = Utc::now();
    let sweeper = HoldSweeper::new(db.clone(), config.clone(), booking);
    let expired = sweeper.sweep(now).await?;
    info!(expired, "Hold sweep complete");

    if args.run_retention {
        let retention = RetentionSweeper::new(db.clone(), config);
        let purged = retention.purge(now).await?;
        info!(purged, "Retention sweep complete");
    }

    db.close().await;
    Ok(())
}
