use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use cpod_opml::config::ConfigDir;
use cpod_opml::import::import_subscriptions;

#[derive(Parser, Debug)]
#[command(
    name = "cpod-import",
    about = "Replace the cpod subscription list with the feeds of an OPML file"
)]
struct Args {
    /// OPML file to read
    path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    cpod_opml::init_tracing();

    let args = Args::parse();

    let dir = ConfigDir::from_env().context("Failed to locate cpod config directory")?;
    let report = import_subscriptions(&dir, &args.path).await?;

    if report.imported == 0 {
        eprintln!("Warning: No feeds found in {}", args.path.display());
    }
    println!(
        "Imported {} feeds to {}",
        report.imported,
        report.urls_path.display()
    );
    Ok(())
}
