use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use cpod_opml::config::{Config, ConfigDir};
use cpod_opml::export::export_subscriptions;
use cpod_opml::feed::HttpResolver;

#[derive(Parser, Debug)]
#[command(
    name = "cpod-export",
    about = "Write the cpod subscription list as an OPML file"
)]
struct Args {
    /// OPML file to write
    path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    cpod_opml::init_tracing();

    let args = Args::parse();

    let dir = ConfigDir::from_env().context("Failed to locate cpod config directory")?;
    let config = Config::load(&dir.config_path()).context("Failed to load configuration")?;
    let resolver =
        HttpResolver::new(config.fetch_timeout()).context("Failed to build HTTP client")?;

    let report = export_subscriptions(&dir, &config, &resolver, &args.path).await?;

    for failed in &report.failures {
        eprintln!("Skipped {}: {}", failed.url, failed.error);
    }
    println!(
        "Exported {} feeds to {}",
        report.written,
        args.path.display()
    );
    Ok(())
}
