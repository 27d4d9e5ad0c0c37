//! OPML → subscription list.
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::ConfigDir;
use crate::feed::parse;
use crate::storage::{ensure_parent_dir, write_urls};

/// Outcome of an import run.
#[derive(Debug)]
pub struct ImportReport {
    pub imported: usize,
    pub urls_path: PathBuf,
}

/// Replaces the subscription list with the feed URLs found in the OPML file
/// at `input`.
///
/// Only `xmlUrl` values survive; titles and head metadata are dropped. The
/// config directory is created if it does not exist yet. The document is
/// fully parsed before the list is touched, so a malformed file leaves the
/// existing list alone.
pub async fn import_subscriptions(dir: &ConfigDir, input: &Path) -> Result<ImportReport> {
    let feeds = parse(input)
        .await
        .with_context(|| format!("Failed to import {}", input.display()))?;
    let urls: Vec<String> = feeds.into_iter().map(|f| f.xml_url).collect();

    let urls_path = dir.urls_path();
    ensure_parent_dir(&urls_path)?;
    write_urls(&urls_path, &urls)?;

    tracing::info!(
        from = %input.display(),
        to = %urls_path.display(),
        count = urls.len(),
        "Imported subscriptions"
    );

    Ok(ImportReport {
        imported: urls.len(),
        urls_path,
    })
}
