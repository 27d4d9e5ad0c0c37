//! Subscription list → OPML.
use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt};
use std::path::Path;

use crate::config::{Config, ConfigDir};
use crate::feed::{export_to_file, FetchError, Head, Outline, TitleResolver};
use crate::storage::read_urls;

/// A subscription that could not be resolved in partial mode.
#[derive(Debug)]
pub struct FailedFeed {
    pub url: String,
    pub error: FetchError,
}

/// Outcome of an export run.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Outlines written to the OPML file.
    pub written: usize,
    /// Feeds left out; always empty unless `partial_export` is on.
    pub failures: Vec<FailedFeed>,
}

/// Reads the subscription list, resolves every feed title and writes the
/// OPML document to `output`.
///
/// By default the first feed that fails to resolve aborts the run and
/// nothing is written. With `partial_export` the failures are collected
/// and the document is written with the feeds that did resolve, unless
/// none did.
pub async fn export_subscriptions<R: TitleResolver>(
    dir: &ConfigDir,
    config: &Config,
    resolver: &R,
    output: &Path,
) -> Result<ExportReport> {
    let urls_path = dir.urls_path();
    let urls = read_urls(&urls_path)?;
    tracing::info!(path = %urls_path.display(), count = urls.len(), "Exporting subscriptions");

    let (outlines, failures) = resolve_all(resolver, &urls, config).await?;

    if outlines.is_empty() && !failures.is_empty() {
        bail!("None of the {} feeds could be resolved", failures.len());
    }

    let head = Head::now(config.opml_title.as_str());
    export_to_file(&head, &outlines, output)
        .with_context(|| format!("Failed to write OPML to {}", output.display()))?;

    Ok(ExportReport {
        written: outlines.len(),
        failures,
    })
}

/// Resolves `urls` into outlines, preserving list order.
///
/// Up to `fetch_concurrency` lookups run at once; results are consumed in
/// input order regardless of completion order.
async fn resolve_all<R: TitleResolver>(
    resolver: &R,
    urls: &[String],
    config: &Config,
) -> Result<(Vec<Outline>, Vec<FailedFeed>)> {
    let mut outlines = Vec::with_capacity(urls.len());
    let mut failures = Vec::new();

    let mut results = stream::iter(urls)
        .map(|url| async move { (url, resolver.resolve(url).await) })
        .buffered(config.effective_concurrency());

    while let Some((url, result)) = results.next().await {
        match result {
            Ok(feed) => {
                tracing::info!(url = %url, title = %feed.title, "Resolved feed");
                outlines.push(Outline {
                    xml_url: url.clone(),
                    text: feed.title,
                    kind: Some(feed.kind.as_str()),
                });
            }
            Err(error) if config.partial_export => {
                tracing::warn!(url = %url, error = %error, "Leaving out unresolvable feed");
                failures.push(FailedFeed {
                    url: url.clone(),
                    error,
                });
            }
            Err(error) => {
                return Err(error).with_context(|| format!("Failed to resolve feed {url:?}"));
            }
        }
    }

    Ok((outlines, failures))
}
