//! Conversion between the cpod subscription list and OPML.
//!
//! The subscription list is a plain text file under the cpod configuration
//! directory with one feed URL per line. Two pipelines operate on it:
//!
//! - [`export::export_subscriptions`]: read the list, look up each feed's
//!   title, write an OPML 2.0 document.
//! - [`import::import_subscriptions`]: read an OPML document, write every
//!   outline's `xmlUrl` back to the list.

pub mod config;
pub mod export;
pub mod feed;
pub mod import;
pub mod storage;

/// Installs the `tracing` subscriber used by both binaries.
///
/// Filtering follows `RUST_LOG`; output goes to stderr so stdout stays free
/// for the summary lines.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}
