//! Feed-facing half of the crate: OPML documents and feed title lookup.
//!
//! - [`opml`] - OPML 2.0 parsing (import) and rendering (export)
//! - [`fetcher`] - HTTP retrieval behind the [`TitleResolver`] trait
//! - [`parser`] - Feed title extraction using the `feed-rs` crate

mod fetcher;
mod opml;
mod parser;

pub use fetcher::{FetchError, HttpResolver, TitleResolver};
pub use opml::{
    export_opml, export_to_file, parse, parse_opml_bytes, parse_opml_content, Head, OpmlError,
    OpmlFeed, Outline, OPML_VERSION,
};
pub use parser::{parse_feed, FeedKind, FeedParseError, ResolvedFeed};
