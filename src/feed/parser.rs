use feed_rs::model::FeedType;
use feed_rs::parser::{self, ParseFeedError};
use thiserror::Error;

/// Why a downloaded body could not be turned into a [`ResolvedFeed`].
#[derive(Debug, Error)]
pub enum FeedParseError {
    #[error("invalid feed: {0}")]
    Invalid(#[from] ParseFeedError),
    #[error("feed has no title")]
    MissingTitle,
}

/// Syndication format of a resolved feed, written as the OPML `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Rss,
    Atom,
    Json,
}

impl FeedKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedKind::Rss => "rss",
            FeedKind::Atom => "atom",
            FeedKind::Json => "json",
        }
    }
}

impl From<&FeedType> for FeedKind {
    fn from(value: &FeedType) -> Self {
        match value {
            FeedType::Atom => FeedKind::Atom,
            FeedType::JSON => FeedKind::Json,
            FeedType::RSS0 | FeedType::RSS1 | FeedType::RSS2 => FeedKind::Rss,
        }
    }
}

/// What export needs to know about a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFeed {
    pub title: String,
    pub kind: FeedKind,
}

/// Parses feed bytes and pulls out the declared channel title.
///
/// A feed with no title (or a blank one) is an error.
pub fn parse_feed(bytes: &[u8]) -> Result<ResolvedFeed, FeedParseError> {
    let feed = parser::parse(bytes)?;

    let title = feed
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(FeedParseError::MissingTitle)?;

    Ok(ResolvedFeed {
        title,
        kind: FeedKind::from(&feed.feed_type),
    })
}
