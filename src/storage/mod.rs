//! The local subscription list: a flat text file with one feed URL per line.
mod url_list;

pub use url_list::{ensure_parent_dir, read_urls, write_urls, StoreError};
