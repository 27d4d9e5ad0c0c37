use std::io::Write;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors reading or writing the subscription list file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read URL list '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write URL list '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Reading
// ============================================================================

/// Reads the subscription list, one entry per line.
///
/// Line terminators (`\n` or `\r\n`) are stripped. Nothing else is touched:
/// blank lines and duplicates come back exactly as stored, and no URL
/// syntax is checked.
pub fn read_urls(path: &Path) -> Result<Vec<String>, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let urls: Vec<String> = content.lines().map(str::to_string).collect();
    tracing::debug!(path = %path.display(), count = urls.len(), "Read URL list");
    Ok(urls)
}

// ============================================================================
// Writing
// ============================================================================

/// Replaces the subscription list with `urls`, each followed by a newline.
///
/// The file is truncated and rewritten in place. The containing directory
/// must already exist; see [`ensure_parent_dir`].
pub fn write_urls<S: AsRef<str>>(path: &Path, urls: &[S]) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.display().to_string(),
        source,
    };

    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(write_err)?;

    let mut out = std::io::BufWriter::new(file);
    for url in urls {
        out.write_all(url.as_ref().as_bytes()).map_err(write_err)?;
        out.write_all(b"\n").map_err(write_err)?;
    }
    out.flush().map_err(write_err)?;

    tracing::debug!(path = %path.display(), count = urls.len(), "Wrote URL list");
    Ok(())
}

/// Creates every missing directory above `path`.
pub fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if parent.is_dir() {
        return Ok(());
    }

    std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
        path: parent.display().to_string(),
        source,
    })?;
    tracing::info!(path = %parent.display(), "Created config directory");
    Ok(())
}
