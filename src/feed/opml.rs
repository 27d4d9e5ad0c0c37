use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::encoding::Decoder;
use quick_xml::{Reader, Writer};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// OPML version written by this crate.
pub const OPML_VERSION: &str = "2.0";

/// Errors that can occur during OPML parsing.
#[derive(Debug, Error)]
pub enum OpmlError {
    /// XML parsing failed.
    #[error("XML parse error: {0}")]
    XmlParse(String),
}

/// A feed subscription read from an OPML file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpmlFeed {
    /// `title` attribute, falling back to `text`.
    pub title: Option<String>,
    /// URL of the RSS/Atom feed XML.
    pub xml_url: String,
}

/// One `<outline>` to be written on export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline {
    pub xml_url: String,
    pub text: String,
    /// Written as the `type` attribute when known.
    pub kind: Option<&'static str>,
}

/// The `<head>` of an exported document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Head {
    pub title: String,
    pub date_created: String,
}

impl Head {
    /// A head stamped with the current local time of day
    /// (e.g. `21:04:17.532810`).
    pub fn now(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date_created: chrono::Local::now().format("%H:%M:%S%.6f").to_string(),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses an OPML file from disk and extracts feed subscriptions.
///
/// The file is read as raw bytes and decoded according to its XML
/// declaration, so `encoding="ISO-8859-1"` and friends are honoured.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not well-formed XML.
pub async fn parse(path: &Path) -> Result<Vec<OpmlFeed>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read OPML file: {}", path.display()))?;
    parse_opml_bytes(&bytes)
        .with_context(|| format!("Failed to parse OPML file: {}", path.display()))
}

/// Parses OPML content and extracts every `<outline>` carrying an `xmlUrl`.
///
/// Outlines are collected anywhere in the tree and at any nesting depth, in
/// document order. Outlines without `xmlUrl` are skipped: container outlines
/// (folders) silently, self-closing ones with a warning.
pub fn parse_opml_content(content: &str) -> Result<Vec<OpmlFeed>> {
    collect_outlines(Reader::from_str(content))
}

/// Like [`parse_opml_content`], for undecoded input. The character encoding
/// is taken from the XML declaration, defaulting to UTF-8.
pub fn parse_opml_bytes(bytes: &[u8]) -> Result<Vec<OpmlFeed>> {
    collect_outlines(Reader::from_reader(bytes))
}

fn collect_outlines(mut reader: Reader<&[u8]>) -> Result<Vec<OpmlFeed>> {
    // quick-xml (0.37) never parses <!ENTITY> declarations from DOCTYPE, so
    // only the 5 XML builtins are resolved. Custom entities like &xxe; fail in
    // `decode_and_unescape_value()` instead of expanding.
    reader.config_mut().trim_text(true);

    let mut feeds = Vec::new();
    let mut buf = Vec::new();
    // quick-xml reports mismatched end tags but not unclosed ones at EOF.
    let mut open_elements: usize = 0;
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                open_elements += 1;
                seen_root = true;
                if e.name().as_ref() == b"outline" {
                    match parse_outline_attributes(&e, reader.decoder())? {
                        Some(feed) => feeds.push(feed),
                        None => tracing::debug!("Skipping OPML folder outline without xmlUrl"),
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                seen_root = true;
                if e.name().as_ref() == b"outline" {
                    match parse_outline_attributes(&e, reader.decoder())? {
                        Some(feed) => feeds.push(feed),
                        None => tracing::warn!(
                            position = reader.buffer_position(),
                            "Skipping OPML outline without xmlUrl"
                        ),
                    }
                }
            }
            Ok(Event::End(_)) => {
                open_elements = open_elements.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpmlError::XmlParse(e.to_string()).into()),
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(OpmlError::XmlParse("no root element found".to_string()).into());
    }
    if open_elements > 0 {
        return Err(OpmlError::XmlParse(format!(
            "unexpected end of document, {open_elements} element(s) left open"
        ))
        .into());
    }

    Ok(feeds)
}

fn parse_outline_attributes(e: &BytesStart<'_>, decoder: Decoder) -> Result<Option<OpmlFeed>> {
    let mut xml_url = None;
    let mut title = None;
    let mut text = None;

    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed OPML attribute");
                continue;
            }
        };
        match attr.key.as_ref() {
            b"xmlUrl" => xml_url = Some(attr.decode_and_unescape_value(decoder)?.into_owned()),
            b"title" => title = Some(attr.decode_and_unescape_value(decoder)?.into_owned()),
            b"text" => text = Some(attr.decode_and_unescape_value(decoder)?.into_owned()),
            _ => {}
        }
    }

    Ok(xml_url.map(|xml_url| OpmlFeed {
        title: title.or(text),
        xml_url,
    }))
}

// ============================================================================
// Export
// ============================================================================

/// Renders an OPML 2.0 document.
///
/// The skeleton is fixed: `<head>` holds `title` and `dateCreated`, `<body>`
/// holds one self-closing `<outline>` per entry in input order with `text`,
/// `xmlUrl` and, when known, `type`. Attribute values are escaped by the
/// writer.
pub fn export_opml(head: &Head, outlines: &[Outline]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut opml = BytesStart::new("opml");
    opml.push_attribute(("version", OPML_VERSION));
    writer
        .write_event(Event::Start(opml))
        .context("Failed to write opml element")?;

    writer
        .write_event(Event::Start(BytesStart::new("head")))
        .context("Failed to write head element")?;
    write_text_element(&mut writer, "title", &head.title)?;
    write_text_element(&mut writer, "dateCreated", &head.date_created)?;
    writer
        .write_event(Event::End(BytesEnd::new("head")))
        .context("Failed to write head end")?;

    writer
        .write_event(Event::Start(BytesStart::new("body")))
        .context("Failed to write body element")?;

    for outline in outlines {
        let mut element = BytesStart::new("outline");
        if let Some(kind) = outline.kind {
            element.push_attribute(("type", kind));
        }
        element.push_attribute(("text", outline.text.as_str()));
        element.push_attribute(("xmlUrl", outline.xml_url.as_str()));
        writer
            .write_event(Event::Empty(element))
            .context("Failed to write outline element")?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("body")))
        .context("Failed to write body end")?;
    writer
        .write_event(Event::End(BytesEnd::new("opml")))
        .context("Failed to write opml end")?;

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).context("Generated OPML contains invalid UTF-8")
}

fn write_text_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Failed to write {name} element"))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .with_context(|| format!("Failed to write {name} text"))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Failed to write {name} end"))?;
    Ok(())
}

/// Writes an OPML document to `path` atomically.
///
/// The document goes to a temporary file in the same directory, is synced,
/// then renamed over `path`, so a failure never leaves a half-written file.
pub fn export_to_file(head: &Head, outlines: &[Outline], path: &Path) -> Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let content = export_opml(head, outlines)?;

    // Randomized temp filename to prevent TOCTOU race conditions
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_extension(format!("tmp.{:016x}", random_suffix));

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .with_context(|| {
            format!(
                "Failed to create temporary file '{}': check directory permissions",
                temp_path.display()
            )
        })?;

    std::io::Write::write_all(&mut file, content.as_bytes()).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to write OPML to temporary file '{}'",
            temp_path.display()
        )
    })?;

    file.sync_all().with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to sync temporary file '{}' to disk",
            temp_path.display()
        )
    })?;

    drop(file);

    std::fs::rename(&temp_path, path).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to rename '{}' to '{}'",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}
