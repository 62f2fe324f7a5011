//! Format detection from file extensions and leading bytes.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// A document format known to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// Plain text
    Text,
    /// HTML markup
    Html,
    /// Markdown
    Markdown,
    /// Rich Text Format
    Rtf,
    /// Zip-packaged office document with an XML body part
    Docx,
    /// Other office binaries (doc, odt, pages); extraction declines on these
    LegacyOffice(String),
    /// Portable Document Format
    Pdf,
    /// Anything else; imported as plain text
    Unknown(String),
}

impl Format {
    /// Map a file extension (with or without the leading dot) to a format.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "text" => Format::Text,
            "html" | "htm" => Format::Html,
            "md" | "markdown" => Format::Markdown,
            "rtf" => Format::Rtf,
            "docx" => Format::Docx,
            "doc" | "odt" | "pages" => Format::LegacyOffice(ext),
            "pdf" => Format::Pdf,
            _ => Format::Unknown(ext),
        }
    }

    /// Whether the source must be read as raw bytes rather than text.
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            Format::Rtf | Format::Docx | Format::LegacyOffice(_) | Format::Pdf
        )
    }

    /// Canonical lowercase extension for this format.
    pub fn extension(&self) -> &str {
        match self {
            Format::Text => "txt",
            Format::Html => "html",
            Format::Markdown => "md",
            Format::Rtf => "rtf",
            Format::Docx => "docx",
            Format::LegacyOffice(ext) | Format::Unknown(ext) => ext,
            Format::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Text => write!(f, "plain text"),
            Format::Html => write!(f, "HTML"),
            Format::Markdown => write!(f, "Markdown"),
            Format::Rtf => write!(f, "RTF"),
            Format::Docx => write!(f, "DOCX"),
            Format::LegacyOffice(ext) => write!(f, "{} (office)", ext.to_uppercase()),
            Format::Pdf => write!(f, "PDF"),
            Format::Unknown(ext) if ext.is_empty() => write!(f, "unknown"),
            Format::Unknown(ext) => write!(f, "unknown (.{})", ext),
        }
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";
const RTF_MAGIC: &[u8] = b"{\\rtf";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Detect a format from the file extension of a path.
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Format {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    Format::from_extension(ext)
}

/// Sniff a format from the leading bytes of a buffer.
///
/// Returns `None` when no signature matches. Zip containers are reported as
/// [`Format::Docx`] without looking inside.
pub fn detect_format_from_bytes(data: &[u8]) -> Option<Format> {
    if data.starts_with(PDF_MAGIC) {
        Some(Format::Pdf)
    } else if data.starts_with(RTF_MAGIC) {
        Some(Format::Rtf)
    } else if data.starts_with(ZIP_MAGIC) {
        Some(Format::Docx)
    } else if data.starts_with(OLE_MAGIC) {
        Some(Format::LegacyOffice("doc".to_string()))
    } else {
        None
    }
}

/// Sniff the format of a file on disk from its first bytes.
pub fn sniff_file<P: AsRef<Path>>(path: P) -> Result<Option<Format>> {
    let mut header = Vec::with_capacity(16);
    File::open(path)?.take(16).read_to_end(&mut header)?;
    Ok(detect_format_from_bytes(&header))
}
