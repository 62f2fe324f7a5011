//! Heuristic text recovery from PDF bytes.
//!
//! Three tiers are tried in order, each only when the previous one found
//! nothing:
//!
//! 1. **Structured**: tagged-content markers (`/Heading`, `/Paragraph`,
//!    `/Text`) delimit blocks.
//! 2. **Whitespace split**: all printable text, split on wide gaps.
//! 3. **Text objects**: string literals shown with `Tj`/`TJ` inside
//!    `BT`..`ET` pairs.
//!
//! There is no object graph, xref or stream decoding. Compressed content
//! streams yield nothing.

use std::fmt;
use std::sync::OnceLock;

use log::{debug, info};
use memchr::memchr;
use regex::Regex;
use serde::Serialize;

use super::{cached_regex, Extracted, ExtractorKind, FormatImporter, ImportOptions, Strategy};
use crate::error::{Error, Result};
use crate::model::{Block, BlockKind, ExtractionResult};

const HEADING_MARKER: &[u8] = b"/Heading";
const PARAGRAPH_MARKER: &[u8] = b"/Paragraph";
const TEXT_MARKER: &[u8] = b"/Text";
const SECTION_MARKER: &[u8] = b"/S";
const TEXT_TERMINATOR: &[u8] = b">\n";

/// Maximum distance searched backwards from a text-show operator.
pub const SHOW_LOOKBEHIND: usize = 100;

static WIDE_GAP: OnceLock<Regex> = OnceLock::new();
static ALNUM_PAIR: OnceLock<Regex> = OnceLock::new();

/// Which tier produced a PDF extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfTier {
    /// Tagged-content markers
    Structured,
    /// Printable runs split on whitespace gaps
    WhitespaceSplit,
    /// `BT`/`ET` text objects
    TextObjects,
}

impl fmt::Display for PdfTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfTier::Structured => write!(f, "structured markers"),
            PdfTier::WhitespaceSplit => write!(f, "whitespace split"),
            PdfTier::TextObjects => write!(f, "text objects"),
        }
    }
}

/// Blocks recovered from a PDF and the tier that found them.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfExtraction {
    /// Recovered blocks
    pub result: ExtractionResult,
    /// Tier that produced the blocks
    pub tier: PdfTier,
}

/// Three-tier PDF text extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create an extractor.
    pub fn new() -> Self {
        Self
    }

    /// Run the tiers in order and return the first non-empty result.
    ///
    /// Declines when all three tiers come back empty.
    pub fn extract(&self, data: &[u8]) -> Result<PdfExtraction> {
        let tiers: [(PdfTier, fn(&[u8]) -> ExtractionResult); 3] = [
            (PdfTier::Structured, structured_tier),
            (PdfTier::WhitespaceSplit, whitespace_tier),
            (PdfTier::TextObjects, text_object_tier),
        ];

        for (tier, run) in tiers {
            let result = run(data);
            if result.is_empty() {
                debug!("PDF tier '{}' found nothing", tier);
                continue;
            }
            info!(
                "PDF tier '{}' recovered {} block(s)",
                tier,
                result.blocks.len()
            );
            return Ok(PdfExtraction { result, tier });
        }
        Err(Error::declined("no text found in any PDF tier"))
    }
}

/// PDF importer.
#[derive(Debug, Clone, Default)]
pub struct PdfImporter {
    extractor: PdfExtractor,
}

impl PdfImporter {
    /// Create a new PDF importer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FormatImporter for PdfImporter {
    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn name(&self) -> &str {
        "pdf"
    }

    fn extractor_kind(&self) -> ExtractorKind {
        ExtractorKind::Pdf
    }

    fn import(&self, _extension: &str, data: &[u8], _options: &ImportOptions) -> Result<Extracted> {
        let extraction = self.extractor.extract(data)?;
        Ok(Extracted::new(
            extraction.result.to_html(),
            Strategy::Pdf(extraction.tier),
        ))
    }
}

fn starts_with_at(data: &[u8], pos: usize, marker: &[u8]) -> bool {
    data.get(pos..pos + marker.len()) == Some(marker)
}

/// Tier 1: blocks delimited by tagged-content markers.
pub fn structured_tier(data: &[u8]) -> ExtractionResult {
    let mut result = ExtractionResult::new();
    let mut buffer = String::new();
    let mut kind = BlockKind::Paragraph;
    let mut pos = 0;

    let flush = |buffer: &mut String, kind: BlockKind, result: &mut ExtractionResult| {
        let text = buffer.trim();
        if !text.is_empty() {
            result.push(Block::new(kind).with_run(text));
        }
        buffer.clear();
    };

    while let Some(offset) = memchr(b'/', &data[pos..]) {
        let at = pos + offset;
        if starts_with_at(data, at, HEADING_MARKER) {
            flush(&mut buffer, kind, &mut result);
            kind = BlockKind::Heading(2);
            pos = at + HEADING_MARKER.len();
        } else if starts_with_at(data, at, PARAGRAPH_MARKER) {
            flush(&mut buffer, kind, &mut result);
            kind = BlockKind::Paragraph;
            pos = at + PARAGRAPH_MARKER.len();
        } else if starts_with_at(data, at, TEXT_MARKER) {
            let start = at + TEXT_MARKER.len();
            let end = memchr::memmem::find(&data[start..], TEXT_TERMINATOR)
                .map(|i| start + i)
                .unwrap_or(data.len());
            let text = decode_text_range(&data[start..end]);
            if cached_regex(&ALNUM_PAIR, r"[a-zA-Z0-9]{2,}").is_match(&text) {
                buffer.push_str(text.trim());
                buffer.push(' ');
            }
            pos = end.max(start);
        } else if starts_with_at(data, at, SECTION_MARKER) {
            flush(&mut buffer, kind, &mut result);
            pos = at + SECTION_MARKER.len();
        } else {
            pos = at + 1;
        }
    }
    flush(&mut buffer, kind, &mut result);
    result
}

/// Decode the bytes after a `/Text` marker.
///
/// String literals are decoded and concatenated. A range with no literal,
/// such as the `/Text` entry of a `/ProcSet` array, yields nothing.
pub fn decode_text_range(range: &[u8]) -> String {
    let mut literals = String::new();
    let mut i = 0;
    while i < range.len() {
        if range[i] == b'(' {
            let (text, end) = decode_literal(range, i);
            literals.push_str(&text);
            i = end;
        } else {
            i += 1;
        }
    }
    literals
}

/// Tier 2: printable text split on runs of three or more whitespace characters.
pub fn whitespace_tier(data: &[u8]) -> ExtractionResult {
    let text: String = data
        .iter()
        .filter_map(|&b| match b {
            0x20..=0x7E => Some(char::from(b)),
            b'\r' | b'\n' => Some(' '),
            _ => None,
        })
        .collect();

    let mut result = ExtractionResult::new();
    for segment in cached_regex(&WIDE_GAP, r"\s{3,}").split(&text) {
        result.push(Block::paragraph(segment.trim()));
    }
    result
}

/// Tier 3: one line per `BT`..`ET` text object from shown string literals.
pub fn text_object_tier(data: &[u8]) -> ExtractionResult {
    let mut result = ExtractionResult::new();
    let mut in_text = false;
    let mut line = String::new();
    let mut i = 0;

    while i + 1 < data.len() {
        let pair = &data[i..i + 2];
        if pair == b"BT" && is_operator_at(data, i, 2) {
            in_text = true;
            line.clear();
            i += 2;
        } else if pair == b"ET" && is_operator_at(data, i, 2) {
            if in_text {
                result.push(Block::paragraph(line.trim()));
            }
            in_text = false;
            line.clear();
            i += 2;
        } else if in_text && pair == b"Tj" && is_operator_at(data, i, 2) {
            if let Some(text) = shown_literal(data, i) {
                line.push_str(&text);
            }
            i += 2;
        } else if in_text && pair == b"TJ" && is_operator_at(data, i, 2) {
            if let Some(text) = shown_array(data, i) {
                line.push_str(&text);
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    result
}

fn is_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'(' | b')' | b'[' | b']' | b'<' | b'>' | b'/')
}

fn is_operator_at(data: &[u8], pos: usize, len: usize) -> bool {
    let before = pos == 0 || is_delimiter(data[pos - 1]);
    let after = data.get(pos + len).map_or(true, |&b| is_delimiter(b));
    before && after
}

fn floor(pos: usize) -> usize {
    pos.saturating_sub(SHOW_LOOKBEHIND)
}

/// Decode the literal operand immediately before a `Tj` at `op`.
fn shown_literal(data: &[u8], op: usize) -> Option<String> {
    let close = last_non_space_before(data, op, floor(op))?;
    if data[close] != b')' {
        return None;
    }
    let open = matching_open(data, close, floor(op))?;
    Some(decode_literal(data, open).0)
}

/// Decode every literal in the array operand before a `TJ` at `op`.
fn shown_array(data: &[u8], op: usize) -> Option<String> {
    let close = last_non_space_before(data, op, floor(op))?;
    if data[close] != b']' {
        return None;
    }
    let open = (floor(op)..close).rev().find(|&i| data[i] == b'[')?;
    let mut text = String::new();
    let mut i = open + 1;
    while i < close {
        if data[i] == b'(' {
            let (decoded, end) = decode_literal(data, i);
            text.push_str(&decoded);
            i = end;
        } else {
            i += 1;
        }
    }
    Some(text)
}

fn last_non_space_before(data: &[u8], pos: usize, floor: usize) -> Option<usize> {
    (floor..pos).rev().find(|&i| !data[i].is_ascii_whitespace())
}

fn is_escaped(data: &[u8], pos: usize) -> bool {
    let backslashes = data[..pos].iter().rev().take_while(|&&b| b == b'\\').count();
    backslashes % 2 == 1
}

/// Walk back from a closing paren to its balanced opening paren.
fn matching_open(data: &[u8], close: usize, floor: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in (floor..=close).rev() {
        match data[i] {
            b')' if !is_escaped(data, i) => depth += 1,
            b'(' if !is_escaped(data, i) => {
                if depth <= 1 {
                    return Some(i);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}

/// Decode a string literal whose `(` is at `open`.
///
/// Returns the printable text and the index just past the closing paren.
/// Balanced inner parentheses are kept; malformed escapes are skipped and
/// an unterminated literal yields what was read.
pub fn decode_literal(data: &[u8], open: usize) -> (String, usize) {
    let mut out: Vec<u8> = Vec::new();
    let mut depth = 1usize;
    let mut i = open + 1;

    while i < data.len() {
        let b = data[i];
        match b {
            b'\\' => {
                i += 1;
                let Some(&esc) = data.get(i) else {
                    break;
                };
                match esc {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0C),
                    b'(' | b')' | b'\\' => out.push(esc),
                    b'0'..=b'7' => {
                        let mut value: u32 = 0;
                        let mut digits = 0;
                        while digits < 3 {
                            match data.get(i) {
                                Some(&d @ b'0'..=b'7') => {
                                    value = value * 8 + u32::from(d - b'0');
                                    digits += 1;
                                    i += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push((value & 0xFF) as u8);
                        continue;
                    }
                    b'\r' => {
                        if data.get(i + 1) == Some(&b'\n') {
                            i += 1;
                        }
                    }
                    b'\n' => {}
                    other => out.push(other),
                }
                i += 1;
            }
            b'(' => {
                depth += 1;
                out.push(b);
                i += 1;
            }
            b')' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    break;
                }
                out.push(b);
            }
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }

    let text = out
        .into_iter()
        .filter(|b| matches!(b, 0x20..=0x7E | b'\n' | b'\t'))
        .map(char::from)
        .collect();
    (text, i)
}
