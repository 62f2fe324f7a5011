//! Signature-scan text recovery from DOCX-class office files.
//!
//! No zip directory or XML parser is involved. The scanner looks for the
//! body part name in the raw bytes, copies a bounded window of printable
//! ASCII after it, and recovers paragraphs from `<w:t>` runs by looking a
//! short distance behind each run for paragraph and style markers. Only
//! stored (uncompressed) body parts can yield text.

use std::sync::OnceLock;

use log::debug;
use memchr::memmem;
use regex::Regex;

use super::options::OfficeScanOptions;
use super::{cached_regex, Extracted, ExtractorKind, FormatImporter, ImportOptions, Strategy};
use crate::error::{Error, Result};
use crate::model::{Alignment, Block, BlockKind, ExtractionResult, StyleContext};

/// Literal marker of the main body part inside the container.
pub const BODY_SIGNATURE: &[u8] = b"word/document.xml";

/// Advisory appended after office output.
pub const CONVERSION_NOTE: &str =
    "Note: Some complex formatting might be simplified during import.";

static COLOR: OnceLock<Regex> = OnceLock::new();
static SIZE: OnceLock<Regex> = OnceLock::new();
static JUSTIFY: OnceLock<Regex> = OnceLock::new();
static PARA_STYLE: OnceLock<Regex> = OnceLock::new();
static TAG: OnceLock<Regex> = OnceLock::new();
static TOGGLE_VAL: OnceLock<Regex> = OnceLock::new();

/// A `<w:t>` run located inside the scan window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    /// Offset of the opening tag
    pub start: usize,
    /// Offset just past the closing tag
    pub end: usize,
    /// Decoded run text
    pub text: String,
}

/// Paragraph properties inferred from the bytes before a run.
#[derive(Debug, Clone, PartialEq)]
struct ParagraphContext {
    kind: BlockKind,
    style: StyleContext,
}

/// Scanner state for one office extraction.
#[derive(Debug, Clone, Default)]
pub struct OfficeScanner {
    options: OfficeScanOptions,
    append_note: bool,
}

impl OfficeScanner {
    /// Create a scanner with default bounds and the advisory note enabled.
    pub fn new() -> Self {
        Self {
            options: OfficeScanOptions::default(),
            append_note: true,
        }
    }

    /// Set the scan bounds.
    pub fn with_options(mut self, options: OfficeScanOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable or disable the advisory note.
    pub fn with_note(mut self, append: bool) -> Self {
        self.append_note = append;
        self
    }

    /// Extract blocks from an office file with the given extension.
    ///
    /// Declines for any extension but `docx`, when the body signature is
    /// missing, and when no text run is found.
    pub fn extract(&self, extension: &str, data: &[u8]) -> Result<ExtractionResult> {
        if !extension.eq_ignore_ascii_case("docx") {
            return Err(Error::declined(format!(
                "no structured extraction for .{}",
                extension
            )));
        }

        let window = self
            .window(data)
            .ok_or_else(|| Error::declined("body part signature not found"))?;
        let runs = self.find_runs(&window);
        if runs.is_empty() {
            return Err(Error::declined("no text runs in body window"));
        }
        debug!(
            "office scan: {} byte window, {} run(s)",
            window.len(),
            runs.len()
        );

        let result = self.assemble(&window, &runs);
        if result.is_empty() {
            return Err(Error::declined("text runs were empty"));
        }
        Ok(if self.append_note {
            result.with_note(CONVERSION_NOTE)
        } else {
            result
        })
    }

    /// Copy the printable bytes of the window after the body signature.
    pub fn window(&self, data: &[u8]) -> Option<String> {
        let hit = memmem::find(data, BODY_SIGNATURE)?;
        let start = hit.saturating_add(self.options.skip).min(data.len());
        let end = start.saturating_add(self.options.window).min(data.len());
        Some(
            data[start..end]
                .iter()
                .filter(|b| (0x20..=0x7E).contains(*b))
                .map(|&b| char::from(b))
                .collect(),
        )
    }

    /// Locate `<w:t>` runs in a window.
    pub fn find_runs(&self, window: &str) -> Vec<TextRun> {
        let mut runs = Vec::new();
        let mut pos = 0;

        while let Some(offset) = window[pos..].find("<w:t") {
            let start = pos + offset;
            let after = start + "<w:t".len();
            pos = after;

            let is_run_tag = matches!(window.as_bytes().get(after), Some(b'>' | b' '));
            if !is_run_tag {
                continue;
            }
            let Some(open_end) = window[after..].find('>').map(|i| after + i) else {
                break;
            };
            if window[..open_end].ends_with('/') {
                pos = open_end + 1;
                continue;
            }
            let Some(close) = window[open_end + 1..].find("</w:t>").map(|i| open_end + 1 + i)
            else {
                break;
            };

            let raw = &window[open_end + 1..close];
            let stripped = cached_regex(&TAG, r"<[^>]+>").replace_all(raw, "");
            let end = close + "</w:t>".len();
            runs.push(TextRun {
                start,
                end,
                text: decode_entities(&stripped),
            });
            pos = end;
        }
        runs
    }

    fn assemble(&self, window: &str, runs: &[TextRun]) -> ExtractionResult {
        let mut result = ExtractionResult::new();
        let mut current: Option<Block> = None;
        let mut previous_end = 0;

        for run in runs {
            let from = run
                .start
                .saturating_sub(self.options.lookbehind)
                .max(previous_end);
            let context = &window[from..run.start];
            previous_end = run.end;

            if starts_paragraph(context) {
                if let Some(block) = current.take() {
                    result.push(block);
                }
                let para = infer_paragraph(context);
                current = Some(Block::new(para.kind).with_style(para.style));
            }
            if run.text.trim().is_empty() {
                continue;
            }

            let block = current.get_or_insert_with(|| Block::new(BlockKind::Paragraph));
            if let Some(last) = block.runs.last() {
                if !last.ends_with(' ') {
                    block.runs.push(" ".to_string());
                }
            }
            block.runs.push(run.text.clone());
        }
        if let Some(block) = current {
            result.push(block);
        }
        result
    }
}

/// Office importer for docx and the legacy formats that always decline.
#[derive(Debug, Clone, Default)]
pub struct OfficeImporter {
    _private: (),
}

impl OfficeImporter {
    /// Create a new office importer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FormatImporter for OfficeImporter {
    fn supported_extensions(&self) -> &[&str] {
        &["docx", "doc", "odt", "pages"]
    }

    fn name(&self) -> &str {
        "office"
    }

    fn extractor_kind(&self) -> ExtractorKind {
        ExtractorKind::Office
    }

    fn import(&self, extension: &str, data: &[u8], options: &ImportOptions) -> Result<Extracted> {
        let result = OfficeScanner::new()
            .with_options(options.office)
            .with_note(options.append_conversion_note)
            .extract(extension, data)?;
        Ok(Extracted::new(result.to_html(), Strategy::Office))
    }
}

fn starts_paragraph(context: &str) -> bool {
    context.contains("<w:p ") || context.contains("<w:p>")
}

/// Whether a run toggle such as `<w:b/>` is switched on; the last one wins.
fn has_toggle(context: &str, name: &str) -> bool {
    let open = format!("<{}", name);
    let mut on = false;
    for (start, _) in context.match_indices(&open) {
        let rest = &context[start + open.len()..];
        if !matches!(rest.chars().next(), Some(' ' | '/' | '>')) {
            continue;
        }
        let tag = rest.split('>').next().unwrap_or(rest);
        on = match capture(&TOGGLE_VAL, r#"w:val="([^"]*)""#, tag) {
            Some(val) => !["0", "false", "off", "none"]
                .iter()
                .any(|off| val.eq_ignore_ascii_case(off)),
            None => true,
        };
    }
    on
}

fn capture<'a>(cell: &'static OnceLock<Regex>, pattern: &str, context: &'a str) -> Option<&'a str> {
    cached_regex(cell, pattern)
        .captures(context)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn infer_paragraph(context: &str) -> ParagraphContext {
    let mut style = StyleContext {
        bold: has_toggle(context, "w:b"),
        italic: has_toggle(context, "w:i"),
        underline: has_toggle(context, "w:u"),
        ..Default::default()
    };

    if let Some(color) = capture(&COLOR, r#"<w:color\s[^>]*w:val="([^"]*)""#, context) {
        if !color.is_empty() && !color.eq_ignore_ascii_case("auto") {
            style.color = Some(format!("#{}", color));
        }
    }
    if let Some(size) = capture(&SIZE, r#"<w:sz\s[^>]*w:val="(\d+)""#, context) {
        if let Ok(half_points) = size.parse::<u32>() {
            style.font_size = Some(half_points as f32 / 2.0);
        }
    }
    if let Some(jc) = capture(&JUSTIFY, r#"<w:jc\s[^>]*w:val="([^"]*)""#, context) {
        style.align = Some(Alignment::parse(jc).unwrap_or_default());
    }

    let kind = match capture(&PARA_STYLE, r#"<w:pStyle\s[^>]*w:val="([^"]*)""#, context) {
        Some(name) if name.contains("Heading") => BlockKind::Heading(heading_level(name)),
        Some(name) if name.contains("ListParagraph") => BlockKind::ListItem {
            ordered: !context.contains("bullet"),
        },
        _ => BlockKind::Paragraph,
    };

    ParagraphContext { kind, style }
}

fn heading_level(style_name: &str) -> u8 {
    let digits: String = style_name.chars().filter(char::is_ascii_digit).collect();
    digits
        .parse::<u32>()
        .ok()
        .map(|n| n.clamp(1, 6) as u8)
        .unwrap_or(2)
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
