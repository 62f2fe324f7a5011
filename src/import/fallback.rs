//! Generic printable-run recovery from arbitrary bytes.
//!
//! This is the last resort for every binary importer: it knows nothing
//! about the container and keeps whatever looks like text.

use log::debug;

use super::options::FallbackOptions;
use crate::model::{Block, ExtractionResult};

/// Paragraph shown when nothing readable survives.
pub const NOTHING_RECOVERED: &str = "Could not extract meaningful content from this file.";

/// Scans a byte buffer for runs of readable ASCII.
#[derive(Debug, Clone, Default)]
pub struct FallbackScanner {
    options: FallbackOptions,
}

impl FallbackScanner {
    /// Create a scanner with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scanner with the given thresholds.
    pub fn with_options(options: FallbackOptions) -> Self {
        Self { options }
    }

    /// Collect the committed text runs, with line breaks normalized to `\n`.
    pub fn runs(&self, data: &[u8]) -> Vec<String> {
        let mut runs = Vec::new();
        let mut current = String::new();
        let mut printable = 0usize;
        let mut last_cr = false;

        for &byte in data {
            match byte {
                0x20..=0x7E => {
                    current.push(char::from(byte));
                    printable += 1;
                    last_cr = false;
                }
                b'\r' => {
                    current.push('\n');
                    last_cr = true;
                }
                b'\n' => {
                    if !last_cr {
                        current.push('\n');
                    }
                    last_cr = false;
                }
                _ => {
                    self.commit(&mut current, printable, &mut runs);
                    printable = 0;
                    last_cr = false;
                }
            }
        }
        self.commit(&mut current, printable, &mut runs);
        runs
    }

    fn commit(&self, current: &mut String, printable: usize, runs: &mut Vec<String>) {
        if printable >= self.options.min_run && current.len() >= self.options.commit_len {
            runs.push(std::mem::take(current));
        } else {
            current.clear();
        }
    }

    /// Recover text as paragraph blocks.
    ///
    /// Runs are joined with blank lines, 3+ line breaks collapse to 2, and
    /// each blank-line-delimited segment becomes a paragraph.
    pub fn scan(&self, data: &[u8]) -> ExtractionResult {
        let joined = self.runs(data).join("\n\n");
        let collapsed = collapse_breaks(&joined);

        let mut result = ExtractionResult::new();
        for segment in collapsed.split("\n\n") {
            result.push(Block::paragraph(segment.trim_matches('\n')));
        }
        debug!(
            "fallback scan recovered {} paragraph(s) from {} bytes",
            result.blocks.len(),
            data.len()
        );
        result
    }

    /// Recover text as HTML, never returning empty markup.
    pub fn recover(&self, data: &[u8]) -> String {
        let result = self.scan(data);
        if result.is_empty() {
            ExtractionResult::from_blocks(vec![Block::paragraph(NOTHING_RECOVERED)]).to_html()
        } else {
            result.to_html()
        }
    }
}

/// Recover readable text from any byte buffer using default thresholds.
pub fn recover(data: &[u8]) -> String {
    FallbackScanner::new().recover(data)
}

fn collapse_breaks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;
    for c in text.chars() {
        if c == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push(c);
            }
        } else {
            newlines = 0;
            out.push(c);
        }
    }
    out
}
