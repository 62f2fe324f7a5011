//! Intermediate blocks produced by the binary extractors.

use serde::{Deserialize, Serialize};

use super::style::StyleContext;
use super::tree::escape_html;

/// Kind of an extracted block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Body paragraph
    Paragraph,
    /// Heading with level 1-6
    Heading(u8),
    /// List item
    ListItem {
        /// Numbered rather than bulleted
        ordered: bool,
    },
}

/// A block of text with a uniform paragraph style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Block kind
    pub kind: BlockKind,
    /// Style shared by the whole block
    pub style: StyleContext,
    /// Text runs, concatenated as-is when rendered
    pub runs: Vec<String>,
}

impl Block {
    /// Create an empty block of the given kind.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            style: StyleContext::default(),
            runs: Vec::new(),
        }
    }

    /// Create a paragraph with one run.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Paragraph).with_run(text)
    }

    /// Create a heading; the level is clamped to 1-6.
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::new(BlockKind::Heading(level.clamp(1, 6))).with_run(text)
    }

    /// Create a list item.
    pub fn list_item(ordered: bool, text: impl Into<String>) -> Self {
        Self::new(BlockKind::ListItem { ordered }).with_run(text)
    }

    /// Add a run (builder style).
    pub fn with_run(mut self, text: impl Into<String>) -> Self {
        self.runs.push(text.into());
        self
    }

    /// Set the style (builder style).
    pub fn with_style(mut self, style: StyleContext) -> Self {
        self.style = style;
        self
    }

    /// Concatenated run text.
    pub fn text(&self) -> String {
        self.runs.concat()
    }

    /// Check if the block has no visible text.
    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.trim().is_empty())
    }

    fn render_inner(&self, out: &mut String) {
        let mut wrappers = Vec::new();
        if self.style.bold && !matches!(self.kind, BlockKind::Heading(_)) {
            wrappers.push("strong");
        }
        if self.style.italic {
            wrappers.push("em");
        }
        if self.style.underline {
            wrappers.push("u");
        }
        for tag in &wrappers {
            out.push_str(&format!("<{}>", tag));
        }
        let escaped = escape_html(&self.text());
        out.push_str(&escaped.replace('\n', "<br>"));
        for tag in wrappers.iter().rev() {
            out.push_str(&format!("</{}>", tag));
        }
    }

    fn style_attr(&self) -> String {
        let outer = StyleContext {
            bold: false,
            italic: false,
            underline: false,
            ..self.style.clone()
        };
        match outer.to_css() {
            Some(css) => format!(" style=\"{}\"", escape_html(&css)),
            None => String::new(),
        }
    }
}

/// Ordered blocks recovered from a source, plus an optional advisory note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Blocks in document order
    pub blocks: Vec<Block>,
    /// Advisory appended after the content
    pub note: Option<String>,
}

impl ExtractionResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a result from blocks.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks, note: None }
    }

    /// Attach an advisory note (builder style).
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Append a block, skipping blank ones.
    pub fn push(&mut self, block: Block) {
        if !block.is_empty() {
            self.blocks.push(block);
        }
    }

    /// Check if no blocks were recovered.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Render to HTML.
    ///
    /// Adjacent list items of the same orderedness share one list element.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        let mut open_list: Option<bool> = None;

        for block in &self.blocks {
            match block.kind {
                BlockKind::ListItem { ordered } => {
                    if open_list != Some(ordered) {
                        close_list(&mut out, open_list);
                        out.push_str(if ordered { "<ol>" } else { "<ul>" });
                        open_list = Some(ordered);
                    }
                    out.push_str(&format!("<li{}>", block.style_attr()));
                    block.render_inner(&mut out);
                    out.push_str("</li>");
                }
                BlockKind::Heading(level) => {
                    close_list(&mut out, open_list.take());
                    out.push_str(&format!("<h{}{}>", level, block.style_attr()));
                    block.render_inner(&mut out);
                    out.push_str(&format!("</h{}>", level));
                }
                BlockKind::Paragraph => {
                    close_list(&mut out, open_list.take());
                    out.push_str(&format!("<p{}>", block.style_attr()));
                    block.render_inner(&mut out);
                    out.push_str("</p>");
                }
            }
        }
        close_list(&mut out, open_list);

        if let Some(ref note) = self.note {
            out.push_str(&format!("<p><em>{}</em></p>", escape_html(note)));
        }
        out
    }
}

fn close_list(out: &mut String, open: Option<bool>) {
    match open {
        Some(true) => out.push_str("</ol>"),
        Some(false) => out.push_str("</ul>"),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_clamped() {
        assert_eq!(Block::heading(9, "x").kind, BlockKind::Heading(6));
        assert_eq!(Block::heading(0, "x").kind, BlockKind::Heading(1));
    }

    #[test]
    fn test_list_coalescing() {
        let result = ExtractionResult::from_blocks(vec![
            Block::list_item(false, "a"),
            Block::list_item(false, "b"),
            Block::list_item(true, "c"),
            Block::paragraph("p"),
            Block::list_item(true, "d"),
        ]);
        assert_eq!(
            result.to_html(),
            "<ul><li>a</li><li>b</li></ul><ol><li>c</li></ol><p>p</p><ol><li>d</li></ol>"
        );
    }

    #[test]
    fn test_styled_paragraph() {
        let style = StyleContext {
            bold: true,
            italic: true,
            color: Some("#ff0000".to_string()),
            ..Default::default()
        };
        let result = ExtractionResult::from_blocks(vec![Block::paragraph("a<b").with_style(style)]);
        assert_eq!(
            result.to_html(),
            "<p style=\"color: #ff0000\"><strong><em>a&lt;b</em></strong></p>"
        );
    }

    #[test]
    fn test_line_breaks_and_note() {
        let result = ExtractionResult::from_blocks(vec![Block::paragraph("one\ntwo")])
            .with_note("simplified");
        assert_eq!(
            result.to_html(),
            "<p>one<br>two</p><p><em>simplified</em></p>"
        );
    }

    #[test]
    fn test_push_skips_blank() {
        let mut result = ExtractionResult::new();
        result.push(Block::paragraph("   "));
        assert!(result.is_empty());
        result.push(Block::heading(2, "Title"));
        assert_eq!(result.blocks.len(), 1);
    }
}
