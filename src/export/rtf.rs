//! Document tree to RTF encoder.
//!
//! The encoder walks the tree once, carrying the effective style of each
//! node. Text is wrapped in style-on and style-off control words; block
//! elements get a structural prefix and, at the top level only, a trailing
//! `\par`. Every brace group is closed by the same call that opened it.
//!
//! Output is 7-bit clean: anything outside ASCII is written as `\uN?`.

use log::debug;

use crate::model::{
    heading_level, Alignment, DocumentTree, Element, Node, StyleContext, StyleResolver,
};

const PARAGRAPH: &str = "\\pard\\sa200\\sl276\\slmult1 ";
const LIST_ITEM: &str = "\\pard\\fi-360\\li720\\sa200\\sl276\\slmult1 ";
const BLOCKQUOTE: &str = "\\pard\\fi340\\li340\\ri340\\sa200\\sl276\\slmult1\\itap1\\cf4 ";
const PREFORMATTED: &str = "{\\pard\\sa200\\sl276\\slmult1\\f2 ";
const TABLE_ROW: &str = "\\trowd\\trgaph108\\trleft-108\\cellx3000\\cellx6000\\cellx9000 ";

/// Heading font sizes in half-points for `h1`..`h6`.
const HEADING_HALF_POINTS: [u32; 6] = [52, 40, 36, 32, 28, 24];

/// Font size restored after sized text, in half-points.
const DEFAULT_HALF_POINTS: u32 = 24;

/// Color table entries that are always present, in table order (index 1..4).
const BASE_COLORS: [(u8, u8, u8); 4] = [(0, 0, 0), (255, 0, 0), (0, 0, 255), (0, 128, 0)];

/// Color given to blockquote text.
const QUOTE_COLOR: &str = "green";

/// Encode a document tree as an RTF document.
///
/// # Example
///
/// ```
/// use docport::model::DocumentTree;
///
/// let rtf = docport::export::rtf::encode_rtf(&DocumentTree::from_html("<p><b>Hi</b></p>"));
/// assert!(rtf.starts_with("{\\rtf1"));
/// assert!(rtf.contains("\\b Hi\\b0 \\par"));
/// ```
pub fn encode_rtf(tree: &DocumentTree) -> String {
    RtfEncoder::new().encode(tree)
}

/// Recursive RTF serializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtfEncoder {
    resolver: StyleResolver,
}

impl RtfEncoder {
    /// Create an encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a tree into a complete RTF document.
    pub fn encode(&self, tree: &DocumentTree) -> String {
        let mut writer = Writer {
            resolver: self.resolver,
            body: String::new(),
            colors: Vec::new(),
        };
        writer.visit_children(&tree.nodes, None, &StyleContext::default(), 0);
        debug!(
            "RTF body is {} bytes with {} custom color(s)",
            writer.body.len(),
            writer.colors.len()
        );

        let mut out = header(&writer.colors);
        out.push_str(&writer.body);
        out.push('}');
        out
    }
}

fn header(custom_colors: &[(u8, u8, u8)]) -> String {
    let mut out = String::from("{\\rtf1\\ansi\\ansicpg1252\\cocoartf2580\\cocoasubrtf220\n");
    out.push_str(
        "{\\fonttbl\\f0\\fswiss\\fcharset0 Helvetica;\\f1\\froman\\fcharset0 TimesNewRoman;\
         \\f2\\fmodern\\fcharset0 Courier;\\f3\\fnil\\fcharset0 Arial;}\n",
    );
    out.push_str("{\\colortbl;");
    for (r, g, b) in BASE_COLORS.iter().chain(custom_colors) {
        out.push_str(&format!("\\red{}\\green{}\\blue{};", r, g, b));
    }
    out.push_str("}\n");
    out.push_str("\\margl1440\\margr1440\\vieww11520\\viewh8400\\viewkind0\n");
    out.push_str(
        "\\pard\\tx720\\tx1440\\tx2160\\tx2880\\tx3600\\tx4320\\tx5040\\tx5760\\tx6480\
         \\tx7200\\tx7920\\tx8640\\pardirnatural\\partightenfactor0\n\n",
    );
    out
}

/// How an element is framed in the output.
struct Frame {
    open: String,
    close: &'static str,
    /// Emit `\par` after the element when it sits at depth 0
    par_after: bool,
    /// Children are one level deeper
    nested: bool,
}

impl Frame {
    fn inline(open: impl Into<String>, close: &'static str) -> Self {
        Self {
            open: open.into(),
            close,
            par_after: false,
            nested: false,
        }
    }

    fn block(open: impl Into<String>, close: &'static str) -> Self {
        Self {
            open: open.into(),
            close,
            par_after: true,
            nested: true,
        }
    }

    fn container(open: impl Into<String>, close: &'static str) -> Self {
        Self {
            open: open.into(),
            close,
            par_after: false,
            nested: true,
        }
    }
}

struct Writer {
    resolver: StyleResolver,
    body: String,
    colors: Vec<(u8, u8, u8)>,
}

impl Writer {
    fn visit_children(
        &mut self,
        nodes: &[Node],
        parent: Option<&str>,
        style: &StyleContext,
        depth: usize,
    ) {
        let mut ordinal = 0;
        // Nested blocks get no \par, so siblings after one are split by \line
        let mut after_block = false;
        for node in nodes {
            match node {
                Node::Text(text) => {
                    if !text.trim().is_empty() {
                        if after_block && depth > 0 {
                            self.body.push_str("\\line ");
                        }
                        after_block = false;
                    }
                    self.visit_text(text, style);
                }
                Node::Element(el) => {
                    if el.tag == "li" {
                        ordinal += 1;
                    }
                    let separate = after_block && depth > 0;
                    after_block =
                        self.visit_element(el, parent, ordinal, style, depth, separate);
                }
            }
        }
    }

    fn visit_text(&mut self, text: &str, style: &StyleContext) {
        if text.trim().is_empty() && text.contains('\n') {
            return;
        }

        let color = style.color.as_deref().and_then(|c| self.color_index(c));
        let size = style.font_size.map(|pt| (pt * 2.0).round() as u32);

        if style.bold {
            self.body.push_str("\\b ");
        }
        if style.italic {
            self.body.push_str("\\i ");
        }
        if style.underline {
            self.body.push_str("\\ul ");
        }
        if let Some(half_points) = size {
            self.body.push_str(&format!("\\fs{} ", half_points));
        }
        if let Some(index) = color {
            self.body.push_str(&format!("\\cf{} ", index));
        }

        self.body.push_str(&escape_rtf(text));

        if style.underline {
            self.body.push_str("\\ulnone ");
        }
        if style.italic {
            self.body.push_str("\\i0 ");
        }
        if style.bold {
            self.body.push_str("\\b0 ");
        }
        if color.is_some() {
            self.body.push_str("\\cf0 ");
        }
        if size.is_some() {
            self.body.push_str(&format!("\\fs{} ", DEFAULT_HALF_POINTS));
        }
    }

    fn visit_element(
        &mut self,
        el: &Element,
        parent: Option<&str>,
        ordinal: usize,
        style: &StyleContext,
        depth: usize,
        separate: bool,
    ) -> bool {
        let mut resolved = self.resolver.resolve(style, el);
        if el.tag == "blockquote" && resolved.color.is_none() {
            resolved.color = Some(QUOTE_COLOR.to_string());
        }

        let mut frame = frame_for(el, parent, ordinal, depth);
        if frame.par_after {
            if let Some(word) = own_alignment(el, &resolved) {
                frame.open.push_str(word);
            }
        }

        if separate && frame.par_after {
            self.body.push_str("\\line ");
        }
        self.body.push_str(&frame.open);
        let child_depth = if frame.nested { depth + 1 } else { depth };
        self.visit_children(&el.children, Some(&el.tag), &resolved, child_depth);
        self.body.push_str(frame.close);

        if frame.par_after && depth == 0 {
            self.body.push_str("\\par\n");
        }
        frame.par_after
    }

    fn color_index(&mut self, css: &str) -> Option<usize> {
        let rgb = parse_css_color(css)?;
        if let Some(pos) = BASE_COLORS.iter().position(|c| *c == rgb) {
            return Some(pos + 1);
        }
        let pos = match self.colors.iter().position(|c| *c == rgb) {
            Some(pos) => pos,
            None => {
                self.colors.push(rgb);
                self.colors.len() - 1
            }
        };
        Some(BASE_COLORS.len() + 1 + pos)
    }
}

fn frame_for(el: &Element, parent: Option<&str>, ordinal: usize, depth: usize) -> Frame {
    if let Some(level) = heading_level(&el.tag) {
        let half_points = HEADING_HALF_POINTS[usize::from(level) - 1];
        return Frame::block(
            format!("{{\\pard\\sa200\\sl276\\slmult1\\f1\\fs{}\\b ", half_points),
            "}",
        );
    }

    match el.tag.as_str() {
        "p" => Frame::block(PARAGRAPH, ""),
        "div" if depth == 0 => Frame::block(PARAGRAPH, ""),
        "ul" | "ol" => Frame::inline(PARAGRAPH, ""),
        "li" => {
            let marker = if parent == Some("ol") {
                format!("{}. ", ordinal)
            } else {
                "\\bullet ".to_string()
            };
            Frame::block(format!("{}{}", LIST_ITEM, marker), "")
        }
        "a" => {
            let href = el.attr("href").unwrap_or_default();
            Frame::inline(
                format!(
                    "{{\\field{{\\*\\fldinst{{HYPERLINK \"{}\"}}}}{{\\fldrslt{{\\ul\\cf3 ",
                    escape_rtf(href)
                ),
                "}}}",
            )
        }
        "blockquote" => Frame::block(BLOCKQUOTE, "\\cf0 "),
        "pre" => Frame::block(PREFORMATTED, "}"),
        "code" if parent != Some("pre") => Frame::inline("{\\f2 ", "}"),
        "tr" => Frame::container(TABLE_ROW, "\\row "),
        "th" => Frame::container("\\pard\\intbl\\b ", "\\b0\\cell "),
        "td" => Frame::container("\\pard\\intbl ", "\\cell "),
        "br" => Frame::inline("\\line ", ""),
        _ => Frame::inline(String::new(), ""),
    }
}

/// Alignment word for a block that sets its own alignment.
fn own_alignment(el: &Element, resolved: &StyleContext) -> Option<&'static str> {
    el.attr("style")?;
    match resolved.align? {
        Alignment::Left => None,
        Alignment::Center => Some("\\qc "),
        Alignment::Right => Some("\\qr "),
        Alignment::Justify => Some("\\qj "),
    }
}

/// Escape text for an RTF body.
///
/// Backslashes and braces are escaped, newlines become `\par`, and
/// non-ASCII characters become signed 16-bit `\uN?` escapes.
pub fn escape_rtf(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\n' => out.push_str("\\par "),
            '\r' => {}
            c if c.is_ascii() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{}?", *unit as i16));
                }
            }
        }
    }
    out
}

/// Parse a CSS color into RGB components.
///
/// Accepts a few named colors, `#rgb`, `#rrggbb` and `rgb()`/`rgba()`.
pub fn parse_css_color(value: &str) -> Option<(u8, u8, u8)> {
    let value = value.trim().to_ascii_lowercase();
    let named = match value.as_str() {
        "black" => Some((0, 0, 0)),
        "red" => Some((255, 0, 0)),
        "blue" => Some((0, 0, 255)),
        "green" => Some((0, 128, 0)),
        "white" => Some((255, 255, 255)),
        "gray" | "grey" => Some((128, 128, 128)),
        "yellow" => Some((255, 255, 0)),
        "orange" => Some((255, 165, 0)),
        "purple" => Some((128, 0, 128)),
        _ => None,
    };
    if named.is_some() {
        return named;
    }

    if let Some(hex) = value.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        return match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
                Some((expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            _ => None,
        };
    }

    let inner = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let mut parts = inner.split(',').map(|p| p.trim().parse::<f32>().ok());
    let mut next = || -> Option<u8> { Some(parts.next()??.clamp(0.0, 255.0).round() as u8) };
    Some((next()?, next()?, next()?))
}
