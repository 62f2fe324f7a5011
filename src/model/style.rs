//! Effective visual style of a node, resolved by cascading from ancestors.

use serde::{Deserialize, Serialize};

use super::tree::Element;

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Left alignment (default)
    #[default]
    Left,
    /// Center alignment
    Center,
    /// Right alignment
    Right,
    /// Justified alignment
    Justify,
}

impl Alignment {
    /// Parse a CSS `text-align` or office `jc` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            "justify" | "both" => Some(Alignment::Justify),
            _ => None,
        }
    }

    /// CSS keyword for this alignment.
    pub fn as_css(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }
}

/// Effective style carried while walking a tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleContext {
    /// Bold weight
    pub bold: bool,
    /// Italic
    pub italic: bool,
    /// Underline
    pub underline: bool,
    /// Text color as written in the source (`#rrggbb`, `red`, ...)
    pub color: Option<String>,
    /// Font size in points
    pub font_size: Option<f32>,
    /// Paragraph alignment
    pub align: Option<Alignment>,
}

impl StyleContext {
    /// Create an empty style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if no property is set.
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// Render as an inline CSS declaration list, or `None` if nothing is set.
    pub fn to_css(&self) -> Option<String> {
        let mut decls = Vec::new();
        if self.bold {
            decls.push("font-weight: bold".to_string());
        }
        if self.italic {
            decls.push("font-style: italic".to_string());
        }
        if self.underline {
            decls.push("text-decoration: underline".to_string());
        }
        if let Some(ref color) = self.color {
            decls.push(format!("color: {}", color));
        }
        if let Some(size) = self.font_size {
            decls.push(format!("font-size: {}pt", format_points(size)));
        }
        if let Some(align) = self.align {
            decls.push(format!("text-align: {}", align.as_css()));
        }
        if decls.is_empty() {
            None
        } else {
            Some(decls.join("; "))
        }
    }
}

fn format_points(size: f32) -> String {
    if size.fract() == 0.0 {
        format!("{}", size as i32)
    } else {
        format!("{}", size)
    }
}

/// Heading sizes in points for `h1`..`h6`.
pub const HEADING_SIZES: [f32; 6] = [26.0, 20.0, 18.0, 16.0, 14.0, 12.0];

/// Numeric font weight at or above which text counts as bold.
pub const BOLD_WEIGHT_THRESHOLD: u32 = 600;

/// Color given to link text.
pub const LINK_COLOR: &str = "blue";

/// Computes the effective style of elements from tags and inline styles.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleResolver;

impl StyleResolver {
    /// Create a resolver.
    pub fn new() -> Self {
        Self
    }

    /// Resolve the style of `element` given its parent's effective style.
    ///
    /// Tag defaults apply first, then inline `style=` declarations override
    /// them. Anything left unset is inherited.
    pub fn resolve(&self, parent: &StyleContext, element: &Element) -> StyleContext {
        let mut style = parent.clone();
        apply_tag_defaults(&element.tag, &mut style);
        if let Some(inline) = element.attr("style") {
            apply_declarations(inline, &mut style);
        }
        style
    }
}

fn apply_tag_defaults(tag: &str, style: &mut StyleContext) {
    match tag {
        "b" | "strong" | "th" => style.bold = true,
        "i" | "em" => style.italic = true,
        "u" => style.underline = true,
        "a" => {
            style.underline = true;
            style.color = Some(LINK_COLOR.to_string());
        }
        _ => {
            if let Some(level) = heading_level(tag) {
                style.bold = true;
                style.font_size = Some(HEADING_SIZES[usize::from(level) - 1]);
            }
        }
    }
}

/// Heading level (1-6) of a tag like `h3`.
pub fn heading_level(tag: &str) -> Option<u8> {
    let digits = tag.strip_prefix('h')?;
    match digits.parse::<u8>() {
        Ok(level @ 1..=6) => Some(level),
        _ => None,
    }
}

/// Parse `property: value;` pairs from an inline style attribute.
pub fn parse_declarations(inline: &str) -> Vec<(String, String)> {
    inline
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                None
            } else {
                Some((name, value.to_string()))
            }
        })
        .collect()
}

fn apply_declarations(inline: &str, style: &mut StyleContext) {
    for (name, value) in parse_declarations(inline) {
        let lower = value.to_ascii_lowercase();
        match name.as_str() {
            "font-weight" => {
                if let Some(bold) = parse_weight(&lower) {
                    style.bold = bold;
                }
            }
            "font-style" => style.italic = lower == "italic" || lower == "oblique",
            "text-decoration" | "text-decoration-line" => {
                style.underline = lower.contains("underline");
            }
            "color" => style.color = Some(value),
            "font-size" => {
                if let Some(pt) = parse_font_size(&lower) {
                    style.font_size = Some(pt);
                }
            }
            "text-align" => {
                if let Some(align) = Alignment::parse(&lower) {
                    style.align = Some(align);
                }
            }
            _ => {}
        }
    }
}

fn parse_weight(value: &str) -> Option<bool> {
    match value {
        "bold" | "bolder" => Some(true),
        "normal" | "lighter" => Some(false),
        _ => value
            .parse::<u32>()
            .ok()
            .map(|w| w >= BOLD_WEIGHT_THRESHOLD),
    }
}

/// Parse a CSS font size into points. Bare numbers are treated as pixels.
pub fn parse_font_size(value: &str) -> Option<f32> {
    let value = value.trim();
    let (number, factor) = if let Some(n) = value.strip_suffix("pt") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix("px") {
        (n, 0.75)
    } else {
        (value, 0.75)
    };
    let size = number.trim().parse::<f32>().ok()?;
    if size > 0.0 && size.is_finite() {
        Some(size * factor)
    } else {
        None
    }
}
