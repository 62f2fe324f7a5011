//! PDF export through an external page renderer.
//!
//! Layout and rasterization are not done here. The exporter builds a styled
//! copy of the tree with a title header and hands it to a [`PageRenderer`].

use chrono::{DateTime, Local};
use serde::Serialize;

use super::options::PageSetup;
use crate::error::Result;
use crate::model::{DocumentTree, Element, Node};

/// Everything a page renderer needs to produce a PDF.
#[derive(Debug, Clone, Serialize)]
pub struct PdfRenderJob {
    /// Styled copy of the document, header included
    pub tree: DocumentTree,
    /// Document title
    pub title: String,
    /// When the export was requested
    pub exported_at: DateTime<Local>,
    /// Page layout
    pub options: PageSetup,
}

impl PdfRenderJob {
    /// Build a job from a document, stamping the current time.
    pub fn new(tree: &DocumentTree, title: impl Into<String>, options: PageSetup) -> Self {
        Self::at(tree, title, options, Local::now())
    }

    /// Build a job with an explicit export time.
    pub fn at(
        tree: &DocumentTree,
        title: impl Into<String>,
        options: PageSetup,
        exported_at: DateTime<Local>,
    ) -> Self {
        let title = title.into();
        Self {
            tree: styled_copy(tree, &title, &exported_at),
            title,
            exported_at,
            options,
        }
    }

    /// Styled markup of the job.
    pub fn html(&self) -> String {
        self.tree.to_html()
    }
}

/// Renders a job to PDF bytes.
pub trait PageRenderer: Send + Sync {
    /// Produce the PDF document.
    fn render(&self, job: &PdfRenderJob) -> Result<Vec<u8>>;
}

const CONTAINER_STYLE: &str = "padding: 20px; font-size: 12pt; color: #000; background: #fff; \
     font-family: Arial, Helvetica, sans-serif; line-height: 1.5";
const HEADER_STYLE: &str =
    "text-align: center; margin-bottom: 20px; border-bottom: 1px solid #e2e8f0; padding-bottom: 10px";

/// Copy a tree, add print styles and prepend a title header.
///
/// The source tree is not modified.
pub fn styled_copy(tree: &DocumentTree, title: &str, exported_at: &DateTime<Local>) -> DocumentTree {
    let mut nodes: Vec<Node> = tree.nodes.clone();
    for node in &mut nodes {
        if let Node::Element(el) = node {
            apply_print_styles(el, false);
        }
    }

    let header = Element::new("div")
        .with_attr("style", HEADER_STYLE)
        .with_child(
            Element::new("h2")
                .with_attr("style", "color: #6366f1; margin: 0")
                .with_text(title),
        )
        .with_child(
            Element::new("p")
                .with_attr("style", "color: #718096; font-size: 10pt; margin-top: 5px")
                .with_text(format!(
                    "Exported on {}",
                    exported_at.format("%Y-%m-%d %H:%M:%S")
                )),
        );

    let mut container = Element::new("div").with_attr("style", CONTAINER_STYLE);
    container.children.push(Node::Element(header));
    container.children.extend(nodes);
    DocumentTree::from(container)
}

fn apply_print_styles(el: &mut Element, in_table: bool) {
    let in_table = in_table || el.tag == "table";
    let decls: &[&str] = match el.tag.as_str() {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            &["margin-bottom: 10px", "margin-top: 20px", "color: #2d3748", "font-weight: bold"]
        }
        "p" => &["margin-bottom: 10px", "text-align: justify"],
        "ul" | "ol" => &["margin-left: 20px", "margin-bottom: 15px"],
        "table" => &["border-collapse: collapse", "width: 100%", "margin-bottom: 15px"],
        "th" if in_table => &[
            "border: 1px solid #cbd5e0",
            "padding: 8px",
            "text-align: left",
            "background-color: #f8fafc",
            "font-weight: bold",
        ],
        "td" if in_table => &["border: 1px solid #cbd5e0", "padding: 8px", "text-align: left"],
        "blockquote" => &[
            "border-left: 4px solid #6366f1",
            "padding-left: 15px",
            "margin: 15px 0",
            "font-style: italic",
            "color: #4a5568",
        ],
        "pre" | "code" => &[
            "font-family: monospace",
            "background-color: #f8fafc",
            "padding: 10px",
            "border-radius: 5px",
            "overflow-x: auto",
            "margin-bottom: 15px",
        ],
        "img" => &[
            "max-width: 100%",
            "height: auto",
            "margin-bottom: 15px",
            "display: block",
            "margin-left: auto",
            "margin-right: auto",
        ],
        _ => &[],
    };
    if !decls.is_empty() {
        append_style(el, &decls.join("; "));
    }

    for child in &mut el.children {
        if let Node::Element(child) = child {
            apply_print_styles(child, in_table);
        }
    }
}

/// Append declarations to an element's inline style; later ones win.
fn append_style(el: &mut Element, decls: &str) {
    let merged = match el.attr("style").map(str::trim) {
        Some(existing) if !existing.is_empty() => {
            format!("{}; {}", existing.trim_end_matches(';'), decls)
        }
        _ => decls.to_string(),
    };
    el.set_attr("style", merged);
}
