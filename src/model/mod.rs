//! Document model types.
//!
//! The [`DocumentTree`] is what the editor owns and what exporters read.
//! Binary extractors produce an [`ExtractionResult`] of [`Block`]s first and
//! render it to markup before it becomes a tree.

mod block;
mod style;
mod tree;

pub use block::{Block, BlockKind, ExtractionResult};
pub use style::{
    heading_level, parse_declarations, parse_font_size, Alignment, StyleContext, StyleResolver,
    BOLD_WEIGHT_THRESHOLD, HEADING_SIZES,
};
pub use tree::{escape_html, is_block_tag, DocumentTree, Element, Node};
