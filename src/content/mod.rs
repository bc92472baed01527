//! Content Rendering
//!
//! Text scanning and inline rendering shared by blog posts and chat
//! messages.
//!
//! - [`scanner`]: link detection and line-oriented image directives
//! - [`render`]: display units, document blocks and HTML output

pub mod render;
pub mod scanner;

pub use render::{
    document_to_html, render, render_document, to_html, DisplayBlock, DisplayUnit, LinkVariant,
};
pub use scanner::{scan, scan_document, DocumentLine, ImageRef, Segment};
