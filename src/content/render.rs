//! Inline Renderer
//!
//! Maps scanner output to display units. The link variant only picks the
//! link styling; segment boundaries and hrefs pass through untouched.

use serde::{Deserialize, Serialize};

use super::scanner::{DocumentLine, Segment};

/// Links always open in a new browsing context
pub const LINK_TARGET: &str = "_blank";

/// Keeps the opened page from reaching back into `window.opener`
pub const LINK_REL: &str = "noopener noreferrer";

/// Presentation variant for links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkVariant {
    /// Standard link colours on a light surface
    #[default]
    Default,
    /// High-contrast link colours for the sender's own chat bubble
    OwnMessage,
}

impl LinkVariant {
    /// CSS classes applied to anchors rendered with this variant
    pub fn link_class(&self) -> &'static str {
        match self {
            LinkVariant::Default => "text-blue-600 hover:text-blue-800 underline break-all",
            LinkVariant::OwnMessage => "text-blue-100 hover:text-white underline break-all",
        }
    }
}

/// A renderable unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayUnit {
    Plain {
        text: String,
    },
    Anchor {
        text: String,
        href: String,
        target: String,
        rel: String,
        class: String,
    },
}

impl DisplayUnit {
    fn anchor(text: &str, href: &str, variant: LinkVariant) -> Self {
        DisplayUnit::Anchor {
            text: text.to_string(),
            href: href.to_string(),
            target: LINK_TARGET.to_string(),
            rel: LINK_REL.to_string(),
            class: variant.link_class().to_string(),
        }
    }
}

/// A renderable block of a long-form document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayBlock {
    /// Vertical spacing standing in for an empty source line
    Spacer,
    Image { alt: String, src: String },
    Paragraph { units: Vec<DisplayUnit> },
}

/// Render segments into display units, one unit per segment, in order.
pub fn render(segments: &[Segment], variant: LinkVariant) -> Vec<DisplayUnit> {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Text { value } => DisplayUnit::Plain {
                text: value.clone(),
            },
            Segment::Link { display_text, href } => {
                DisplayUnit::anchor(display_text, href, variant)
            }
        })
        .collect()
}

/// Render a scanned document into blocks.
///
/// Text following an image directive becomes a paragraph right after the
/// image.
pub fn render_document(lines: &[DocumentLine], variant: LinkVariant) -> Vec<DisplayBlock> {
    let mut blocks = Vec::with_capacity(lines.len());

    for line in lines {
        match line {
            DocumentLine::Blank => blocks.push(DisplayBlock::Spacer),
            DocumentLine::Image { image, trailing } => {
                blocks.push(DisplayBlock::Image {
                    alt: image.alt.clone(),
                    src: image.src.clone(),
                });
                if !trailing.is_empty() {
                    blocks.push(DisplayBlock::Paragraph {
                        units: render(trailing, variant),
                    });
                }
            }
            DocumentLine::Inline { segments } => blocks.push(DisplayBlock::Paragraph {
                units: render(segments, variant),
            }),
        }
    }

    blocks
}

/// Serialize display units to an HTML fragment
pub fn to_html(units: &[DisplayUnit]) -> String {
    let mut out = String::new();
    for unit in units {
        match unit {
            DisplayUnit::Plain { text } => out.push_str(&escape_html(text)),
            DisplayUnit::Anchor {
                text,
                href,
                target,
                rel,
                class,
            } => {
                out.push_str(&format!(
                    r#"<a href="{}" target="{}" rel="{}" class="{}">{}</a>"#,
                    escape_html(href),
                    escape_html(target),
                    escape_html(rel),
                    escape_html(class),
                    escape_html(text)
                ));
            }
        }
    }
    out
}

/// Serialize document blocks to HTML, one element per block
pub fn document_to_html(blocks: &[DisplayBlock]) -> String {
    blocks
        .iter()
        .map(|block| match block {
            DisplayBlock::Spacer => r#"<div class="h-4"></div>"#.to_string(),
            DisplayBlock::Image { alt, src } => format!(
                r#"<img src="{}" alt="{}" class="max-w-full rounded-lg my-4">"#,
                escape_html(src),
                escape_html(alt)
            ),
            DisplayBlock::Paragraph { units } => format!("<p>{}</p>", to_html(units)),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
