//! Blog
//!
//! Line-oriented rendering of blog posts: blank lines keep paragraph
//! spacing, a leading `![alt](src)` makes a line an image, and links are
//! detected on every other line.

use serde::{Deserialize, Serialize};

use crate::content::render::escape_html;
use crate::content::{document_to_html, render_document, scan_document, DisplayBlock, LinkVariant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPost {
    pub title: String,
    pub blocks: Vec<DisplayBlock>,
}

pub fn render_post(post: &BlogPost) -> RenderedPost {
    let lines = scan_document(&post.content);
    RenderedPost {
        title: post.title.clone(),
        blocks: render_document(&lines, LinkVariant::Default),
    }
}

/// Render a post as a standalone `<article>` element
pub fn render_post_html(post: &BlogPost) -> String {
    let rendered = render_post(post);
    format!(
        "<article>\n<h1>{}</h1>\n{}\n</article>",
        escape_html(&rendered.title),
        document_to_html(&rendered.blocks)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(content: &str) -> BlogPost {
        BlogPost {
            title: "Demo day <recap>".to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_render_post_blocks() {
        let rendered = render_post(&post(
            "Winners below\n\n![Stage](/stage.jpg)\nRepo: github.com/team/app",
        ));

        assert_eq!(rendered.blocks.len(), 4);
        assert_eq!(rendered.blocks[1], DisplayBlock::Spacer);
        assert!(matches!(rendered.blocks[2], DisplayBlock::Image { .. }));
    }

    #[test]
    fn test_render_post_html_escapes_title() {
        let html = render_post_html(&post("see hack.dev"));

        assert!(html.starts_with(
            "<article>\n<h1>Demo day &lt;recap&gt;</h1>\n<p>see <a href=\"https://hack.dev\""
        ));
        assert!(html.ends_with("</a></p>\n</article>"));
    }

    #[test]
    fn test_render_empty_post() {
        assert!(render_post(&post("")).blocks.is_empty());
    }
}
