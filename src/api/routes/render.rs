//! Render Routes
//!
//! Stateless rendering of chat text and blog posts.

use axum::{
    response::{Html, IntoResponse, Response},
    Json,
};

use crate::api::dto::{RenderBlogRequest, RenderChatRequest, RenderChatResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::blog::{render_post, render_post_html, BlogPost};
use crate::chat::render_content;

/// POST /api/v1/render/chat
///
/// Render message text the way it appears to `viewer_id`. Links in the
/// viewer's own messages get the high-contrast style.
pub async fn render_chat(Json(req): Json<RenderChatRequest>) -> Json<RenderChatResponse> {
    let own = matches!(
        (&req.sender_id, &req.viewer_id),
        (Some(sender), Some(viewer)) if sender == viewer
    );

    Json(RenderChatResponse {
        own,
        units: render_content(&req.content, own),
    })
}

/// POST /api/v1/render/blog
///
/// Render a blog post as display blocks, or as an HTML fragment when
/// `format` is `html`.
pub async fn render_blog(Json(req): Json<RenderBlogRequest>) -> ApiResult<Response> {
    let post = BlogPost {
        title: req.title,
        content: req.content,
    };

    match req.format.to_lowercase().as_str() {
        "json" => Ok(Json(render_post(&post)).into_response()),
        "html" => Ok(Html(render_post_html(&post)).into_response()),
        other => Err(ApiError::Validation(format!(
            "Unsupported format: {}. Use 'json' or 'html'",
            other
        ))),
    }
}
