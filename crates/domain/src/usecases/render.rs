//! Rendering use case - turns a source post into destination-ready content

use crate::model::{Post, RenderedPost};
use crate::sanitize::{build_link_facets, clean};

/// Configuration for the renderer
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Maximum characters in the destination post
    pub max_chars: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { max_chars: 300 }
    }
}

/// Renderer for mirrored posts
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Clean the text, fit it to the length limit, and mark its links
    pub fn render(&self, post: &Post) -> RenderedPost {
        let cleaned = clean(&post.text);
        let (text, facets) = match self.cut_point(&cleaned) {
            None => {
                let facets = build_link_facets(&cleaned);
                (cleaned, facets)
            }
            Some(cut) => {
                // Facets come from the kept body so the ellipsis never joins a link
                let body = cleaned[..cut].trim_end();
                let facets = build_link_facets(body);
                (format!("{}…", body), facets)
            }
        };

        RenderedPost {
            source_post_id: post.id.clone(),
            source_url: post.url.clone(),
            text,
            facets,
            images: post.images.clone(),
            videos: post.videos.clone(),
            alt_text: post.alt_text.clone(),
        }
    }

    /// Byte offset to cut at when the text is over the limit.
    ///
    /// Leaves room for the ellipsis and backs off to the start of a link
    /// that would otherwise be split.
    fn cut_point(&self, text: &str) -> Option<usize> {
        if text.chars().count() <= self.config.max_chars {
            return None;
        }
        let keep = self.config.max_chars.saturating_sub(1);
        let mut cut = text.char_indices().nth(keep).map(|(i, _)| i)?;
        if let Some(link) = build_link_facets(text)
            .into_iter()
            .find(|link| link.byte_start < cut && cut < link.byte_end)
        {
            cut = link.byte_start;
        }
        Some(cut)
    }
}
