//! Dedup cursor: which fetched posts are new since the last mirrored one

use std::cmp::Ordering;

use crate::model::{FirstRunPolicy, Post};

/// Outcome of comparing a fetched window against the cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewPosts {
    /// Posts newer than the cursor, oldest first
    Fresh(Vec<Post>),
    /// The cursor ID is not in the fetched window; posting anything could duplicate
    Stale,
}

impl NewPosts {
    pub fn into_posts(self) -> Vec<Post> {
        match self {
            NewPosts::Fresh(posts) => posts,
            NewPosts::Stale => vec![],
        }
    }
}

/// Compute the posts to mirror from an oldest-first window.
///
/// Without a cursor, `policy` decides between the newest post only and the
/// whole window. With a cursor, only posts after it are returned; a cursor
/// missing from the window yields [`NewPosts::Stale`].
pub fn compute_new(
    chronological: &[Post],
    cursor: Option<&str>,
    policy: FirstRunPolicy,
) -> NewPosts {
    let Some(cursor) = cursor else {
        let posts = match policy {
            FirstRunPolicy::Newest => chronological.last().cloned().into_iter().collect(),
            FirstRunPolicy::All => chronological.to_vec(),
        };
        return NewPosts::Fresh(posts);
    };

    match chronological.iter().position(|p| p.id == cursor) {
        Some(index) => NewPosts::Fresh(chronological[index + 1..].to_vec()),
        None => NewPosts::Stale,
    }
}

/// Order two source IDs when both are numeric snowflakes; `None` for opaque IDs
pub fn compare_ids(a: &str, b: &str) -> Option<Ordering> {
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());
    if !numeric(a) || !numeric(b) {
        return None;
    }
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    Some(a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
}

/// Whether moving the cursor from `current` to `candidate` keeps it monotonic
pub fn advances(current: Option<&str>, candidate: &str) -> bool {
    match current {
        None => true,
        Some(current) => !matches!(compare_ids(candidate, current), Some(Ordering::Less)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str) -> Post {
        Post {
            id: id.to_string(),
            text: format!("post {}", id),
            url: format!("https://x.com/someone/status/{}", id),
            timestamp_source: String::new(),
            images: vec![],
            videos: vec![],
            alt_text: vec![],
        }
    }

    fn ids(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_posts_after_cursor() {
        let window = vec![post("a"), post("b"), post("c")];
        let result = compute_new(&window, Some("a"), FirstRunPolicy::Newest);
        assert_eq!(result, NewPosts::Fresh(vec![post("b"), post("c")]));
    }

    #[test]
    fn test_cursor_at_newest_yields_nothing() {
        let window = vec![post("a"), post("b")];
        let result = compute_new(&window, Some("b"), FirstRunPolicy::All);
        assert_eq!(result, NewPosts::Fresh(vec![]));
    }

    #[test]
    fn test_stale_cursor_yields_nothing() {
        let window = vec![post("a"), post("b")];
        let result = compute_new(&window, Some("z"), FirstRunPolicy::All);
        assert_eq!(result, NewPosts::Stale);
        assert!(result.into_posts().is_empty());
    }

    #[test]
    fn test_first_run_newest_policy() {
        let window = vec![post("a"), post("b"), post("c")];
        let result = compute_new(&window, None, FirstRunPolicy::Newest).into_posts();
        assert_eq!(ids(&result), vec!["c"]);
    }

    #[test]
    fn test_first_run_all_policy() {
        let window = vec![post("a"), post("b"), post("c")];
        let result = compute_new(&window, None, FirstRunPolicy::All).into_posts();
        assert_eq!(ids(&result), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_first_run_empty_window() {
        assert_eq!(
            compute_new(&[], None, FirstRunPolicy::Newest),
            NewPosts::Fresh(vec![])
        );
    }

    #[test]
    fn test_compare_snowflake_ids() {
        assert_eq!(
            compare_ids("1850000000000000002", "1850000000000000001"),
            Some(Ordering::Greater)
        );
        assert_eq!(compare_ids("999", "1000"), Some(Ordering::Less));
        assert_eq!(compare_ids("0042", "42"), Some(Ordering::Equal));
        assert_eq!(compare_ids("abc", "42"), None);
    }

    #[test]
    fn test_cursor_never_regresses() {
        assert!(advances(None, "100"));
        assert!(advances(Some("100"), "101"));
        assert!(advances(Some("100"), "100"));
        assert!(!advances(Some("101"), "100"));
        assert!(advances(Some("b"), "a"));
    }
}
