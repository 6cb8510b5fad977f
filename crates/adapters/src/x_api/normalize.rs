//! Payload normalization for RapidAPI timeline responses
//!
//! Pure functions: JSON in, filtered [`Post`]s out. Item order is preserved
//! (newest first, as served).

use courtside_domain::{Post, PostSourceError};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::cmp::Reverse;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTweet {
    id_str: Option<String>,
    tweet_id: Option<String>,
    full_text: Option<String>,
    text: Option<String>,
    created_at: Option<String>,
    retweeted_status: Option<Value>,
    in_reply_to_status_id: Option<Value>,
    in_reply_to_status_id_str: Option<String>,
    is_reply: Option<bool>,
    conversation_id_str: Option<String>,
    entities: Option<Entities>,
    extended_entities: Option<Entities>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Entities {
    #[serde(deserialize_with = "null_as_default")]
    urls: Vec<UrlEntity>,
    #[serde(deserialize_with = "null_as_default")]
    media: Vec<MediaEntity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UrlEntity {
    url: Option<String>,
    expanded_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MediaEntity {
    #[serde(rename = "type")]
    kind: Option<String>,
    media_url_https: Option<String>,
    /// Shortened link the source appends to the text for this media
    url: Option<String>,
    ext_alt_text: Option<String>,
    video_info: Option<VideoInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VideoInfo {
    #[serde(deserialize_with = "null_as_default")]
    variants: Vec<Variant>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Variant {
    content_type: Option<String>,
    url: Option<String>,
    bitrate: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawListItem {
    tweet_id: Option<String>,
    text: Option<String>,
    screen_name: Option<String>,
    created_at: Option<String>,
    retweeted_status: Option<Value>,
    in_reply_to_status_id: Option<Value>,
    entities: Option<Entities>,
    media: Option<ListMedia>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListMedia {
    #[serde(deserialize_with = "null_as_default")]
    photo: Vec<ListPhoto>,
    #[serde(deserialize_with = "null_as_default")]
    video: Vec<VideoInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListPhoto {
    media_url_https: Option<String>,
}

/// Explicit `null` arrays read as empty
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a user-timeline payload (`result` or `results` array)
pub fn parse_user_timeline(body: &Value, identity: &str) -> Result<Vec<Post>, PostSourceError> {
    let items = body
        .get("result")
        .or_else(|| body.get("results"))
        .and_then(Value::as_array)
        .ok_or_else(|| PostSourceError::Malformed("missing result array".to_string()))?;

    Ok(items
        .iter()
        .filter_map(|item| match serde_json::from_value::<RawTweet>(item.clone()) {
            Ok(raw) => normalize_tweet(raw, identity),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unparseable timeline item");
                None
            }
        })
        .collect())
}

/// Parse a list-timeline payload (`timeline` array)
pub fn parse_list_timeline(body: &Value, identity: &str) -> Result<Vec<Post>, PostSourceError> {
    let items = body
        .get("timeline")
        .and_then(Value::as_array)
        .ok_or_else(|| PostSourceError::Malformed("missing timeline array".to_string()))?;

    Ok(items
        .iter()
        .filter_map(|item| match serde_json::from_value::<RawListItem>(item.clone()) {
            Ok(raw) => normalize_list_item(raw, identity),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unparseable list item");
                None
            }
        })
        .collect())
}

fn normalize_tweet(raw: RawTweet, identity: &str) -> Option<Post> {
    let id = raw.id_str.or(raw.tweet_id)?;
    let text = raw.full_text.or(raw.text).unwrap_or_default();

    if is_retweet(&text, raw.retweeted_status.as_ref()) {
        tracing::debug!(post_id = %id, "Skipping retweet");
        return None;
    }
    let reply = raw.in_reply_to_status_id.as_ref().is_some_and(is_truthy)
        || raw
            .in_reply_to_status_id_str
            .as_deref()
            .is_some_and(|s| !s.is_empty())
        || raw.is_reply.unwrap_or(false);
    if reply {
        tracing::debug!(post_id = %id, "Skipping reply");
        return None;
    }
    if raw
        .conversation_id_str
        .as_deref()
        .is_some_and(|conversation| conversation != id)
    {
        tracing::debug!(post_id = %id, "Skipping thread continuation");
        return None;
    }

    let entities = raw.entities.unwrap_or_default();
    let media = match raw.extended_entities {
        Some(extended) if !extended.media.is_empty() => extended.media,
        _ => entities.media,
    };

    let mut images = Vec::new();
    let mut videos = Vec::new();
    let mut alt_text = Vec::new();
    let mut media_links = Vec::new();

    for item in media {
        match item.kind.as_deref() {
            Some("photo") => {
                let Some(url) = item.media_url_https.filter(|u| !u.is_empty()) else {
                    continue;
                };
                images.push(url);
                alt_text.push(
                    item.ext_alt_text
                        .unwrap_or_else(|| default_alt_text(identity)),
                );
            }
            Some("video") | Some("animated_gif") => {
                let Some(url) = item.video_info.and_then(|info| best_variant(info.variants))
                else {
                    continue;
                };
                videos.push(url);
            }
            _ => continue,
        }
        if let Some(link) = item.url.filter(|l| !l.is_empty()) {
            media_links.push(link);
        }
    }

    let mut text = expand_urls(&decode_entities(&text), &entities.urls);
    if !images.is_empty() || !videos.is_empty() {
        text = strip_trailing_links(&text, &media_links);
    }

    Some(Post {
        url: format!("https://x.com/{}/status/{}", identity, id),
        id,
        text,
        timestamp_source: raw.created_at.unwrap_or_default(),
        images,
        videos,
        alt_text,
    })
}

fn normalize_list_item(raw: RawListItem, identity: &str) -> Option<Post> {
    let id = raw.tweet_id?;
    let text = raw.text.unwrap_or_default();

    if is_retweet(&text, raw.retweeted_status.as_ref()) {
        tracing::debug!(post_id = %id, "Skipping retweet");
        return None;
    }
    if text.trim_start().starts_with('@') || raw.in_reply_to_status_id.as_ref().is_some_and(is_truthy)
    {
        tracing::debug!(post_id = %id, "Skipping reply");
        return None;
    }

    let author = raw
        .screen_name
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| identity.to_string());
    let media = raw.media.unwrap_or_default();

    let images: Vec<String> = media
        .photo
        .into_iter()
        .filter_map(|p| p.media_url_https.filter(|u| !u.is_empty()))
        .collect();
    let videos: Vec<String> = media
        .video
        .into_iter()
        .filter_map(|v| best_variant(v.variants))
        .collect();
    let alt_text = images.iter().map(|_| default_alt_text(&author)).collect();

    let urls = raw.entities.map(|e| e.urls).unwrap_or_default();
    let text = expand_urls(&decode_entities(&text), &urls);

    Some(Post {
        url: format!("https://x.com/{}/status/{}", author, id),
        id,
        text,
        timestamp_source: raw.created_at.unwrap_or_default(),
        images,
        videos,
        alt_text,
    })
}

fn default_alt_text(author: &str) -> String {
    format!("Image from tweet by @{}", author)
}

fn is_retweet(text: &str, retweeted_status: Option<&Value>) -> bool {
    text.starts_with("RT ") || retweeted_status.is_some_and(|v| !v.is_null())
}

/// Loose truthiness for reply markers, which arrive as strings, numbers, or null
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Decode named, decimal, and hex HTML entities
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Replace every occurrence of each shortened link with its expansion
fn expand_urls(text: &str, urls: &[UrlEntity]) -> String {
    urls.iter().fold(text.to_string(), |acc, entity| {
        match (entity.url.as_deref(), entity.expanded_url.as_deref()) {
            (Some(short), Some(expanded)) if !short.is_empty() && !expanded.is_empty() => {
                acc.replace(short, expanded)
            }
            _ => acc,
        }
    })
}

fn strip_trailing_links(text: &str, links: &[String]) -> String {
    let mut out = text.trim_end();
    for link in links {
        if let Some(rest) = out.strip_suffix(link.as_str()) {
            out = rest.trim_end();
        }
    }
    out.to_string()
}

/// Highest-bitrate MP4, else the first variant with a URL
fn best_variant(variants: Vec<Variant>) -> Option<String> {
    let best_mp4 = variants
        .iter()
        .filter(|v| v.content_type.as_deref() == Some("video/mp4") && v.url.is_some())
        .min_by_key(|v| Reverse(v.bitrate.unwrap_or(0)))
        .and_then(|v| v.url.clone());

    best_mp4.or_else(|| variants.into_iter().find_map(|v| v.url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tweet(id: &str, text: &str) -> Value {
        json!({
            "id_str": id,
            "full_text": text,
            "created_at": "Mon Nov 10 23:00:00 +0000 2025",
            "conversation_id_str": id,
        })
    }

    #[test]
    fn test_accepts_result_or_results() {
        let a = parse_user_timeline(&json!({ "result": [tweet("2", "a")] }), "DukeMBB").unwrap();
        let b = parse_user_timeline(&json!({ "results": [tweet("2", "b")] }), "DukeMBB").unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(a[0].url, "https://x.com/DukeMBB/status/2");
        assert_eq!(a[0].timestamp_source, "Mon Nov 10 23:00:00 +0000 2025");
    }

    #[test]
    fn test_missing_array_is_malformed() {
        let result = parse_user_timeline(&json!({ "status": "ok" }), "DukeMBB");
        assert!(matches!(result, Err(PostSourceError::Malformed(_))));
    }

    #[test]
    fn test_filters_retweets_replies_and_threads() {
        let mut retweet_status = tweet("3", "quoting");
        retweet_status["retweeted_status"] = json!({ "id_str": "1" });
        let mut reply_id = tweet("4", "reply");
        reply_id["in_reply_to_status_id"] = json!(123);
        let mut reply_str = tweet("5", "reply");
        reply_str["in_reply_to_status_id_str"] = json!("123");
        let mut reply_flag = tweet("6", "reply");
        reply_flag["is_reply"] = json!(true);
        let mut thread = tweet("7", "continued");
        thread["conversation_id_str"] = json!("1");
        let mut null_reply = tweet("8", "kept");
        null_reply["in_reply_to_status_id"] = Value::Null;

        let body = json!({ "result": [
            tweet("2", "RT @someone: hi"),
            retweet_status,
            reply_id,
            reply_str,
            reply_flag,
            thread,
            null_reply,
            tweet("9", "kept too"),
        ]});

        let posts = parse_user_timeline(&body, "DukeMBB").unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["8", "9"]);
    }

    #[test]
    fn test_decodes_entities_and_expands_all_links() {
        let mut item = tweet("2", "Duke &amp; UNC &#39;25 &#x1F3C0; https://t.co/abc and again https://t.co/abc");
        item["entities"] = json!({
            "urls": [{ "url": "https://t.co/abc", "expanded_url": "https://goduke.com/game" }]
        });

        let posts = parse_user_timeline(&json!({ "result": [item] }), "DukeMBB").unwrap();

        assert_eq!(
            posts[0].text,
            "Duke & UNC '25 🏀 https://goduke.com/game and again https://goduke.com/game"
        );
    }

    #[test]
    fn test_extracts_photos_with_alt_text_and_strips_media_link() {
        let mut item = tweet("2", "Game day https://t.co/media1");
        item["extended_entities"] = json!({
            "media": [
                {
                    "type": "photo",
                    "media_url_https": "https://pbs.twimg.com/media/a.jpg",
                    "url": "https://t.co/media1",
                    "ext_alt_text": "Cameron Indoor"
                },
                {
                    "type": "photo",
                    "media_url_https": "https://pbs.twimg.com/media/b.jpg",
                    "url": "https://t.co/media1",
                    "ext_alt_text": null
                }
            ]
        });

        let posts = parse_user_timeline(&json!({ "result": [item] }), "DukeMBB").unwrap();
        let post = &posts[0];

        assert_eq!(post.text, "Game day");
        assert_eq!(
            post.images,
            vec![
                "https://pbs.twimg.com/media/a.jpg",
                "https://pbs.twimg.com/media/b.jpg"
            ]
        );
        assert_eq!(
            post.alt_text,
            vec!["Cameron Indoor", "Image from tweet by @DukeMBB"]
        );
    }

    #[test]
    fn test_falls_back_to_entities_media() {
        let mut item = tweet("2", "Photo");
        item["entities"] = json!({
            "media": [{ "type": "photo", "media_url_https": "https://pbs.twimg.com/media/a.jpg" }]
        });

        let posts = parse_user_timeline(&json!({ "result": [item] }), "DukeMBB").unwrap();

        assert_eq!(posts[0].images.len(), 1);
    }

    #[test]
    fn test_picks_highest_bitrate_mp4() {
        let mut item = tweet("2", "Highlights");
        item["extended_entities"] = json!({
            "media": [{
                "type": "video",
                "media_url_https": "https://pbs.twimg.com/thumb.jpg",
                "video_info": { "variants": [
                    { "content_type": "application/x-mpegURL", "url": "https://video.twimg.com/pl.m3u8" },
                    { "content_type": "video/mp4", "url": "https://video.twimg.com/low.mp4", "bitrate": 256000 },
                    { "content_type": "video/mp4", "url": "https://video.twimg.com/high.mp4", "bitrate": 2176000 }
                ]}
            }, {
                "type": "animated_gif",
                "video_info": { "variants": [
                    { "content_type": "application/x-mpegURL", "url": "https://video.twimg.com/gif.m3u8" }
                ]}
            }]
        });

        let posts = parse_user_timeline(&json!({ "result": [item] }), "DukeMBB").unwrap();

        assert_eq!(
            posts[0].videos,
            vec![
                "https://video.twimg.com/high.mp4",
                "https://video.twimg.com/gif.m3u8"
            ]
        );
        assert!(posts[0].images.is_empty());
    }

    #[test]
    fn test_list_timeline_items() {
        let body = json!({ "timeline": [
            {
                "tweet_id": "20",
                "text": "Final &gt; 80-70",
                "screen_name": "DukeMBB",
                "created_at": "Mon Nov 10 23:00:00 +0000 2025",
                "media": {
                    "photo": [{ "media_url_https": "https://pbs.twimg.com/media/a.jpg" }],
                    "video": [{ "variants": [
                        { "content_type": "video/mp4", "url": "https://video.twimg.com/v.mp4", "bitrate": 832000 }
                    ]}]
                }
            },
            { "tweet_id": "19", "text": "@fan thanks!", "screen_name": "DukeMBB" },
            { "tweet_id": "18", "text": "RT @other: news", "screen_name": "DukeMBB" }
        ]});

        let posts = parse_list_timeline(&body, "DukeMBB").unwrap();

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].text, "Final > 80-70");
        assert_eq!(posts[0].url, "https://x.com/DukeMBB/status/20");
        assert_eq!(posts[0].videos, vec!["https://video.twimg.com/v.mp4"]);
        assert_eq!(posts[0].alt_text, vec!["Image from tweet by @DukeMBB"]);
    }
}
