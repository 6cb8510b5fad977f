//! Destination publisher - one post, at most two attempts

use std::sync::Arc;

use crate::model::{Embed, PostRecord, RecordRef, RenderedPost, Session};
use crate::ports::{Clock, Credentials, Destination, MediaFetcher, StateStore};
use crate::state::AppState;
use crate::usecases::media::{MediaConfig, MediaUploader};
use crate::usecases::session::SessionCache;

/// Title of the link card used for video posts
const VIDEO_CARD_TITLE: &str = "Video";

/// Configuration for publishing
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// How long a destination session is reused
    pub session_ttl: std::time::Duration,
    pub media: MediaConfig,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            session_ttl: std::time::Duration::from_secs(3600),
            media: MediaConfig::default(),
        }
    }
}

/// Result of publishing one post
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { uri: String },
    Failed { reason: String },
}

impl PublishOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }
}

/// How a single record submission ended
enum Attempt {
    Published(RecordRef),
    /// Worth one more try with a fresh session
    RetryableAuth(String),
    Fatal(String),
}

/// Publishes rendered posts to the destination
pub struct CrossPoster<D, M, St, Cl>
where
    D: Destination + ?Sized,
    M: MediaFetcher + ?Sized,
    St: StateStore + ?Sized,
    Cl: Clock + ?Sized,
{
    destination: Arc<D>,
    sessions: SessionCache<D, St, Cl>,
    media: MediaUploader<M, D>,
    clock: Arc<Cl>,
}

impl<D, M, St, Cl> CrossPoster<D, M, St, Cl>
where
    D: Destination + ?Sized,
    M: MediaFetcher + ?Sized,
    St: StateStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(
        destination: Arc<D>,
        fetcher: Arc<M>,
        state: AppState<St>,
        clock: Arc<Cl>,
        credentials: Credentials,
        config: PublishConfig,
    ) -> Self {
        let sessions = SessionCache::new(
            Arc::clone(&destination),
            state,
            Arc::clone(&clock),
            credentials,
            config.session_ttl,
        );
        let media = MediaUploader::new(fetcher, Arc::clone(&destination), config.media);
        Self {
            destination,
            sessions,
            media,
            clock,
        }
    }

    /// Publish a post, retrying once with a fresh session on retryable errors.
    ///
    /// The retry rebuilds the whole record under the fresh session, so image
    /// uploads rejected with the stale token are attempted again.
    pub async fn publish(&self, post: &RenderedPost) -> PublishOutcome {
        let session = match self.sessions.acquire().await {
            Ok(session) => session,
            Err(e) => {
                return PublishOutcome::Failed {
                    reason: format!("login failed: {}", e),
                };
            }
        };

        let record = self.build_record(&session, post).await;
        let reason = match self.attempt(&session, &record).await {
            Attempt::Published(created) => return published(post, created),
            Attempt::Fatal(reason) => return PublishOutcome::Failed { reason },
            Attempt::RetryableAuth(reason) => reason,
        };

        tracing::warn!(
            post_id = %post.source_post_id,
            reason = %reason,
            "Publish failed, retrying with a fresh session"
        );
        self.sessions.invalidate().await;

        let fresh = match self.sessions.create().await {
            Ok(session) => session,
            Err(e) => {
                return PublishOutcome::Failed {
                    reason: format!("re-login failed: {}", e),
                };
            }
        };

        let record = self.build_record(&fresh, post).await;
        match self.attempt(&fresh, &record).await {
            Attempt::Published(created) => published(post, created),
            Attempt::RetryableAuth(reason) | Attempt::Fatal(reason) => {
                PublishOutcome::Failed { reason }
            }
        }
    }

    async fn attempt(&self, session: &Session, record: &PostRecord) -> Attempt {
        match self.destination.create_record(session, record).await {
            Ok(created) => Attempt::Published(created),
            Err(e) if e.is_retryable() => Attempt::RetryableAuth(e.to_string()),
            Err(e) => Attempt::Fatal(e.to_string()),
        }
    }

    async fn build_record(&self, session: &Session, post: &RenderedPost) -> PostRecord {
        PostRecord {
            text: post.text.clone(),
            facets: post.facets.clone(),
            embed: self.build_embed(session, post).await,
            created_at: self.clock.now(),
        }
    }

    /// Video wins over images; an image gallery needs at least one upload
    async fn build_embed(&self, session: &Session, post: &RenderedPost) -> Option<Embed> {
        if let Some(video) = post.videos.first() {
            return Some(Embed::External {
                uri: video.clone(),
                title: VIDEO_CARD_TITLE.to_string(),
                description: String::new(),
            });
        }

        if post.images.is_empty() {
            return None;
        }

        let uploaded = self
            .media
            .upload_images(session, &post.images, &post.alt_text)
            .await;
        if uploaded.is_empty() {
            tracing::warn!(post_id = %post.source_post_id, "No images uploaded, posting text only");
            return None;
        }
        Some(Embed::Images(uploaded))
    }
}

fn published(post: &RenderedPost, created: RecordRef) -> PublishOutcome {
    tracing::info!(post_id = %post.source_post_id, uri = %created.uri, "Published post");
    PublishOutcome::Published { uri: created.uri }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::DestinationError;
    use crate::state::testing::FakeStateStore;
    use crate::usecases::testing::{FakeClock, FakeDestination, FakeMediaFetcher, credentials};
    use std::sync::atomic::Ordering;
    use time::macros::datetime;

    type Poster = CrossPoster<FakeDestination, FakeMediaFetcher, FakeStateStore, FakeClock>;

    fn poster(destination: &Arc<FakeDestination>, fetcher: FakeMediaFetcher) -> Poster {
        CrossPoster::new(
            Arc::clone(destination),
            Arc::new(fetcher),
            AppState::new(Arc::new(FakeStateStore::default())),
            Arc::new(FakeClock::at(datetime!(2025-11-01 12:00 UTC))),
            credentials(),
            PublishConfig::default(),
        )
    }

    fn rendered(text: &str) -> RenderedPost {
        RenderedPost {
            source_post_id: "1".to_string(),
            source_url: "https://x.com/DukeMBB/status/1".to_string(),
            text: text.to_string(),
            facets: vec![],
            images: vec![],
            videos: vec![],
            alt_text: vec![],
        }
    }

    fn server_error() -> DestinationError {
        DestinationError::Server {
            status: 502,
            message: "Bad Gateway".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publishes_text_post() {
        let destination = Arc::new(FakeDestination::default());
        let outcome = poster(&destination, FakeMediaFetcher::default())
            .publish(&rendered("Tip-off at 7"))
            .await;

        assert!(outcome.is_success());
        let records = destination.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1.text, "Tip-off at 7");
        assert_eq!(records[0].1.embed, None);
        assert_eq!(records[0].1.created_at, datetime!(2025-11-01 12:00 UTC));
    }

    #[tokio::test]
    async fn test_retries_once_with_fresh_session() {
        let destination = Arc::new(FakeDestination::with_record_results(vec![Err(
            DestinationError::Auth("ExpiredToken".to_string()),
        )]));
        let outcome = poster(&destination, FakeMediaFetcher::default())
            .publish(&rendered("hello"))
            .await;

        assert!(outcome.is_success());
        let records = destination.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, "jwt-1");
        assert_eq!(records[1].0, "jwt-2");
        assert_eq!(records[0].1, records[1].1);
        assert_eq!(destination.sessions_created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_second_failure() {
        let destination = Arc::new(FakeDestination::with_record_results(vec![
            Err(server_error()),
            Err(server_error()),
            Ok(RecordRef {
                uri: "never".to_string(),
            }),
        ]));
        let outcome = poster(&destination, FakeMediaFetcher::default())
            .publish(&rendered("hello"))
            .await;

        assert!(!outcome.is_success());
        assert_eq!(destination.records.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let destination = Arc::new(FakeDestination::with_record_results(vec![Err(
            DestinationError::Rejected {
                status: 400,
                message: "InvalidRequest".to_string(),
            },
        )]));
        let outcome = poster(&destination, FakeMediaFetcher::default())
            .publish(&rendered("hello"))
            .await;

        assert!(matches!(outcome, PublishOutcome::Failed { .. }));
        assert_eq!(destination.records.lock().unwrap().len(), 1);
        assert_eq!(destination.sessions_created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_login_failure_fails_without_record() {
        let destination = Arc::new(FakeDestination {
            fail_sessions: true,
            ..Default::default()
        });
        let outcome = poster(&destination, FakeMediaFetcher::default())
            .publish(&rendered("hello"))
            .await;

        assert!(!outcome.is_success());
        assert!(destination.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_video_becomes_external_card() {
        let destination = Arc::new(FakeDestination::default());
        let mut post = rendered("Highlights");
        post.videos = vec!["https://video.twimg.com/v.mp4".to_string()];
        post.images = vec!["https://pbs.twimg.com/media/a.jpg".to_string()];

        poster(&destination, FakeMediaFetcher::default())
            .publish(&post)
            .await;

        let records = destination.records.lock().unwrap();
        assert_eq!(
            records[0].1.embed,
            Some(Embed::External {
                uri: "https://video.twimg.com/v.mp4".to_string(),
                title: "Video".to_string(),
                description: String::new(),
            })
        );
        assert!(destination.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_images_become_gallery() {
        let destination = Arc::new(FakeDestination::default());
        let fetcher =
            FakeMediaFetcher::default().with("https://pbs.twimg.com/media/a.jpg", 10, "image/jpeg");
        let mut post = rendered("Photos");
        post.images = vec![
            "https://pbs.twimg.com/media/a.jpg".to_string(),
            "https://pbs.twimg.com/media/missing.jpg".to_string(),
        ];
        post.alt_text = vec!["alt a".to_string(), "alt missing".to_string()];

        poster(&destination, fetcher).publish(&post).await;

        let records = destination.records.lock().unwrap();
        match &records[0].1.embed {
            Some(Embed::Images(images)) => {
                assert_eq!(images.len(), 1);
                assert_eq!(images[0].alt_text, "alt a");
            }
            other => panic!("expected image gallery, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_all_image_failures_post_text_only() {
        let destination = Arc::new(FakeDestination::default());
        let mut post = rendered("Photos");
        post.images = vec!["https://pbs.twimg.com/media/missing.jpg".to_string()];

        let outcome = poster(&destination, FakeMediaFetcher::default())
            .publish(&post)
            .await;

        assert!(outcome.is_success());
        assert_eq!(destination.records.lock().unwrap()[0].1.embed, None);
    }

    #[tokio::test]
    async fn test_retry_reuploads_images_with_fresh_session() {
        let destination = Arc::new(FakeDestination {
            rejected_jwt: Some("jwt-1".to_string()),
            ..Default::default()
        });
        let fetcher =
            FakeMediaFetcher::default().with("https://pbs.twimg.com/media/a.jpg", 10, "image/jpeg");
        let mut post = rendered("Photos");
        post.images = vec!["https://pbs.twimg.com/media/a.jpg".to_string()];
        post.alt_text = vec!["alt a".to_string()];

        let outcome = poster(&destination, fetcher).publish(&post).await;

        assert!(outcome.is_success());
        let records = destination.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        let (jwt, record) = &records[1];
        assert_eq!(jwt, "jwt-2");
        match &record.embed {
            Some(Embed::Images(images)) => assert_eq!(images.len(), 1),
            other => panic!("expected image gallery, got {:?}", other),
        }
        assert_eq!(destination.uploads.lock().unwrap().len(), 1);
    }
}
