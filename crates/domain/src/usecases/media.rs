//! Media uploader - best-effort image transfer to the destination

use std::sync::Arc;

use crate::model::{Session, UploadedMedia};
use crate::ports::{Destination, MediaFetcher};

/// Limits applied to image uploads
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Images beyond this count are ignored
    pub max_count: usize,
    /// Larger images are skipped
    pub max_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_count: 4,
            max_bytes: 1_000_000,
        }
    }
}

pub struct MediaUploader<M, D>
where
    M: MediaFetcher + ?Sized,
    D: Destination + ?Sized,
{
    fetcher: Arc<M>,
    destination: Arc<D>,
    config: MediaConfig,
}

impl<M, D> MediaUploader<M, D>
where
    M: MediaFetcher + ?Sized,
    D: Destination + ?Sized,
{
    pub fn new(fetcher: Arc<M>, destination: Arc<D>, config: MediaConfig) -> Self {
        Self {
            fetcher,
            destination,
            config,
        }
    }

    /// Upload up to `max_count` images, skipping any that fail.
    ///
    /// Alt text is matched by the image's position in `urls`. The result keeps
    /// source order and may be shorter than the input; it is never an error.
    pub async fn upload_images(
        &self,
        session: &Session,
        urls: &[String],
        alt_text: &[String],
    ) -> Vec<UploadedMedia> {
        let mut uploaded = Vec::new();

        for (index, url) in urls.iter().take(self.config.max_count).enumerate() {
            let media = match self.fetcher.fetch(url).await {
                Ok(media) => media,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Skipping image: fetch failed");
                    continue;
                }
            };

            let mime = media
                .content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            if !mime.starts_with("image/") {
                tracing::warn!(url = %url, content_type = %media.content_type, "Skipping image: not an image");
                continue;
            }
            if media.bytes.len() > self.config.max_bytes {
                tracing::warn!(
                    url = %url,
                    bytes = media.bytes.len(),
                    max_bytes = self.config.max_bytes,
                    "Skipping image: too large"
                );
                continue;
            }

            let blob = match self.destination.upload_blob(session, media.bytes, &mime).await {
                Ok(blob) => blob,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Skipping image: upload failed");
                    continue;
                }
            };

            uploaded.push(UploadedMedia {
                blob,
                alt_text: alt_text.get(index).cloned().unwrap_or_default(),
            });
        }

        uploaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::testing::{FakeDestination, FakeMediaFetcher};
    use time::macros::datetime;

    fn session() -> Session {
        Session {
            access_jwt: "jwt-1".to_string(),
            did: "did:plc:bot".to_string(),
            created_at: datetime!(2025-11-01 12:00 UTC),
        }
    }

    fn urls(names: &[&str]) -> Vec<String> {
        names
            .iter()
            .map(|n| format!("https://pbs.twimg.com/media/{}", n))
            .collect()
    }

    #[tokio::test]
    async fn test_uploads_images_with_aligned_alt_text() {
        let fetcher = FakeMediaFetcher::default()
            .with("https://pbs.twimg.com/media/a.jpg", 100, "image/jpeg")
            .with("https://pbs.twimg.com/media/b.png", 200, "image/png");
        let destination = Arc::new(FakeDestination::default());
        let uploader =
            MediaUploader::new(Arc::new(fetcher), Arc::clone(&destination), MediaConfig::default());

        let uploaded = uploader
            .upload_images(
                &session(),
                &urls(&["a.jpg", "b.png"]),
                &["first".to_string(), "second".to_string()],
            )
            .await;

        assert_eq!(uploaded.len(), 2);
        assert_eq!(uploaded[0].alt_text, "first");
        assert_eq!(uploaded[1].alt_text, "second");
        assert_eq!(
            *destination.uploads.lock().unwrap(),
            vec![(100, "image/jpeg".to_string()), (200, "image/png".to_string())]
        );
    }

    #[tokio::test]
    async fn test_skips_oversized_non_image_and_missing() {
        let fetcher = FakeMediaFetcher::default()
            .with("https://pbs.twimg.com/media/big.jpg", 1_000_001, "image/jpeg")
            .with("https://pbs.twimg.com/media/page.html", 10, "text/html")
            .with("https://pbs.twimg.com/media/ok.jpg", 1_000_000, "image/jpeg; charset=binary");
        let destination = Arc::new(FakeDestination::default());
        let uploader =
            MediaUploader::new(Arc::new(fetcher), Arc::clone(&destination), MediaConfig::default());

        let uploaded = uploader
            .upload_images(
                &session(),
                &urls(&["big.jpg", "page.html", "gone.jpg", "ok.jpg"]),
                &[
                    "big".to_string(),
                    "page".to_string(),
                    "gone".to_string(),
                    "ok".to_string(),
                ],
            )
            .await;

        assert_eq!(uploaded.len(), 1);
        assert_eq!(uploaded[0].alt_text, "ok");
        assert_eq!(destination.uploads.lock().unwrap()[0].1, "image/jpeg");
    }

    #[tokio::test]
    async fn test_caps_image_count() {
        let names = ["1.jpg", "2.jpg", "3.jpg", "4.jpg", "5.jpg"];
        let fetcher = names.iter().fold(FakeMediaFetcher::default(), |f, n| {
            f.with(&format!("https://pbs.twimg.com/media/{}", n), 10, "image/jpeg")
        });
        let destination = Arc::new(FakeDestination::default());
        let uploader =
            MediaUploader::new(Arc::new(fetcher), Arc::clone(&destination), MediaConfig::default());

        let uploaded = uploader.upload_images(&session(), &urls(&names), &[]).await;

        assert_eq!(uploaded.len(), 4);
        assert!(uploaded.iter().all(|m| m.alt_text.is_empty()));
    }

    #[tokio::test]
    async fn test_upload_failures_yield_empty() {
        let fetcher =
            FakeMediaFetcher::default().with("https://pbs.twimg.com/media/a.jpg", 10, "image/jpeg");
        let destination = Arc::new(FakeDestination {
            fail_uploads: true,
            ..Default::default()
        });
        let uploader = MediaUploader::new(Arc::new(fetcher), destination, MediaConfig::default());

        let uploaded = uploader
            .upload_images(&session(), &urls(&["a.jpg"]), &[])
            .await;

        assert!(uploaded.is_empty());
    }
}
