use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::schemas::{PhotoReference, PhotoSubmission};

// scheme, then a dotted domain, localhost or IPv4, optional port, optional path/query
static URL_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"(?i)^https?://(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+[A-Z]{2,6}\.?|localhost|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?::\d+)?(?:/?|[/?]\S+)$",
    )
    .ok()
});

/// Filters submitted photos down to those with a usable absolute HTTP(S) URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaIngestionAgent;

impl MediaIngestionAgent {
    pub fn new() -> Self {
        Self
    }

    pub fn is_valid_url(url: &str) -> bool {
        URL_PATTERN.as_ref().is_some_and(|re| re.is_match(url))
    }

    /// Keep valid photos in submission order. Invalid or empty URLs are dropped, not errors.
    pub fn process(&self, correlation_id: &str, photos: &[PhotoSubmission]) -> Vec<PhotoReference> {
        let kept: Vec<PhotoReference> = photos
            .iter()
            .filter_map(|photo| {
                let url = photo.image_url.trim();
                if url.is_empty() || !Self::is_valid_url(url) {
                    debug!(correlation_id, url = %photo.image_url, "rejecting photo url");
                    return None;
                }
                Some(PhotoReference {
                    image_url: url.to_string(),
                    room_name: photo.room_name.clone(),
                    order_index: photo.order_index,
                })
            })
            .collect();
        info!(
            correlation_id,
            stage = "ingest",
            submitted = photos.len(),
            accepted = kept.len(),
            "photo ingestion finished"
        );
        kept
    }
}
