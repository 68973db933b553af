//! Decoded emote cache keyed by URL.

use super::decode::DecodedImage;
use std::collections::HashMap;
use std::sync::Arc;

/// Bounded URL -> image cache.
///
/// Emote URLs are effectively unbounded over a long stream. When the cache
/// outgrows its capacity it is emptied wholesale rather than tracking
/// recency per entry.
#[derive(Debug)]
pub struct ImageCache {
    entries: HashMap<String, Arc<DecodedImage>>,
    capacity: usize,
}

impl ImageCache {
    /// Create an empty cache.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Cached image for `url`.
    pub fn get(&self, url: &str) -> Option<Arc<DecodedImage>> {
        self.entries.get(url).cloned()
    }

    /// Store an image. Returns `true` if older entries were evicted.
    pub fn insert(&mut self, url: String, image: Arc<DecodedImage>) -> bool {
        let evicted = !self.entries.contains_key(&url) && self.entries.len() >= self.capacity;
        if evicted {
            tracing::debug!(entries = self.entries.len(), "emote cache full, resetting");
            self.entries.clear();
        }
        self.entries.insert(url, image);
        evicted
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> Arc<DecodedImage> {
        Arc::new(DecodedImage {
            mime: "image/png".to_string(),
            width: 1,
            height: 1,
            rgba: vec![0; 4],
        })
    }

    #[test]
    fn test_get_insert() {
        let mut cache = ImageCache::new(4);
        assert!(cache.get("a").is_none());
        assert!(!cache.insert("a".to_string(), image()));
        assert!(cache.get("a").is_some());
    }

    #[test]
    fn test_overflow_resets_but_keeps_newest() {
        let mut cache = ImageCache::new(2);
        cache.insert("a".to_string(), image());
        cache.insert("b".to_string(), image());
        assert!(cache.insert("c".to_string(), image()));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("c").is_some());
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_replacing_existing_does_not_evict() {
        let mut cache = ImageCache::new(1);
        cache.insert("a".to_string(), image());
        assert!(!cache.insert("a".to_string(), image()));
        assert_eq!(cache.len(), 1);
    }
}
