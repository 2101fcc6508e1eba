use std::collections::HashMap;
use std::fmt;

/// Logical identity of a generated page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageKey {
    Segment(String),
    Topic { segment: String, topic: String },
    Answer(String),
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageKey::Segment(slug) => write!(f, "segment_{}", slug),
            PageKey::Topic { segment, topic } => write!(f, "topic_{}_{}", segment, topic),
            PageKey::Answer(slug) => write!(f, "answer_{}", slug),
        }
    }
}

/// Fully assembled pages for the lifetime of the tab.
///
/// Only finished documents are stored; callers insert after the `complete`
/// event or a JSON response, never while a stream is still running.
#[derive(Debug, Default)]
pub struct PageCache {
    pages: HashMap<PageKey, String>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PageKey) -> Option<&str> {
        self.pages.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &PageKey) -> bool {
        self.pages.contains_key(key)
    }

    pub fn insert(&mut self, key: PageKey, html: String) {
        tracing::debug!(key = %key, bytes = html.len(), "caching page");
        self.pages.insert(key, html);
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(PageKey::Segment("pricing".into()).to_string(), "segment_pricing");
        assert_eq!(
            PageKey::Topic {
                segment: "pricing".into(),
                topic: "teams".into()
            }
            .to_string(),
            "topic_pricing_teams"
        );
        assert_eq!(PageKey::Answer("how-much".into()).to_string(), "answer_how-much");
    }

    #[test]
    fn test_insert_and_get() {
        let mut cache = PageCache::new();
        let key = PageKey::Segment("pricing".into());
        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), "<html></html>".into());
        assert_eq!(cache.get(&key), Some("<html></html>"));
        assert!(cache.contains(&key));
        assert_eq!(cache.len(), 1);
    }
}
