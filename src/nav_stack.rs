//! Breadcrumb-equivalent navigation stack.
//!
//! The stack reflects the logical path the visitor took (segment, then at
//! most one topic or answer) independently of whatever navigation the
//! generated markup invents. Stacks are values: every navigation decision
//! builds a new one instead of editing the current one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cache::PageKey;

/// Kind of a stack entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Segment,
    Topic,
    Answer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    pub slug: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

impl NavEntry {
    pub fn new(slug: impl Into<String>, name: impl Into<String>, entry_type: EntryType) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            entry_type,
        }
    }
}

/// Error for entry sequences that break the stack's shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStack(pub String);

impl fmt::Display for InvalidStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid navigation stack: {}", self.0)
    }
}

impl std::error::Error for InvalidStack {}

/// Ordered breadcrumb entries. Index 0 is the root segment.
///
/// Shape: `[]`, `[segment]` or `[segment, topic|answer]`. Deserialization
/// rejects anything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NavEntry>", into = "Vec<NavEntry>")]
pub struct NavigationStack(Vec<NavEntry>);

impl NavigationStack {
    /// The landing page's stack.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// A fresh stack rooted at `slug`.
    pub fn segment(slug: &str, name: Option<&str>) -> Self {
        Self(vec![NavEntry::new(
            slug,
            name.map(str::to_string).unwrap_or_else(|| humanize(slug)),
            EntryType::Segment,
        )])
    }

    /// `[parent, topic]`, reusing the current root's display name when it
    /// already matches `parent`. Any earlier topic is dropped.
    pub fn topic(&self, parent: &str, topic: &str, name: Option<&str>) -> Self {
        let root = match self.root() {
            Some(root) if root.slug == parent => root.clone(),
            _ => NavEntry::new(parent, humanize(parent), EntryType::Segment),
        };
        let leaf = NavEntry::new(
            topic,
            name.map(str::to_string).unwrap_or_else(|| humanize(topic)),
            EntryType::Topic,
        );
        Self(vec![root, leaf])
    }

    /// Stack for an answer page: `[root, answer]` when a segment is current,
    /// otherwise empty (answers asked from the landing page hang off home).
    pub fn answer(&self, slug: &str, title: &str) -> Self {
        match self.root() {
            Some(root) => Self(vec![
                root.clone(),
                NavEntry::new(slug, title, EntryType::Answer),
            ]),
            None => Self::empty(),
        }
    }

    /// Derive a plausible stack from a `segment` or `segment/topic` path.
    ///
    /// Only used for history entries that carry no stack of their own.
    pub fn rebuild_from_path(path: &str) -> Self {
        let parts: Vec<&str> = path
            .trim_matches('/')
            .split('/')
            .filter(|p| !p.is_empty())
            .collect();
        match parts.as_slice() {
            [] | ["landing"] => Self::empty(),
            ["answer", _] => Self::empty(),
            [segment] => Self::segment(segment, None),
            [segment, topic, ..] => Self::empty().topic(segment, topic, None),
        }
    }

    pub fn entries(&self) -> &[NavEntry] {
        &self.0
    }

    pub fn root(&self) -> Option<&NavEntry> {
        self.0.first()
    }

    pub fn current(&self) -> Option<&NavEntry> {
        self.0.last()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// History path for the page this stack points at.
    pub fn page_path(&self) -> String {
        match self.0.as_slice() {
            [] => "landing".to_string(),
            [segment] => segment.slug.clone(),
            [_, leaf] if leaf.entry_type == EntryType::Answer => format!("answer/{}", leaf.slug),
            [segment, leaf, ..] => format!("{}/{}", segment.slug, leaf.slug),
        }
    }

    /// Cache key for the page this stack points at (`None` for landing).
    pub fn page_key(&self) -> Option<PageKey> {
        match self.0.as_slice() {
            [] => None,
            [segment] => Some(PageKey::Segment(segment.slug.clone())),
            [_, leaf] if leaf.entry_type == EntryType::Answer => {
                Some(PageKey::Answer(leaf.slug.clone()))
            }
            [segment, leaf, ..] => Some(PageKey::Topic {
                segment: segment.slug.clone(),
                topic: leaf.slug.clone(),
            }),
        }
    }
}

impl TryFrom<Vec<NavEntry>> for NavigationStack {
    type Error = InvalidStack;

    fn try_from(entries: Vec<NavEntry>) -> Result<Self, Self::Error> {
        match entries.as_slice() {
            [] => {}
            [root] if root.entry_type == EntryType::Segment => {}
            [root, leaf]
                if root.entry_type == EntryType::Segment
                    && leaf.entry_type != EntryType::Segment => {}
            [root, ..] if root.entry_type != EntryType::Segment => {
                return Err(InvalidStack(format!(
                    "root entry '{}' is not a segment",
                    root.slug
                )))
            }
            _ => {
                return Err(InvalidStack(format!(
                    "expected at most one segment and one child, got {} entries",
                    entries.len()
                )))
            }
        }
        Ok(Self(entries))
    }
}

impl From<NavigationStack> for Vec<NavEntry> {
    fn from(stack: NavigationStack) -> Self {
        stack.0
    }
}

/// Turn a slug into a display name: `pricing-plans` → `Pricing Plans`.
pub fn humanize(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
