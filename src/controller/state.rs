//! What is on screen, as an explicit state machine.

use std::fmt;

use crate::nav_stack::{EntryType, NavigationStack};

/// The page currently displayed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Landing,
    Segment {
        slug: String,
    },
    Topic {
        segment: String,
        topic: String,
    },
    Answer {
        slug: String,
    },
    /// Only offers the way back to landing
    Error {
        timed_out: bool,
    },
}

/// A page swap the controller performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    ShowLanding,
    ShowSegment { slug: String },
    ShowTopic { segment: String, topic: String },
    ShowAnswer { slug: String },
    Fail { timed_out: bool },
}

impl Transition {
    /// The transition that displays the page `stack` points at.
    pub fn for_stack(stack: &NavigationStack) -> Self {
        match stack.entries() {
            [] => Transition::ShowLanding,
            [segment] => Transition::ShowSegment {
                slug: segment.slug.clone(),
            },
            [_, leaf] if leaf.entry_type == EntryType::Answer => Transition::ShowAnswer {
                slug: leaf.slug.clone(),
            },
            [segment, leaf, ..] => Transition::ShowTopic {
                segment: segment.slug.clone(),
                topic: leaf.slug.clone(),
            },
        }
    }
}

impl ViewState {
    /// Transition table.
    ///
    /// Gating happens on the loading flags, so every state accepts every
    /// transition and the target depends only on the transition.
    pub fn apply(&self, transition: Transition) -> ViewState {
        let next = match transition {
            Transition::ShowLanding => ViewState::Landing,
            Transition::ShowSegment { slug } => ViewState::Segment { slug },
            Transition::ShowTopic { segment, topic } => ViewState::Topic { segment, topic },
            Transition::ShowAnswer { slug } => ViewState::Answer { slug },
            Transition::Fail { timed_out } => ViewState::Error { timed_out },
        };
        tracing::trace!(from = %self, to = %next, "view transition");
        next
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ViewState::Error { .. })
    }

    /// Page path as used in history states and window events.
    pub fn page(&self) -> String {
        match self {
            ViewState::Landing => "landing".to_string(),
            ViewState::Segment { slug } => slug.clone(),
            ViewState::Topic { segment, topic } => format!("{}/{}", segment, topic),
            ViewState::Answer { slug } => format!("answer/{}", slug),
            ViewState::Error { .. } => "error".to_string(),
        }
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.page())
    }
}
