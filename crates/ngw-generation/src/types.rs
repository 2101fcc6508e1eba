//! Request, response and stream event types for the generation backend.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// One of the three independently generated sections of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionId {
    Header,
    Content,
    Footer,
}

impl SectionId {
    /// All sections, in document order.
    pub const ALL: [SectionId; 3] = [SectionId::Header, SectionId::Content, SectionId::Footer];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionId::Header => "header",
            SectionId::Content => "content",
            SectionId::Footer => "footer",
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionId {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "header" => Ok(SectionId::Header),
            "content" => Ok(SectionId::Content),
            "footer" => Ok(SectionId::Footer),
            other => Err(GenerationError::ParseError(format!(
                "unknown section id: {}",
                other
            ))),
        }
    }
}

/// Kind of page being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    /// A top-level segment page
    Segment,
    /// A topic page nested under a segment
    Detail,
}

/// Aggregated visitor interaction data sent along with generation requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorSignals {
    /// Visited page keys, unique, in first-visit order
    pub pages_visited: Vec<String>,
    /// Accumulated dwell time per section, in seconds
    pub time_on_sections: BTreeMap<String, f64>,
    /// Clicked element identifiers, unique, in first-click order
    pub clicked_elements: Vec<String>,
    /// Deepest scroll fraction reached per page
    pub scroll_depth: BTreeMap<String, f64>,
}

impl BehaviorSignals {
    pub fn is_empty(&self) -> bool {
        self.pages_visited.is_empty()
            && self.time_on_sections.is_empty()
            && self.clicked_elements.is_empty()
            && self.scroll_depth.is_empty()
    }
}

/// Body of `generate-page` and `generate-page-stream`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePageRequest {
    pub site_id: String,
    pub version_id: String,
    pub page_type: PageType,
    pub segment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior_signals: Option<BehaviorSignals>,
}

impl GeneratePageRequest {
    pub fn new(
        site_id: impl Into<String>,
        version_id: impl Into<String>,
        page_type: PageType,
        segment: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            site_id: site_id.into(),
            version_id: version_id.into(),
            page_type,
            segment: segment.into(),
            topic: None,
            session_id: session_id.into(),
            context: None,
            behavior_signals: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_behavior_signals(mut self, signals: BehaviorSignals) -> Self {
        self.behavior_signals = Some(signals);
        self
    }
}

/// Response of `generate-page`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratePageResponse {
    pub html: String,
}

/// Body of `generate-answer-page`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPageRequest {
    pub project_id: String,
    pub question: String,
    pub question_slug: String,
    pub question_title: String,
    pub content: String,
    pub session_id: String,
}

/// Response of `generate-answer-page`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPageResponse {
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    /// Server-side generation time in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_time: Option<f64>,
}

impl AnswerPageResponse {
    /// `generation_time` as a duration; `None` when absent or not a finite,
    /// non-negative number of milliseconds.
    pub fn generation_duration(&self) -> Option<std::time::Duration> {
        self.generation_time
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .map(|ms| std::time::Duration::from_secs_f64(ms / 1000.0))
    }
}

/// Body of `leads`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmission {
    pub site_id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub cta_type: String,
    pub source: String,
    /// RFC 3339 submission time
    pub timestamp: String,
}

/// Payload of the `wrapper` event: everything before the first section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapperPayload {
    /// `<!DOCTYPE html><html><head>…</head>`
    pub head: String,
    /// The opening `<body …>` tag
    pub body_open: String,
}

/// Payload of `section-start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionStart {
    pub id: SectionId,
}

/// Payload of `section-chunk`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionChunk {
    pub id: SectionId,
    pub chunk: String,
}

/// Payload of `section-complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionComplete {
    pub id: SectionId,
    pub html: String,
}

/// Payload of `section-error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionError {
    pub id: SectionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Payload of `complete`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_status: Option<serde_json::Value>,
}

/// Payload of `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: String,
}

/// Events of the `generate-page-stream` protocol.
///
/// The SSE `event:` line selects the variant, the `data:` line carries the
/// JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum StreamEvent {
    Wrapper(WrapperPayload),
    SectionStart(SectionStart),
    SectionChunk(SectionChunk),
    SectionComplete(SectionComplete),
    SectionError(SectionError),
    Complete(CompletePayload),
    Error(ErrorPayload),
}

impl StreamEvent {
    /// Event names understood by this client.
    pub const NAMES: [&'static str; 7] = [
        "wrapper",
        "section-start",
        "section-chunk",
        "section-complete",
        "section-error",
        "complete",
        "error",
    ];

    pub fn is_known(name: &str) -> bool {
        Self::NAMES.contains(&name)
    }

    /// Decode an event from its SSE name and raw `data:` text.
    ///
    /// An empty data field decodes as `{}` so `complete` may be sent bare.
    pub fn decode(name: &str, data: &str) -> Result<Self, GenerationError> {
        let data = data.trim();
        let payload: serde_json::Value = if data.is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(data)?
        };
        let tagged = serde_json::json!({ "event": name, "data": payload });
        Ok(serde_json::from_value(tagged)?)
    }

    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Wrapper(_) => "wrapper",
            StreamEvent::SectionStart(_) => "section-start",
            StreamEvent::SectionChunk(_) => "section-chunk",
            StreamEvent::SectionComplete(_) => "section-complete",
            StreamEvent::SectionError(_) => "section-error",
            StreamEvent::Complete(_) => "complete",
            StreamEvent::Error(_) => "error",
        }
    }

    /// The section this event belongs to, if any.
    pub fn section(&self) -> Option<SectionId> {
        match self {
            StreamEvent::SectionStart(e) => Some(e.id),
            StreamEvent::SectionChunk(e) => Some(e.id),
            StreamEvent::SectionComplete(e) => Some(e.id),
            StreamEvent::SectionError(e) => Some(e.id),
            _ => None,
        }
    }

    /// Whether the event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete(_) | StreamEvent::Error(_))
    }
}
