use serde::{Deserialize, Serialize};

/// Custom events exchanged with sibling scripts on `window`.
///
/// The chat widget and the controller coordinate only through these; neither
/// holds a reference to the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum WindowEvent {
    /// An answer page is on screen
    #[serde(rename = "ngw-answer-ready")]
    AnswerReady {
        #[serde(rename = "questionSlug")]
        question_slug: String,
        cached: bool,
    },

    /// The answer page could not be produced
    #[serde(rename = "ngw-answer-error")]
    AnswerError {
        #[serde(rename = "questionSlug")]
        question_slug: String,
        message: String,
    },

    /// The document body was swapped for a new page
    #[serde(rename = "ngw-content-replaced")]
    ContentReplaced { page: String },
}

impl WindowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WindowEvent::AnswerReady { .. } => "ngw-answer-ready",
            WindowEvent::AnswerError { .. } => "ngw-answer-error",
            WindowEvent::ContentReplaced { .. } => "ngw-content-replaced",
        }
    }
}

/// Detail of the `ngw-generate-answer` event sent by the chat widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAnswerRequest {
    pub question: String,
    pub question_slug: String,
    pub question_title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_generated_html: Option<String>,
}
