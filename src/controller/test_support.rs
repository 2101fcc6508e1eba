//! Scripted backend and fixtures for controller tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use ngw_generation::{
    AnswerPageRequest, AnswerPageResponse, GeneratePageRequest, GenerationError, LeadSubmission,
    SectionStream,
};
use parking_lot::Mutex;

use super::{ControllerConfig, GenerationBackend, NavigationController};
use crate::runtime::HeadlessRuntime;

pub const LANDING: &str = r#"<!DOCTYPE html><html><head><title>Acme</title></head><body class="landing"><main><h1>Welcome to Acme</h1><a data-segment="pricing">Pricing</a></main></body></html>"#;

pub const HEAD: &str =
    "<!DOCTYPE html><html><head><title>Generated</title><style>.hero{color:red}</style></head>";

pub const BODY_OPEN: &str = r#"<body class="bg-white">"#;

/// How the next `generate-page-stream` call behaves.
pub enum MockStream {
    /// The whole body at once
    Body(String),
    /// The whole body after a delay
    Delayed(Duration, String),
    /// Connected, never sends a byte
    Silent,
    /// Rejected with a 503
    Refused,
}

#[derive(Default)]
pub struct MockBackend {
    streams: Mutex<VecDeque<MockStream>>,
    pages: Mutex<VecDeque<Result<String, GenerationError>>>,
    answers: Mutex<VecDeque<Result<AnswerPageResponse, GenerationError>>>,
    requests: Mutex<Vec<GeneratePageRequest>>,
    pub answers_sent: Mutex<Vec<AnswerPageRequest>>,
    pub leads: Mutex<Vec<LeadSubmission>>,
    pub stream_calls: AtomicUsize,
    pub page_calls: AtomicUsize,
    pub answer_calls: AtomicUsize,
    fail_leads: AtomicBool,
    hang_answers: AtomicBool,
}

impl MockBackend {
    pub fn push_stream(&self, stream: MockStream) {
        self.streams.lock().push_back(stream);
    }

    pub fn push_page(&self, page: Result<String, GenerationError>) {
        self.pages.lock().push_back(page);
    }

    pub fn push_answer(&self, answer: Result<AnswerPageResponse, GenerationError>) {
        self.answers.lock().push_back(answer);
    }

    pub fn fail_leads(&self) {
        self.fail_leads.store(true, Ordering::SeqCst);
    }

    pub fn hang_answers(&self) {
        self.hang_answers.store(true, Ordering::SeqCst);
    }

    pub fn last_request(&self) -> Option<GeneratePageRequest> {
        self.requests.lock().last().cloned()
    }
}

fn unscripted(endpoint: &str) -> GenerationError {
    GenerationError::ApiError {
        status: 500,
        message: format!("no scripted {} response", endpoint),
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate_page_stream(
        &self,
        request: &GeneratePageRequest,
    ) -> Result<SectionStream, GenerationError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        let script = self.streams.lock().pop_front();
        match script {
            Some(MockStream::Body(body)) => Ok(SectionStream::from_byte_stream(stream::iter(
                vec![Ok(Bytes::from(body))],
            ))),
            Some(MockStream::Delayed(delay, body)) => {
                Ok(SectionStream::from_byte_stream(stream::once(async move {
                    tokio::time::sleep(delay).await;
                    Ok(Bytes::from(body))
                })))
            }
            Some(MockStream::Silent) => Ok(SectionStream::from_byte_stream(stream::pending::<
                Result<Bytes, GenerationError>,
            >())),
            Some(MockStream::Refused) => Err(GenerationError::ApiError {
                status: 503,
                message: "streaming unavailable".into(),
            }),
            None => Err(unscripted("stream")),
        }
    }

    async fn generate_page(&self, request: &GeneratePageRequest) -> Result<String, GenerationError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        let page = self.pages.lock().pop_front();
        page.unwrap_or_else(|| Err(unscripted("page")))
    }

    async fn generate_answer_page(
        &self,
        request: &AnswerPageRequest,
    ) -> Result<AnswerPageResponse, GenerationError> {
        self.answer_calls.fetch_add(1, Ordering::SeqCst);
        self.answers_sent.lock().push(request.clone());
        if self.hang_answers.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        let answer = self.answers.lock().pop_front();
        answer.unwrap_or_else(|| Err(unscripted("answer")))
    }

    async fn submit_lead(&self, lead: &LeadSubmission) -> Result<(), GenerationError> {
        self.leads.lock().push(lead.clone());
        if self.fail_leads.load(Ordering::SeqCst) {
            return Err(GenerationError::ApiError {
                status: 500,
                message: "lead store down".into(),
            });
        }
        Ok(())
    }
}

pub fn test_config() -> ControllerConfig {
    ControllerConfig::new("site-1", "v1")
}

/// Controller over `backend` and a fresh headless runtime, already initialized.
pub fn setup(
    backend: MockBackend,
) -> (NavigationController, Arc<HeadlessRuntime>, Arc<MockBackend>) {
    let backend = Arc::new(backend);
    let runtime = Arc::new(HeadlessRuntime::new());
    let controller =
        NavigationController::new(test_config(), backend.clone(), runtime.clone(), LANDING);
    controller.init();
    (controller, runtime, backend)
}

/// One SSE frame.
pub fn frame(event: &str, data: serde_json::Value) -> String {
    format!("event: {}\ndata: {}\n\n", event, data)
}

fn section(id: &str, name: &str) -> String {
    format!(r#"<div id="{id}">{name} {id}</div>"#)
}

fn wrapper_frame() -> String {
    frame(
        "wrapper",
        serde_json::json!({ "head": HEAD, "bodyOpen": BODY_OPEN }),
    )
}

fn complete_frames(id: &str, name: &str) -> String {
    let html = section(id, name);
    let (first, rest) = html.split_at(html.len() / 2);
    frame("section-start", serde_json::json!({ "id": id }))
        + &frame("section-chunk", serde_json::json!({ "id": id, "chunk": first }))
        + &frame("section-chunk", serde_json::json!({ "id": id, "chunk": rest }))
        + &frame("section-complete", serde_json::json!({ "id": id, "html": html }))
}

/// A stream whose three sections all complete.
pub fn well_formed_stream(name: &str) -> String {
    wrapper_frame()
        + &complete_frames("header", name)
        + &complete_frames("content", name)
        + &complete_frames("footer", name)
        + &frame("complete", serde_json::json!({ "validationStatus": { "valid": true } }))
}

/// A stream whose content section fails.
pub fn stream_with_content_error(name: &str) -> String {
    wrapper_frame()
        + &complete_frames("header", name)
        + &frame("section-start", serde_json::json!({ "id": "content" }))
        + &frame(
            "section-error",
            serde_json::json!({ "id": "content", "message": "generation refused" }),
        )
        + &complete_frames("footer", name)
        + &frame("complete", serde_json::json!({}))
}

/// The document a well-formed stream assembles to.
pub fn expected_document(name: &str) -> String {
    format!(
        "{HEAD}{BODY_OPEN}{}{}{}</body></html>",
        section("header", name),
        section("content", name),
        section("footer", name)
    )
}
