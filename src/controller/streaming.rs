//! Progressive rendering of `generate-page-stream` responses.

use std::collections::BTreeMap;

use futures::StreamExt;
use ngw_generation::{GeneratePageRequest, GenerationError, SectionId, StreamEvent, WrapperPayload};

use super::NavigationController;
use crate::dom::{section_placeholder, SectionStatus};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
enum SectionOutcome {
    Complete(String),
    Failed,
}

/// Collects stream events into the final document.
///
/// The assembled page is `head + bodyOpen + header + content + footer +
/// "</body></html>"`. A section that failed or never finished contributes
/// the failure placeholder.
#[derive(Debug, Default)]
pub struct SectionAssembler {
    wrapper: Option<WrapperPayload>,
    /// Chunks of sections still in progress
    partial: BTreeMap<SectionId, String>,
    finished: BTreeMap<SectionId, SectionOutcome>,
}

impl SectionAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one non-terminal event into the page.
    pub fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Wrapper(wrapper) => self.wrapper = Some(wrapper.clone()),
            StreamEvent::SectionStart(start) => {
                self.partial.entry(start.id).or_default();
            }
            StreamEvent::SectionChunk(chunk) => {
                self.partial.entry(chunk.id).or_default().push_str(&chunk.chunk);
            }
            StreamEvent::SectionComplete(done) => {
                self.partial.remove(&done.id);
                self.finished
                    .insert(done.id, SectionOutcome::Complete(done.html.clone()));
            }
            StreamEvent::SectionError(failed) => {
                self.partial.remove(&failed.id);
                self.finished.insert(failed.id, SectionOutcome::Failed);
            }
            StreamEvent::Complete(_) | StreamEvent::Error(_) => {}
        }
    }

    pub fn has_wrapper(&self) -> bool {
        self.wrapper.is_some()
    }

    /// Chunks received so far for a section that has not completed.
    pub fn partial(&self, id: SectionId) -> Option<&str> {
        self.partial.get(&id).map(String::as_str)
    }

    /// Sections that will render as the failure placeholder.
    pub fn failed_sections(&self) -> Vec<SectionId> {
        SectionId::ALL
            .into_iter()
            .filter(|id| !matches!(self.finished.get(id), Some(SectionOutcome::Complete(_))))
            .collect()
    }

    pub fn assemble(&self) -> String {
        let mut html = String::new();
        if let Some(wrapper) = &self.wrapper {
            html.push_str(&wrapper.head);
            html.push_str(&wrapper.body_open);
        }
        for id in SectionId::ALL {
            match self.finished.get(&id) {
                Some(SectionOutcome::Complete(section)) => html.push_str(section),
                _ => html.push_str(&section_placeholder(id)),
            }
        }
        html.push_str("</body></html>");
        html
    }
}

impl NavigationController {
    /// Consume one stream, revealing sections as they finish.
    ///
    /// Returns the assembled document on `complete`. An `error` event, a
    /// transport failure or an early end of stream is an error; the caller
    /// decides whether to fall back.
    pub(super) async fn stream_page(
        &self,
        request: &GeneratePageRequest,
        generation: u64,
    ) -> Result<String> {
        let mut stream = self.backend.generate_page_stream(request).await?;
        let mut assembler = SectionAssembler::new();

        while let Some(event) = stream.next().await {
            let event = event?;
            tracing::trace!(event = event.name(), "stream event");
            assembler.apply(&event);

            match event {
                StreamEvent::Wrapper(wrapper) => {
                    self.with_live_document(generation, |doc| {
                        doc.merge_head(&wrapper.head).map(|_| ())
                    });
                }
                StreamEvent::SectionStart(start) => {
                    self.with_live_document(generation, |doc| {
                        doc.set_progress(start.id, SectionStatus::Loading)
                    });
                }
                StreamEvent::SectionChunk(_) => {}
                StreamEvent::SectionComplete(done) => {
                    self.with_live_document(generation, |doc| {
                        doc.reveal_section(done.id, &done.html)?;
                        doc.set_progress(done.id, SectionStatus::Done)
                    });
                }
                StreamEvent::SectionError(failed) => {
                    tracing::warn!(
                        section = %failed.id,
                        "Section failed to generate: {}",
                        failed.message.as_deref().unwrap_or("no message")
                    );
                    self.with_live_document(generation, |doc| {
                        doc.reveal_section_error(failed.id)?;
                        doc.set_progress(failed.id, SectionStatus::Error)
                    });
                }
                StreamEvent::Complete(complete) => {
                    if let Some(status) = &complete.validation_status {
                        tracing::debug!(%status, "backend validation status");
                    }
                    if !assembler.has_wrapper() {
                        tracing::warn!("stream completed without a wrapper event");
                    }
                    self.with_live_document(generation, |doc| doc.hide_progress());
                    return Ok(assembler.assemble());
                }
                StreamEvent::Error(error) => {
                    return Err(GenerationError::Remote(error.message).into());
                }
            }
        }
        Err(GenerationError::Incomplete.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::SECTION_ERROR_TEXT;
    use ngw_generation::{SectionChunk, SectionComplete, SectionError, SectionStart};

    fn wrapper() -> StreamEvent {
        StreamEvent::Wrapper(WrapperPayload {
            head: "<!DOCTYPE html><html><head><title>T</title></head>".into(),
            body_open: r#"<body class="bg-white">"#.into(),
        })
    }

    fn complete(id: SectionId, html: &str) -> StreamEvent {
        StreamEvent::SectionComplete(SectionComplete {
            id,
            html: html.into(),
        })
    }

    #[test]
    fn test_assembles_in_document_order() {
        let mut assembler = SectionAssembler::new();
        assembler.apply(&wrapper());
        assembler.apply(&complete(SectionId::Footer, "<footer>F</footer>"));
        assembler.apply(&complete(SectionId::Header, "<header>H</header>"));
        assembler.apply(&complete(SectionId::Content, "<main>C</main>"));
        assert_eq!(
            assembler.assemble(),
            concat!(
                "<!DOCTYPE html><html><head><title>T</title></head>",
                r#"<body class="bg-white">"#,
                "<header>H</header><main>C</main><footer>F</footer>",
                "</body></html>"
            )
        );
        assert!(assembler.failed_sections().is_empty());
    }

    #[test]
    fn test_failed_and_missing_sections_get_placeholders() {
        let mut assembler = SectionAssembler::new();
        assembler.apply(&wrapper());
        assembler.apply(&complete(SectionId::Header, "<header>H</header>"));
        assembler.apply(&StreamEvent::SectionError(SectionError {
            id: SectionId::Content,
            message: Some("model refused".into()),
        }));
        let html = assembler.assemble();
        assert!(html.contains("<header>H</header>"));
        assert_eq!(html.matches(SECTION_ERROR_TEXT).count(), 2);
        assert_eq!(
            assembler.failed_sections(),
            vec![SectionId::Content, SectionId::Footer]
        );
    }

    #[test]
    fn test_chunks_are_buffered_until_complete() {
        let mut assembler = SectionAssembler::new();
        assembler.apply(&StreamEvent::SectionStart(SectionStart {
            id: SectionId::Content,
        }));
        for chunk in ["<main>", "Hel", "lo"] {
            assembler.apply(&StreamEvent::SectionChunk(SectionChunk {
                id: SectionId::Content,
                chunk: chunk.into(),
            }));
        }
        assert_eq!(assembler.partial(SectionId::Content), Some("<main>Hello"));
        assert!(!assembler.assemble().contains("Hello"));

        assembler.apply(&complete(SectionId::Content, "<main>Hello</main>"));
        assert_eq!(assembler.partial(SectionId::Content), None);
        assert!(assembler.assemble().contains("<main>Hello</main>"));
    }

    #[test]
    fn test_late_section_error_overrides_completion() {
        let mut assembler = SectionAssembler::new();
        assembler.apply(&complete(SectionId::Footer, "<footer>F</footer>"));
        assembler.apply(&StreamEvent::SectionError(SectionError {
            id: SectionId::Footer,
            message: None,
        }));
        assert!(!assembler.assemble().contains("<footer>F</footer>"));
    }
}
