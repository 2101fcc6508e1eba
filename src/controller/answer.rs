//! `ngw-generate-answer` handling.

use ngw_generation::AnswerPageRequest;

use super::{FlagGuard, Flag, HistoryMode, NavOutcome, NavigationController, ShownPage, TIMEOUT_MESSAGE};
use crate::cache::PageKey;
use crate::dom::validate_generated_html;
use crate::error::NavError;
use crate::events::{GenerateAnswerRequest, WindowEvent};

impl NavigationController {
    /// Show the answer page for a question.
    ///
    /// The outcome is also reported to the page through `ngw-answer-ready`
    /// or `ngw-answer-error`. A failed answer leaves the current page alone.
    pub async fn handle_generate_answer(&self, request: GenerateAnswerRequest) -> NavOutcome {
        let slug = request.question_slug.trim().to_string();
        if slug.is_empty() {
            self.answer_error(&slug, "Missing question slug");
            return NavOutcome::Dropped;
        }
        let title = if request.question_title.trim().is_empty() {
            request.question.clone()
        } else {
            request.question_title.clone()
        };

        let (page, generation) = {
            let mut st = self.state.lock();
            let page = ShownPage::answer(&self.config, &slug, st.stack.answer(&slug, &title));

            if let Some(html) = request.pre_generated_html.clone() {
                tracing::debug!(slug = %slug, "showing pre-generated answer");
                st.next_generation();
                st.stack = page.stack.clone();
                st.cache.insert(page.key.clone(), html.clone());
                self.show_page(&mut st, &page, &html, HistoryMode::Push);
                self.answer_ready(&slug, true);
                return NavOutcome::Generated;
            }
            if st.is_busy() {
                drop(st);
                self.answer_error(&slug, "Another page is still being generated");
                return NavOutcome::Dropped;
            }
            let generation = st.next_generation();
            st.stack = page.stack.clone();
            if let Some(html) = st.cache.get(&page.key).map(str::to_string) {
                self.show_page(&mut st, &page, &html, HistoryMode::Push);
                drop(st);
                self.answer_ready(&slug, true);
                return NavOutcome::CacheHit;
            }
            st.set_flag(Flag::Loading, true);
            (page, generation)
        };

        let body = AnswerPageRequest {
            project_id: self.config.project_id.clone(),
            question: request.question,
            question_slug: slug.clone(),
            question_title: title,
            content: request.content,
            session_id: self.session_id.as_str().to_string(),
        };
        tracing::info!(slug = %slug, "generating answer page");

        let limit = self.config.generation_timeout;
        let result = {
            let _loading = FlagGuard::adopt(&self.state, Flag::Loading);
            tokio::time::timeout(limit, self.backend.generate_answer_page(&body)).await
        };

        match result {
            Ok(Ok(response)) => {
                let cached = response.cached.unwrap_or(false);
                if let Some(took) = response.generation_duration() {
                    let generation_ms = took.as_millis() as u64;
                    tracing::debug!(slug = %slug, generation_ms, cached, "answer generated");
                }
                validate_generated_html(&response.html);
                let mut st = self.state.lock();
                st.cache.insert(PageKey::Answer(slug.clone()), response.html.clone());
                if st.nav_generation != generation {
                    tracing::info!(slug = %slug, "visitor moved on; answer cached only");
                    return NavOutcome::Stale;
                }
                self.show_page(&mut st, &page, &response.html, HistoryMode::Push);
                drop(st);
                self.answer_ready(&slug, cached);
                NavOutcome::Generated
            }
            Ok(Err(e)) => {
                let e = NavError::from(e);
                tracing::error!(slug = %slug, "Answer generation failed: {}", e);
                self.answer_error(&slug, &e.to_string());
                NavOutcome::Failed { timed_out: false }
            }
            Err(_) => {
                tracing::error!(slug = %slug, "Answer generation timed out after {}s", limit.as_secs());
                self.answer_error(&slug, TIMEOUT_MESSAGE);
                NavOutcome::Failed { timed_out: true }
            }
        }
    }

    fn answer_ready(&self, slug: &str, cached: bool) {
        self.emit(WindowEvent::AnswerReady {
            question_slug: slug.to_string(),
            cached,
        });
    }

    fn answer_error(&self, slug: &str, message: &str) {
        self.emit(WindowEvent::AnswerError {
            question_slug: slug.to_string(),
            message: message.to_string(),
        });
    }
}
