//! The navigation controller.
//!
//! Owns the live document, the page cache, the navigation stack, the
//! behavior tracker and the lead modal. Entry points are `async fn(&self)`
//! and never return errors to the host: every failure ends in a visible
//! state (the error page, or an `ngw-answer-error` event).
//!
//! At most one generation runs at a time. `is_loading` covers single-shot
//! requests and `streaming_in_progress` covers streams; both are raised in
//! the same critical section that checks them and are cleared by guards, so
//! no outcome (timeouts included) can leave them set. Leaving a page while a
//! generation runs bumps the navigation generation: the late result is
//! cached but not displayed.

mod answer;
mod backend;
mod state;
mod streaming;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;
use std::time::Duration;

use ngw_generation::{BehaviorSignals, GeneratePageRequest, PageType};
use parking_lot::Mutex;

use crate::cache::{PageCache, PageKey};
use crate::dispatch::{dispatch, ClickTarget, DispatchContext, NavAction};
use crate::dom::{validate_generated_html, Document, RequiredAssets};
use crate::error::{NavError, Result};
use crate::events::WindowEvent;
use crate::history::HistoryState;
use crate::leads::{FormKind, LeadForm, LeadFormError, LeadModal};
use crate::nav_stack::NavigationStack;
use crate::runtime::BrowserRuntime;
use crate::session::{landing_html_key, SessionId};
use crate::settings::NavigatorSettings;
use crate::tracker::BehaviorTracker;

pub use backend::GenerationBackend;
pub use state::{Transition, ViewState};
pub use streaming::SectionAssembler;

/// Shown when a generation hits the time limit.
pub const TIMEOUT_MESSAGE: &str = "Page generation timed out. Please try again in a moment.";

/// Shown when generation failed for any other reason.
pub const GENERIC_ERROR_MESSAGE: &str =
    "We couldn't generate this page. Please return to the home page and try again.";

/// Resolved configuration for one controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub site_id: String,
    pub version_id: String,
    pub project_id: String,
    pub generation_timeout: Duration,
    pub prefer_streaming: bool,
    pub inject_nav_bar: bool,
    pub tracking_enabled: bool,
    pub lead_source: String,
    pub assets: RequiredAssets,
}

impl ControllerConfig {
    /// Default behavior for a site.
    pub fn new(site_id: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self::from_settings(&NavigatorSettings::default(), site_id, version_id)
    }

    pub fn from_settings(
        settings: &NavigatorSettings,
        site_id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        let site_id = site_id.into();
        let project_id = settings
            .site
            .project_id
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| site_id.clone());
        Self {
            site_id,
            version_id: version_id.into(),
            project_id,
            generation_timeout: Duration::from_secs(settings.navigation.generation_timeout_secs),
            prefer_streaming: settings.navigation.prefer_streaming,
            inject_nav_bar: settings.navigation.inject_nav_bar,
            tracking_enabled: settings.tracking.enabled,
            lead_source: settings.leads.source.clone(),
            assets: RequiredAssets {
                framework_script: settings.assets.framework_script.clone(),
                icon_stylesheet: settings.assets.icon_stylesheet.clone(),
            },
        }
    }
}

/// How a navigation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// Another generation was in flight; nothing happened
    Dropped,
    /// The landing page is on screen
    Landing,
    /// Served from the page cache
    CacheHit,
    /// Generated and displayed
    Generated,
    /// Generated and cached, but the visitor had moved on
    Stale,
    /// The error page is on screen
    Failed { timed_out: bool },
}

/// How a displayed page is recorded in session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    Push,
    Replace,
    /// Already current (popstate)
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    Loading,
    Streaming,
}

/// Everything behind the controller's lock.
#[derive(Debug)]
struct ControllerState {
    document: Document,
    /// Pristine landing markup, used when tab storage has none
    landing_html: String,
    cache: PageCache,
    stack: NavigationStack,
    view: ViewState,
    tracker: BehaviorTracker,
    is_loading: bool,
    streaming_in_progress: bool,
    nav_generation: u64,
    lead_modal: LeadModal,
}

impl ControllerState {
    fn is_busy(&self) -> bool {
        self.is_loading || self.streaming_in_progress
    }

    fn set_flag(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::Loading => self.is_loading = value,
            Flag::Streaming => self.streaming_in_progress = value,
        }
    }

    /// Invalidate whatever is in flight and return the new generation.
    fn next_generation(&mut self) -> u64 {
        self.nav_generation += 1;
        self.nav_generation
    }
}

/// Clears a loading flag when dropped.
///
/// Must not be dropped while the controller lock is held.
struct FlagGuard<'a> {
    state: &'a Mutex<ControllerState>,
    flag: Flag,
}

impl<'a> FlagGuard<'a> {
    /// Take over a flag raised inside an earlier critical section.
    fn adopt(state: &'a Mutex<ControllerState>, flag: Flag) -> Self {
        Self { state, flag }
    }

    fn raise(state: &'a Mutex<ControllerState>, flag: Flag) -> Self {
        state.lock().set_flag(flag, true);
        Self::adopt(state, flag)
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().set_flag(self.flag, false);
    }
}

/// A page about to be displayed, with its bookkeeping.
#[derive(Debug, Clone)]
struct ShownPage {
    key: PageKey,
    stack: NavigationStack,
    history: HistoryState,
    transition: Transition,
}

impl ShownPage {
    fn for_stack(config: &ControllerConfig, stack: NavigationStack) -> Option<Self> {
        let key = stack.page_key()?;
        Some(Self {
            history: HistoryState::for_stack(&config.site_id, &config.version_id, &stack),
            transition: Transition::for_stack(&stack),
            key,
            stack,
        })
    }

    fn answer(config: &ControllerConfig, slug: &str, stack: NavigationStack) -> Self {
        Self {
            key: PageKey::Answer(slug.to_string()),
            history: HistoryState::answer(&config.site_id, &config.version_id, slug, &stack),
            transition: Transition::ShowAnswer {
                slug: slug.to_string(),
            },
            stack,
        }
    }
}

pub struct NavigationController {
    config: ControllerConfig,
    backend: Arc<dyn GenerationBackend>,
    runtime: Arc<dyn BrowserRuntime>,
    session_id: SessionId,
    state: Mutex<ControllerState>,
}

impl NavigationController {
    /// Create a controller for the page currently showing `landing_html`.
    ///
    /// Loads or creates the tab's session id. Call [`init`](Self::init)
    /// before dispatching any event.
    pub fn new(
        config: ControllerConfig,
        backend: Arc<dyn GenerationBackend>,
        runtime: Arc<dyn BrowserRuntime>,
        landing_html: impl Into<String>,
    ) -> Self {
        let landing_html = landing_html.into();
        let session_id = SessionId::load_or_create(runtime.as_ref());
        Self {
            config,
            backend,
            runtime,
            session_id,
            state: Mutex::new(ControllerState {
                document: Document::new(landing_html.clone()),
                landing_html,
                cache: PageCache::new(),
                stack: NavigationStack::empty(),
                view: ViewState::Landing,
                tracker: BehaviorTracker::new(),
                is_loading: false,
                streaming_in_progress: false,
                nav_generation: 0,
                lead_modal: LeadModal::default(),
            }),
        }
    }

    /// Capture the pristine landing page and anchor history on it.
    pub fn init(&self) {
        let key = landing_html_key(&self.config.site_id, &self.config.version_id);
        let mut st = self.state.lock();
        match self.runtime.session_get(&key) {
            Some(stored) => {
                tracing::debug!("landing page already captured for this tab");
                st.landing_html = stored;
            }
            None => {
                if let Err(e) = self.runtime.session_set(&key, &st.landing_html) {
                    tracing::warn!("Failed to store landing page: {}", e);
                }
            }
        }
        st.tracker.record_page_visit("landing");
        let landing = HistoryState::landing(&self.config.site_id, &self.config.version_id);
        if let Err(e) = self.runtime.replace_state(&landing, &landing.url()) {
            tracing::warn!("Failed to write landing history state: {}", e);
        }
        tracing::info!(
            site_id = %self.config.site_id,
            version_id = %self.config.version_id,
            session_id = %self.session_id,
            "navigation controller ready"
        );
    }

    /// Show the root page of a segment.
    pub async fn navigate_to_segment(&self, slug: &str) -> NavOutcome {
        let slug = slug.trim();
        if slug.is_empty() {
            tracing::debug!("ignoring navigation to an empty segment");
            return NavOutcome::Dropped;
        }
        self.open_page(NavigationStack::segment(slug, None), HistoryMode::Push)
            .await
    }

    /// Show a topic page. The stack becomes exactly `[parent, topic]`.
    pub async fn navigate_to_topic(&self, parent: &str, topic: &str) -> NavOutcome {
        let (parent, topic) = (parent.trim(), topic.trim());
        if parent.is_empty() || topic.is_empty() {
            tracing::debug!("ignoring navigation to an incomplete topic");
            return NavOutcome::Dropped;
        }
        let stack = self.state.lock().stack.topic(parent, topic, None);
        self.open_page(stack, HistoryMode::Push).await
    }

    /// Restore the landing page exactly as it was first loaded.
    ///
    /// Allowed while a generation runs; its result will only be cached.
    pub async fn navigate_to_landing(&self) -> NavOutcome {
        self.show_landing(HistoryMode::Replace);
        NavOutcome::Landing
    }

    /// Open the lead form matching a CTA.
    pub fn handle_cta_action(&self, cta_type: &str, label: &str) -> FormKind {
        let kind = self.state.lock().lead_modal.open(cta_type, label);
        tracing::info!(cta_type, form = kind.as_str(), "lead form opened");
        kind
    }

    /// Submit the open lead form.
    ///
    /// Validation problems are returned and keep the form open. Once the
    /// form is valid the modal always ends in `Success`; delivery failures
    /// are only logged.
    pub async fn submit_lead(&self, form: &LeadForm) -> std::result::Result<(), LeadFormError> {
        let submission = self.state.lock().lead_modal.begin_submit(
            form,
            &self.config.site_id,
            &self.config.lead_source,
            chrono::Utc::now(),
        )?;
        if let Err(e) = self.backend.submit_lead(&submission).await {
            tracing::error!(cta_type = %submission.cta_type, "Lead submission failed: {}", e);
        }
        self.state.lock().lead_modal.finish();
        Ok(())
    }

    pub fn close_lead_modal(&self) {
        self.state.lock().lead_modal.close();
    }

    /// Back/forward navigation.
    pub async fn handle_pop_state(&self, state: Option<HistoryState>) -> NavOutcome {
        let Some(state) = state else {
            self.show_landing(HistoryMode::Keep);
            return NavOutcome::Landing;
        };
        if state.is_landing() {
            self.show_landing(HistoryMode::Keep);
            return NavOutcome::Landing;
        }

        let stack = state.resolved_stack();
        let page = if state.is_answer() {
            let slug = state.page.strip_prefix("answer/").unwrap_or(&state.page);
            Some(ShownPage::answer(&self.config, slug, stack.clone()))
        } else {
            ShownPage::for_stack(&self.config, stack.clone())
        };
        let Some(page) = page else {
            self.show_landing(HistoryMode::Keep);
            return NavOutcome::Landing;
        };

        {
            let mut st = self.state.lock();
            if let Some(html) = st.cache.get(&page.key).map(str::to_string) {
                tracing::debug!(key = %page.key, "popstate served from cache");
                st.next_generation();
                st.stack = page.stack.clone();
                self.show_page(&mut st, &page, &html, HistoryMode::Keep);
                return NavOutcome::CacheHit;
            }
            if st.is_busy() {
                tracing::warn!(key = %page.key, "popstate during generation; ignoring");
                return NavOutcome::Dropped;
            }
        }

        if state.is_answer() {
            tracing::warn!(key = %page.key, "answer page not cached; returning to landing");
            self.show_landing(HistoryMode::Replace);
            return NavOutcome::Landing;
        }
        self.open_page(stack, HistoryMode::Replace).await
    }

    /// Route a click through the dispatch rules.
    ///
    /// Returns the action taken, or `None` for inert clicks.
    pub async fn handle_click(&self, target: &ClickTarget) -> Option<NavAction> {
        let (rule, action) = {
            let mut st = self.state.lock();
            let resolved = {
                let ctx = DispatchContext {
                    current_segment: st.stack.root().map(|e| e.slug.as_str()),
                };
                dispatch(target, &ctx)
            };
            let (rule, action) = resolved?;
            st.tracker.record_click(&action.click_id());
            (rule, action)
        };
        tracing::debug!(rule, action = %action, "click dispatched");

        match action.clone().into_canonical() {
            NavAction::Segment { slug } => {
                self.navigate_to_segment(&slug).await;
            }
            NavAction::Topic { parent, topic }
            | NavAction::LegacyItem {
                parent,
                item: topic,
                ..
            } => {
                self.navigate_to_topic(&parent, &topic).await;
            }
            NavAction::BackToLanding => {
                self.navigate_to_landing().await;
            }
            NavAction::Cta { cta_type, label } => {
                self.handle_cta_action(&cta_type, &label);
            }
        }
        Some(action)
    }

    // Tracker plumbing for the host's observers.

    pub fn on_scroll(&self, fraction: f64) -> bool {
        let mut st = self.state.lock();
        let page = st.view.page();
        st.tracker.on_scroll(&page, fraction)
    }

    pub fn on_animation_frame(&self) {
        self.state.lock().tracker.on_animation_frame();
    }

    pub fn section_visible(&self, section: &str) {
        self.state.lock().tracker.start_section(section);
    }

    pub fn section_hidden(&self, section: &str) {
        self.state.lock().tracker.stop_section(section);
    }

    // Read-only views.

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn document_html(&self) -> String {
        self.state.lock().document.outer_html().to_string()
    }

    pub fn navigation_stack(&self) -> NavigationStack {
        self.state.lock().stack.clone()
    }

    pub fn view(&self) -> ViewState {
        self.state.lock().view.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading
    }

    pub fn is_streaming(&self) -> bool {
        self.state.lock().streaming_in_progress
    }

    pub fn cached_page(&self, key: &PageKey) -> Option<String> {
        self.state.lock().cache.get(key).map(str::to_string)
    }

    pub fn cache_len(&self) -> usize {
        self.state.lock().cache.len()
    }

    pub fn lead_modal(&self) -> LeadModal {
        self.state.lock().lead_modal.clone()
    }

    pub fn behavior_signals(&self) -> BehaviorSignals {
        self.state.lock().tracker.snapshot()
    }

    /// Cache lookup, then generation, for the page `stack` points at.
    async fn open_page(&self, stack: NavigationStack, mode: HistoryMode) -> NavOutcome {
        let Some(page) = ShownPage::for_stack(&self.config, stack) else {
            self.show_landing(HistoryMode::Replace);
            return NavOutcome::Landing;
        };

        let (generation, request, flag) = {
            let mut st = self.state.lock();
            if st.is_busy() {
                tracing::debug!(key = %page.key, "generation in flight; dropping navigation");
                return NavOutcome::Dropped;
            }
            let generation = st.next_generation();
            st.stack = page.stack.clone();

            if let Some(html) = st.cache.get(&page.key).map(str::to_string) {
                tracing::debug!(key = %page.key, "cache hit");
                self.show_page(&mut st, &page, &html, mode);
                return NavOutcome::CacheHit;
            }

            let flag = if self.config.prefer_streaming {
                Flag::Streaming
            } else {
                Flag::Loading
            };
            st.set_flag(flag, true);
            if flag == Flag::Streaming {
                if let Err(e) = st.document.show_skeleton(&self.config.assets) {
                    tracing::warn!("Failed to show skeleton: {}", e);
                }
            }
            (generation, self.page_request(&st, &page), flag)
        };

        tracing::info!(key = %page.key, streaming = flag == Flag::Streaming, "generating page");
        let result = self.run_generation(&request, generation, flag).await;
        self.finish_generation(&page, result, generation, mode)
    }

    /// Run one generation under `flag`, falling back from the stream to
    /// the single-shot endpoint once.
    async fn run_generation(
        &self,
        request: &GeneratePageRequest,
        generation: u64,
        flag: Flag,
    ) -> Result<String> {
        let primary = FlagGuard::adopt(&self.state, flag);
        if flag == Flag::Loading {
            return self.fetch_page(request).await;
        }

        let limit = self.config.generation_timeout;
        match tokio::time::timeout(limit, self.stream_page(request, generation)).await {
            Ok(Ok(html)) => Ok(html),
            Err(_) => Err(NavError::Timeout(limit.as_secs())),
            Ok(Err(e)) => {
                tracing::warn!("Streaming generation failed ({}); retrying without streaming", e);
                let _fallback = FlagGuard::raise(&self.state, Flag::Loading);
                drop(primary);
                self.with_live_document(generation, |doc| doc.hide_progress());
                self.fetch_page(request).await
            }
        }
    }

    /// Single-shot `generate-page` under the time limit.
    async fn fetch_page(&self, request: &GeneratePageRequest) -> Result<String> {
        let limit = self.config.generation_timeout;
        match tokio::time::timeout(limit, self.backend.generate_page(request)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(NavError::Timeout(limit.as_secs())),
        }
    }

    fn finish_generation(
        &self,
        page: &ShownPage,
        result: Result<String>,
        generation: u64,
        mode: HistoryMode,
    ) -> NavOutcome {
        let mut st = self.state.lock();
        match result {
            Ok(html) => {
                validate_generated_html(&html);
                st.cache.insert(page.key.clone(), html.clone());
                if st.nav_generation != generation {
                    tracing::info!(key = %page.key, "visitor moved on; page cached only");
                    return NavOutcome::Stale;
                }
                self.show_page(&mut st, page, &html, mode);
                NavOutcome::Generated
            }
            Err(e) => {
                let timed_out = e.is_timeout();
                tracing::error!(key = %page.key, "Page generation failed: {}", e);
                if st.nav_generation != generation {
                    return NavOutcome::Stale;
                }
                self.show_error(&mut st, timed_out);
                NavOutcome::Failed { timed_out }
            }
        }
    }

    fn page_request(&self, st: &ControllerState, page: &ShownPage) -> GeneratePageRequest {
        let entries = page.stack.entries();
        let (page_type, segment, topic) = match entries {
            [segment] => (PageType::Segment, segment.slug.as_str(), None),
            [segment, leaf, ..] => (PageType::Detail, segment.slug.as_str(), Some(leaf.slug.as_str())),
            [] => (PageType::Segment, "", None),
        };
        let mut request = GeneratePageRequest::new(
            &self.config.site_id,
            &self.config.version_id,
            page_type,
            segment,
            self.session_id.as_str(),
        )
        .with_context(serde_json::json!({
            "navigationStack": page.stack,
            "previousPage": st.view.page(),
        }));
        if let Some(topic) = topic {
            request = request.with_topic(topic);
        }
        if self.config.tracking_enabled {
            request = request.with_behavior_signals(st.tracker.snapshot());
        }
        request
    }

    /// Display a finished page and record it.
    fn show_page(&self, st: &mut ControllerState, page: &ShownPage, html: &str, mode: HistoryMode) {
        let replaced = st.document.replace_content(
            html,
            !self.config.inject_nav_bar,
            &page.stack,
            &self.config.assets,
        );
        if let Err(e) = replaced {
            tracing::error!(key = %page.key, "Failed to display page: {}", e);
            self.show_error(st, false);
            return;
        }

        st.view = st.view.apply(page.transition.clone());
        st.tracker.stop_all_sections();
        st.tracker.record_page_visit(&page.key.to_string());

        let written = match mode {
            HistoryMode::Push => self.runtime.push_state(&page.history, &page.history.url()),
            HistoryMode::Replace => self.runtime.replace_state(&page.history, &page.history.url()),
            HistoryMode::Keep => Ok(()),
        };
        if let Err(e) = written {
            tracing::warn!("Failed to update history: {}", e);
        }
        self.emit(WindowEvent::ContentReplaced {
            page: st.view.page(),
        });
        tracing::info!(page = %st.view, "page displayed");
    }

    fn show_landing(&self, mode: HistoryMode) {
        let key = landing_html_key(&self.config.site_id, &self.config.version_id);
        let mut st = self.state.lock();
        st.next_generation();
        st.stack = NavigationStack::empty();
        let html = self
            .runtime
            .session_get(&key)
            .unwrap_or_else(|| st.landing_html.clone());
        st.document.set_html(html);
        st.view = st.view.apply(Transition::ShowLanding);
        st.tracker.stop_all_sections();
        st.tracker.record_page_visit("landing");

        if mode != HistoryMode::Keep {
            let landing = HistoryState::landing(&self.config.site_id, &self.config.version_id);
            if let Err(e) = self.runtime.replace_state(&landing, &landing.url()) {
                tracing::warn!("Failed to write landing history state: {}", e);
            }
        }
        self.emit(WindowEvent::ContentReplaced {
            page: st.view.page(),
        });
    }

    fn show_error(&self, st: &mut ControllerState, timed_out: bool) {
        let message = if timed_out {
            TIMEOUT_MESSAGE
        } else {
            GENERIC_ERROR_MESSAGE
        };
        if let Err(e) = st.document.render_error_page(message, &self.config.assets) {
            tracing::error!("Failed to render error page: {}", e);
            st.document.set_html(format!(
                "<!DOCTYPE html><html><head></head><body>{}</body></html>",
                crate::dom::error_page(message)
            ));
        }
        st.view = st.view.apply(Transition::Fail { timed_out });
    }

    /// Apply a progressive update if the page being generated is still wanted.
    fn with_live_document(&self, generation: u64, update: impl FnOnce(&mut Document) -> Result<()>) {
        let mut st = self.state.lock();
        if st.nav_generation != generation {
            return;
        }
        if let Err(e) = update(&mut st.document) {
            tracing::warn!("Failed to update document: {}", e);
        }
    }

    fn emit(&self, event: WindowEvent) {
        let name = event.name();
        if let Err(e) = self.runtime.emit(event) {
            tracing::warn!(event = name, "Failed to emit window event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::dispatch::ClickedElement;
    use crate::dom::SECTION_ERROR_TEXT;
    use crate::nav_stack::EntryType;
    use crate::runtime::HeadlessRuntime;
    use ngw_generation::GenerationError;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_init_captures_landing_and_anchors_history() {
        let (controller, runtime, _) = setup(MockBackend::default());
        let key = landing_html_key("site-1", "v1");
        assert_eq!(runtime.session_get(&key).as_deref(), Some(LANDING));
        let entry = runtime.current_entry();
        assert_eq!(entry.url, "/");
        assert!(entry.state.unwrap().is_landing());
        assert_eq!(controller.behavior_signals().pages_visited, vec!["landing"]);
    }

    #[tokio::test]
    async fn test_stream_is_assembled_cached_and_displayed() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Body(well_formed_stream("Pricing")));
        let (controller, runtime, backend) = setup(backend);

        let outcome = controller.navigate_to_segment("pricing").await;
        assert_eq!(outcome, NavOutcome::Generated);

        let cached = controller
            .cached_page(&PageKey::Segment("pricing".into()))
            .unwrap();
        assert_eq!(cached, expected_document("Pricing"));

        let html = controller.document_html();
        assert!(html.contains("<nav data-ngw-nav"));
        assert!(html.contains(r#"<div id="content">Pricing content</div>"#));
        assert!(!html.contains("data-skeleton"));
        assert!(!html.contains("ngw-progress"));
        assert_eq!(
            controller.view(),
            ViewState::Segment {
                slug: "pricing".into()
            }
        );
        assert_eq!(runtime.history_len(), 2);
        assert_eq!(runtime.current_entry().url, "?page=pricing");
        assert!(runtime
            .emitted()
            .contains(&WindowEvent::ContentReplaced {
                page: "pricing".into()
            }));
        assert_eq!(backend.stream_calls.load(Ordering::SeqCst), 1);
        assert!(!controller.is_streaming());
    }

    #[tokio::test]
    async fn test_request_carries_identity_and_signals() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Body(well_formed_stream("Teams")));
        let (controller, _, backend) = setup(backend);

        controller.navigate_to_topic("pricing", "teams").await;

        let request = backend.last_request().unwrap();
        assert_eq!(request.site_id, "site-1");
        assert_eq!(request.page_type, PageType::Detail);
        assert_eq!(request.segment, "pricing");
        assert_eq!(request.topic.as_deref(), Some("teams"));
        assert_eq!(request.session_id, controller.session_id().as_str());
        let signals = request.behavior_signals.unwrap();
        assert_eq!(signals.pages_visited, vec!["landing"]);
    }

    #[tokio::test]
    async fn test_tracking_disabled_sends_no_signals() {
        let backend = Arc::new(MockBackend::default());
        backend.push_stream(MockStream::Body(well_formed_stream("Pricing")));
        let runtime = Arc::new(HeadlessRuntime::new());
        let mut config = test_config();
        config.tracking_enabled = false;
        let controller =
            NavigationController::new(config, backend.clone(), runtime, LANDING);
        controller.init();

        controller.navigate_to_segment("pricing").await;
        assert!(backend.last_request().unwrap().behavior_signals.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_one_generation_in_flight() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Delayed(
            Duration::from_secs(2),
            well_formed_stream("Pricing"),
        ));
        let (controller, _, backend) = setup(backend);

        let (first, second, third) = tokio::join!(
            controller.navigate_to_segment("pricing"),
            controller.navigate_to_segment("features"),
            controller.navigate_to_topic("pricing", "teams"),
        );
        assert_eq!(first, NavOutcome::Generated);
        assert_eq!(second, NavOutcome::Dropped);
        assert_eq!(third, NavOutcome::Dropped);
        assert_eq!(backend.stream_calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.page_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_visit_is_cache_hit_with_identical_html() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Body(well_formed_stream("Pricing")));
        let (controller, runtime, backend) = setup(backend);

        assert_eq!(controller.navigate_to_segment("pricing").await, NavOutcome::Generated);
        let first = controller.document_html();
        assert_eq!(controller.navigate_to_segment("pricing").await, NavOutcome::CacheHit);
        assert_eq!(controller.document_html(), first);
        assert_eq!(backend.stream_calls.load(Ordering::SeqCst), 1);
        assert_eq!(runtime.history_len(), 3);
    }

    #[tokio::test]
    async fn test_landing_restore_is_byte_identical() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Body(well_formed_stream("Pricing")));
        backend.push_stream(MockStream::Body(well_formed_stream("Teams")));
        let (controller, runtime, _) = setup(backend);

        controller.navigate_to_segment("pricing").await;
        controller.navigate_to_topic("pricing", "teams").await;
        assert_ne!(controller.document_html(), LANDING);

        let before = runtime.history_len();
        assert_eq!(controller.navigate_to_landing().await, NavOutcome::Landing);
        assert_eq!(controller.document_html(), LANDING);
        assert!(controller.navigation_stack().is_empty());
        assert_eq!(controller.view(), ViewState::Landing);
        // replaceState, never pushState
        assert_eq!(runtime.history_len(), before);
        assert!(runtime.current_entry().state.unwrap().is_landing());
    }

    #[tokio::test]
    async fn test_topic_stack_is_exact() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Body(well_formed_stream("Features")));
        backend.push_stream(MockStream::Body(well_formed_stream("Teams")));
        let (controller, runtime, _) = setup(backend);

        controller.navigate_to_segment("features").await;
        controller.navigate_to_topic("pricing", "teams").await;

        let shape: Vec<_> = controller
            .navigation_stack()
            .entries()
            .iter()
            .map(|e| (e.slug.clone(), e.entry_type))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("pricing".to_string(), EntryType::Segment),
                ("teams".to_string(), EntryType::Topic)
            ]
        );
        assert_eq!(runtime.current_entry().url, "?page=pricing/teams");
        assert!(controller.document_html().contains(r#"data-segment="pricing""#));
    }

    #[tokio::test]
    async fn test_section_error_renders_placeholder() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Body(stream_with_content_error("Pricing")));
        let (controller, _, _) = setup(backend);

        assert_eq!(controller.navigate_to_segment("pricing").await, NavOutcome::Generated);
        let cached = controller
            .cached_page(&PageKey::Segment("pricing".into()))
            .unwrap();
        assert!(cached.contains(SECTION_ERROR_TEXT));
        assert!(cached.contains(r#"<div id="header">Pricing header</div>"#));
        assert!(cached.contains(r#"<div id="footer">Pricing footer</div>"#));
        let html = controller.document_html();
        assert!(html.contains(SECTION_ERROR_TEXT));
        assert!(html.contains("Pricing footer"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_stream_times_out_without_lockout() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Silent);
        backend.push_stream(MockStream::Body(well_formed_stream("Pricing")));
        let (controller, runtime, backend) = setup(backend);

        let started = tokio::time::Instant::now();
        let outcome = controller.navigate_to_segment("pricing").await;
        assert_eq!(outcome, NavOutcome::Failed { timed_out: true });
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(!controller.is_streaming());
        assert!(!controller.is_loading());
        assert!(controller.document_html().contains(TIMEOUT_MESSAGE));
        assert!(controller
            .document_html()
            .contains(r#"data-action="back-to-landing""#));
        assert_eq!(controller.view(), ViewState::Error { timed_out: true });
        assert_eq!(backend.page_calls.load(Ordering::SeqCst), 0);
        assert_eq!(runtime.history_len(), 1);

        // The same segment is accepted again right away
        let retry = controller.navigate_to_segment("pricing").await;
        assert_eq!(retry, NavOutcome::Generated);
        assert_eq!(backend.stream_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stream_failure_falls_back_to_single_request() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Refused);
        backend.push_page(Ok(expected_document("Fallback")));
        let (controller, _, backend) = setup(backend);

        assert_eq!(controller.navigate_to_segment("pricing").await, NavOutcome::Generated);
        assert_eq!(backend.page_calls.load(Ordering::SeqCst), 1);
        assert!(controller.document_html().contains("Fallback content"));
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn test_error_event_and_truncated_stream_fall_back() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Body(
            frame("wrapper", serde_json::json!({"head": HEAD, "bodyOpen": "<body>"}))
                + &frame("error", serde_json::json!({"message": "model overloaded"})),
        ));
        backend.push_page(Ok(expected_document("One")));
        backend.push_stream(MockStream::Body(
            frame("section-start", serde_json::json!({"id": "header"})),
        ));
        backend.push_page(Ok(expected_document("Two")));
        let (controller, _, backend) = setup(backend);

        assert_eq!(controller.navigate_to_segment("one").await, NavOutcome::Generated);
        assert_eq!(controller.navigate_to_segment("two").await, NavOutcome::Generated);
        assert_eq!(backend.page_calls.load(Ordering::SeqCst), 2);
        assert!(controller.document_html().contains("Two content"));
    }

    #[tokio::test]
    async fn test_failed_fallback_shows_error_page() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Refused);
        backend.push_page(Err(GenerationError::ApiError {
            status: 502,
            message: "bad gateway".into(),
        }));
        let (controller, _, _) = setup(backend);

        let outcome = controller.navigate_to_segment("pricing").await;
        assert_eq!(outcome, NavOutcome::Failed { timed_out: false });
        assert!(controller.document_html().contains(GENERIC_ERROR_MESSAGE));
        assert_eq!(controller.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_json_first_when_streaming_disabled() {
        let backend = Arc::new(MockBackend::default());
        backend.push_page(Ok(expected_document("Json")));
        let runtime = Arc::new(HeadlessRuntime::new());
        let mut config = test_config();
        config.prefer_streaming = false;
        let controller = NavigationController::new(config, backend.clone(), runtime, LANDING);
        controller.init();

        assert_eq!(controller.navigate_to_segment("pricing").await, NavOutcome::Generated);
        assert_eq!(backend.stream_calls.load(Ordering::SeqCst), 0);
        assert_eq!(backend.page_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaving_mid_flight_caches_without_displaying() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Delayed(
            Duration::from_secs(5),
            well_formed_stream("Pricing"),
        ));
        let (controller, _, _) = setup(backend);

        let (outcome, _) = tokio::join!(controller.navigate_to_segment("pricing"), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            controller.navigate_to_landing().await
        });
        assert_eq!(outcome, NavOutcome::Stale);
        assert_eq!(controller.document_html(), LANDING);
        assert!(controller
            .cached_page(&PageKey::Segment("pricing".into()))
            .is_some());
    }

    #[tokio::test]
    async fn test_popstate_landing_clears_stack() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Body(well_formed_stream("Pricing")));
        let (controller, _, _) = setup(backend);
        controller.navigate_to_segment("pricing").await;
        assert_eq!(controller.navigation_stack().len(), 1);

        let landing = HistoryState::landing("site-1", "v1");
        assert_eq!(controller.handle_pop_state(Some(landing)).await, NavOutcome::Landing);
        assert!(controller.navigation_stack().is_empty());
        assert_eq!(controller.document_html(), LANDING);

        controller.navigate_to_segment("pricing").await;
        assert_eq!(controller.handle_pop_state(None).await, NavOutcome::Landing);
        assert!(controller.navigation_stack().is_empty());
    }

    #[tokio::test]
    async fn test_back_and_forward_use_cache_without_writing_history() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Body(well_formed_stream("Pricing")));
        backend.push_stream(MockStream::Body(well_formed_stream("Teams")));
        let (controller, runtime, backend) = setup(backend);

        controller.navigate_to_segment("pricing").await;
        let pricing_html = controller.document_html();
        controller.navigate_to_topic("pricing", "teams").await;
        assert_eq!(runtime.history_len(), 3);

        let back = runtime.back().unwrap();
        assert_eq!(controller.handle_pop_state(back).await, NavOutcome::CacheHit);
        assert_eq!(controller.document_html(), pricing_html);
        assert_eq!(controller.navigation_stack().len(), 1);

        let forward = runtime.forward().unwrap();
        assert_eq!(controller.handle_pop_state(forward).await, NavOutcome::CacheHit);
        assert_eq!(controller.navigation_stack().len(), 2);
        assert_eq!(runtime.history_len(), 3);
        assert_eq!(backend.stream_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_popstate_miss_regenerates_with_replace() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Body(well_formed_stream("Teams")));
        let (controller, runtime, backend) = setup(backend);

        // Deep link from an older entry without a stack
        let state: HistoryState = serde_json::from_str(
            r#"{"page":"pricing/teams","siteId":"site-1","versionId":"v1"}"#,
        )
        .unwrap();
        assert_eq!(controller.handle_pop_state(Some(state)).await, NavOutcome::Generated);
        assert_eq!(backend.stream_calls.load(Ordering::SeqCst), 1);
        assert_eq!(runtime.history_len(), 1);
        let entry = runtime.current_entry();
        assert_eq!(entry.url, "?page=pricing/teams");
        assert_eq!(
            entry.state.unwrap().navigation_stack.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_clicks_dispatch_and_are_tracked() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Body(well_formed_stream("Features")));
        backend.push_stream(MockStream::Body(well_formed_stream("Sso")));
        let (controller, _, _) = setup(backend);

        let segment = ClickTarget::new(ClickedElement::new("a").with_attr("data-segment", "features"));
        assert!(controller.handle_click(&segment).await.is_some());

        let legacy = ClickTarget::new(ClickedElement::new("div").with_attr("data-feature-id", "sso"));
        let action = controller.handle_click(&legacy).await.unwrap();
        assert!(matches!(action, NavAction::LegacyItem { .. }));
        assert_eq!(controller.navigation_stack().page_path(), "features/sso");

        let inert = ClickTarget::new(ClickedElement::new("a").with_attr("href", "/x"));
        assert!(controller.handle_click(&inert).await.is_none());

        let home = ClickTarget::new(
            ClickedElement::new("button").with_attr("data-action", "back-to-landing"),
        );
        controller.handle_click(&home).await;
        assert_eq!(controller.document_html(), LANDING);

        let signals = controller.behavior_signals();
        assert_eq!(
            signals.clicked_elements,
            vec!["segment:features", "topic:features/sso", "back-to-landing"]
        );
        assert_eq!(
            signals.pages_visited,
            vec!["landing", "segment_features", "topic_features_sso"]
        );
    }

    #[tokio::test]
    async fn test_cta_opens_modal_and_lead_always_succeeds() {
        let backend = MockBackend::default();
        backend.fail_leads();
        let (controller, runtime, backend) = setup(backend);

        let cta = ClickTarget::new(
            ClickedElement::new("button")
                .with_attr("data-action", "cta-primary")
                .with_attr("data-cta-type", "demo")
                .with_text("Book a demo"),
        );
        controller.handle_click(&cta).await;
        assert!(matches!(
            controller.lead_modal(),
            LeadModal::Open {
                kind: FormKind::Demo,
                ..
            }
        ));
        assert_eq!(runtime.history_len(), 1);

        let invalid = LeadForm {
            name: "Ada".into(),
            email: "nope".into(),
            ..LeadForm::default()
        };
        assert_eq!(
            controller.submit_lead(&invalid).await,
            Err(LeadFormError::InvalidEmail)
        );
        assert!(backend.leads.lock().is_empty());

        let valid = LeadForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            ..LeadForm::default()
        };
        assert_eq!(controller.submit_lead(&valid).await, Ok(()));
        assert_eq!(
            controller.lead_modal(),
            LeadModal::Success {
                kind: FormKind::Demo
            }
        );
        let sent = backend.leads.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].source, "generated-site");
        assert_eq!(sent[0].cta_type, "demo");
    }

    #[tokio::test]
    async fn test_modal_survives_page_replacement() {
        let backend = MockBackend::default();
        backend.push_stream(MockStream::Body(well_formed_stream("Pricing")));
        let (controller, _, _) = setup(backend);

        controller.handle_cta_action("contact", "Talk to us");
        controller.navigate_to_segment("pricing").await;
        assert!(controller.lead_modal().is_open());
        controller.close_lead_modal();
        assert!(!controller.lead_modal().is_open());
    }

    #[tokio::test]
    async fn test_scroll_depth_is_recorded_per_page() {
        let (controller, _, _) = setup(MockBackend::default());
        assert!(controller.on_scroll(0.5));
        assert!(!controller.on_scroll(0.8));
        controller.on_animation_frame();
        assert_eq!(controller.behavior_signals().scroll_depth["landing"], 0.8);
    }
}
