//! History API state attached to every `pushState` / `replaceState`.

use serde::{Deserialize, Serialize};

use crate::cache::PageKey;
use crate::nav_stack::NavigationStack;

/// Page path of the landing state.
pub const LANDING_PAGE: &str = "landing";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryState {
    /// `landing`, `<segment>`, `<segment>/<topic>` or `answer/<slug>`
    pub page: String,
    pub site_id: String,
    pub version_id: String,
    /// Missing on entries written before stacks were attached
    #[serde(default)]
    pub navigation_stack: Option<NavigationStack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_answer_page: Option<bool>,
}

impl HistoryState {
    pub fn new(
        page: impl Into<String>,
        site_id: impl Into<String>,
        version_id: impl Into<String>,
        navigation_stack: NavigationStack,
    ) -> Self {
        Self {
            page: page.into(),
            site_id: site_id.into(),
            version_id: version_id.into(),
            navigation_stack: Some(navigation_stack),
            is_answer_page: None,
        }
    }

    /// The landing state: `page == "landing"` and an empty stack.
    pub fn landing(site_id: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self::new(LANDING_PAGE, site_id, version_id, NavigationStack::empty())
    }

    /// State for the page a stack points at.
    pub fn for_stack(site_id: &str, version_id: &str, stack: &NavigationStack) -> Self {
        Self::new(stack.page_path(), site_id, version_id, stack.clone())
    }

    /// State for an answer page.
    pub fn answer(site_id: &str, version_id: &str, slug: &str, stack: &NavigationStack) -> Self {
        Self {
            is_answer_page: Some(true),
            ..Self::new(format!("answer/{}", slug), site_id, version_id, stack.clone())
        }
    }

    pub fn is_landing(&self) -> bool {
        self.page == LANDING_PAGE
    }

    pub fn is_answer(&self) -> bool {
        self.is_answer_page.unwrap_or(false) || self.page.starts_with("answer/")
    }

    /// The stack to restore: the embedded one, or one rebuilt from the path.
    pub fn resolved_stack(&self) -> NavigationStack {
        match &self.navigation_stack {
            Some(stack) if !stack.is_empty() || self.is_landing() || self.is_answer() => {
                stack.clone()
            }
            _ => NavigationStack::rebuild_from_path(&self.page),
        }
    }

    /// Cache key of the page this state shows (`None` for landing).
    pub fn page_key(&self) -> Option<PageKey> {
        if self.is_landing() {
            return None;
        }
        if self.is_answer() {
            let slug = self.page.strip_prefix("answer/").unwrap_or(&self.page);
            return Some(PageKey::Answer(slug.to_string()));
        }
        self.resolved_stack().page_key()
    }

    /// URL shown in the address bar.
    pub fn url(&self) -> String {
        if self.is_landing() {
            "/".to_string()
        } else {
            format!("?page={}", self.page)
        }
    }
}
