use std::fmt;

use serde::{Deserialize, Serialize};

use crate::runtime::BrowserRuntime;

/// Tab-scoped storage key of the session id.
pub const SESSION_ID_KEY: &str = "ngw_session_id";

/// Tab-scoped storage key of the pristine landing document.
pub fn landing_html_key(site_id: &str, version_id: &str) -> String {
    format!("ngw_landing_html_{}_{}", site_id, version_id)
}

/// Identifies one visitor's interaction sequence to the backend.
///
/// Created once per tab and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Reuse the tab's id, or mint and persist a new one.
    ///
    /// A failed write is logged; the id is still used for this page load.
    pub fn load_or_create(runtime: &dyn BrowserRuntime) -> Self {
        if let Some(existing) = runtime.session_get(SESSION_ID_KEY) {
            if !existing.trim().is_empty() {
                return Self(existing);
            }
        }

        let id = Self(uuid::Uuid::new_v4().to_string());
        if let Err(e) = runtime.session_set(SESSION_ID_KEY, &id.0) {
            tracing::warn!("Failed to persist session id: {}", e);
        }
        tracing::debug!(session_id = %id, "created session id");
        id
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
