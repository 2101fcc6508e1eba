// Runtime abstraction over the page environment
//
// The controller never touches the browser directly. History, tab-scoped
// storage and window events go through `BrowserRuntime`; a wasm host binds it
// to `window.history`, `sessionStorage` and `dispatchEvent`, the headless
// runtime keeps everything in memory.

use async_trait::async_trait;
use thiserror::Error;

use crate::events::WindowEvent;
use crate::history::HistoryState;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Event receiver closed")]
    ReceiverClosed,

    #[error("Storage write failed for '{key}': {message}")]
    Storage { key: String, message: String },

    #[error("History update failed: {0}")]
    History(String),
}

/// The page environment as seen by the navigation controller.
///
/// Held by the controller as `Arc<dyn BrowserRuntime>`.
#[async_trait]
pub trait BrowserRuntime: Send + Sync + 'static {
    /// Dispatch a custom event on `window`
    ///
    /// # Errors
    /// `RuntimeError::ReceiverClosed` once nobody is listening.
    fn emit(&self, event: WindowEvent) -> Result<(), RuntimeError>;

    /// `history.pushState(state, "", url)`
    fn push_state(&self, state: &HistoryState, url: &str) -> Result<(), RuntimeError>;

    /// `history.replaceState(state, "", url)`
    fn replace_state(&self, state: &HistoryState, url: &str) -> Result<(), RuntimeError>;

    /// Read a tab-scoped storage value
    fn session_get(&self, key: &str) -> Option<String>;

    /// Write a tab-scoped storage value
    ///
    /// # Errors
    /// Returns `RuntimeError::Storage` when the write is rejected (quota).
    fn session_set(&self, key: &str, value: &str) -> Result<(), RuntimeError>;

    /// Release listeners; later `emit` calls fail.
    async fn shutdown(&self) -> Result<(), RuntimeError>;
}

pub mod headless;

pub use headless::HeadlessRuntime;
