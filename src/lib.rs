//! Dynamic navigation and progressive rendering for generated sites.
//!
//! A [`NavigationController`](controller::NavigationController) owns the
//! live document of a generated micro-site and turns visitor clicks into
//! generated pages: streamed section by section from the generation backend,
//! cached per tab, and recorded in session history.

pub mod cache;
pub mod controller;
pub mod dispatch;
pub mod dom;
pub mod error;
pub mod events;
pub mod history;
pub mod leads;
pub mod nav_stack;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod tracker;

#[cfg(feature = "cli")]
pub mod cli;

pub use cache::{PageCache, PageKey};
pub use controller::{
    ControllerConfig, GenerationBackend, HistoryMode, NavOutcome, NavigationController, ViewState,
};
pub use error::{NavError, Result};
pub use events::{GenerateAnswerRequest, WindowEvent};
pub use history::HistoryState;
pub use nav_stack::{NavEntry, NavigationStack};
pub use runtime::{BrowserRuntime, HeadlessRuntime};
