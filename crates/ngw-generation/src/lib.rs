//! Client and streaming protocol for the page generation backend.
//!
//! The backend synthesizes HTML for a segment or topic of a generated site.
//! Two shapes are offered: a single JSON response (`generate-page`) and a
//! Server-Sent Events stream (`generate-page-stream`) that delivers the page
//! as a wrapper followed by three independently generated sections.
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use ngw_generation::{Client, GeneratePageRequest, PageType, StreamEvent};
//!
//! # async fn example() -> Result<(), ngw_generation::GenerationError> {
//! let client = Client::new("https://api.example.com/v1")?;
//! let request = GeneratePageRequest::new("site", "v1", PageType::Segment, "pricing", "session");
//!
//! let mut stream = client.generate_page_stream(&request).await?;
//! while let Some(event) = stream.next().await {
//!     if let StreamEvent::SectionComplete(section) = event? {
//!         println!("{} ready ({} bytes)", section.id, section.html.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod streaming;
mod types;

pub use client::Client;
pub use error::GenerationError;
pub use streaming::{SectionStream, SseDecoder, SseFrame};
pub use types::*;

/// Endpoint paths relative to the configured API base.
pub mod endpoints {
    /// Server-Sent Events page generation
    pub const GENERATE_PAGE_STREAM: &str = "generate-page-stream";
    /// Single-shot JSON page generation
    pub const GENERATE_PAGE: &str = "generate-page";
    /// Chat answer page generation
    pub const GENERATE_ANSWER_PAGE: &str = "generate-answer-page";
    /// Lead capture
    pub const LEADS: &str = "leads";
}
