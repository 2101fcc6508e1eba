//! The generation backend as seen by the controller.

use async_trait::async_trait;
use ngw_generation::{
    AnswerPageRequest, AnswerPageResponse, Client, GeneratePageRequest, GenerationError,
    LeadSubmission, SectionStream,
};

/// Everything the controller asks of the backend.
///
/// Implemented for the HTTP [`Client`]; tests substitute scripted backends.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Open a `generate-page-stream` response.
    async fn generate_page_stream(
        &self,
        request: &GeneratePageRequest,
    ) -> Result<SectionStream, GenerationError>;

    /// Single-shot `generate-page`, returning the full document.
    async fn generate_page(&self, request: &GeneratePageRequest) -> Result<String, GenerationError>;

    async fn generate_answer_page(
        &self,
        request: &AnswerPageRequest,
    ) -> Result<AnswerPageResponse, GenerationError>;

    async fn submit_lead(&self, lead: &LeadSubmission) -> Result<(), GenerationError>;
}

#[async_trait]
impl GenerationBackend for Client {
    async fn generate_page_stream(
        &self,
        request: &GeneratePageRequest,
    ) -> Result<SectionStream, GenerationError> {
        Client::generate_page_stream(self, request).await
    }

    async fn generate_page(&self, request: &GeneratePageRequest) -> Result<String, GenerationError> {
        Client::generate_page(self, request).await
    }

    async fn generate_answer_page(
        &self,
        request: &AnswerPageRequest,
    ) -> Result<AnswerPageResponse, GenerationError> {
        Client::generate_answer_page(self, request).await
    }

    async fn submit_lead(&self, lead: &LeadSubmission) -> Result<(), GenerationError> {
        Client::submit_lead(self, lead).await
    }
}
