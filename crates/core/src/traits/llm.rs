//! Language model capability

use async_trait::async_trait;

use crate::{GenerateRequest, GenerateResponse, Result, ToolDefinition};

/// Chat/completion model
///
/// Used three ways: structured single-turn completions (intent
/// classification, reranking) and multi-turn chat with tool calling
/// (reply generation).
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Generate a completion without tools
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// Generate with tool/function calling
    ///
    /// The response either carries final text or one or more tool calls the
    /// caller must execute and feed back as tool messages.
    async fn generate_with_tools(
        &self,
        request: GenerateRequest,
        tools: &[ToolDefinition],
    ) -> Result<GenerateResponse>;

    /// Check if the backend is reachable
    async fn is_available(&self) -> bool {
        true
    }

    /// Model name for logging
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoLlm;

    #[async_trait]
    impl LanguageModel for EchoLlm {
        async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(GenerateResponse::text(last))
        }

        async fn generate_with_tools(
            &self,
            request: GenerateRequest,
            _tools: &[ToolDefinition],
        ) -> Result<GenerateResponse> {
            self.generate(request).await
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_default_availability() {
        let llm = EchoLlm;
        assert!(llm.is_available().await);
        let response = llm
            .generate(GenerateRequest::new("sys").with_user_message("selam"))
            .await
            .unwrap();
        assert_eq!(response.text, "selam");
    }
}
