use sh_domain::cancel::CancelToken;
use sh_domain::error::Result;
use sh_domain::stream::BoxStream;
use sh_domain::stream::StreamPart;
use sh_domain::tool::{Message, ToolDefinition};

/// A provider-agnostic chat completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Model identifier override. When `None`, the provider uses its default.
    pub model: Option<String>,
}

/// The LLM stream adapter contract (component C7).
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stream a chat completion. The returned stream must stop producing
    /// items promptly once `cancel.is_cancelled()` is observed true.
    async fn chat_stream(
        &self,
        req: &ChatRequest,
        cancel: CancelToken,
    ) -> Result<BoxStream<'static, Result<StreamPart>>>;

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;
}
