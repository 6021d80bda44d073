use async_trait::async_trait;

/// A text-in, text-out inference backend.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Provider name, for logs and health output.
    fn name(&self) -> &str;

    /// Send `prompt` and return the model's raw text answer.
    async fn infer(&self, prompt: &str) -> anyhow::Result<String>;
}
