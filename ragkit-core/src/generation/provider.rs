//! Generation service seam

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::generation::message::Message;
use crate::generation::streaming::AnswerStream;

/// A chat model that answers with a stream of text
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send `messages` (oldest first) to `model` and stream the reply
    ///
    /// Errors before the first chunk are returned here; errors mid-answer arrive
    /// as items of the stream.
    async fn stream_chat(&self, model: &str, messages: Vec<Message>) -> Result<AnswerStream>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: Provider + ?Sized> Provider for Arc<T> {
    async fn stream_chat(&self, model: &str, messages: Vec<Message>) -> Result<AnswerStream> {
        (**self).stream_chat(model, messages).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
