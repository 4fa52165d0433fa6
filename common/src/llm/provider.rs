use crate::error::Result;
use crate::llm::message::Message;
use async_trait::async_trait;

/// one chat call: system instruction, prior turns, and the new user prompt
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub temperature: f32,
    pub history: &'a [Message],
    pub prompt: &'a str,
}

/// seam between the pipeline and a language model provider
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// provider name for logs
    fn name(&self) -> &str;

    /// send the request and return the raw reply text
    async fn generate(&self, request: &ChatRequest<'_>) -> Result<String>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::AskDbError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// a recorded call, owned so tests can inspect it after the fact
    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub model: String,
        pub system: String,
        pub temperature: f32,
        pub history_len: usize,
        pub prompt: String,
    }

    /// replays canned replies in order and records every request
    #[derive(Default)]
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String>>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl ScriptedModel {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, text: impl Into<String>) -> Self {
            self.replies.lock().unwrap().push_back(Ok(text.into()));
            self
        }

        pub fn fail(self, message: impl Into<String>) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(Err(AskDbError::Provider(message.into())));
            self
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &ChatRequest<'_>) -> Result<String> {
            self.calls.lock().unwrap().push(RecordedCall {
                model: request.model.to_string(),
                system: request.system.to_string(),
                temperature: request.temperature,
                history_len: request.history.len(),
                prompt: request.prompt.to_string(),
            });

            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AskDbError::Provider("script exhausted".to_string())))
        }
    }
}
