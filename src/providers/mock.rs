//! Scripted chat model for tests
//!
//! Replays canned replies in order and counts calls, so loop tests can assert
//! exactly how many model turns a run consumed.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::providers::{ChatMessage, ChatModel, ProviderError};

pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    /// Served once the script is exhausted; `None` makes exhaustion an error
    fallback: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedModel {
    /// A model that replays `replies` in order and errors when they run out
    pub fn new(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A model that answers every call with the same reply
    pub fn repeating(reply: String) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Some(reply),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter, usable after the model is moved into the loop
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, _messages: &[ChatMessage]) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let next = self.replies.lock().unwrap().pop_front();
        match next.or_else(|| self.fallback.clone()) {
            Some(reply) => Ok(reply),
            None => Err(ProviderError::EmptyCompletion),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_errors() {
        let model = ScriptedModel::new(vec!["one".to_string(), "two".to_string()]);
        assert_eq!(model.chat(&[]).await.unwrap(), "one");
        assert_eq!(model.chat(&[]).await.unwrap(), "two");
        assert!(model.chat(&[]).await.is_err());
        assert_eq!(model.calls().load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_repeating_never_runs_out() {
        let model = ScriptedModel::repeating("again".to_string());
        for _ in 0..4 {
            assert_eq!(model.chat(&[]).await.unwrap(), "again");
        }
    }
}
