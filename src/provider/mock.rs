use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{ChatProvider, ImageProvider};
use crate::errors::Result;
use crate::wire::{ChatRequest, ImageRequest, Role};

const CANNED_SCENARIO: &str = "1. The user opens the application.\n2. The user describes what they need.\n3. The application presents a result and the user confirms it.";

/// Offline collaborator. Scripted chat replies are returned in order; once
/// the script runs out, a canned numbered list is returned. Image URLs are
/// deterministic.
#[derive(Default)]
pub struct MockProvider {
    scripted: Mutex<VecDeque<String>>,
    chat_calls: AtomicUsize,
    image_calls: AtomicUsize,
}

impl MockProvider {
    pub fn with_script(replies: Vec<String>) -> Self {
        Self { scripted: Mutex::new(replies.into()), ..Default::default() }
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn complete(&self, req: &ChatRequest) -> Result<String> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.scripted.lock().ok().and_then(|mut q| q.pop_front());
        if let Some(reply) = next {
            return Ok(reply);
        }
        let asks_for_list = req
            .messages
            .iter()
            .any(|m| m.role == Role::User && m.content.to_lowercase().contains("numbered list"));
        if asks_for_list {
            Ok(CANNED_SCENARIO.to_string())
        } else {
            Ok(format!("[mock {}] persona placeholder", req.model))
        }
    }
}

#[async_trait]
impl ImageProvider for MockProvider {
    async fn generate(&self, req: &ImageRequest) -> Result<Vec<String>> {
        let first = self.image_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok((0..req.n.max(1) as usize)
            .map(|i| format!("mock://image/{}", first + i))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ChatRequest;

    #[tokio::test]
    async fn script_then_canned_list() {
        let m = MockProvider::with_script(vec!["first".into()]);
        let req = ChatRequest::new("gpt", "sys", "Use numbered list please".into());
        assert_eq!(m.complete(&req).await.unwrap(), "first");
        assert!(m.complete(&req).await.unwrap().starts_with("1. "));
        assert_eq!(m.chat_calls(), 2);
    }
}
