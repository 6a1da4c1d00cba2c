//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use readaloud::gateway::CompletionGateway;
use readaloud::store::{BOOKS_TABLE, MemoryRowStore, PAGES_TABLE};
use readaloud::types::{ChatMessage, CompletionOptions, RawCompletion};
use readaloud::{AiConfig, GatewayError};

/// A key that passes the availability check.
pub const TEST_KEY: &str = "sk-test-0123456789abcdef";

pub fn configured() -> AiConfig {
    AiConfig::new(Some(TEST_KEY.to_string()))
}

pub fn unconfigured() -> AiConfig {
    AiConfig::new(None)
}

/// Gateway that replays scripted replies, then repeats `fallback`.
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    fallback: Result<String, GatewayError>,
    calls: AtomicU32,
    operations: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn always(reply: Result<String, GatewayError>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: reply,
            calls: AtomicU32::new(0),
            operations: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(content: impl Into<String>) -> Self {
        Self::always(Ok(content.into()))
    }

    pub fn failing(error: GatewayError) -> Self {
        Self::always(Err(error))
    }

    /// Queue replies served before the fallback.
    pub fn then(self, reply: Result<String, GatewayError>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<RawCompletion, GatewayError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.operations
            .lock()
            .unwrap()
            .push(options.operation.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        reply.map(|content| RawCompletion {
            content,
            usage: None,
            model: Some(options.model.clone()),
        })
    }
}

pub fn image_reply(description: &str) -> String {
    json!({
        "description": description,
        "vocabulary": [{"word": "forest", "definition": "a place with many trees",
                        "partOfSpeech": "noun", "exampleSentence": "The fox ran into the forest."}]
    })
    .to_string()
}

pub fn page(id: &str, book_id: &str, number: i64, image: Option<&str>, description: Option<&str>) -> Value {
    json!({
        "id": id,
        "book_id": book_id,
        "page_number": number,
        "image_url": image,
        "description": description,
    })
}

/// One book, `b1`, with pages inserted out of order.
pub fn library_store() -> MemoryRowStore {
    MemoryRowStore::new()
        .with_table(BOOKS_TABLE, vec![json!({"id": "b1", "title": "The Brave Fox"})])
        .with_table(
            PAGES_TABLE,
            vec![
                page("p3", "b1", 3, Some("https://img.test/3.png"), None),
                page("p1", "b1", 1, Some("https://img.test/1.png"), None),
                page("p2", "b1", 2, Some("https://img.test/2.png"), Some("Already described.")),
            ],
        )
}
