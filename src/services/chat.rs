//! Conversational chat over a single shared memory
//!
//! Every caller talks into the same conversation. Each reply is generated
//! from the complete history so far; nothing is summarized or dropped, so
//! the prompt grows for as long as the process runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, PoisonError};
use tokio::sync::Mutex;
use tracing::{error, info};

use super::error_text;
use crate::llm::{ChatMessage, ChatModel, ChatRequest};

/// Instructions sent ahead of the conversation
const CONVERSATION_PREAMBLE: &str = "The following is a friendly conversation between a human and an AI. \
The AI is talkative and provides lots of specific details from its context. \
If the AI does not know the answer to a question, it truthfully says it does not know.";

/// One completed exchange
#[derive(Debug, Clone)]
pub struct Turn {
    pub input: String,
    pub response: String,
    pub at: DateTime<Utc>,
}

/// Unbounded buffer of completed turns, oldest first
#[derive(Debug, Default)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed exchange
    pub fn push(&mut self, input: impl Into<String>, response: impl Into<String>) {
        self.turns.push(Turn {
            input: input.into(),
            response: response.into(),
            at: Utc::now(),
        });
    }

    /// History as alternating user / chatbot messages
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .flat_map(|t| [ChatMessage::user(&t.input), ChatMessage::chatbot(&t.response)])
            .collect()
    }

    /// Most recent exchange
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Snapshot of the conversation size, readable while a reply is in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChatStats {
    pub turns: usize,
    pub last_turn_at: Option<DateTime<Utc>>,
}

/// Freeform chat with process-wide memory
pub struct ChatService {
    llm: Arc<dyn ChatModel>,
    memory: Mutex<ConversationMemory>,
    /// Updated after each recorded turn; never held across an await
    stats: std::sync::Mutex<ChatStats>,
}

impl ChatService {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self {
            llm,
            memory: Mutex::new(ConversationMemory::new()),
            stats: std::sync::Mutex::new(ChatStats::default()),
        }
    }

    /// Produce the next reply in the shared conversation.
    ///
    /// The memory stays locked for the whole model call, so turns never
    /// interleave. A failed call leaves the memory untouched.
    pub async fn reply(&self, message: &str) -> String {
        let mut memory = self.memory.lock().await;

        let request = ChatRequest {
            preamble: Some(CONVERSATION_PREAMBLE.to_string()),
            history: memory.to_messages(),
            message: message.to_string(),
        };

        match self.llm.chat(&request).await {
            Ok(reply) => {
                memory.push(message, reply.clone());
                *self.stats.lock().unwrap_or_else(PoisonError::into_inner) = ChatStats {
                    turns: memory.len(),
                    last_turn_at: memory.last().map(|t| t.at),
                };
                info!(
                    turns = memory.len(),
                    model = self.llm.chat_model(),
                    "Chat reply generated"
                );
                reply
            }
            Err(e) => {
                error!(error = %e, "Chat reply failed");
                error_text(e)
            }
        }
    }

    /// Conversation size without waiting for an in-flight reply
    pub fn stats(&self) -> ChatStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of completed turns in memory
    pub fn turn_count(&self) -> usize {
        self.stats().turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatRole, LlmError};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Replies with a rendering of everything it was sent
    struct EchoModel;

    #[async_trait::async_trait]
    impl ChatModel for EchoModel {
        async fn chat(&self, request: &ChatRequest) -> Result<String, LlmError> {
            let history: Vec<String> = request
                .history
                .iter()
                .map(|m| format!("{:?}:{}", m.role, m.text))
                .collect();
            Ok(format!("[{}] {}", history.join(" | "), request.message))
        }

        fn chat_model(&self) -> &str {
            "echo"
        }
    }

    /// Fails once when armed, then behaves like `EchoModel`
    struct FlakyModel {
        fail_next: AtomicBool,
    }

    #[async_trait::async_trait]
    impl ChatModel for FlakyModel {
        async fn chat(&self, request: &ChatRequest) -> Result<String, LlmError> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(LlmError::Decode("missing text".into()));
            }
            EchoModel.chat(request).await
        }

        fn chat_model(&self) -> &str {
            "flaky"
        }
    }

    #[test]
    fn test_memory_to_messages_alternates() {
        let mut memory = ConversationMemory::new();
        memory.push("hi", "hello");
        memory.push("bye", "goodbye");

        let messages = memory.to_messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], ChatMessage::user("hi"));
        assert_eq!(messages[1], ChatMessage::chatbot("hello"));
        assert_eq!(messages[3].role, ChatRole::Chatbot);
    }

    #[tokio::test]
    async fn test_second_reply_sees_first_turn() {
        let chat = ChatService::new(Arc::new(EchoModel));

        let first = chat.reply("M1").await;
        assert_eq!(first, "[] M1");

        let second = chat.reply("M2").await;
        assert!(second.contains("User:M1"));
        assert!(second.contains(&format!("Chatbot:{first}")));
        assert!(second.ends_with("M2"));
        assert_eq!(chat.turn_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_reply_not_remembered() {
        let chat = ChatService::new(Arc::new(FlakyModel {
            fail_next: AtomicBool::new(true),
        }));

        assert_eq!(
            chat.reply("lost").await,
            "Error: unexpected provider response: missing text"
        );
        assert_eq!(chat.turn_count(), 0);

        let reply = chat.reply("kept").await;
        assert!(!reply.contains("lost"));
        assert_eq!(chat.turn_count(), 1);
    }

    #[tokio::test]
    async fn test_preamble_always_sent() {
        struct PreambleCheck;

        #[async_trait::async_trait]
        impl ChatModel for PreambleCheck {
            async fn chat(&self, request: &ChatRequest) -> Result<String, LlmError> {
                Ok(request.preamble.clone().unwrap_or_default())
            }

            fn chat_model(&self) -> &str {
                "preamble"
            }
        }

        let chat = ChatService::new(Arc::new(PreambleCheck));
        assert!(chat.reply("x").await.starts_with("The following is a friendly conversation"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_replies_all_recorded() {
        let chat = Arc::new(ChatService::new(Arc::new(EchoModel)));

        let mut handles = Vec::new();
        for i in 0..8 {
            let chat = Arc::clone(&chat);
            handles.push(tokio::spawn(async move { chat.reply(&format!("msg {i}")).await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(chat.turn_count(), 8);
    }

    #[tokio::test]
    async fn test_stats_track_last_turn() {
        let chat = ChatService::new(Arc::new(EchoModel));
        assert_eq!(chat.stats(), ChatStats::default());

        let before = Utc::now();
        chat.reply("hi").await;
        let stats = chat.stats();
        assert_eq!(stats.turns, 1);
        assert!(stats.last_turn_at.unwrap() >= before);
    }

    #[tokio::test]
    async fn test_stats_readable_during_slow_reply() {
        struct SlowModel;

        #[async_trait::async_trait]
        impl ChatModel for SlowModel {
            async fn chat(&self, _request: &ChatRequest) -> Result<String, LlmError> {
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                Ok("late".into())
            }

            fn chat_model(&self) -> &str {
                "slow"
            }
        }

        let chat = Arc::new(ChatService::new(Arc::new(SlowModel)));
        let pending = {
            let chat = Arc::clone(&chat);
            tokio::spawn(async move { chat.reply("wait").await })
        };
        tokio::task::yield_now().await;

        assert_eq!(chat.turn_count(), 0);
        pending.abort();
    }
}
