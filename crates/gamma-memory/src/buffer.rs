use std::sync::{Arc, OnceLock};

use tiktoken_rs::CoreBPE;
use tracing::debug;

use gamma_core::config::MemoryConfig;
use gamma_core::error::Result;
use gamma_core::traits::{LlmClient, SnapshotStore};
use gamma_core::types::{ChatMessage, Role, SessionId};

/// Get or initialize the tokenizer for cl100k_base.
fn tokenizer() -> &'static CoreBPE {
    static TOKENIZER: OnceLock<CoreBPE> = OnceLock::new();
    TOKENIZER
        .get_or_init(|| tiktoken_rs::cl100k_base().expect("Failed to load cl100k_base tokenizer"))
}

/// Token count using BPE tokenization (cl100k_base).
pub fn estimate_tokens(text: &str) -> usize {
    tokenizer().encode_ordinary(text).len()
}

/// Estimate token count for an entire ChatMessage: content plus serialized
/// tool calls, with 4 tokens of per-message overhead.
pub fn estimate_message_tokens(msg: &ChatMessage) -> usize {
    let mut total = estimate_tokens(&msg.content) + 4;
    if !msg.tool_calls.is_empty() {
        let serialized = serde_json::to_string(&msg.tool_calls).unwrap_or_default();
        total += estimate_tokens(&serialized);
    }
    total
}

/// Per-session conversation buffer with a token budget.
///
/// Appends are followed synchronously by budget enforcement: when a
/// summarizer is configured the oldest non-system messages are folded into
/// a single synthesized system message first; whatever still exceeds the
/// budget is head-evicted. Surviving messages keep their relative order.
pub struct MemoryStore {
    session_id: SessionId,
    messages: Vec<ChatMessage>,
    token_budget: usize,
    keep_recent: usize,
    summarizer: Option<Arc<dyn LlmClient>>,
}

impl MemoryStore {
    pub fn new(session_id: SessionId, token_budget: usize) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            token_budget,
            keep_recent: 5,
            summarizer: None,
        }
    }

    /// Build a store from the `[memory]` config section. The summarizer is
    /// only attached when summarization is enabled there.
    pub fn from_config(
        session_id: SessionId,
        config: &MemoryConfig,
        summarizer: Option<Arc<dyn LlmClient>>,
    ) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            token_budget: config.token_budget,
            keep_recent: config.keep_recent,
            summarizer: if config.enable_summarization {
                summarizer
            } else {
                None
            },
        }
    }

    /// Set how many of the most recent messages summarization leaves alone.
    pub fn with_keep_recent(mut self, keep_recent: usize) -> Self {
        self.keep_recent = keep_recent;
        self
    }

    /// Set the LLM used for best-effort summarization of old history.
    pub fn with_summarizer(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.summarizer = Some(llm);
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn token_budget(&self) -> usize {
        self.token_budget
    }

    /// Total estimated token count across all buffered messages.
    pub fn total_tokens(&self) -> usize {
        self.messages.iter().map(estimate_message_tokens).sum()
    }

    /// Snapshot of the ordered conversation for an LLM call.
    pub fn context(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Insert a system prompt at position 0 if the session has none yet.
    pub fn ensure_system_prompt(&mut self, prompt: &str) {
        let has_system = self
            .messages
            .first()
            .map(|m| m.role == Role::System)
            .unwrap_or(false);
        if !has_system {
            self.messages.insert(0, ChatMessage::system(prompt));
        }
    }

    /// Append a message, then enforce the token budget.
    pub async fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.enforce_budget().await;
    }

    /// Drop everything in the buffer.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Backup the buffer through a snapshot store, keyed by session.
    pub fn persist(&self, store: &dyn SnapshotStore) -> Result<()> {
        let value = serde_json::to_value(&self.messages)?;
        store.write(&format!("memory:{}", self.session_id), &value)
    }

    /// Restore a previously persisted buffer. Returns false when no
    /// snapshot exists for this session.
    pub fn restore(&mut self, store: &dyn SnapshotStore) -> Result<bool> {
        match store.read(&format!("memory:{}", self.session_id))? {
            Some(value) => {
                self.messages = serde_json::from_value(value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Shrink the buffer until the estimate fits the budget or only one
    /// message remains.
    async fn enforce_budget(&mut self) {
        if self.total_tokens() <= self.token_budget {
            return;
        }

        if self.summarizer.is_some() && self.messages.len() > self.keep_recent + 1 {
            self.summarize().await;
        }

        while self.total_tokens() > self.token_budget && self.messages.len() > 1 {
            let removed = self.messages.remove(0);
            debug!(role = ?removed.role, "Evicted oldest message to fit token budget");
        }
    }

    /// Replace the oldest non-system messages with one synthesized system
    /// message. Best-effort: on summarizer failure or empty output the
    /// batch is simply dropped (plain truncation).
    async fn summarize(&mut self) {
        let split = self.messages.len().saturating_sub(self.keep_recent);
        if split == 0 {
            return;
        }

        let batch: Vec<usize> = (0..split)
            .filter(|&i| self.messages[i].role != Role::System)
            .collect();
        if batch.is_empty() {
            return;
        }

        let transcript = batch
            .iter()
            .map(|&i| {
                let m = &self.messages[i];
                format!("{:?}: {}", m.role, m.content)
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Summarize the following conversation concisely, preserving key \
             facts, decisions, and file paths. Output only the summary.\n\n{}",
            transcript
        );

        let summary = match self.summarizer.as_ref() {
            Some(llm) => llm
                .chat(vec![ChatMessage::user(prompt)], &[])
                .await
                .ok()
                .map(|m| m.content)
                .filter(|c| !c.is_empty()),
            None => None,
        };

        let first = batch[0];
        for &i in batch.iter().rev() {
            self.messages.remove(i);
        }

        match summary {
            Some(text) => {
                let insert_at = first.min(self.messages.len());
                self.messages.insert(
                    insert_at,
                    ChatMessage::system(format!("[Conversation summary]\n{}", text)),
                );
                debug!(replaced = batch.len(), "Summarized oldest messages");
            }
            None => {
                debug!(
                    dropped = batch.len(),
                    "Summarization unavailable, truncated oldest messages"
                );
            }
        }
    }
}
