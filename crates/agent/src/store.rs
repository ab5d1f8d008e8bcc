//! In-memory conversation store and delivery sink
//!
//! Keeps each conversation's message log next to its burst state under one
//! map entry, so a generation bump and the message it belongs to are never
//! observed apart. Delivered payloads are appended to the same log as
//! outbound messages, which is what the pending-batch boundary reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use support_agent_core::{
    BurstState, BurstTicket, Channel, Clock, ConversationMessage, ConversationStore,
    MessageDirection, Outbound, ReplySink, Result, SystemClock,
};

#[derive(Debug, Default)]
struct ConversationLog {
    messages: Vec<ConversationMessage>,
    channel: Channel,
    burst: Option<BurstState>,
    /// Arrival time per generation of the open burst
    joins: Vec<(u64, DateTime<Utc>)>,
}

/// Conversation store backed by a concurrent map
pub struct InMemoryConversationStore {
    conversations: DashMap<String, ConversationLog>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Store whose outbound timestamps come from `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            conversations: DashMap::new(),
            clock,
        }
    }

    /// Append a message to the log
    pub fn append(&self, message: ConversationMessage) {
        self.conversations
            .entry(message.conversation_id.clone())
            .or_default()
            .messages
            .push(message);
    }

    pub fn set_channel(&self, conversation_id: &str, channel: Channel) {
        self.conversations
            .entry(conversation_id.to_string())
            .or_default()
            .channel = channel;
    }

    /// Full log in arrival order
    pub fn messages(&self, conversation_id: &str) -> Vec<ConversationMessage> {
        self.conversations
            .get(conversation_id)
            .map(|log| log.messages.clone())
            .unwrap_or_default()
    }

    /// Outbound messages, public and private, in delivery order
    pub fn outbound(&self, conversation_id: &str) -> Vec<ConversationMessage> {
        self.messages(conversation_id)
            .into_iter()
            .filter(|m| m.direction == MessageDirection::Outbound)
            .collect()
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn latest_inbound(&self, conversation_id: &str) -> Result<Option<ConversationMessage>> {
        Ok(self.conversations.get(conversation_id).and_then(|log| {
            log.messages
                .iter()
                .rev()
                .find(|m| m.is_public_inbound())
                .cloned()
        }))
    }

    async fn pending_inbound(&self, conversation_id: &str) -> Result<Vec<ConversationMessage>> {
        let Some(log) = self.conversations.get(conversation_id) else {
            return Ok(Vec::new());
        };

        // Private notes never close a batch; only a public reply does
        let boundary = log
            .messages
            .iter()
            .rposition(|m| m.direction == MessageDirection::Outbound && !m.private)
            .map(|i| i + 1)
            .unwrap_or(0);

        Ok(log.messages[boundary..]
            .iter()
            .filter(|m| m.is_public_inbound())
            .cloned()
            .collect())
    }

    async fn recent_history(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>> {
        let Some(log) = self.conversations.get(conversation_id) else {
            return Ok(Vec::new());
        };

        let public: Vec<&ConversationMessage> =
            log.messages.iter().filter(|m| !m.private).collect();
        let start = public.len().saturating_sub(limit);
        Ok(public[start..].iter().map(|m| (*m).clone()).collect())
    }

    async fn join_burst(
        &self,
        conversation_id: &str,
        message_id: &str,
        at: DateTime<Utc>,
    ) -> Result<BurstTicket> {
        let mut log = self
            .conversations
            .entry(conversation_id.to_string())
            .or_default();

        let state = match log.burst.take() {
            Some(mut state) if state.open => {
                state.generation += 1;
                state.latest_inbound_id = message_id.to_string();
                state
            },
            previous => {
                log.joins.clear();
                let (generation, committed_generation) = previous
                    .map(|s| (s.generation, s.committed_generation))
                    .unwrap_or((0, 0));
                BurstState {
                    generation: generation + 1,
                    started_at: at,
                    latest_inbound_id: message_id.to_string(),
                    open: true,
                    committed_generation,
                }
            },
        };

        let ticket = BurstTicket {
            generation: state.generation,
            started_at: state.started_at,
        };
        log.joins.push((state.generation, at));
        log.burst = Some(state);
        Ok(ticket)
    }

    async fn burst_state(&self, conversation_id: &str) -> Result<Option<BurstState>> {
        Ok(self
            .conversations
            .get(conversation_id)
            .and_then(|log| log.burst.clone()))
    }

    async fn close_burst(&self, conversation_id: &str, generation: u64) -> Result<()> {
        let Some(mut log) = self.conversations.get_mut(conversation_id) else {
            return Ok(());
        };
        let log = &mut *log;
        let Some(state) = log.burst.as_mut() else {
            return Ok(());
        };

        state.committed_generation = state.committed_generation.max(generation);
        if state.generation <= generation {
            state.open = false;
            log.joins.clear();
            return Ok(());
        }

        // Newer messages arrived while the reply was generated; they form
        // the next burst, which started with the first of them
        log.joins.retain(|(g, _)| *g > generation);
        if let Some((_, first)) = log.joins.first() {
            state.started_at = *first;
        }
        Ok(())
    }

    async fn channel(&self, conversation_id: &str) -> Result<Channel> {
        Ok(self
            .conversations
            .get(conversation_id)
            .map(|log| log.channel)
            .unwrap_or_default())
    }
}

#[async_trait]
impl ReplySink for InMemoryConversationStore {
    async fn deliver(&self, conversation_id: &str, outbound: Outbound) -> Result<()> {
        let mut message = ConversationMessage::outbound(
            uuid::Uuid::new_v4().to_string(),
            conversation_id,
            outbound.text(),
            self.clock.now(),
        );
        message.private = !outbound.is_public();
        message.metadata = serde_json::to_value(&outbound)?;

        tracing::debug!(
            conversation_id = %conversation_id,
            private = message.private,
            "Delivered outbound message"
        );
        self.append(message);
        Ok(())
    }
}
