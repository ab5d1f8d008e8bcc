//! Conversation state and reply delivery capabilities

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{BurstState, BurstTicket, Channel, ConversationMessage, Outbound, Result};

/// Conversation log plus the burst generation counter kept beside it
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Most recent public inbound message
    async fn latest_inbound(&self, conversation_id: &str) -> Result<Option<ConversationMessage>>;

    /// Public inbound messages created after the last outbound message,
    /// in arrival order
    async fn pending_inbound(&self, conversation_id: &str) -> Result<Vec<ConversationMessage>>;

    /// Last `limit` public messages (both directions), oldest first
    async fn recent_history(&self, conversation_id: &str, limit: usize)
        -> Result<Vec<ConversationMessage>>;

    /// Register an inbound message with the current burst
    ///
    /// Opens a new burst when none is open. Must bump the generation
    /// atomically with respect to concurrent callers.
    async fn join_burst(
        &self,
        conversation_id: &str,
        message_id: &str,
        at: DateTime<Utc>,
    ) -> Result<BurstTicket>;

    async fn burst_state(&self, conversation_id: &str) -> Result<Option<BurstState>>;

    /// Close the burst a reply was committed for
    ///
    /// Messages that joined after `generation` stay in an open burst.
    async fn close_burst(&self, conversation_id: &str, generation: u64) -> Result<()>;

    /// Delivery channel, used to decide on rich product cards
    async fn channel(&self, _conversation_id: &str) -> Result<Channel> {
        Ok(Channel::default())
    }
}

/// Delivery layer for replies, product cards and private notes
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn deliver(&self, conversation_id: &str, outbound: Outbound) -> Result<()>;
}
