//! Conversation log types, burst bookkeeping and outbound payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::ValidationResult;

/// Delivery channel of a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    #[default]
    Web,
    Facebook,
    Instagram,
    Whatsapp,
    Email,
    Api,
}

impl Channel {
    /// Whether the channel can render product carousels
    pub fn supports_product_cards(&self) -> bool {
        matches!(self, Channel::Facebook | Channel::Instagram | Channel::Whatsapp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

/// One entry in a conversation's message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub conversation_id: String,
    pub direction: MessageDirection,
    /// Internal notes are never shown to the customer nor answered
    #[serde(default)]
    pub private: bool,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ConversationMessage {
    pub fn inbound(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            conversation_id: conversation_id.into(),
            direction: MessageDirection::Inbound,
            private: false,
            content: content.into(),
            created_at,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn outbound(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            direction: MessageDirection::Outbound,
            ..Self::inbound(id, conversation_id, content, created_at)
        }
    }

    pub fn is_public_inbound(&self) -> bool {
        self.direction == MessageDirection::Inbound && !self.private
    }
}

/// Ticket handed out when an inbound message joins a burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstTicket {
    pub generation: u64,
    /// Arrival of the first message in the burst
    pub started_at: DateTime<Utc>,
}

/// Per-conversation burst state stored next to the message log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurstState {
    /// Bumped on every public inbound message
    pub generation: u64,
    pub started_at: DateTime<Utc>,
    pub latest_inbound_id: String,
    /// Cleared once a reply for the burst has been committed
    pub open: bool,
    /// Highest generation a reply was committed for; tickets at or below it
    /// are already answered
    pub committed_generation: u64,
}

/// Rich product card for carousel-capable channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCard {
    pub title: String,
    pub price: Option<String>,
    pub image_url: Option<String>,
    pub link: Option<String>,
}

/// Payload handed to the delivery layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outbound {
    /// Customer-facing reply
    Reply {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        validation: Option<ValidationResult>,
    },
    /// Carousel with its intro line
    ProductCards {
        intro: String,
        cards: Vec<ProductCard>,
        /// Validation of the text the cards replace
        #[serde(skip_serializing_if = "Option::is_none")]
        validation: Option<ValidationResult>,
    },
    /// Internal note for human agents
    PrivateNote { content: String },
}

impl Outbound {
    pub fn reply(content: impl Into<String>) -> Self {
        Outbound::Reply {
            content: content.into(),
            validation: None,
        }
    }

    pub fn note(content: impl Into<String>) -> Self {
        Outbound::PrivateNote {
            content: content.into(),
        }
    }

    /// Whether the customer sees this payload
    pub fn is_public(&self) -> bool {
        !matches!(self, Outbound::PrivateNote { .. })
    }

    pub fn text(&self) -> String {
        match self {
            Outbound::Reply { content, .. } => content.clone(),
            Outbound::ProductCards { intro, cards, .. } => {
                let titles: Vec<&str> = cards.iter().map(|c| c.title.as_str()).collect();
                format!("{}\n{}", intro, titles.join("\n"))
            },
            Outbound::PrivateNote { content } => content.clone(),
        }
    }
}
