//! Message sink abstraction — the "deliver a message" capability.

use async_trait::async_trait;

use crate::error::ChannelError;

/// A tappable choice offered with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonChoice {
    pub id: String,
    pub label: String,
}

impl ButtonChoice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// One outbound message produced by the conversation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub text: String,
    pub choices: Vec<ButtonChoice>,
}

impl OutboundMessage {
    /// A plain text message.
    pub fn text(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            text: text.into(),
            choices: Vec::new(),
        }
    }

    /// A message with choice buttons.
    pub fn with_choices(
        to: impl Into<String>,
        text: impl Into<String>,
        choices: Vec<ButtonChoice>,
    ) -> Self {
        Self {
            to: to.into(),
            text: text.into(),
            choices,
        }
    }
}

/// Delivers a message to a recipient address.
///
/// Delivery is fire-and-forget from the engine's perspective: the dispatch
/// layer logs failures and never retries.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), ChannelError>;
}
