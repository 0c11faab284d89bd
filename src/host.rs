use anyhow::Result;
use async_trait::async_trait;

/// One piece of an outgoing reply. The host delivers parts in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPart {
    Text(String),
    Image { filename: String, data: Vec<u8> },
}

impl ReplyPart {
    pub fn text(s: impl Into<String>) -> ReplyPart {
        ReplyPart::Text(s.into())
    }
}

/// Outbound side of the host messaging interface. The bot framework (or the
/// console front end) implements this; the game only ever talks through it.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn send(&self, session_id: &str, parts: Vec<ReplyPart>) -> Result<()>;
}
