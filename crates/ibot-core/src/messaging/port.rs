use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    formatting::notice_to_html,
    messaging::types::{ChatAction, MessagingCapabilities, Notice},
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the only implementation; the shape keeps platform details
/// (parse modes, retry-after handling) out of the poller and query code.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()>;

    /// Deliver a structured notice, truncated to the messenger's limits.
    async fn send_notice(&self, chat_id: ChatId, notice: &Notice) -> Result<MessageRef> {
        let html = notice_to_html(notice, self.capabilities().max_message_len);
        self.send_html(chat_id, &html).await
    }
}
