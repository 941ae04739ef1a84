use crate::domain::ports::MessageSender;
use async_trait::async_trait;

/// Transport adapter that prints outbound messages to stdout.
///
/// Used by the binary's interactive mode, where one stdin line is one
/// inbound message.
#[derive(Debug, Default, Clone)]
pub struct ConsoleSender;

impl ConsoleSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageSender for ConsoleSender {
    async fn send(&self, recipient: &str, text: &str) {
        println!("[{recipient}]\n{text}\n");
    }
}
