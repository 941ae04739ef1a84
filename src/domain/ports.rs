use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A document fetched in full from the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub bytes: Vec<u8>,
    pub rev: String,
    pub server_modified: String,
}

/// Remote document store.
///
/// `get_metadata` is a cheap call that returns only the current revision
/// token; `download` transfers the document body together with its revision
/// metadata.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get_metadata(&self, path: &str) -> Result<String>;
    async fn download(&self, path: &str) -> Result<RemoteDocument>;
}

/// Guardian → registered students mapping.
#[async_trait]
pub trait GuardianRegistry: Send + Sync {
    /// Registered student ids for `sender`, in registration order.
    async fn list_students(&self, sender: &str) -> Result<Vec<String>>;
    /// Adds a relation; inserting an already-registered student is a no-op.
    async fn add_relation(&self, sender: &str, student_id: &str) -> Result<()>;
    /// Removes a relation, returning whether it existed and was removed.
    async fn remove_relation(&self, sender: &str, student_id: &str) -> Result<bool>;
}

/// Outbound side of the chat transport. Fire-and-forget: delivery failures
/// are the transport's concern, not the engine's.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, recipient: &str, text: &str);
}

/// Time source for session expiry and debt computation.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
    /// 1-based calendar month (enero = 1).
    fn current_month(&self) -> u32;
}

pub type RemoteStoreRef = Arc<dyn RemoteStore>;
pub type GuardianRegistryRef = Arc<dyn GuardianRegistry>;
pub type MessageSenderRef = Arc<dyn MessageSender>;
pub type ClockRef = Arc<dyn Clock>;
