use crate::domain::ports::{GuardianRegistry, MessageSender, RemoteDocument, RemoteStore};
use crate::error::{BotError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory remote store with call counters and failure injection.
///
/// Stands in for the real document store in tests and exercises the cache's
/// metadata/download split.
#[derive(Default, Clone)]
pub struct InMemoryRemoteStore {
    docs: Arc<RwLock<HashMap<String, (Vec<u8>, String)>>>,
    metadata_calls: Arc<AtomicUsize>,
    download_calls: Arc<AtomicUsize>,
    metadata_fails: Arc<AtomicBool>,
    download_fails: Arc<AtomicBool>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, path: &str, bytes: Vec<u8>, rev: &str) {
        self.docs
            .write()
            .await
            .insert(path.to_string(), (bytes, rev.to_string()));
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn fail_metadata(&self, fail: bool) {
        self.metadata_fails.store(fail, Ordering::SeqCst);
    }

    pub fn fail_download(&self, fail: bool) {
        self.download_fails.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn get_metadata(&self, path: &str) -> Result<String> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.metadata_fails.load(Ordering::SeqCst) {
            return Err(BotError::Fetch("metadata unavailable".to_string()));
        }
        let docs = self.docs.read().await;
        docs.get(path)
            .map(|(_, rev)| rev.clone())
            .ok_or_else(|| BotError::Fetch(format!("{path} not found")))
    }

    async fn download(&self, path: &str) -> Result<RemoteDocument> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        if self.download_fails.load(Ordering::SeqCst) {
            return Err(BotError::Fetch("download unavailable".to_string()));
        }
        let docs = self.docs.read().await;
        let (bytes, rev) = docs
            .get(path)
            .ok_or_else(|| BotError::Fetch(format!("{path} not found")))?;
        Ok(RemoteDocument {
            bytes: bytes.clone(),
            rev: rev.clone(),
            server_modified: "2026-01-01T00:00:00Z".to_string(),
        })
    }
}

/// Guardian registry held only in memory; used by tests and by the binary's
/// ephemeral mode.
#[derive(Default, Clone)]
pub struct InMemoryGuardianRegistry {
    relations: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

impl InMemoryGuardianRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GuardianRegistry for InMemoryGuardianRegistry {
    async fn list_students(&self, sender: &str) -> Result<Vec<String>> {
        let relations = self.relations.read().await;
        Ok(relations.get(sender).cloned().unwrap_or_default())
    }

    async fn add_relation(&self, sender: &str, student_id: &str) -> Result<()> {
        let mut relations = self.relations.write().await;
        let students = relations.entry(sender.to_string()).or_default();
        if !students.iter().any(|id| id == student_id) {
            students.push(student_id.to_string());
        }
        Ok(())
    }

    async fn remove_relation(&self, sender: &str, student_id: &str) -> Result<bool> {
        let mut relations = self.relations.write().await;
        let Some(students) = relations.get_mut(sender) else {
            return Ok(false);
        };
        let before = students.len();
        students.retain(|id| id != student_id);
        Ok(students.len() < before)
    }
}

/// Sender that records every outbound message for later assertions.
#[derive(Default, Clone)]
pub struct RecordingSender {
    messages: Arc<RwLock<Vec<(String, String)>>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<(String, String)> {
        self.messages.read().await.clone()
    }

    pub async fn texts(&self) -> Vec<String> {
        self.messages
            .read()
            .await
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub async fn last_text(&self) -> Option<String> {
        self.messages
            .read()
            .await
            .last()
            .map(|(_, text)| text.clone())
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, recipient: &str, text: &str) {
        self.messages
            .write()
            .await
            .push((recipient.to_string(), text.to_string()));
    }
}
