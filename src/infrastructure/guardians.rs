use crate::domain::ports::GuardianRegistry;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

#[derive(Debug, Default, Serialize, Deserialize)]
struct GuardianMap {
    encargados: HashMap<String, GuardianEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GuardianEntry {
    alumnos: Vec<String>,
}

/// Guardian registry backed by a single JSON file.
///
/// The whole map is loaded at startup and rewritten in full on every
/// mutation. `Clone` shares the in-memory map and the file path.
#[derive(Clone)]
pub struct JsonGuardianRegistry {
    map: Arc<RwLock<GuardianMap>>,
    path: PathBuf,
}

impl JsonGuardianRegistry {
    /// Opens the registry at `path`. A missing file starts empty; an
    /// unreadable one is logged and treated as empty rather than blocking
    /// startup.
    pub fn open(path: PathBuf) -> Self {
        let map = match std::fs::read(&path) {
            Ok(raw) => match serde_json::from_slice(&raw) {
                Ok(map) => map,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "unreadable guardian file, starting empty");
                    GuardianMap::default()
                }
            },
            Err(_) => GuardianMap::default(),
        };
        Self {
            map: Arc::new(RwLock::new(map)),
            path,
        }
    }

    fn save(&self, map: &GuardianMap) -> Result<()> {
        let json = serde_json::to_vec_pretty(map)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[async_trait]
impl GuardianRegistry for JsonGuardianRegistry {
    async fn list_students(&self, sender: &str) -> Result<Vec<String>> {
        let map = self.map.read().await;
        Ok(map
            .encargados
            .get(sender)
            .map(|entry| entry.alumnos.clone())
            .unwrap_or_default())
    }

    async fn add_relation(&self, sender: &str, student_id: &str) -> Result<()> {
        let mut map = self.map.write().await;
        let entry = map.encargados.entry(sender.to_string()).or_default();
        if entry.alumnos.iter().any(|id| id == student_id) {
            return Ok(());
        }
        entry.alumnos.push(student_id.to_string());
        self.save(&map)
    }

    async fn remove_relation(&self, sender: &str, student_id: &str) -> Result<bool> {
        let mut map = self.map.write().await;
        let Some(entry) = map.encargados.get_mut(sender) else {
            return Ok(false);
        };
        let before = entry.alumnos.len();
        entry.alumnos.retain(|id| id != student_id);
        if entry.alumnos.len() == before {
            return Ok(false);
        }
        self.save(&map)?;
        Ok(true)
    }
}
