use crate::error::Result;
use crate::infrastructure::file_cache::RemoteFileCache;
use std::fs::File;
use std::sync::Arc;
use tracing::warn;

const COL_ID: usize = 0;
const COL_PIN: usize = 1;
const HEADER_ROWS: usize = 1;

/// Reader for the id → PIN authorization ledger.
#[derive(Clone)]
pub struct PinLedger {
    cache: Arc<RemoteFileCache>,
    remote_path: String,
}

impl PinLedger {
    pub fn new(cache: Arc<RemoteFileCache>, remote_path: String) -> Self {
        Self { cache, remote_path }
    }

    /// True iff some row matches both id and PIN exactly (case-sensitive).
    ///
    /// Fail-closed: any resolution or parse failure is logged and answered
    /// with `false`, never surfaced to the caller.
    pub async fn validate_pin(&self, student_id: &str, pin: &str) -> bool {
        match self.check(student_id, pin).await {
            Ok(valid) => valid,
            Err(err) => {
                warn!(error = %err, "PIN validation failed, rejecting");
                false
            }
        }
    }

    async fn check(&self, student_id: &str, pin: &str) -> Result<bool> {
        let local = self.cache.resolve(&self.remote_path).await?;
        let file = File::open(&local)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        for (index, record) in reader.records().enumerate() {
            let record = record?;
            if index < HEADER_ROWS {
                continue;
            }
            let id_cell = record.get(COL_ID).unwrap_or("");
            let pin_cell = record.get(COL_PIN).unwrap_or("");
            if id_cell == student_id && pin_cell == pin {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
