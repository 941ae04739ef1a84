use crate::domain::student::{FeeCell, Month, StudentRecord};
use crate::error::Result;
use crate::infrastructure::file_cache::RemoteFileCache;
use std::collections::BTreeMap;
use std::fs::File;
use std::sync::Arc;

// Fixed grid layout of the tuition ledger (0-based column indices,
// matching spreadsheet columns A, B, F, N and W..AH).
const COL_NAME: usize = 0;
const COL_GRADE: usize = 1;
const COL_ID: usize = 5;
const COL_FEE: usize = 13;
const COL_FIRST_MONTH: usize = 22;
const HEADER_ROWS: usize = 2;

/// Reader for the student tuition ledger.
///
/// The document is resolved through the cache on every lookup, so a changed
/// remote revision is picked up without restarting.
#[derive(Clone)]
pub struct StudentLedger {
    cache: Arc<RemoteFileCache>,
    remote_path: String,
}

impl StudentLedger {
    pub fn new(cache: Arc<RemoteFileCache>, remote_path: String) -> Self {
        Self { cache, remote_path }
    }

    /// Finds the student with `id`, or `Ok(None)` when absent.
    ///
    /// The scan is exhaustive: when several rows share an id, the last row
    /// in the document wins. That is the ledger's precedence rule for
    /// duplicate entries, not an error.
    pub async fn find_student(&self, id: &str) -> Result<Option<StudentRecord>> {
        let local = self.cache.resolve(&self.remote_path).await?;
        let file = File::open(&local)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut found = None;
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            if index < HEADER_ROWS {
                continue;
            }
            if cell(&record, COL_ID) != id {
                continue;
            }
            found = Some(parse_row(&record, id));
        }
        Ok(found)
    }
}

fn cell<'r>(record: &'r csv::StringRecord, column: usize) -> &'r str {
    record.get(column).unwrap_or("")
}

fn parse_row(record: &csv::StringRecord, id: &str) -> StudentRecord {
    let raw_fee = cell(record, COL_FEE).to_string();
    let monthly_fee = FeeCell::classify(&raw_fee).normalize();

    let months: BTreeMap<Month, String> = Month::ALL
        .into_iter()
        .enumerate()
        .map(|(offset, month)| {
            (month, cell(record, COL_FIRST_MONTH + offset).to_string())
        })
        .collect();

    StudentRecord {
        id: id.to_string(),
        name: cell(record, COL_NAME).to_string(),
        grade: cell(record, COL_GRADE).to_string(),
        monthly_fee,
        months,
        raw_fee,
    }
}
