use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use fundy_core::domain::order::OrderRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("order store I/O failed at `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("order record could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Append-only persistence for approved fund requests.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Appends one record. Callers must treat an error as "not recorded";
    /// approval messages are gated on this result.
    async fn append(&self, record: &OrderRecord) -> Result<(), StoreError>;

    /// Reads back every parseable record in file order.
    async fn list(&self) -> Result<Vec<OrderRecord>, StoreError>;
}

/// File-backed store writing one JSON object per line.
///
/// Appends are serialized through a lock so two turns cannot interleave
/// partial lines. Reading tolerates damaged lines, which a crash between
/// write and flush can leave behind.
pub struct JsonlOrderStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlOrderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }
}

#[async_trait]
impl OrderStore for JsonlOrderStore {
    async fn append(&self, record: &OrderRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        file.write_all(line.as_bytes()).await.map_err(|source| self.io_error(source))?;
        file.flush().await.map_err(|source| self.io_error(source))?;

        debug!(
            event_name = "orders.append.persisted",
            path = %self.path.display(),
            project_id = %record.project_id,
            amount = record.amount,
            "order appended"
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };

        let mut records = Vec::new();
        let mut damaged = 0usize;
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<OrderRecord>(line) {
                Ok(record) => records.push(record),
                Err(_) => damaged += 1,
            }
        }

        if damaged > 0 {
            warn!(
                event_name = "orders.list.damaged_lines",
                path = %self.path.display(),
                damaged,
                "unparseable order lines were skipped"
            );
        }
        Ok(records)
    }
}

/// In-memory store for tests and demos, with optional append failure
/// injection to exercise the "validated but not recorded" path.
#[derive(Default)]
pub struct InMemoryOrderStore {
    records: std::sync::Mutex<Vec<OrderRecord>>,
    fail_appends: bool,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every append fails.
    pub fn failing() -> Self {
        Self { records: std::sync::Mutex::new(Vec::new()), fail_appends: true }
    }

    pub fn records(&self) -> Vec<OrderRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn append(&self, record: &OrderRecord) -> Result<(), StoreError> {
        if self.fail_appends {
            return Err(StoreError::Io {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::other("appends disabled for this store"),
            });
        }
        match self.records.lock() {
            Ok(mut guard) => guard.push(record.clone()),
            Err(poisoned) => poisoned.into_inner().push(record.clone()),
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<OrderRecord>, StoreError> {
        Ok(self.records())
    }
}
