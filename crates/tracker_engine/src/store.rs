use std::fs;
use std::io;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracker_logging::tracker_debug;

use crate::persist::is_plain_file_name;
use crate::{AtomicFileWriter, PersistError, SaveError, SaveFailureKind, SaveOperation};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not encode record: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("invalid record id or table {0:?}")]
    InvalidKey(String),
    #[error("no record {id:?} in {table}")]
    NotFound { table: String, id: String },
    #[error("backend responded with http status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("backend request timed out: {0}")]
    Timeout(String),
    #[error("backend unreachable: {0}")]
    Network(String),
    #[error("invalid backend configuration: {0}")]
    Config(String),
}

impl From<StoreError> for SaveError {
    fn from(err: StoreError) -> Self {
        let kind = match &err {
            StoreError::Serialization(_) => SaveFailureKind::Serialization,
            StoreError::Persist(_) => SaveFailureKind::Io,
            StoreError::InvalidKey(_) | StoreError::Config(_) => SaveFailureKind::Rejected,
            StoreError::NotFound { .. } => SaveFailureKind::NotFound,
            StoreError::HttpStatus { status, .. } => SaveFailureKind::HttpStatus(*status),
            StoreError::Timeout(_) => SaveFailureKind::Timeout,
            StoreError::Network(_) => SaveFailureKind::Network,
        };
        SaveError::new(kind, err.to_string())
    }
}

/// A backend that can overwrite one record addressed by table and id.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn update_by_id(
        &self,
        table: &str,
        id: &str,
        body: &serde_json::Value,
    ) -> Result<(), StoreError>;
}

/// Stores each record as `{dir}/{table}/{id}.json`.
///
/// Updating a record that does not exist yet creates it.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn writer(&self, table: &str) -> Result<AtomicFileWriter, StoreError> {
        if !is_plain_file_name(table) {
            return Err(StoreError::InvalidKey(table.to_string()));
        }
        Ok(AtomicFileWriter::new(self.dir.join(table)))
    }

    fn file_name(id: &str) -> Result<String, StoreError> {
        if !is_plain_file_name(id) {
            return Err(StoreError::InvalidKey(id.to_string()));
        }
        Ok(format!("{id}.json"))
    }

    /// Reads a record back; `Ok(None)` when it was never written.
    pub fn load_by_id<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        let path = self.writer(table)?.dir().join(Self::file_name(id)?);
        let content = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::Persist(PersistError::Io(err))),
        };
        Ok(Some(serde_json::from_slice(&content)?))
    }
}

#[async_trait::async_trait]
impl RecordStore for FileRecordStore {
    async fn update_by_id(
        &self,
        table: &str,
        id: &str,
        body: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let writer = self.writer(table)?;
        let file_name = Self::file_name(id)?;
        let content = serde_json::to_vec_pretty(body)?;

        let path = tokio::task::spawn_blocking(move || writer.write(&file_name, &content))
            .await
            .map_err(|err| StoreError::Persist(PersistError::Io(io::Error::other(err))))??;
        tracker_debug!("record written to {:?}", path);
        Ok(())
    }
}

/// Saves payloads by serializing them and updating their record in `store`.
pub struct RecordSaver<S, F> {
    store: S,
    table: String,
    id_of: F,
}

impl<S, F> RecordSaver<S, F> {
    /// `id_of` extracts the record id from a payload.
    pub fn new(store: S, table: impl Into<String>, id_of: F) -> Self {
        Self {
            store,
            table: table.into(),
            id_of,
        }
    }
}

#[async_trait::async_trait]
impl<T, S, F> SaveOperation<T> for RecordSaver<S, F>
where
    T: Serialize + Send + 'static,
    S: RecordStore,
    F: Fn(&T) -> String + Send + Sync,
{
    async fn save(&self, payload: T) -> Result<(), SaveError> {
        let id = (self.id_of)(&payload);
        let body = serde_json::to_value(&payload).map_err(StoreError::from)?;
        self.store.update_by_id(&self.table, &id, &body).await?;
        Ok(())
    }
}
