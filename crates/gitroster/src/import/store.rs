//! Persistence of the import record.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use thiserror::Error;
use uuid::Uuid;

use super::progress::{ImportProgress, ImportStatus};
use super::types::JOB_NAME;
use crate::entity::import_job::{self, Entity as ImportJob};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Where the single import record lives between calls.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Load the record; a missing record is the idle one.
    async fn load(&self) -> Result<ImportProgress, StoreError>;

    async fn save(&self, progress: &ImportProgress) -> Result<(), StoreError>;
}

/// Process-local store. Progress is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    inner: Mutex<ImportProgress>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing record.
    pub fn with_progress(progress: ImportProgress) -> Self {
        Self {
            inner: Mutex::new(progress),
        }
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn load(&self) -> Result<ImportProgress, StoreError> {
        Ok(self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn save(&self, progress: &ImportProgress) -> Result<(), StoreError> {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = progress.clone();
        Ok(())
    }
}

/// Store backed by one row of `import_jobs`.
#[derive(Debug, Clone)]
pub struct DbProgressStore {
    db: DatabaseConnection,
    name: String,
}

impl DbProgressStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_name(db, JOB_NAME)
    }

    pub fn with_name(db: DatabaseConnection, name: impl Into<String>) -> Self {
        Self {
            db,
            name: name.into(),
        }
    }

    async fn find_row(&self) -> Result<Option<import_job::Model>, StoreError> {
        Ok(ImportJob::find()
            .filter(import_job::Column::Name.eq(self.name.as_str()))
            .one(&self.db)
            .await?)
    }
}

/// Rebuild what can be trusted from a row whose payload no longer decodes.
///
/// The seed user is dropped on purpose: an active record without one is stale
/// and only `reset` brings it back.
fn recover_from_columns(row: &import_job::Model, cause: &serde_json::Error) -> ImportProgress {
    ImportProgress {
        status: row.status.parse().unwrap_or(ImportStatus::Error),
        mode: row.mode.parse().unwrap_or_default(),
        last_error: Some(format!("Stored progress could not be read: {cause}")),
        updated_at: Some(row.updated_at.with_timezone(&Utc)),
        ..ImportProgress::default()
    }
}

#[async_trait]
impl ProgressStore for DbProgressStore {
    async fn load(&self) -> Result<ImportProgress, StoreError> {
        let Some(row) = self.find_row().await? else {
            return Ok(ImportProgress::idle());
        };

        match serde_json::from_str::<ImportProgress>(&row.payload) {
            Ok(progress) => Ok(progress),
            Err(e) => {
                tracing::warn!(job = %self.name, error = %e, "Import progress payload is unreadable");
                Ok(recover_from_columns(&row, &e))
            }
        }
    }

    async fn save(&self, progress: &ImportProgress) -> Result<(), StoreError> {
        let payload = serde_json::to_string(progress)?;
        let now = Utc::now();

        match self.find_row().await? {
            Some(existing) => {
                let mut model: import_job::ActiveModel = existing.into();
                model.status = Set(progress.status.to_string());
                model.source_username = Set(progress.source_username.clone());
                model.mode = Set(progress.mode.to_string());
                model.payload = Set(payload);
                model.updated_at = Set(now.into());
                model.update(&self.db).await?;
            }
            None => {
                import_job::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(self.name.clone()),
                    status: Set(progress.status.to_string()),
                    source_username: Set(progress.source_username.clone()),
                    mode: Set(progress.mode.to_string()),
                    payload: Set(payload),
                    updated_at: Set(now.into()),
                }
                .insert(&self.db)
                .await?;
            }
        }

        Ok(())
    }
}
