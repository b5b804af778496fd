//! The community directory the import commits into.
//!
//! The commit step only talks to these traits. [`SqlDirectory`] backs them with
//! the sea-orm schema in [`crate::entity`], [`FsImageStore`] keeps avatars on disk.

mod images;
mod sql;

use async_trait::async_trait;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use images::FsImageStore;
pub use sql::SqlDirectory;

/// Errors raised by directory collaborators.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {context}")]
    NotFound { context: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl DirectoryError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DirectoryError>;

/// A company in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub github_url: Option<String>,
}

/// A person in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub avatar_path: Option<String>,
    pub website: Option<String>,
    pub github_url: Option<String>,
    pub location: Option<String>,
    pub company_id: Option<Uuid>,
    pub is_published: bool,
}

/// Input for [`PersonDirectory::create_person`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPerson {
    pub name: String,
    pub bio: Option<String>,
    pub avatar_path: Option<String>,
    pub website: Option<String>,
    pub github_url: Option<String>,
    pub location: Option<String>,
    pub company_id: Option<Uuid>,
    pub is_published: bool,
}

#[async_trait]
pub trait PersonDirectory: Send + Sync {
    /// Find a person with the given GitHub profile URL or exactly the given name.
    async fn find_person(&self, github_url: &str, name: &str) -> Result<Option<Person>>;

    async fn create_person(&self, person: NewPerson) -> Result<Person>;
}

#[async_trait]
pub trait CompanyDirectory: Send + Sync {
    async fn list_companies(&self) -> Result<Vec<Company>>;

    /// Record the company's GitHub organization URL.
    async fn set_github_url(&self, company_id: Uuid, github_url: &str) -> Result<()>;
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store avatar bytes for `login`, returning the path to save on the person.
    async fn store_avatar(&self, login: &str, bytes: &[u8]) -> Result<String>;
}

#[cfg(test)]
pub(crate) use memory::MemoryDirectory;
