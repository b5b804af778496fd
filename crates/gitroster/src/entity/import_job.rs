//! ImportJob entity - one row per named import job.
//!
//! Status, seed user and mode are mirrored into columns so a record whose
//! payload can no longer be decoded is still recognisable as an active job.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "import_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Job name, unique (e.g. `github-following-import`).
    #[sea_orm(unique)]
    pub name: String,

    pub status: String,

    pub source_username: Option<String>,

    pub mode: String,

    /// Serialized `ImportProgress`.
    #[sea_orm(column_type = "Text")]
    pub payload: String,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
