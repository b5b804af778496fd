//! Person entity - a directory entry, possibly imported from GitHub.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "people")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    /// Markdown bio; may contain `[[Company]]` cross-references.
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,

    /// Path of the stored avatar, relative to the image directory.
    pub avatar_path: Option<String>,

    pub website: Option<String>,

    pub github_url: Option<String>,

    pub location: Option<String>,

    pub company_id: Option<Uuid>,

    /// Imported people stay hidden until an editor publishes them.
    pub is_published: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id"
    )]
    Company,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
