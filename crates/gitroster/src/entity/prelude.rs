//! Common re-exports for convenient entity usage.

pub use super::company::{
    ActiveModel as CompanyActiveModel, Column as CompanyColumn, Entity as CompanyEntity,
    Model as CompanyModel,
};
pub use super::import_job::{
    ActiveModel as ImportJobActiveModel, Column as ImportJobColumn, Entity as ImportJob,
    Model as ImportJobModel,
};
pub use super::person::{
    ActiveModel as PersonActiveModel, Column as PersonColumn, Entity as PersonEntity,
    Model as PersonModel,
};
