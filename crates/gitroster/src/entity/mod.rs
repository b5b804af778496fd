//! SeaORM entity definitions for the gitroster database schema.

pub mod company;
pub mod import_job;
pub mod person;
pub mod prelude;
