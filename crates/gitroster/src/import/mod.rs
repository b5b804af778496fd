//! The resumable GitHub connections import job.
//!
//! # Module Structure
//!
//! - [`types`] - Constants and `ImportOptions`
//! - [`progress`] - The persisted record: `ImportProgress`, `ImportStatus`, `ImportMode`
//! - [`events`] - Progress reporting: `ImportEvent`, `ProgressCallback`, `emit()`
//! - [`store`] - `ProgressStore` with memory and database implementations
//! - [`batch`] - `process_batch()`, one step of the crawl
//! - [`controller`] - `ImportController`, the caller-facing operations

pub mod batch;
pub mod controller;
mod errors;
mod events;
mod progress;
mod store;
mod types;

pub use batch::process_batch;
pub use controller::ImportController;
pub use errors::{ImportError, Result};
pub use events::{ImportEvent, ProgressCallback, emit};
pub use progress::{ImportMode, ImportProgress, ImportStatus, ProfileError};
pub use store::{DbProgressStore, MemoryProgressStore, ProgressStore, StoreError};
pub use types::{
    DEFAULT_BATCH_SIZE, DEFAULT_RATE_LIMIT_THRESHOLD, ImportOptions, JOB_NAME, MAX_LOGGED_ERRORS,
};
