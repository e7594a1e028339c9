//! Common utilities and shared types for Re-Source.
//!
//! This crate provides the foundation used by every other crate:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based identifiers and canonical pair keys via [`IdGenerator`]
//! - **Storage**: Blob storage for listing images
//!
//! # Example
//!
//! ```no_run
//! use resource_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id = IdGenerator::new().generate();
//!     println!("{} -> {id}", config.server.url);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use storage::{
    ImageKind, LocalStorage, StorageBackend, UploadedFile, detect_image, generate_storage_key,
    is_allowed_image,
};
