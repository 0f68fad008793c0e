//! S3 storage client.
//!
//! This crate provides:
//! - Streaming download of source videos to local files
//! - Result document building and upload

pub mod client;
pub mod error;
pub mod result;

pub use client::{S3Client, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use result::{result_key, ResultDocument, ResultMetadata};
