//! S3 source bucket client for the Lectern pipeline.
//!
//! Core logic depends on nothing beyond "fetch by key to a local path";
//! bucket layout and lifecycle belong to the upload service.

pub mod client;
pub mod error;

pub use client::{local_filename_for_key, local_path_for_key, SourceBucket, SourceBucketConfig};
pub use error::{StorageError, StorageResult};
