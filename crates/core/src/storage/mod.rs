//! Blob store client for document content using Apache OpenDAL.
//!
//! This module provides vendor-agnostic object storage with support for:
//! - S3-compatible: MinIO, Cloudflare R2, AWS S3
//! - Azure Blob Storage
//! - Local filesystem (development only)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    BlobStore (trait)                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ ensure_bucket()            │ presign(key, expiry)               │
//! │ put_object(key, bytes)     │ remove_object(key)  (idempotent)   │
//! │ list_objects()             │ exists(key)                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │        OpendalBlobStore: TimeoutLayer + RetryLayer               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod key;
mod service;
mod size;

pub use config::{StorageConfig, StorageProvider};
pub use error::StorageError;
pub use key::{MAX_EXTENSION_LEN, generate_object_key};
pub use service::{BlobEntry, BlobStore, OpendalBlobStore, PresignedUrl};
pub use size::format_size;
