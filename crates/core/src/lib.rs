//! Core document storage logic for Docstore.
//!
//! This crate contains the coordinator with ZERO web or database dependencies.
//! The metadata store is reached through [`document::DocumentRepository`],
//! implemented by the db crate.
//!
//! # Modules
//!
//! - `storage` - Blob store client, object keys, size labels
//! - `document` - Document storage coordinator and its persistence traits

pub mod document;
pub mod storage;
