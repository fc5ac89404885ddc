//! Document storage coordination.
//!
//! Ties the blob store and the metadata store together: upload with
//! compensation, blob-first delete, metadata-only update, and retrieval URL
//! refresh.

mod error;
mod orphan;
mod service;
mod types;

#[cfg(test)]
mod tests;

pub use error::DocumentError;
pub use orphan::{LogOrphanRecorder, OrphanBlob, OrphanRecorder};
pub use service::{DocumentRepository, DocumentService, DocumentServiceConfig, MIN_SEARCH_LEN};
pub use types::{Document, DocumentFields, DocumentId, NewDocument, UploadInput};
