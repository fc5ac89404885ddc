//! Repository implementations for data access.

mod document;
mod orphan;

pub use document::DocumentRepository;
pub use orphan::OrphanBlobRepository;
