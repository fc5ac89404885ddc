//! `SeaORM` entity definitions.

pub mod documents;
pub mod orphan_blobs;
