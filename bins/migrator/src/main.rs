//! Database migration runner for Docstore.
//!
//! Reads `DATABASE_URL` (or `.env`).
//!
//! Usage:
//!   migrator up      - Create the documents and orphan_blobs tables
//!   migrator down    - Rollback last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations

use docstore_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Run the migrator CLI (it sets up its own tracing)
    cli::run_cli(Migrator).await;
}
