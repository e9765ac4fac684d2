/// Casefile Core: the case-file ingestion engine.
///
/// This crate maps loose files and directory trees supplied by an
/// investigator into a case store's object graph. It has no UI
/// dependencies and performs no persistence of file contents itself.
///
/// # Modules
///
/// - [`model`]: Case objects, identities, and creation requests.
/// - [`store`]: The `CaseStore` contract plus an arena-backed in-memory store.
/// - [`ingest`]: The ingestion engine facade and its collaborators.
/// - [`notify`]: Fire-and-forget "content added" notifications.
/// - [`config`]: Ingestion policy (timestamps, link following, walking).
/// - [`error`]: Error types shared across the crate.
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod notify;
pub mod store;

pub use config::IngestConfig;
pub use error::{IngestError, StoreError};
pub use ingest::IngestEngine;
pub use store::{CaseStore, MemoryCaseStore};
