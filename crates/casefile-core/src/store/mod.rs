/// Case store: the persistent object graph the engine registers into.
///
/// The engine is a pure client of [`CaseStore`]. Durable persistence,
/// identity assignment, and creation of the local files root on first use
/// are the store's concern. [`MemoryCaseStore`] is an arena-backed
/// implementation with JSON snapshots.
pub mod memory;

pub use memory::{MemoryCaseStore, NewImageFile, LOCAL_FILES_ROOT_NAME};

use crate::error::StoreError;
use crate::model::{CaseObject, ImageId, NewDerivedFile, NewLocalFile, ObjectId};

/// Name search key for [`CaseStore::find_by_name`].
///
/// Names are matched the way the case database matches them: SQL `LIKE`
/// semantics, case-insensitive, with `%` and `_` wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameQuery {
    /// Any object in the image whose name matches.
    Name(String),
    /// Objects whose name matches and whose parent path contains `dir_name`.
    InDirectory { name: String, dir_name: String },
}

impl NameQuery {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::InDirectory { name, .. } => name,
        }
    }
}

/// Operations the ingestion engine requires from a case store.
///
/// All calls are synchronous and blocking.
pub trait CaseStore: Send {
    /// Identity of the local files root, creating the root on first use.
    /// Repeated calls return the same identity.
    fn local_files_root_id(&mut self) -> Result<ObjectId, StoreError>;

    /// Look up an object by identity.
    fn object(&self, id: ObjectId) -> Result<Option<CaseObject>, StoreError>;

    /// Create a virtual directory. Names need not be unique.
    fn create_virtual_directory(
        &mut self,
        parent: ObjectId,
        name: &str,
    ) -> Result<ObjectId, StoreError>;

    /// Register a local file.
    fn create_local_file(&mut self, file: NewLocalFile) -> Result<ObjectId, StoreError>;

    /// Register a derived file.
    fn create_derived_file(&mut self, file: NewDerivedFile) -> Result<ObjectId, StoreError>;

    /// Image-backed files matching `query`, in store order.
    fn find_by_name(&self, image: ImageId, query: &NameQuery)
        -> Result<Vec<CaseObject>, StoreError>;

    /// Image-backed files at `path`, optionally prefixed with the image
    /// name and/or a volume name.
    fn resolve_path(&self, image: ImageId, path: &str) -> Result<Vec<CaseObject>, StoreError>;

    /// Direct children of `parent`, in no particular order.
    fn children(&self, parent: ObjectId) -> Result<Vec<CaseObject>, StoreError>;
}
