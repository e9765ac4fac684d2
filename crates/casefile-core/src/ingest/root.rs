/// Resolution and caching of the local files root.
///
/// The store creates the root on first use; the resolver only remembers
/// the identity so the store is asked at most once per successful
/// resolution. Once set, the cached identity never changes.
use crate::error::{IngestError, StoreError};
use crate::model::ObjectId;
use crate::store::CaseStore;
use tracing::{debug, error};

#[derive(Debug, Default)]
pub(crate) struct RootResolver {
    cached: Option<ObjectId>,
}

impl RootResolver {
    /// Attempt resolution eagerly, logging instead of failing.
    ///
    /// Used at engine construction: a store that cannot produce the root
    /// leaves the engine open but unresolved.
    pub(crate) fn prime<S: CaseStore>(&mut self, store: &mut S) {
        if let Err(err) = self.try_resolve(store) {
            error!("Error getting or creating the local files root at engine start: {err}");
        }
    }

    /// The cached root identity, resolving it now if needed.
    pub(crate) fn resolve<S: CaseStore>(&mut self, store: &mut S) -> Result<ObjectId, IngestError> {
        self.try_resolve(store)
            .map_err(|e| IngestError::store("Local files root is unavailable", e))
    }

    fn try_resolve<S: CaseStore>(&mut self, store: &mut S) -> Result<ObjectId, StoreError> {
        if let Some(id) = self.cached {
            return Ok(id);
        }
        let id = store.local_files_root_id()?;
        debug!("Resolved local files root {id}");
        self.cached = Some(id);
        Ok(id)
    }

    #[cfg(test)]
    pub(crate) fn cached(&self) -> Option<ObjectId> {
        self.cached
    }
}
