/// Ingestion engine: the synchronized public surface over the case store.
///
/// [`IngestEngine`] owns the case store behind a single
/// `parking_lot::Mutex`. Every operation, read or write, takes that lock,
/// so root resolution never races with tree ingestion and concurrent
/// callers observe fully serialized execution. A long directory walk
/// blocks every other caller of the same engine until it finishes.
///
/// Bulk additions are two-phase: every source path is validated before
/// anything is created, then roots are added in input order, stopping at
/// the first failure without rolling back what was already created.
pub mod naming;
mod root;
mod tree;
pub mod validator;

use crate::config::IngestConfig;
use crate::error::{IngestError, Result, StoreError, ValidationFailure};
use crate::model::{CaseObject, ImageId, NewDerivedFile, ObjectId};
use crate::notify::{ContentEvent, ContentSink, NullSink};
use crate::store::{CaseStore, NameQuery};
use parking_lot::Mutex;
use root::RootResolver;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tree::TreeIngestor;
use validator::LocalPathKind;

/// Mutable state guarded by the engine lock.
struct EngineState<S> {
    /// `None` once the engine has been closed.
    store: Option<S>,
    root: RootResolver,
}

impl<S: CaseStore> EngineState<S> {
    /// Borrow the store and resolver, failing if the engine was closed.
    fn open(&mut self) -> Result<(&mut S, &mut RootResolver)> {
        let Self { store, root } = self;
        let store = store.as_mut().ok_or(IngestError::EngineClosed)?;
        Ok((store, root))
    }
}

/// Maps local files and directory trees into a case store.
pub struct IngestEngine<S: CaseStore> {
    state: Mutex<EngineState<S>>,
    sink: Box<dyn ContentSink>,
    config: IngestConfig,
}

impl<S: CaseStore> IngestEngine<S> {
    /// Create an engine with default config that discards notifications.
    pub fn new(store: S) -> Self {
        Self::with_sink(store, NullSink, IngestConfig::default())
    }

    /// Create an engine that reports top-level additions to `sink`.
    ///
    /// The local files root is resolved (and created by the store if
    /// absent) immediately. If that fails the error is logged and the engine
    /// stays usable; operations that need the root retry the resolution.
    pub fn with_sink(mut store: S, sink: impl ContentSink + 'static, config: IngestConfig) -> Self {
        let mut root = RootResolver::default();
        root.prime(&mut store);
        Self {
            state: Mutex::new(EngineState {
                store: Some(store),
                root,
            }),
            sink: Box::new(sink),
            config,
        }
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().store.is_none()
    }

    /// Release the case store and hand it back to the caller.
    ///
    /// Every later operation fails with [`IngestError::EngineClosed`].
    /// Closing again is not an error and returns `None`.
    pub fn close(&self) -> Option<S> {
        let store = self.state.lock().store.take();
        if store.is_some() {
            info!("Ingestion engine closed");
        }
        store
    }

    /// Run `f` against the store under the engine lock.
    pub fn with_store<R>(&self, f: impl FnOnce(&S) -> R) -> Result<R> {
        let mut state = self.state.lock();
        let (store, _) = state.open()?;
        Ok(f(store))
    }

    /// The local files root, resolving it if that has not succeeded yet.
    pub fn local_files_root(&self) -> Result<CaseObject> {
        let mut state = self.state.lock();
        let (store, resolver) = state.open()?;
        let id = resolver.resolve(store)?;
        fetch(store, id)
    }

    /// Image-backed files whose name matches `name`.
    pub fn find_files(&self, image: ImageId, name: &str) -> Result<Vec<CaseObject>> {
        self.search(image, NameQuery::Name(name.to_string()))
    }

    /// Image-backed files whose name matches `name` and whose parent path
    /// contains `dir_name`.
    pub fn find_files_in_dir(
        &self,
        image: ImageId,
        name: &str,
        dir_name: &str,
    ) -> Result<Vec<CaseObject>> {
        self.search(
            image,
            NameQuery::InDirectory {
                name: name.to_string(),
                dir_name: dir_name.to_string(),
            },
        )
    }

    /// Image-backed files whose name matches `name` inside a directory
    /// named like `parent`.
    pub fn find_files_under(
        &self,
        image: ImageId,
        name: &str,
        parent: &CaseObject,
    ) -> Result<Vec<CaseObject>> {
        self.find_files_in_dir(image, name, &parent.name)
    }

    fn search(&self, image: ImageId, query: NameQuery) -> Result<Vec<CaseObject>> {
        let mut state = self.state.lock();
        let (store, _) = state.open()?;
        store.find_by_name(image, &query).map_err(|e| {
            IngestError::store(format!("Error finding {} in {image}", query.name()), e)
        })
    }

    /// Image-backed files at `path`. The path may be prefixed with the
    /// image name and/or a volume name.
    pub fn open_files(&self, image: ImageId, path: &str) -> Result<Vec<CaseObject>> {
        let mut state = self.state.lock();
        let (store, _) = state.open()?;
        store
            .resolve_path(image, path)
            .map_err(|e| IngestError::store(format!("Error resolving {path} in {image}"), e))
    }

    /// Register a derived file exactly as given. No collision naming is
    /// applied; the caller chooses a unique name.
    pub fn add_derived_file(&self, file: NewDerivedFile) -> Result<CaseObject> {
        let mut state = self.state.lock();
        let (store, _) = state.open()?;
        let name = file.name.clone();
        let parent = file.parent;
        let id = store.create_derived_file(file).map_err(|e| {
            IngestError::store(format!("Error adding derived file {name} under {parent}"), e)
        })?;
        debug!("Added derived file {name} as {id}");
        fetch(store, id)
    }

    /// Add local files and directories, returning one object per input
    /// path in input order.
    ///
    /// Every path is validated before anything is created; a single
    /// missing or unreadable path fails the whole call with
    /// [`IngestError::ValidationFailed`] and nothing added. After that,
    /// roots are added one by one and a content event is emitted for each.
    /// The first failure stops the call with
    /// [`IngestError::PartialCreationFailure`]: roots added before it (and
    /// whatever part of the failing root was created) remain in the store.
    pub fn add_local_files_dirs<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<CaseObject>> {
        let mut state = self.state.lock();
        let (store, resolver) = state.open()?;

        let mut roots: Vec<(PathBuf, LocalPathKind)> = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let path = validator::normalize(path).map_err(|_| IngestError::ValidationFailed {
                path: path.to_path_buf(),
                reason: ValidationFailure::Missing,
            })?;
            match validator::inspect(&path, self.config.follow_links) {
                Ok(kind) => roots.push((path, kind)),
                Err(reason) => {
                    error!(
                        "Local file or directory {} {reason}, aborting before any files are added",
                        path.display()
                    );
                    return Err(IngestError::ValidationFailed { path, reason });
                }
            }
        }
        if roots.is_empty() {
            return Ok(Vec::new());
        }

        let root_id = resolver.resolve(store)?;
        let mut ingestor = TreeIngestor::new(store, root_id, &self.config);
        let mut added = Vec::with_capacity(roots.len());

        for (path, kind) in roots {
            let created = match kind {
                LocalPathKind::Directory => ingestor.add_directory(&path),
                LocalPathKind::File | LocalPathKind::Other => ingestor.add_single_file(&path),
            }
            .and_then(|id| ingestor.fetch(id));

            match created {
                Ok(object) => {
                    info!("Added {} as {} ({})", path.display(), object.name, object.id);
                    self.sink.content_added(ContentEvent {
                        object: object.clone(),
                        source_path: path,
                    });
                    added.push(object);
                }
                Err(source) => {
                    error!("Local file or directory {} could not be added: {source}", path.display());
                    return Err(IngestError::PartialCreationFailure {
                        path,
                        added,
                        source: Box::new(source),
                    });
                }
            }
        }

        Ok(added)
    }
}

/// Read a freshly created object back from the store.
pub(crate) fn fetch<S: CaseStore>(store: &S, id: ObjectId) -> Result<CaseObject> {
    store
        .object(id)
        .and_then(|found| found.ok_or(StoreError::NotFound(id)))
        .map_err(|e| IngestError::store(format!("Created object {id} could not be read back"), e))
}
