/// Mirrors local files and directory trees into the case store.
///
/// A directory root is anchored under a context container named after its
/// parent directory (one level of surrounding context, never the full
/// absolute path), or directly under the local files root when it has no
/// addressable parent. Its contents are then walked with `jwalk`, which
/// drives an explicit queue rather than recursing on the call stack, so
/// depth is bounded only by the heap.
///
/// **Ordering**: entries are sorted by name and yielded parent-first, so
/// the created graph is the same regardless of walker parallelism, and a
/// directory is always mirrored before anything inside it.
///
/// **Failure**: the first error aborts the rest of the walk. Objects that
/// were already created stay in the store; there is no rollback.
use super::naming;
use crate::config::{IngestConfig, TimestampPolicy};
use crate::error::IngestError;
use crate::model::{CaseObject, NewLocalFile, ObjectId, Timestamps};
use crate::store::CaseStore;
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use std::collections::HashMap;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};
use tracing::debug;

/// Running totals for one mirrored tree, used for the summary log line.
#[derive(Debug, Default)]
struct WalkStats {
    files: u64,
    dirs: u64,
    total_size: u64,
}

pub(crate) struct TreeIngestor<'a, S: CaseStore> {
    store: &'a mut S,
    /// The resolved local files root.
    root: ObjectId,
    config: &'a IngestConfig,
}

impl<'a, S: CaseStore> TreeIngestor<'a, S> {
    pub(crate) fn new(store: &'a mut S, root: ObjectId, config: &'a IngestConfig) -> Self {
        Self {
            store,
            root,
            config,
        }
    }

    /// Register one file (or special file) directly under the local files root.
    pub(crate) fn add_single_file(&mut self, path: &Path) -> Result<ObjectId, IngestError> {
        let name = display_name(path);
        let name = self.unique_name(self.root, &name, path)?;
        let (id, _) = self.create_leaf(self.root, path, &name)?;
        Ok(id)
    }

    /// Anchor a directory under its context container and mirror its contents.
    ///
    /// Returns the identity of the virtual directory standing for `path`.
    pub(crate) fn add_directory(&mut self, path: &Path) -> Result<ObjectId, IngestError> {
        let anchored = self.anchor(path)?;

        let start = Instant::now();
        let stats = self.mirror_tree(path, anchored)?;
        debug!(
            "Mirrored {}: {} files, {} dirs, {} bytes in {:?}",
            path.display(),
            stats.files,
            stats.dirs,
            stats.total_size,
            start.elapsed()
        );
        Ok(anchored)
    }

    /// Create the virtual directory standing for `path` without walking it.
    ///
    /// It goes under the context container when `path` has a named parent,
    /// and directly under the local files root for mount points and their
    /// immediate children.
    fn anchor(&mut self, path: &Path) -> Result<ObjectId, IngestError> {
        let anchor_parent = match context_name(path) {
            Some(context) => self.context_container(&context)?,
            None => self.root,
        };

        let name = display_name(path);
        let name = self.unique_name(anchor_parent, &name, path)?;
        self.create_directory(anchor_parent, &name, path)
    }

    /// Read a created object back from the store.
    pub(crate) fn fetch(&self, id: ObjectId) -> Result<CaseObject, IngestError> {
        super::fetch(&*self.store, id)
    }

    /// Reuse the local files root's virtual directory named `context`, or
    /// create it.
    fn context_container(&mut self, context: &str) -> Result<ObjectId, IngestError> {
        let existing = self
            .children_of(self.root)?
            .into_iter()
            .find(|child| child.is_virtual_directory() && child.name == context);
        match existing {
            Some(dir) => Ok(dir.id),
            None => {
                debug!("Creating context container {context}");
                self.store
                    .create_virtual_directory(self.root, context)
                    .map_err(|e| {
                        IngestError::store(
                            format!("Error creating context container {context}"),
                            e,
                        )
                    })
            }
        }
    }

    /// Walk everything below `source_root` and mirror it under `anchored`.
    fn mirror_tree(
        &mut self,
        source_root: &Path,
        anchored: ObjectId,
    ) -> Result<WalkStats, IngestError> {
        let mut stats = WalkStats::default();

        // Mirrored directory for every source directory seen so far. The
        // walk is parent-first, so a lookup miss means the walker broke
        // its ordering guarantee.
        let mut dir_map: HashMap<PathBuf, ObjectId> = HashMap::new();
        dir_map.insert(source_root.to_path_buf(), anchored);

        let walker = jwalk::WalkDir::new(source_root)
            .skip_hidden(false)
            .follow_links(self.config.follow_links)
            .sort(true)
            .parallelism(self.config.parallelism.to_jwalk());

        for entry_result in walker {
            let entry = entry_result.map_err(|err| walk_error(source_root, err))?;
            if entry.depth == 0 {
                continue;
            }

            let path = entry.path();
            let parent = path
                .parent()
                .and_then(|p| dir_map.get(p))
                .copied()
                .ok_or_else(|| IngestError::SourceIo {
                    path: path.clone(),
                    source: std::io::Error::other("parent directory was not mirrored"),
                })?;

            // Nested nodes land in a container created by this walk, whose
            // only children come from one directory listing: names are
            // already unique there, so no collision suffix is needed.
            let name = entry.file_name().to_string_lossy();

            if entry.file_type().is_dir() {
                let id = self.create_directory(parent, &name, &path)?;
                dir_map.insert(path, id);
                stats.dirs += 1;
            } else {
                let (_, size) = self.create_leaf(parent, &path, &name)?;
                stats.files += 1;
                stats.total_size += size;
            }
        }

        Ok(stats)
    }

    fn unique_name(&self, parent: ObjectId, name: &str, path: &Path) -> Result<String, IngestError> {
        let siblings = self.children_of(parent)?;
        Ok(naming::disambiguate(&siblings, name, path).into_owned())
    }

    fn children_of(&self, parent: ObjectId) -> Result<Vec<CaseObject>, IngestError> {
        self.store
            .children(parent)
            .map_err(|e| IngestError::store(format!("Error listing children of {parent}"), e))
    }

    fn create_directory(
        &mut self,
        parent: ObjectId,
        name: &str,
        source: &Path,
    ) -> Result<ObjectId, IngestError> {
        self.store.create_virtual_directory(parent, name).map_err(|e| {
            IngestError::store(
                format!("Error creating virtual directory for {}", source.display()),
                e,
            )
        })
    }

    /// Register a leaf after checking it still exists and is readable.
    /// Returns the new identity and the recorded size.
    fn create_leaf(
        &mut self,
        parent: ObjectId,
        path: &Path,
        name: &str,
    ) -> Result<(ObjectId, u64), IngestError> {
        let meta = if self.config.follow_links {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        }
        .map_err(|source| IngestError::SourceIo {
            path: path.to_path_buf(),
            source,
        })?;

        // Only regular files are opened; a fifo would block here.
        if meta.is_file() {
            fs::File::open(path).map_err(|source| IngestError::SourceIo {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let size = meta.len();
        let file = NewLocalFile {
            name: CompactString::new(name),
            source_path: path.to_path_buf(),
            size,
            times: timestamps(&meta, self.config.timestamps),
            is_file: meta.is_file(),
            parent: Some(parent),
        };
        let id = self.store.create_local_file(file).map_err(|e| {
            IngestError::store(format!("Error adding local file {}", path.display()), e)
        })?;
        Ok((id, size))
    }
}

/// Name of the directory holding `path`, if it has one worth keeping as
/// context. Mount points and their immediate children have none.
fn context_name(path: &Path) -> Option<String> {
    path.parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
}

/// Derive an object name for a source path: the final component, or for a
/// mount point such as `C:\` or `/` the path itself minus trailing separators.
pub(crate) fn display_name(path: &Path) -> String {
    if let Some(name) = path.file_name() {
        return name.to_string_lossy().into_owned();
    }
    let s = path.to_string_lossy();
    let trimmed = s.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        s.into_owned()
    } else {
        trimmed.to_string()
    }
}

fn timestamps(meta: &Metadata, policy: TimestampPolicy) -> Timestamps {
    match policy {
        TimestampPolicy::Zero => Timestamps::ZERO,
        TimestampPolicy::FromFilesystem => Timestamps {
            ctime: change_time(meta),
            crtime: epoch_secs(meta.created()),
            atime: epoch_secs(meta.accessed()),
            mtime: epoch_secs(meta.modified()),
        },
    }
}

fn epoch_secs(time: std::io::Result<SystemTime>) -> i64 {
    time.map(|t| DateTime::<Utc>::from(t).timestamp())
        .unwrap_or(0)
}

#[cfg(unix)]
fn change_time(meta: &Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    meta.ctime()
}

#[cfg(not(unix))]
fn change_time(_meta: &Metadata) -> i64 {
    0
}

fn walk_error(source_root: &Path, err: jwalk::Error) -> IngestError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| source_root.to_path_buf());
    IngestError::SourceIo {
        path,
        source: std::io::Error::other(err.to_string()),
    }
}
