/// Arena-backed in-memory case store with JSON snapshots.
///
/// All objects live in a single `Vec<StoredNode>`. An object's identity is
/// its arena position, and children are linked via `first_child` /
/// `next_sibling` indices, so no per-node child `Vec` is needed and the
/// whole graph serialises as-is.
use super::{CaseStore, NameQuery};
use crate::error::StoreError;
use crate::model::{
    CaseObject, DerivedFileMeta, ImageFileMeta, ImageId, LocalFileMeta, NewDerivedFile,
    NewLocalFile, ObjectId, ObjectVariant, Timestamps,
};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Name given to the local files root when the store creates it.
pub const LOCAL_FILES_ROOT_NAME: &str = "$LocalFiles";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredNode {
    object: CaseObject,
    /// First child. Children form a singly-linked list via `next_sibling`.
    first_child: Option<ObjectId>,
    next_sibling: Option<ObjectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ImageRecord {
    name: CompactString,
    volumes: Vec<CompactString>,
}

/// Request to register a file parsed from a disk image.
///
/// Image parsing is done elsewhere; this exists so image-backed content
/// can be searched through the engine's read operations.
#[derive(Debug, Clone)]
pub struct NewImageFile {
    pub image: ImageId,
    pub volume: Option<CompactString>,
    /// Parent directory within the image. `None` for the filesystem root.
    pub parent: Option<ObjectId>,
    pub name: CompactString,
    pub size: u64,
    pub times: Timestamps,
    pub is_dir: bool,
}

/// The complete object graph of one case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryCaseStore {
    nodes: Vec<StoredNode>,
    images: Vec<ImageRecord>,
    local_files_root: Option<ObjectId>,
}

impl MemoryCaseStore {
    /// Create an empty case.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a case from a JSON snapshot written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let reader = BufReader::new(File::open(path)?);
        let store: Self = serde_json::from_reader(reader)?;
        debug!(
            "Loaded case snapshot {} ({} objects)",
            path.display(),
            store.len()
        );
        Ok(store)
    }

    /// Write the case to a JSON snapshot.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        debug!("Saved case snapshot {} ({} objects)", path.display(), self.len());
        Ok(())
    }

    /// Register a disk image and its volume labels.
    pub fn add_image(&mut self, name: &str, volumes: &[&str]) -> ImageId {
        let id = ImageId(self.images.len() as u32);
        self.images.push(ImageRecord {
            name: CompactString::new(name),
            volumes: volumes.iter().map(|v| CompactString::new(v)).collect(),
        });
        id
    }

    /// Register a file parsed from a disk image.
    pub fn add_image_file(&mut self, file: NewImageFile) -> Result<ObjectId, StoreError> {
        self.image(file.image)?;
        if let Some(parent) = file.parent {
            self.node(parent)?;
        }
        let variant = ObjectVariant::ImageFile(ImageFileMeta {
            image: file.image,
            volume: file.volume,
            size: file.size,
            times: file.times,
            is_dir: file.is_dir,
        });
        Ok(self.add_object(file.name, file.parent, variant))
    }

    /// Identity of the local files root, if it has been created.
    pub fn local_files_root(&self) -> Option<ObjectId> {
        self.local_files_root
    }

    /// Iterate over every object in creation order.
    pub fn objects(&self) -> impl Iterator<Item = &CaseObject> {
        self.nodes.iter().map(|n| &n.object)
    }

    /// Total number of objects in the case.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the case contains no objects.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Reconstruct the path of an object by walking up to its top-level
    /// ancestor, e.g. `/$LocalFiles/case1/evidence`.
    pub fn full_path(&self, id: ObjectId) -> Result<String, StoreError> {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = self.node(cur)?;
            segments.push(node.object.name.as_str());
            current = node.object.parent;
        }
        segments.reverse();
        Ok(format!("/{}", segments.join("/")))
    }

    /// Path of the directory holding `id`, always ending in `/`.
    fn parent_path(&self, id: ObjectId) -> Result<String, StoreError> {
        match self.node(id)?.object.parent {
            Some(parent) => Ok(format!("{}/", self.full_path(parent)?)),
            None => Ok("/".to_string()),
        }
    }

    fn node(&self, id: ObjectId) -> Result<&StoredNode, StoreError> {
        self.nodes.get(id.idx()).ok_or(StoreError::NotFound(id))
    }

    fn image(&self, id: ImageId) -> Result<&ImageRecord, StoreError> {
        self.images
            .get(id.0 as usize)
            .ok_or(StoreError::UnknownImage(id))
    }

    /// Allocate a new object in the arena and link it under its parent.
    ///
    /// The parent must already have been checked to exist.
    fn add_object(
        &mut self,
        name: CompactString,
        parent: Option<ObjectId>,
        variant: ObjectVariant,
    ) -> ObjectId {
        let id = ObjectId::new(self.nodes.len());
        self.nodes.push(StoredNode {
            object: CaseObject {
                id,
                name,
                parent,
                variant,
            },
            first_child: None,
            next_sibling: None,
        });
        if let Some(parent) = parent {
            // O(1): prepend to the parent's sibling list.
            let old_first = self.nodes[parent.idx()].first_child;
            self.nodes[id.idx()].next_sibling = old_first;
            self.nodes[parent.idx()].first_child = Some(id);
        }
        id
    }

    fn image_files(&self, image: ImageId) -> impl Iterator<Item = &CaseObject> {
        self.objects().filter(move |o| {
            matches!(&o.variant, ObjectVariant::ImageFile(meta) if meta.image == image)
        })
    }
}

impl CaseStore for MemoryCaseStore {
    fn local_files_root_id(&mut self) -> Result<ObjectId, StoreError> {
        if let Some(id) = self.local_files_root {
            return Ok(id);
        }
        let id = self.add_object(
            CompactString::new(LOCAL_FILES_ROOT_NAME),
            None,
            ObjectVariant::VirtualDirectory,
        );
        self.local_files_root = Some(id);
        debug!("Created local files root {id}");
        Ok(id)
    }

    fn object(&self, id: ObjectId) -> Result<Option<CaseObject>, StoreError> {
        Ok(self.nodes.get(id.idx()).map(|n| n.object.clone()))
    }

    fn create_virtual_directory(
        &mut self,
        parent: ObjectId,
        name: &str,
    ) -> Result<ObjectId, StoreError> {
        self.node(parent)?;
        Ok(self.add_object(
            CompactString::new(name),
            Some(parent),
            ObjectVariant::VirtualDirectory,
        ))
    }

    fn create_local_file(&mut self, file: NewLocalFile) -> Result<ObjectId, StoreError> {
        let parent = match file.parent {
            Some(parent) => {
                self.node(parent)?;
                parent
            }
            None => self.local_files_root_id()?,
        };
        let variant = ObjectVariant::LocalFile(LocalFileMeta {
            source_path: file.source_path,
            size: file.size,
            times: file.times,
            is_file: file.is_file,
        });
        Ok(self.add_object(file.name, Some(parent), variant))
    }

    fn create_derived_file(&mut self, file: NewDerivedFile) -> Result<ObjectId, StoreError> {
        self.node(file.parent)?;
        let variant = ObjectVariant::DerivedFile(DerivedFileMeta {
            storage_path: file.storage_path,
            size: file.size,
            times: file.times,
            is_file: file.is_file,
            derivation: file.derivation,
        });
        Ok(self.add_object(file.name, Some(file.parent), variant))
    }

    fn find_by_name(
        &self,
        image: ImageId,
        query: &NameQuery,
    ) -> Result<Vec<CaseObject>, StoreError> {
        self.image(image)?;
        let mut found = Vec::new();
        for object in self.image_files(image) {
            if !like_match(query.name(), &object.name) {
                continue;
            }
            if let NameQuery::InDirectory { dir_name, .. } = query {
                let parent_path = self.parent_path(object.id)?.to_ascii_lowercase();
                if !parent_path.contains(&dir_name.to_ascii_lowercase()) {
                    continue;
                }
            }
            found.push(object.clone());
        }
        Ok(found)
    }

    fn resolve_path(&self, image: ImageId, path: &str) -> Result<Vec<CaseObject>, StoreError> {
        let record = self.image(image)?;
        let normalised = path.replace('\\', "/");
        let all: Vec<&str> = normalised.split('/').filter(|c| !c.is_empty()).collect();
        let mut components: &[&str] = &all;

        if let Some(first) = components.first() {
            if first.eq_ignore_ascii_case(&record.name) {
                components = &components[1..];
            }
        }
        let mut volume = None;
        if let Some(first) = components.first() {
            volume = record
                .volumes
                .iter()
                .find(|v| v.eq_ignore_ascii_case(first))
                .cloned();
            if volume.is_some() {
                components = &components[1..];
            }
        }
        if components.is_empty() {
            return Ok(Vec::new());
        }
        let wanted = format!("/{}", components.join("/"));

        let mut found = Vec::new();
        for object in self.image_files(image) {
            if let (Some(wanted_volume), ObjectVariant::ImageFile(meta)) = (&volume, &object.variant)
            {
                if meta.volume.as_ref() != Some(wanted_volume) {
                    continue;
                }
            }
            if self.full_path(object.id)?.eq_ignore_ascii_case(&wanted) {
                found.push(object.clone());
            }
        }
        Ok(found)
    }

    fn children(&self, parent: ObjectId) -> Result<Vec<CaseObject>, StoreError> {
        let mut children = Vec::new();
        let mut child = self.node(parent)?.first_child;
        while let Some(id) = child {
            let node = &self.nodes[id.idx()];
            children.push(node.object.clone());
            child = node.next_sibling;
        }
        Ok(children)
    }
}

/// SQL `LIKE` matching: `%` matches any run of characters, `_` exactly
/// one; everything else compares ASCII case-insensitively.
fn like_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    // Position of the last `%` seen and the text position it is matched up to.
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        match p.get(pi) {
            Some('%') => {
                backtrack = Some((pi, ti));
                pi += 1;
            }
            Some(&c) if c == '_' || c.eq_ignore_ascii_case(&t[ti]) => {
                pi += 1;
                ti += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    pi = star + 1;
                    ti = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    p[pi..].iter().all(|&c| c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn image_file(
        store: &mut MemoryCaseStore,
        image: ImageId,
        volume: Option<&str>,
        parent: Option<ObjectId>,
        name: &str,
        is_dir: bool,
    ) -> ObjectId {
        store
            .add_image_file(NewImageFile {
                image,
                volume: volume.map(CompactString::new),
                parent,
                name: CompactString::new(name),
                size: if is_dir { 0 } else { 10 },
                times: Timestamps::ZERO,
                is_dir,
            })
            .unwrap()
    }

    /// Build an image with:
    ///
    /// ```text
    /// vol2: /Windows/System32/config/SAM
    ///       /Users/alice/NTUSER.DAT
    /// vol3: /Users/bob/NTUSER.DAT
    /// ```
    fn sample() -> (MemoryCaseStore, ImageId) {
        let mut store = MemoryCaseStore::new();
        let img = store.add_image("disk.E01", &["vol2", "vol3"]);
        let v2 = Some("vol2");
        let windows = image_file(&mut store, img, v2, None, "Windows", true);
        let system32 = image_file(&mut store, img, v2, Some(windows), "System32", true);
        let config = image_file(&mut store, img, v2, Some(system32), "config", true);
        image_file(&mut store, img, v2, Some(config), "SAM", false);
        let users = image_file(&mut store, img, v2, None, "Users", true);
        let alice = image_file(&mut store, img, v2, Some(users), "alice", true);
        image_file(&mut store, img, v2, Some(alice), "NTUSER.DAT", false);

        let v3 = Some("vol3");
        let users3 = image_file(&mut store, img, v3, None, "Users", true);
        let bob = image_file(&mut store, img, v3, Some(users3), "bob", true);
        image_file(&mut store, img, v3, Some(bob), "NTUSER.DAT", false);
        (store, img)
    }

    #[test]
    fn test_like_match() {
        assert!(like_match("ntuser.dat", "NTUSER.DAT"));
        assert!(like_match("%.dat", "NTUSER.DAT"));
        assert!(like_match("ntuser%", "NTUSER.DAT"));
        assert!(like_match("s_m", "SAM"));
        assert!(like_match("%", ""));
        assert!(like_match("%a%b%", "xxaxxbxx"));
        assert!(!like_match("s_m", "SAMX"));
        assert!(!like_match("%.log", "NTUSER.DAT"));
        assert!(!like_match("", "a"));
    }

    #[test]
    fn test_local_files_root_is_idempotent() {
        let mut store = MemoryCaseStore::new();
        let a = store.local_files_root_id().unwrap();
        let b = store.local_files_root_id().unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        let root = store.object(a).unwrap().unwrap();
        assert_eq!(root.name, LOCAL_FILES_ROOT_NAME);
        assert!(root.is_virtual_directory());
    }

    #[test]
    fn test_children_and_full_path() {
        let mut store = MemoryCaseStore::new();
        let root = store.local_files_root_id().unwrap();
        let case1 = store.create_virtual_directory(root, "case1").unwrap();
        let file = store
            .create_local_file(NewLocalFile {
                name: CompactString::new("a.txt"),
                source_path: PathBuf::from("/data/case1/a.txt"),
                size: 5,
                times: Timestamps::ZERO,
                is_file: true,
                parent: Some(case1),
            })
            .unwrap();

        let children = store.children(case1).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, file);
        assert_eq!(store.full_path(file).unwrap(), "/$LocalFiles/case1/a.txt");
    }

    #[test]
    fn test_local_file_without_parent_goes_under_root() {
        let mut store = MemoryCaseStore::new();
        let file = store
            .create_local_file(NewLocalFile {
                name: CompactString::new("loose.bin"),
                source_path: PathBuf::from("/tmp/loose.bin"),
                size: 1,
                times: Timestamps::ZERO,
                is_file: true,
                parent: None,
            })
            .unwrap();
        let root = store.local_files_root().unwrap();
        assert_eq!(store.object(file).unwrap().unwrap().parent, Some(root));
    }

    #[test]
    fn test_create_under_missing_parent_fails() {
        let mut store = MemoryCaseStore::new();
        let err = store
            .create_virtual_directory(ObjectId(99), "x")
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ObjectId(99))));
    }

    #[test]
    fn test_find_by_name() {
        let (store, img) = sample();
        let hits = store
            .find_by_name(img, &NameQuery::Name("ntuser.dat".into()))
            .unwrap();
        assert_eq!(hits.len(), 2);

        let hits = store
            .find_by_name(
                img,
                &NameQuery::InDirectory {
                    name: "ntuser.dat".into(),
                    dir_name: "alice".into(),
                },
            )
            .unwrap();
        assert_eq!(hits.len(), 1);

        assert!(store
            .find_by_name(ImageId(7), &NameQuery::Name("SAM".into()))
            .is_err());
    }

    #[test]
    fn test_resolve_path_with_prefixes() {
        let (store, img) = sample();
        assert_eq!(
            store
                .resolve_path(img, "/Windows/System32/config/SAM")
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            store
                .resolve_path(img, "disk.E01/vol2/windows/system32/config/sam")
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            store
                .resolve_path(img, "disk.E01\\vol3\\Users\\bob\\NTUSER.DAT")
                .unwrap()
                .len(),
            1
        );
        // Without a volume qualifier both Users trees are candidates.
        assert_eq!(store.resolve_path(img, "/Users").unwrap().len(), 2);
        assert!(store.resolve_path(img, "/vol3/Windows").unwrap().is_empty());
        assert!(store.resolve_path(img, "/").unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let (mut store, _img) = sample();
        let root = store.local_files_root_id().unwrap();
        store.create_virtual_directory(root, "case1").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.json");
        store.save(&path).unwrap();

        let mut loaded = MemoryCaseStore::load(&path).unwrap();
        assert_eq!(loaded.len(), store.len());
        assert_eq!(loaded.local_files_root_id().unwrap(), root);
        assert_eq!(loaded.children(root).unwrap()[0].name, "case1");
    }
}
