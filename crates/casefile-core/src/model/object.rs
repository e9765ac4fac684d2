/// A single object in a case: virtual directory, local file, image-backed
/// file, or derived file.
///
/// Objects reference their parent by identity only. The case store owns
/// the canonical graph; a `CaseObject` is a detached snapshot of one node.
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identity of an object, assigned by the case store and unique within a case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl ObjectId {
    /// Create an `ObjectId` from an arena position.
    #[inline]
    pub fn new(index: usize) -> Self {
        Self(index as u64)
    }

    /// Return the id as a `usize` for arena indexing.
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a disk image registered in the case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(pub u32);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image#{}", self.0)
    }
}

/// The four MAC-style timestamps recorded for a file, in seconds since the
/// Unix epoch. Zero means "not recorded".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// Metadata change time.
    pub ctime: i64,
    /// Creation time.
    pub crtime: i64,
    /// Last access time.
    pub atime: i64,
    /// Last modification time.
    pub mtime: i64,
}

impl Timestamps {
    /// All four timestamps unset.
    pub const ZERO: Self = Self {
        ctime: 0,
        crtime: 0,
        atime: 0,
        mtime: 0,
    };
}

/// Plain discriminant of [`ObjectVariant`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    VirtualDirectory,
    LocalFile,
    ImageFile,
    DerivedFile,
}

/// Metadata of a registered reference to an external file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFileMeta {
    /// Absolute path of the file on the investigator's machine.
    pub source_path: PathBuf,
    pub size: u64,
    pub times: Timestamps,
    /// `false` for special files (fifos, sockets, unfollowed links).
    pub is_file: bool,
}

/// Metadata of a file parsed out of a disk image by another subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFileMeta {
    pub image: ImageId,
    /// Volume label within the image, when the image is partitioned.
    pub volume: Option<CompactString>,
    pub size: u64,
    pub times: Timestamps,
    pub is_dir: bool,
}

/// Re-derivation details recorded alongside a derived file.
///
/// These are stored verbatim and never interpreted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationDetails {
    pub rederive: String,
    pub tool_name: String,
    pub tool_version: String,
    pub other: String,
}

/// Metadata of a file produced by transforming another object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFileMeta {
    /// Storage path relative to the case directory.
    pub storage_path: PathBuf,
    pub size: u64,
    pub times: Timestamps,
    pub is_file: bool,
    pub derivation: DerivationDetails,
}

/// Closed set of object variants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectVariant {
    VirtualDirectory,
    LocalFile(LocalFileMeta),
    ImageFile(ImageFileMeta),
    DerivedFile(DerivedFileMeta),
}

/// A detached snapshot of one object in the case graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseObject {
    pub id: ObjectId,
    /// Object name only (NOT a path).
    pub name: CompactString,
    /// Parent identity. `None` for top-level objects such as the local
    /// files root or an image's root directory.
    pub parent: Option<ObjectId>,
    pub variant: ObjectVariant,
}

impl CaseObject {
    pub fn kind(&self) -> FileKind {
        match self.variant {
            ObjectVariant::VirtualDirectory => FileKind::VirtualDirectory,
            ObjectVariant::LocalFile(_) => FileKind::LocalFile,
            ObjectVariant::ImageFile(_) => FileKind::ImageFile,
            ObjectVariant::DerivedFile(_) => FileKind::DerivedFile,
        }
    }

    /// Recorded source path, for local files only.
    pub fn source_path(&self) -> Option<&Path> {
        match &self.variant {
            ObjectVariant::LocalFile(meta) => Some(&meta.source_path),
            ObjectVariant::VirtualDirectory
            | ObjectVariant::ImageFile(_)
            | ObjectVariant::DerivedFile(_) => None,
        }
    }

    /// Size in bytes. Virtual directories have no size of their own.
    pub fn size(&self) -> u64 {
        match &self.variant {
            ObjectVariant::VirtualDirectory => 0,
            ObjectVariant::LocalFile(meta) => meta.size,
            ObjectVariant::ImageFile(meta) => meta.size,
            ObjectVariant::DerivedFile(meta) => meta.size,
        }
    }

    pub fn is_virtual_directory(&self) -> bool {
        matches!(self.variant, ObjectVariant::VirtualDirectory)
    }
}

/// Request to register a local file in the case store.
#[derive(Clone, Debug)]
pub struct NewLocalFile {
    pub name: CompactString,
    pub source_path: PathBuf,
    pub size: u64,
    pub times: Timestamps,
    pub is_file: bool,
    /// Parent container. `None` places the file under the local files root.
    pub parent: Option<ObjectId>,
}

/// Request to register a derived file in the case store.
///
/// The caller is expected to have already chosen a unique name.
#[derive(Clone, Debug)]
pub struct NewDerivedFile {
    pub name: CompactString,
    pub storage_path: PathBuf,
    pub size: u64,
    pub times: Timestamps,
    pub is_file: bool,
    /// The object this file was derived from.
    pub parent: ObjectId,
    pub derivation: DerivationDetails,
}
