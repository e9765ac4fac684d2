/// Data model for objects registered in a case.
///
/// Re-exports the tagged object type and the creation requests the engine
/// hands to a [`CaseStore`](crate::store::CaseStore).
pub mod object;

pub use object::{
    CaseObject, DerivationDetails, DerivedFileMeta, FileKind, ImageFileMeta, ImageId,
    LocalFileMeta, NewDerivedFile, NewLocalFile, ObjectId, ObjectVariant, Timestamps,
};
