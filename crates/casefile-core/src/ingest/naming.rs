/// Collision naming: derives a unique target name for a new child.
///
/// A sibling collides with a candidate when it is a virtual directory or
/// local file of the same name, or when it records the same source path.
/// The suffix is the collision count (`report.txt_1`), bumped further if
/// that suffixed name is itself already taken.
use crate::model::{CaseObject, ObjectVariant};
use std::borrow::Cow;
use std::path::Path;

/// Count siblings that collide with `name` / `source_path`.
///
/// Each sibling counts at most once even if both its name and its source
/// path match.
pub fn count_collisions(siblings: &[CaseObject], name: &str, source_path: &Path) -> usize {
    siblings
        .iter()
        .filter(|child| {
            let same_name = child.name == name
                && matches!(
                    child.variant,
                    ObjectVariant::VirtualDirectory | ObjectVariant::LocalFile(_)
                );
            same_name || child.source_path() == Some(source_path)
        })
        .count()
}

/// Pick the name for a new child of a container holding `siblings`.
pub fn disambiguate<'a>(siblings: &[CaseObject], name: &'a str, source_path: &Path) -> Cow<'a, str> {
    let count = count_collisions(siblings, name, source_path);
    if count == 0 {
        return Cow::Borrowed(name);
    }
    let mut suffix = count;
    loop {
        let candidate = format!("{name}_{suffix}");
        if !siblings.iter().any(|child| child.name == candidate.as_str()) {
            return Cow::Owned(candidate);
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageFileMeta, ImageId, LocalFileMeta, ObjectId, Timestamps};
    use compact_str::CompactString;
    use std::path::PathBuf;

    fn vdir(id: u64, name: &str) -> CaseObject {
        CaseObject {
            id: ObjectId(id),
            name: CompactString::new(name),
            parent: Some(ObjectId(0)),
            variant: ObjectVariant::VirtualDirectory,
        }
    }

    fn local(id: u64, name: &str, source: &str) -> CaseObject {
        CaseObject {
            id: ObjectId(id),
            name: CompactString::new(name),
            parent: Some(ObjectId(0)),
            variant: ObjectVariant::LocalFile(LocalFileMeta {
                source_path: PathBuf::from(source),
                size: 1,
                times: Timestamps::ZERO,
                is_file: true,
            }),
        }
    }

    #[test]
    fn test_no_collision_keeps_name() {
        let siblings = vec![vdir(1, "other")];
        assert_eq!(
            disambiguate(&siblings, "evidence", Path::new("/data/evidence")),
            "evidence"
        );
    }

    #[test]
    fn test_directory_name_collision() {
        let siblings = vec![vdir(1, "evidence")];
        assert_eq!(
            disambiguate(&siblings, "evidence", Path::new("/data/evidence")),
            "evidence_1"
        );
    }

    #[test]
    fn test_distinct_files_with_same_name() {
        let siblings = vec![local(1, "report.txt", "/tmp/a/report.txt")];
        assert_eq!(
            disambiguate(&siblings, "report.txt", Path::new("/tmp/b/report.txt")),
            "report.txt_1"
        );
    }

    #[test]
    fn test_same_source_path_counts_once() {
        let siblings = vec![local(1, "report.txt", "/tmp/a/report.txt")];
        assert_eq!(
            count_collisions(&siblings, "report.txt", Path::new("/tmp/a/report.txt")),
            1
        );
    }

    #[test]
    fn test_renamed_copy_of_same_source_still_counts() {
        let siblings = vec![
            local(1, "report.txt", "/tmp/a/report.txt"),
            local(2, "report.txt_1", "/tmp/a/report.txt"),
        ];
        assert_eq!(
            disambiguate(&siblings, "report.txt", Path::new("/tmp/a/report.txt")),
            "report.txt_2"
        );
    }

    #[test]
    fn test_taken_suffix_is_skipped() {
        // Two earlier additions of the same directory name: the plain name
        // and `_1`. A count of 1 would reuse `_1`, so the suffix is bumped.
        let siblings = vec![vdir(1, "evidence"), vdir(2, "evidence_1")];
        assert_eq!(
            disambiguate(&siblings, "evidence", Path::new("/mnt/evidence")),
            "evidence_2"
        );
    }

    #[test]
    fn test_image_files_do_not_collide_by_name() {
        let siblings = vec![CaseObject {
            id: ObjectId(1),
            name: CompactString::new("evidence"),
            parent: Some(ObjectId(0)),
            variant: ObjectVariant::ImageFile(ImageFileMeta {
                image: ImageId(0),
                volume: None,
                size: 0,
                times: Timestamps::ZERO,
                is_dir: true,
            }),
        }];
        assert_eq!(
            disambiguate(&siblings, "evidence", Path::new("/data/evidence")),
            "evidence"
        );
    }
}
