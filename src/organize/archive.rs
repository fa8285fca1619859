use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use tempfile::NamedTempFile;
use zip::{ZipArchive, ZipWriter};

/// Extensions of containers that are zip files inside.
const ZIP_EXTENSIONS: &[&str] = &["zip", "cbz"];

/// Filename prefix of archives being rewritten.
pub const STAGING_PREFIX: &str = ".mangasort-";

/// What an archive holds at the top level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveContents {
    pub entry_count: usize,
    /// Set when every entry lives under one folder.
    pub root_folder: Option<String>,
}

/// Check if the lowercase extension belongs to a zip container.
#[must_use]
pub fn is_zip_container(extension: &str) -> bool {
    ZIP_EXTENSIONS.contains(&extension)
}

/// Read the entry list of a zip archive without extracting anything.
///
/// # Errors
/// Returns an error if the file cannot be opened or is not a valid zip archive.
pub fn inspect_archive(path: &Path) -> anyhow::Result<ArchiveContents> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let archive =
        ZipArchive::new(BufReader::new(file)).with_context(|| format!("Failed to read zip {}", path.display()))?;

    let mut roots: BTreeSet<&str> = BTreeSet::new();
    let mut has_root_files = false;
    for name in archive.file_names() {
        match name.split_once('/') {
            Some((root, _)) if !root.is_empty() => {
                roots.insert(root);
            }
            Some(_) => {}
            None => has_root_files = true,
        }
    }

    let root_folder = if !has_root_files && roots.len() == 1 {
        roots.first().map(ToString::to_string)
    } else {
        None
    };

    Ok(ArchiveContents {
        entry_count: archive.len(),
        root_folder,
    })
}

/// Write a copy of the archive with its top-level folder renamed.
///
/// Entries are copied raw, so nothing is recompressed and timestamps are kept.
/// The copy is a hidden temporary file in `staging_dir` that disappears when dropped,
/// so nothing changes on disk until it is committed.
///
/// # Errors
/// Returns an error if the archive cannot be read or the copy cannot be written.
pub fn stage_root_folder_rename(
    path: &Path,
    old_root: &str,
    new_root: &str,
    staging_dir: &Path,
) -> anyhow::Result<NamedTempFile> {
    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(".tmp")
        .tempfile_in(staging_dir)
        .with_context(|| format!("Failed to create temporary file in {}", staging_dir.display()))?;

    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).with_context(|| format!("Failed to read zip {}", path.display()))?;

    {
        let mut writer = ZipWriter::new(staged.as_file_mut());
        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index)?;
            let new_name = rename_root(entry.name(), old_root, new_root);
            writer
                .raw_copy_file_rename(entry, new_name)
                .with_context(|| format!("Failed to copy entry {index} of {}", path.display()))?;
        }
        writer.finish()?;
    }

    // Temporary files are created private, keep the original mode instead
    let permissions = fs::metadata(path)?.permissions();
    fs::set_permissions(staged.path(), permissions)?;

    Ok(staged)
}

/// Give the staged archive its final name. Never overwrites an existing file.
///
/// # Errors
/// Returns an error if the target exists or the staged file cannot be renamed.
pub fn commit_staged(staged: NamedTempFile, target: &Path) -> anyhow::Result<()> {
    staged
        .persist_noclobber(target)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(())
}

/// Swap the first path component of an entry name if it is the old root folder.
fn rename_root(name: &str, old_root: &str, new_root: &str) -> String {
    match name.strip_prefix(old_root) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => format!("{new_root}{rest}"),
        _ => name.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::{entry_names, write_zip};
    use super::*;

    use std::io::Read;

    use tempfile::tempdir;

    use crate::path_to_filename_string as path_to_filename;

    #[test]
    fn inspect_single_root_folder() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("てすと第1巻.zip");
        write_zip(&path, &[("てすと第1巻/", ""), ("てすと第1巻/test.txt", "test content")]);

        let contents = inspect_archive(&path).unwrap();
        assert_eq!(contents.entry_count, 2);
        assert_eq!(contents.root_folder.as_deref(), Some("てすと第1巻"));
    }

    #[test]
    fn inspect_root_level_files_has_no_root_folder() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flat.zip");
        write_zip(&path, &[("001.jpg", "a"), ("002.jpg", "b")]);

        assert_eq!(inspect_archive(&path).unwrap().root_folder, None);
    }

    #[test]
    fn inspect_multiple_root_folders_has_no_root_folder() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mixed.zip");
        write_zip(&path, &[("a/001.jpg", "a"), ("b/001.jpg", "b")]);

        assert_eq!(inspect_archive(&path).unwrap().root_folder, None);
    }

    #[test]
    fn inspect_corrupt_archive_is_a_zip_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.zip");
        fs::write(&path, b"definitely not a zip").unwrap();

        let error = inspect_archive(&path).unwrap_err();
        assert!(error.chain().any(|cause| cause.is::<zip::result::ZipError>()));
    }

    #[test]
    fn is_zip_container_extensions() {
        assert!(is_zip_container("zip"));
        assert!(is_zip_container("cbz"));
        assert!(!is_zip_container("rar"));
    }

    #[test]
    fn rename_root_only_touches_first_component() {
        assert_eq!(rename_root("old/page.jpg", "old", "new"), "new/page.jpg");
        assert_eq!(rename_root("old/", "old", "new"), "new/");
        assert_eq!(rename_root("older/page.jpg", "old", "new"), "older/page.jpg");
        assert_eq!(rename_root("x/old/page.jpg", "old", "new"), "x/old/page.jpg");
    }

    #[test]
    fn staged_rename_keeps_contents_and_original_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("てすと第1巻.zip");
        write_zip(&path, &[("てすと第1巻/", ""), ("てすと第1巻/test.txt", "test content")]);

        let staged = stage_root_folder_rename(&path, "てすと第1巻", "てすとフォルダ1第1巻", dir.path()).unwrap();

        assert_eq!(entry_names(&path), vec!["てすと第1巻/", "てすと第1巻/test.txt"]);
        assert_eq!(
            entry_names(staged.path()),
            vec!["てすとフォルダ1第1巻/", "てすとフォルダ1第1巻/test.txt"]
        );

        let mut archive = ZipArchive::new(File::open(staged.path()).unwrap()).unwrap();
        let mut content = String::new();
        archive
            .by_name("てすとフォルダ1第1巻/test.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "test content");
    }

    #[test]
    fn dropped_stage_leaves_no_temporary_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.zip");
        write_zip(&path, &[("a/1.jpg", "1")]);

        let staged = stage_root_folder_rename(&path, "a", "b", dir.path()).unwrap();
        assert!(path_to_filename(staged.path()).starts_with(STAGING_PREFIX));
        let staged_path = staged.path().to_path_buf();
        drop(staged);

        assert!(!staged_path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn commit_writes_target_in_staging_dir() {
        let dir = tempdir().unwrap();
        let library = dir.path().join("library");
        fs::create_dir(&library).unwrap();
        let path = dir.path().join("a.zip");
        write_zip(&path, &[("a/1.jpg", "1")]);

        let staged = stage_root_folder_rename(&path, "a", "b", &library).unwrap();
        let target = library.join("b.zip");
        commit_staged(staged, &target).unwrap();

        assert_eq!(entry_names(&target), vec!["b/1.jpg"]);
        assert_eq!(entry_names(&path), vec!["a/1.jpg"]);
        assert_eq!(fs::read_dir(&library).unwrap().count(), 1);
    }

    #[test]
    fn commit_never_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.zip");
        write_zip(&path, &[("a/1.jpg", "1")]);
        let target = dir.path().join("taken.zip");
        fs::write(&target, "existing").unwrap();

        let staged = stage_root_folder_rename(&path, "a", "b", dir.path()).unwrap();
        assert!(commit_staged(staged, &target).is_err());
        assert_eq!(fs::read(&target).unwrap(), b"existing");
    }
}
