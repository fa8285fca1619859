use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tempfile::NamedTempFile;

use crate::insert_suffix_before_extension;
use crate::organize::archive::{commit_staged, is_zip_container, stage_root_folder_rename};
use crate::organize::title::normalize_title;
use crate::organize::types::{ArchiveFile, SeriesFolder};
use crate::path_to_filename_string;

/// Where an archive goes and what changes on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub source: PathBuf,
    pub target: PathBuf,
    /// New filename stem when the archive is renamed to the folder title.
    pub new_stem: Option<String>,
    /// Old and new name of the top-level folder inside the archive.
    pub internal_root: Option<(String, String)>,
}

impl MovePlan {
    #[must_use]
    pub const fn renamed(&self) -> bool {
        self.new_stem.is_some()
    }

    #[must_use]
    pub fn is_in_place(&self) -> bool {
        self.source == self.target
    }

    #[must_use]
    pub fn target_name(&self) -> String {
        path_to_filename_string(&self.target)
    }

    /// Directory the archive is moved into.
    #[must_use]
    pub fn target_dir(&self) -> &Path {
        self.target.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// Plans and performs archive moves.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mover {
    keep_names: bool,
}

impl Mover {
    #[must_use]
    pub const fn new(keep_names: bool) -> Self {
        Self { keep_names }
    }

    /// Work out the target path for moving an archive into a series folder.
    ///
    /// The file is renamed to `<folder title><volume suffix>` only when its own title differs from the folder title.
    /// The top-level folder inside a zip container follows the new filename.
    #[must_use]
    pub fn plan(&self, archive: &ArchiveFile, folder: &SeriesFolder) -> MovePlan {
        let new_stem = (!self.keep_names && normalize_title(&archive.title) != folder.normalized)
            .then(|| format!("{}{}", folder.title, archive.suffix));

        let file_name = match &new_stem {
            Some(stem) => {
                let extension = archive
                    .path
                    .extension()
                    .map_or_else(|| archive.extension.clone(), |ext| ext.to_string_lossy().to_string());
                if extension.is_empty() {
                    stem.clone()
                } else {
                    format!("{stem}.{extension}")
                }
            }
            None => archive.file_name(),
        };

        let internal_root = match (&new_stem, &archive.internal_root) {
            (Some(stem), Some(root)) if is_zip_container(&archive.extension) && root != stem => {
                Some((root.clone(), stem.clone()))
            }
            _ => None,
        };

        MovePlan {
            source: archive.path.clone(),
            target: folder.path.join(file_name),
            new_stem,
            internal_root,
        }
    }

    /// Write the rewritten archive next to its target when the inner folder changes.
    /// Returns `None` when the archive can be moved as is.
    ///
    /// # Errors
    /// Returns an error if the archive cannot be rewritten.
    pub fn stage(&self, plan: &MovePlan) -> anyhow::Result<Option<NamedTempFile>> {
        match &plan.internal_root {
            Some((old_root, new_root)) => {
                stage_root_folder_rename(&plan.source, old_root, new_root, plan.target_dir()).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Put the archive in place. A staged copy replaces the source, otherwise the source is moved.
    ///
    /// # Errors
    /// Returns an error if the target exists or the filesystem operation fails.
    pub fn commit(&self, plan: &MovePlan, staged: Option<NamedTempFile>) -> anyhow::Result<()> {
        match staged {
            Some(staged) => {
                commit_staged(staged, &plan.target)?;
                fs::remove_file(&plan.source)
                    .with_context(|| format!("Failed to remove {}", plan.source.display()))
            }
            None => move_file(&plan.source, &plan.target),
        }
    }
}

/// Move a file without ever overwriting the target.
///
/// Falls back to copy and delete when the target is on a different filesystem.
///
/// # Errors
/// Returns an error if the target exists or the file cannot be moved.
pub fn move_file(source: &Path, target: &Path) -> anyhow::Result<()> {
    if target.exists() {
        anyhow::bail!("Target already exists: {}", target.display());
    }
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::CrossesDevices => {
            fs::copy(source, target)
                .with_context(|| format!("Failed to copy {} to {}", source.display(), target.display()))?;
            fs::remove_file(source).with_context(|| format!("Failed to remove {}", source.display()))
        }
        Err(error) => {
            Err(error).with_context(|| format!("Failed to move {} to {}", source.display(), target.display()))
        }
    }
}

/// First path that does not exist yet, adding " (1)", " (2)" and so on before the extension.
#[must_use]
pub fn next_free_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    (1..)
        .map(|index| insert_suffix_before_extension(path, &format!(" ({index})")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}
