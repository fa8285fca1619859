use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

use crate::organize::archive::{inspect_archive, is_zip_container};
use crate::organize::config::OrganizeConfig;
use crate::organize::types::{ArchiveFile, FailureKind, SeriesFolder};
use crate::{
    get_normalized_dir_name, get_normalized_file_stem_and_extension, is_hidden, path_to_file_extension_string,
    path_to_filename_string, print_warning,
};

/// Series folders known for this run.
#[derive(Debug, Clone, Default)]
pub struct LibrarySnapshot {
    root: PathBuf,
    folders: Vec<SeriesFolder>,
}

/// An archive that could not be read during the scan.
#[derive(Debug, Clone)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

/// Archives found in the source directory.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Readable archives sorted by path.
    pub archives: Vec<ArchiveFile>,
    pub failures: Vec<ScanFailure>,
}

/// Reads the source directory and the destination library.
#[derive(Debug, Clone, Copy)]
pub struct Scanner<'a> {
    config: &'a OrganizeConfig,
}

impl LibrarySnapshot {
    #[must_use]
    pub const fn new(root: PathBuf, folders: Vec<SeriesFolder>) -> Self {
        Self { root, folders }
    }

    #[must_use]
    pub fn folders(&self) -> &[SeriesFolder] {
        &self.folders
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.folders.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    #[must_use]
    pub fn find_by_path(&self, path: &Path) -> Option<&SeriesFolder> {
        self.folders.iter().find(|folder| folder.path == path)
    }

    /// Add a folder created during the run so later archives can match it.
    pub fn insert(&mut self, folder: SeriesFolder) {
        if self.find_by_path(&folder.path).is_none() {
            self.folders.push(folder);
        }
    }
}

impl<'a> Scanner<'a> {
    #[must_use]
    pub const fn new(config: &'a OrganizeConfig) -> Self {
        Self { config }
    }

    /// Collect every series folder below the destination root.
    ///
    /// Hidden directories are skipped, and so is the source directory when it lives inside the library.
    ///
    /// # Errors
    /// Returns an error if the destination is not a directory.
    pub fn scan_library(&self) -> anyhow::Result<LibrarySnapshot> {
        let root = &self.config.destination;
        if !root.is_dir() {
            anyhow::bail!("Destination directory does not exist: {}", root.display());
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        spinner.set_message("Scanning library...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let source = &self.config.source;
        let mut folders = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !(is_hidden(entry) || entry.path() == source))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    if self.config.verbose {
                        spinner.suspend(|| print_warning!("{error}"));
                    }
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let Ok(dir_name) = get_normalized_dir_name(entry.path()) else {
                continue;
            };
            let title = self.config.titles.folder_title(&dir_name);
            if title.is_empty() {
                continue;
            }
            spinner.set_message(format!("Scanning library: {title}"));
            folders.push(SeriesFolder::new(entry.into_path(), title));
        }

        spinner.finish_and_clear();
        if self.config.debug {
            println!("Found {} series folders in {}", folders.len(), root.display());
        }
        Ok(LibrarySnapshot::new(root.clone(), folders))
    }

    /// Collect the archives to sort from the source directory.
    ///
    /// Archives that cannot be opened are returned as failures instead of being dropped silently.
    ///
    /// # Errors
    /// Returns an error if the source is not a directory.
    pub fn scan_archives(&self) -> anyhow::Result<ScanResult> {
        let source = &self.config.source;
        if !source.is_dir() {
            anyhow::bail!("Source directory does not exist: {}", source.display());
        }

        let mut walker = WalkDir::new(source).min_depth(1);
        if !self.config.recurse {
            walker = walker.max_depth(1);
        }

        let mut result = ScanResult::default();
        for entry in walker
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    if self.config.verbose {
                        print_warning!("{error}");
                    }
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.is_wanted(entry.path()) {
                continue;
            }

            let path = entry.into_path();
            match self.read_archive(&path) {
                Ok(archive) => result.archives.push(archive),
                Err(error) => result.failures.push(ScanFailure {
                    kind: FailureKind::classify(&error),
                    message: format!("{error:#}"),
                    path,
                }),
            }
        }

        result.archives.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(result)
    }

    /// Build an archive entry from its filename and, for zip containers, its top-level folder.
    ///
    /// # Errors
    /// Returns an error if the filename is unusable or the container cannot be read.
    pub fn read_archive(&self, path: &Path) -> anyhow::Result<ArchiveFile> {
        let (stem, extension) = get_normalized_file_stem_and_extension(path)?;
        let (title, suffix) = self.config.titles.split_archive_stem(&stem);
        let internal_root = if is_zip_container(&extension) {
            inspect_archive(path)?.root_folder
        } else {
            None
        };
        Ok(ArchiveFile {
            path: path.to_path_buf(),
            stem,
            title,
            suffix,
            extension,
            internal_root,
        })
    }

    fn is_wanted(&self, path: &Path) -> bool {
        let extension = path_to_file_extension_string(path);
        if !self.config.extensions.contains(&extension) {
            return false;
        }
        let name = path_to_filename_string(path).to_lowercase();
        if !self.config.include.is_empty() && !self.config.include.iter().any(|include| name.contains(include)) {
            return false;
        }
        !self.config.exclude.iter().any(|exclude| name.contains(exclude))
    }
}
