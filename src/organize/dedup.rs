use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;
use sha1::{Digest, Sha1};

use crate::organize::archive::STAGING_PREFIX;
use crate::organize::types::{DuplicateRecord, DuplicateStatus};

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Detects duplicate archives in destination folders.
///
/// Directory listings are read once per folder and kept up to date with
/// [`register`](Self::register) and [`forget`](Self::forget).
/// Hashes are only computed for files whose size matches the incoming archive.
#[derive(Debug, Default)]
pub struct Deduplicator {
    listings: HashMap<PathBuf, Vec<DuplicateRecord>>,
}

impl Deduplicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `content` against the files in `target_dir`,
    /// as if it was going to be saved there as `target_name`.
    ///
    /// # Errors
    /// Returns an error if a file cannot be read.
    pub fn check(&mut self, content: &Path, target_dir: &Path, target_name: &str) -> anyhow::Result<DuplicateStatus> {
        let size = fs::metadata(content)
            .with_context(|| format!("Failed to read metadata for {}", content.display()))?
            .len();
        let mut content_hash: Option<String> = None;

        let records = self.listing(target_dir)?;

        if let Some(existing) = records
            .iter_mut()
            .find(|record| record.path != content && record.path.file_name().is_some_and(|name| name == target_name))
        {
            if existing.size == size && cached_fingerprint(existing)? == hash_once(&mut content_hash, content)? {
                return Ok(DuplicateStatus::ExactDuplicate {
                    existing: existing.path.clone(),
                });
            }
            return Ok(DuplicateStatus::NameCollision {
                existing: existing.path.clone(),
            });
        }

        for record in records
            .iter_mut()
            .filter(|record| record.size == size && record.path != content)
        {
            if cached_fingerprint(record)? == hash_once(&mut content_hash, content)? {
                return Ok(DuplicateStatus::ExactDuplicate {
                    existing: record.path.clone(),
                });
            }
        }

        Ok(DuplicateStatus::NoDuplicate)
    }

    /// Record a file that was just moved into a destination folder.
    pub fn register(&mut self, path: &Path) {
        let Some(parent) = path.parent() else {
            return;
        };
        let Some(records) = self.listings.get_mut(parent) else {
            return;
        };
        let size = fs::metadata(path).map(|metadata| metadata.len()).unwrap_or_default();
        records.retain(|record| record.path != path);
        records.push(DuplicateRecord::new(path.to_path_buf(), size));
    }

    /// Record the file a dry run would create at `target` with the contents of `content`.
    ///
    /// Later checks against the same folder then see the name as taken.
    ///
    /// # Errors
    /// Returns an error if `content` cannot be read.
    pub fn register_planned(&mut self, target: &Path, content: &Path) -> anyhow::Result<()> {
        let Some(records) = target.parent().and_then(|parent| self.listings.get_mut(parent)) else {
            return Ok(());
        };
        let size = fs::metadata(content)
            .with_context(|| format!("Failed to read metadata for {}", content.display()))?
            .len();
        let hash = fingerprint(content)?;
        records.retain(|record| record.path != target);
        records.push(DuplicateRecord {
            path: target.to_path_buf(),
            size,
            fingerprint: Some(hash),
        });
        Ok(())
    }

    /// Drop a file that was removed from a destination folder.
    pub fn forget(&mut self, path: &Path) {
        if let Some(records) = path.parent().and_then(|parent| self.listings.get_mut(parent)) {
            records.retain(|record| record.path != path);
        }
    }

    fn listing(&mut self, dir: &Path) -> anyhow::Result<&mut Vec<DuplicateRecord>> {
        if !self.listings.contains_key(dir) {
            let records = read_listing(dir)?;
            self.listings.insert(dir.to_path_buf(), records);
        }
        self.listings
            .get_mut(dir)
            .context("Directory listing missing from cache")
    }
}

/// SHA-1 of the file contents as a lowercase hex string.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn fingerprint(path: &Path) -> anyhow::Result<String> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha1::new();
    let mut buffer = vec![0_u8; READ_BUFFER_SIZE];
    loop {
        let read = reader
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(to_hex(&hasher.finalize().to_vec()))
}

fn to_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        hex.push(char::from(HEX_CHARS[(byte >> 4) as usize]));
        hex.push(char::from(HEX_CHARS[(byte & 0x0f) as usize]));
    }
    hex
}

fn cached_fingerprint(record: &mut DuplicateRecord) -> anyhow::Result<String> {
    if let Some(hash) = &record.fingerprint {
        return Ok(hash.clone());
    }
    let hash = fingerprint(&record.path)?;
    record.fingerprint = Some(hash.clone());
    Ok(hash)
}

fn hash_once(cache: &mut Option<String>, path: &Path) -> anyhow::Result<String> {
    if let Some(hash) = cache {
        return Ok(hash.clone());
    }
    let hash = fingerprint(path)?;
    *cache = Some(hash.clone());
    Ok(hash)
}

/// Regular files in a directory, without archives still being staged.
/// A missing directory has no files.
fn read_listing(dir: &Path) -> anyhow::Result<Vec<DuplicateRecord>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut records = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
            continue;
        }
        let metadata = entry.metadata()?;
        if metadata.is_file() {
            records.push(DuplicateRecord::new(entry.path(), metadata.len()));
        }
    }
    Ok(records)
}
