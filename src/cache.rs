use anyhow::Result;
use chrono::{DateTime, Local};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DEFAULT_CACHE_DIR: &str = "cached_data";
pub const CACHE_EXTENSION: &str = "fits";
const STAGING_DIR: &str = ".staging";

/// A file held in the cache directory
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
}

/// Name-addressed store of downloaded images, one file per target.
///
/// Existence of the file is the only hit signal. Entries are never
/// invalidated or overwritten once written.
pub struct CacheManager {
    cache_dir: PathBuf,
}

/// Replace whitespace and path separators so a display name is a safe file stem.
pub fn sanitize_name(name: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[\s/\\]").expect("static regex"));
    re.replace_all(name.trim(), "_").into_owned()
}

impl CacheManager {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Deterministic cache location for a target name. Does not touch the filesystem.
    pub fn entry_path(&self, name: &str) -> PathBuf {
        let filename = format!("{}.{}", sanitize_name(name), CACHE_EXTENSION);
        self.cache_dir.join(filename)
    }

    pub fn is_cached(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Return the cache path for `name` if an entry exists
    pub fn lookup(&self, name: &str) -> Option<PathBuf> {
        let path = self.entry_path(name);
        self.is_cached(&path).then_some(path)
    }

    /// Directory downloads land in before being moved into place. Lives inside
    /// the cache directory so the final rename stays on one filesystem.
    pub fn ensure_staging_dir(&self) -> std::io::Result<PathBuf> {
        let staging = self.cache_dir.join(STAGING_DIR);
        std::fs::create_dir_all(&staging)?;
        Ok(staging)
    }

    /// Move a downloaded file into the cache under `name`.
    ///
    /// If an entry already exists it is kept and the staged file is removed.
    pub fn store(&self, name: &str, staged: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.cache_dir)?;
        let path = self.entry_path(name);

        if self.is_cached(&path) {
            tracing::warn!(
                "Cache entry {} already exists, discarding {}",
                path.display(),
                staged.display()
            );
            std::fs::remove_file(staged)?;
            return Ok(path);
        }

        std::fs::rename(staged, &path)?;
        Ok(path)
    }

    /// All cached images, sorted by file name. The staging directory is skipped.
    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        if !self.cache_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(CACHE_EXTENSION) {
                continue;
            }

            let metadata = entry.metadata()?;
            let modified = metadata.modified().ok().map(DateTime::<Local>::from);
            entries.push(CacheEntry {
                path,
                size: metadata.len(),
                modified,
            });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    pub fn get_total_size(&self) -> Result<u64> {
        Ok(self.entries()?.iter().map(|e| e.size).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("SMACS J0723.3-7327"), "SMACS_J0723.3-7327");
        assert_eq!(sanitize_name("Stephan's Quintet"), "Stephan's_Quintet");
        assert_eq!(sanitize_name("M16"), "M16");
        assert_eq!(sanitize_name("a/b\\c d"), "a_b_c_d");
    }

    #[test]
    fn test_entry_path_is_deterministic() {
        let cache = CacheManager::new("cached_data");
        let a = cache.entry_path("NGC 3372");
        let b = cache.entry_path("NGC 3372");
        assert_eq!(a, b);
        assert_eq!(a, PathBuf::from("cached_data/NGC_3372.fits"));
    }

    #[test]
    fn test_lookup_hits_only_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path());
        assert!(cache.lookup("M16").is_none());

        fs::write(dir.path().join("M16.fits"), b"SIMPLE").unwrap();
        assert_eq!(cache.lookup("M16"), Some(dir.path().join("M16.fits")));
    }

    #[test]
    fn test_store_moves_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path().join("cache"));
        let staging = cache.ensure_staging_dir().unwrap();
        let staged = staging.join("jw01_cal.fits");
        fs::write(&staged, b"data").unwrap();

        let path = cache.store("ESO 350-40", &staged).unwrap();
        assert_eq!(path, cache.entry_path("ESO 350-40"));
        assert!(!staged.exists());
        assert_eq!(fs::read(&path).unwrap(), b"data");
    }

    #[test]
    fn test_store_never_overwrites_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path());
        fs::write(cache.entry_path("M16"), b"original").unwrap();

        let staging = cache.ensure_staging_dir().unwrap();
        let staged = staging.join("new.fits");
        fs::write(&staged, b"replacement").unwrap();

        let path = cache.store("M16", &staged).unwrap();
        assert_eq!(fs::read(path).unwrap(), b"original");
        assert!(!staged.exists());
    }

    #[test]
    fn test_entries_and_total_size() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path());
        assert!(cache.entries().unwrap().is_empty());

        fs::write(dir.path().join("M16.fits"), vec![0u8; 10]).unwrap();
        fs::write(dir.path().join("NGC_1976.fits"), vec![0u8; 32]).unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        cache.ensure_staging_dir().unwrap();

        let entries = cache.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].path.ends_with("M16.fits"));
        assert_eq!(cache.get_total_size().unwrap(), 42);
    }
}
