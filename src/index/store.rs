//! Index store directory structure and atomic publication
//!
//! An index directory holds immutable store generations and a `CURRENT`
//! pointer naming the published one:
//!
//! ```text
//! index/
//! ├── CURRENT              # "gen-000002"
//! ├── gen-000001/          # previous generation, kept for open readers
//! ├── gen-000002/          # published generation
//! │   ├── meta.json
//! │   ├── shard_00.dict
//! │   ├── shard_00.postings
//! │   └── ...
//! └── gen-000003.partial/  # build in progress, never referenced
//! ```
//!
//! Publishing renames the finished `.partial` directory into place and then
//! swaps `CURRENT` with a single rename, so readers see either the old
//! generation or the new one.

use crate::error::{PiError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CURRENT_FILE: &str = "CURRENT";
const GENERATION_PREFIX: &str = "gen-";
const PARTIAL_SUFFIX: &str = ".partial";

/// Index directory paths
#[derive(Debug, Clone)]
pub struct StorePaths {
    root: PathBuf,
}

impl StorePaths {
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        StorePaths {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The `CURRENT` pointer file
    pub fn current_pointer(&self) -> PathBuf {
        self.root.join(CURRENT_FILE)
    }

    pub fn generation_dir(&self, generation: u32) -> PathBuf {
        self.root.join(generation_name(generation))
    }

    pub fn partial_dir(&self, generation: u32) -> PathBuf {
        self.root
            .join(format!("{}{}", generation_name(generation), PARTIAL_SUFFIX))
    }

    /// Generation named by `CURRENT`, if a store was ever published
    pub fn current_generation(&self) -> Result<Option<u32>> {
        let pointer = self.current_pointer();
        let content = match fs::read_to_string(&pointer) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PiError::io(pointer, e)),
        };

        parse_generation(content.trim())
            .map(Some)
            .ok_or_else(|| PiError::NotAvailable(format!("corrupt CURRENT pointer: {:?}", content)))
    }

    /// Directory of the published generation
    pub fn current_dir(&self) -> Result<Option<PathBuf>> {
        Ok(self.current_generation()?.map(|g| self.generation_dir(g)))
    }

    /// Finished generations on disk, ascending
    pub fn list_generations(&self) -> Result<Vec<u32>> {
        let mut generations = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(generations),
            Err(e) => return Err(PiError::io(&self.root, e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| PiError::io(&self.root, e))?;
            if let Some(generation) = entry.file_name().to_str().and_then(parse_generation) {
                generations.push(generation);
            }
        }

        generations.sort_unstable();
        Ok(generations)
    }

    /// Number for the next build: one past anything on disk or published
    pub fn next_generation(&self) -> Result<u32> {
        let newest_dir = self.list_generations()?.last().copied().unwrap_or(0);
        let current = self.current_generation()?.unwrap_or(0);
        Ok(newest_dir.max(current) + 1)
    }

    /// Create an empty working directory for a generation
    pub fn create_partial(&self, generation: u32) -> Result<PathBuf> {
        let partial = self.partial_dir(generation);
        if partial.is_dir() {
            fs::remove_dir_all(&partial).map_err(|e| PiError::io(&partial, e))?;
        }
        fs::create_dir_all(&partial).map_err(|e| PiError::io(&partial, e))?;
        Ok(partial)
    }

    /// Remove a failed build's working directory
    pub fn discard_partial(&self, generation: u32) {
        let partial = self.partial_dir(generation);
        if let Err(e) = fs::remove_dir_all(&partial) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", partial.display(), e);
            }
        }
    }

    /// Remove what a failed publish left of `generation`
    ///
    /// The finished directory is kept if `CURRENT` already names it.
    pub fn discard_generation(&self, generation: u32) {
        self.discard_partial(generation);
        match self.current_generation() {
            Ok(Some(current)) if current == generation => {
                warn!("{} is already published, keeping it", generation_name(generation));
            }
            Ok(_) => {
                let dir = self.generation_dir(generation);
                if let Err(e) = fs::remove_dir_all(&dir) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!("Failed to remove {}: {}", dir.display(), e);
                    }
                }
            }
            Err(e) => warn!("Cannot read CURRENT, keeping {}: {}", generation_name(generation), e),
        }
    }

    /// Move a finished generation into place and point `CURRENT` at it
    pub fn publish(&self, generation: u32) -> Result<()> {
        let partial = self.partial_dir(generation);
        let final_dir = self.generation_dir(generation);

        sync_dir(&partial)?;
        fs::rename(&partial, &final_dir).map_err(|e| PiError::io(&final_dir, e))?;

        let pointer = self.current_pointer();
        let temp_pointer = self.root.join(format!("{}.tmp", CURRENT_FILE));
        {
            let mut file =
                fs::File::create(&temp_pointer).map_err(|e| PiError::io(&temp_pointer, e))?;
            file.write_all(generation_name(generation).as_bytes())
                .and_then(|_| file.write_all(b"\n"))
                .and_then(|_| file.sync_all())
                .map_err(|e| PiError::io(&temp_pointer, e))?;
        }
        fs::rename(&temp_pointer, &pointer).map_err(|e| PiError::io(&pointer, e))?;

        // The switch is done once CURRENT is renamed
        if let Err(e) = sync_dir(&self.root) {
            warn!(
                "Published {} but could not sync {}: {}",
                generation_name(generation),
                self.root.display(),
                e
            );
        }

        info!(
            "Published {} in {}",
            generation_name(generation),
            self.root.display()
        );
        Ok(())
    }

    /// Remove generations older than the one before `current`, plus stale
    /// partial directories. The previous generation stays for readers that
    /// opened it before the switch.
    pub fn collect_garbage(&self, current: u32) -> Result<()> {
        let generations = self.list_generations()?;
        let previous = generations.iter().copied().filter(|&g| g < current).max();

        for generation in generations {
            if generation == current || Some(generation) == previous {
                continue;
            }
            let dir = self.generation_dir(generation);
            debug!("Removing old generation {}", dir.display());
            if let Err(e) = fs::remove_dir_all(&dir) {
                warn!("Failed to remove {}: {}", dir.display(), e);
            }
        }

        let entries = fs::read_dir(&self.root).map_err(|e| PiError::io(&self.root, e))?;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(GENERATION_PREFIX) && name.ends_with(PARTIAL_SUFFIX) {
                debug!("Removing stale partial build {}", name);
                let _ = fs::remove_dir_all(entry.path());
            }
        }

        Ok(())
    }
}

fn generation_name(generation: u32) -> String {
    format!("{}{:06}", GENERATION_PREFIX, generation)
}

fn parse_generation(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(GENERATION_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Flush directory entries so renames survive a crash
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| PiError::io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_names() {
        assert_eq!(generation_name(3), "gen-000003");
        assert_eq!(parse_generation("gen-000003"), Some(3));
        assert_eq!(parse_generation("gen-000003.partial"), None);
        assert_eq!(parse_generation("gen-"), None);
        assert_eq!(parse_generation("CURRENT"), None);
    }

    #[test]
    fn test_unpublished_store_has_no_current() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StorePaths::from_root(dir.path().join("index"));
        assert_eq!(paths.current_generation().unwrap(), None);
        assert_eq!(paths.next_generation().unwrap(), 1);
    }

    #[test]
    fn test_publish_switches_current() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StorePaths::from_root(dir.path());

        let partial = paths.create_partial(1).unwrap();
        fs::write(partial.join("meta.json"), "{}").unwrap();
        assert_eq!(paths.current_generation().unwrap(), None);

        paths.publish(1).unwrap();
        assert_eq!(paths.current_generation().unwrap(), Some(1));
        assert!(paths.generation_dir(1).join("meta.json").exists());
        assert!(!paths.partial_dir(1).exists());
        assert_eq!(paths.next_generation().unwrap(), 2);
    }

    #[test]
    fn test_garbage_collection_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StorePaths::from_root(dir.path());

        for generation in 1..=3 {
            paths.create_partial(generation).unwrap();
            paths.publish(generation).unwrap();
        }
        paths.create_partial(7).unwrap();

        paths.collect_garbage(3).unwrap();
        assert_eq!(paths.list_generations().unwrap(), vec![2, 3]);
        assert!(!paths.partial_dir(7).exists());
    }

    #[test]
    fn test_corrupt_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StorePaths::from_root(dir.path());
        fs::write(paths.current_pointer(), "latest").unwrap();
        assert!(matches!(
            paths.current_generation(),
            Err(PiError::NotAvailable(_))
        ));
    }

    #[test]
    fn test_discard_never_removes_published_generation() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StorePaths::from_root(dir.path());

        paths.create_partial(1).unwrap();
        paths.publish(1).unwrap();
        paths.discard_generation(1);
        assert_eq!(paths.current_generation().unwrap(), Some(1));
        assert!(paths.generation_dir(1).is_dir());

        // Renamed into place but never pointed at
        paths.create_partial(2).unwrap();
        fs::rename(paths.partial_dir(2), paths.generation_dir(2)).unwrap();
        paths.discard_generation(2);
        assert!(!paths.generation_dir(2).exists());
        assert_eq!(paths.list_generations().unwrap(), vec![1]);
    }
}
