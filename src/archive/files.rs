//! Numbered message directories.
//!
//! A directory holding one message per file, named by distance from the
//! newest message: `0` is the newest, `1` the one before it, and so on. It
//! doubles as a cache of a public-inbox mirror so repeated runs do not walk
//! the git history again.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::archive::git::PublicInboxMirror;
use crate::archive::{ArchiveError, ArchiveSource};

#[derive(Debug, Clone)]
pub struct MessageDir {
    path: PathBuf,
}

impl MessageDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn file(&self, index: usize) -> PathBuf {
        self.path.join(index.to_string())
    }

    /// Indexes of the numbered files present, ascending.
    pub fn present(&self) -> Result<Vec<usize>, ArchiveError> {
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ArchiveError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let mut indexes: Vec<usize> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<usize>().ok())
            .collect();
        indexes.sort_unstable();
        Ok(indexes)
    }

    /// Fill in missing files `0..count` from a mirror.
    ///
    /// Only the missing positions are read from the mirror, and a complete
    /// directory never opens it. The lowest-numbered existing file is
    /// compared with the mirror first: once the mirror gained new messages
    /// every index shifts and the directory content is stale.
    pub fn populate(&self, mirror: &PublicInboxMirror, count: usize) -> Result<usize, ArchiveError> {
        let present = self.present()?;
        let missing: BTreeSet<usize> = (0..count)
            .filter(|index| present.binary_search(index).is_err())
            .collect();
        if missing.is_empty() {
            log::info!("{} already holds {} messages", self.path.display(), count);
            return Ok(0);
        }

        let lowest = present.first().copied().filter(|&lowest| lowest < count);
        let mut wanted = missing.clone();
        wanted.extend(lowest);
        let mut blobs = mirror.blobs_at(&wanted)?;

        if let Some(lowest) = lowest {
            let cached = self.read_one(lowest)?;
            if blobs.get(&lowest).is_some_and(|blob| *blob != cached) {
                return Err(ArchiveError::Stale {
                    path: self.path.clone(),
                    index: lowest,
                });
            }
        }

        fs::create_dir_all(&self.path).map_err(|source| ArchiveError::Io {
            path: self.path.clone(),
            source,
        })?;

        let mut written = 0;
        for index in &missing {
            let Some(blob) = blobs.remove(index) else {
                continue;
            };
            let path = self.file(*index);
            fs::write(&path, blob).map_err(|source| ArchiveError::Io { path, source })?;
            written += 1;
            if written % 1000 == 0 {
                log::info!("cached {}/{} messages", written, missing.len());
            }
        }

        log::info!("cached {} new messages in {}", written, self.path.display());
        Ok(written)
    }

    fn read_one(&self, index: usize) -> Result<Vec<u8>, ArchiveError> {
        let path = self.file(index);
        fs::read(&path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                ArchiveError::Missing { path }
            } else {
                ArchiveError::Io { path, source }
            }
        })
    }
}

impl ArchiveSource for MessageDir {
    fn describe(&self) -> String {
        format!("message directory {}", self.path.display())
    }

    /// Files `count-1` down to `0`, i.e. oldest first.
    fn read_blobs(&self, count: usize) -> Result<Vec<Vec<u8>>, ArchiveError> {
        (0..count).rev().map(|index| self.read_one(index)).collect()
    }
}
