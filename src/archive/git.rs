//! public-inbox v2 mirrors.
//!
//! Every commit of a public-inbox v2 epoch repository stores exactly one
//! message in a blob named `m` at the root of its tree. Walking the
//! first-parent history from `HEAD` therefore yields the archive newest
//! first.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use gix::ObjectId;

use crate::archive::{ArchiveError, ArchiveSource};
use crate::history::GitError;

/// Name of the message blob in a public-inbox v2 tree.
const MESSAGE_BLOB: &str = "m";

#[derive(Debug, Clone)]
pub struct PublicInboxMirror {
    path: PathBuf,
}

impl PublicInboxMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> Result<gix::Repository, GitError> {
        if !self.path.exists() {
            return Err(GitError::Other(format!(
                "Mirror not found at {}. Clone the public-inbox epoch first.",
                self.path.display()
            )));
        }
        Ok(gix::open(&self.path)?)
    }

    /// The `m` blob of one commit, `None` for commits without one.
    fn message_blob(repo: &gix::Repository, id: ObjectId) -> Result<Option<Vec<u8>>, GitError> {
        let commit = repo
            .find_object(id)
            .map_err(|e| GitError::Other(format!("Failed to find commit: {}", e)))?
            .try_into_commit()
            .map_err(|e| GitError::Other(format!("Object is not a commit: {}", e)))?;

        let tree = commit
            .tree()
            .map_err(|e| GitError::Other(format!("Failed to get tree: {}", e)))?;

        for entry in tree.iter() {
            let entry =
                entry.map_err(|e| GitError::Other(format!("Failed to iterate tree: {}", e)))?;
            if entry.filename() != MESSAGE_BLOB || !entry.mode().is_blob() {
                continue;
            }
            let blob = entry
                .object()
                .map_err(|e| GitError::Other(format!("Failed to get object: {}", e)))?
                .try_into_blob()
                .map_err(|e| GitError::Other(format!("Object is not a blob: {}", e)))?;
            return Ok(Some(blob.data.to_vec()));
        }

        Ok(None)
    }

    /// Walk up to `limit` first-parent commits from `HEAD`, newest first.
    ///
    /// `visit` gets the position of each commit (`0` is `HEAD`). Returns how
    /// many commits were walked.
    fn walk<F>(&self, limit: usize, mut visit: F) -> Result<usize, GitError>
    where
        F: FnMut(&gix::Repository, usize, ObjectId) -> Result<(), GitError>,
    {
        let repo = self.open()?;
        let mut next = Some(
            repo.rev_parse_single("HEAD")
                .map_err(|e| GitError::Revision {
                    spec: "HEAD".to_string(),
                    reason: e.to_string(),
                })?
                .detach(),
        );

        let mut walked = 0;
        while let Some(id) = next {
            if walked == limit {
                break;
            }
            visit(&repo, walked, id)?;
            walked += 1;

            next = repo
                .find_object(id)
                .map_err(|e| GitError::Other(format!("Failed to find commit: {}", e)))?
                .try_into_commit()
                .map_err(|e| GitError::Other(format!("Object is not a commit: {}", e)))?
                .parent_ids()
                .next()
                .map(|parent| parent.detach());
        }

        if walked < limit {
            log::warn!(
                "{} has only {} commits, {} requested",
                self.path.display(),
                walked,
                limit
            );
        }
        Ok(walked)
    }

    /// Message blobs of the last `count` commits, newest first.
    pub fn newest_blobs(&self, count: usize) -> Result<Vec<Vec<u8>>, GitError> {
        let mut blobs = Vec::with_capacity(count);
        self.walk(count, |repo, _, id| {
            match Self::message_blob(repo, id)? {
                Some(blob) => blobs.push(blob),
                None => log::warn!("commit {} has no message blob", id),
            }
            Ok(())
        })?;
        Ok(blobs)
    }

    /// Message blobs of the commits at the `wanted` positions from `HEAD`.
    ///
    /// The walk stops at the highest wanted position and only those commits
    /// have their blob read.
    pub fn blobs_at(&self, wanted: &BTreeSet<usize>) -> Result<BTreeMap<usize, Vec<u8>>, GitError> {
        let Some(&highest) = wanted.last() else {
            return Ok(BTreeMap::new());
        };

        let mut blobs = BTreeMap::new();
        self.walk(highest + 1, |repo, position, id| {
            if !wanted.contains(&position) {
                return Ok(());
            }
            match Self::message_blob(repo, id)? {
                Some(blob) => {
                    blobs.insert(position, blob);
                }
                None => log::warn!("commit {} has no message blob", id),
            }
            Ok(())
        })?;
        Ok(blobs)
    }
}

impl ArchiveSource for PublicInboxMirror {
    fn describe(&self) -> String {
        format!("public-inbox mirror {}", self.path.display())
    }

    fn read_blobs(&self, count: usize) -> Result<Vec<Vec<u8>>, ArchiveError> {
        let mut blobs = self.newest_blobs(count)?;
        blobs.reverse();
        Ok(blobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_mirror_is_fatal() {
        let mirror = PublicInboxMirror::new("/nonexistent/ml-stat/netdev/0.git");
        assert!(matches!(mirror.read_blobs(10), Err(ArchiveError::Git(_))));
    }

    #[test]
    fn test_nothing_wanted_skips_the_mirror() {
        let mirror = PublicInboxMirror::new("/nonexistent/ml-stat/netdev/0.git");
        assert!(mirror.blobs_at(&BTreeSet::new()).unwrap().is_empty());
        assert!(mirror.blobs_at(&BTreeSet::from([3])).is_err());
    }
}
