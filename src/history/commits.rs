//! Commit-log access over a local git repository.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use gix::ObjectId;
use thiserror::Error;

/// Errors raised while reading a git repository.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to open repository: {0}")]
    Open(#[from] gix::open::Error),
    #[error("cannot resolve revision `{spec}`: {reason}")]
    Revision { spec: String, reason: String },
    #[error("{0}")]
    Other(String),
}

/// One non-merge commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: String,
    /// Committer timestamp
    pub time: DateTime<Utc>,
    pub author_name: String,
    pub author_email: String,
    pub committer_name: String,
    pub committer_email: String,
    pub message: String,
}

impl CommitRecord {
    /// Author as `Name <email>`.
    pub fn author(&self) -> String {
        format!("{} <{}>", self.author_name, self.author_email)
    }

    /// Committer as `Name <email>`.
    pub fn committer(&self) -> String {
        format!("{} <{}>", self.committer_name, self.committer_email)
    }
}

/// Split `start..end` into its ends.
///
/// A missing end means `HEAD`; a plain revision has no start and walks the
/// whole history behind it.
pub fn parse_range(range: &str) -> (Option<&str>, &str) {
    match range.split_once("..") {
        Some((start, end)) => {
            let start = Some(start.trim()).filter(|s| !s.is_empty());
            let end = Some(end.trim()).filter(|e| !e.is_empty()).unwrap_or("HEAD");
            (start, end)
        }
        None => (None, Some(range.trim()).filter(|r| !r.is_empty()).unwrap_or("HEAD")),
    }
}

/// Read-only view of a repository's history.
pub struct CommitLog {
    repo: gix::Repository,
}

impl CommitLog {
    pub fn open(path: &Path) -> Result<Self, GitError> {
        if !path.exists() {
            return Err(GitError::Other(format!(
                "repository not found at {}",
                path.display()
            )));
        }
        let repo = gix::open(path)?;
        Ok(Self { repo })
    }

    pub fn resolve(&self, spec: &str) -> Result<ObjectId, GitError> {
        self.repo
            .rev_parse_single(spec)
            .map(|id| id.detach())
            .map_err(|e| GitError::Revision {
                spec: spec.to_string(),
                reason: e.to_string(),
            })
    }

    /// Every commit reachable from `id`, `id` included.
    fn reachable(&self, id: ObjectId) -> Result<Vec<ObjectId>, GitError> {
        let commit = self
            .repo
            .find_object(id)
            .map_err(|e| GitError::Other(format!("Failed to find commit: {}", e)))?
            .try_into_commit()
            .map_err(|e| GitError::Other(format!("Object is not a commit: {}", e)))?;

        let ancestors = commit
            .ancestors()
            .all()
            .map_err(|e| GitError::Other(format!("Failed to create ancestor iterator: {}", e)))?;

        let mut ids = Vec::new();
        for info in ancestors {
            let info =
                info.map_err(|e| GitError::Other(format!("Failed to get ancestor info: {}", e)))?;
            ids.push(info.id);
        }
        Ok(ids)
    }

    fn record(&self, id: ObjectId) -> Result<Option<CommitRecord>, GitError> {
        let commit = self
            .repo
            .find_object(id)
            .map_err(|e| GitError::Other(format!("Failed to find commit {}: {}", id, e)))?
            .try_into_commit()
            .map_err(|e| GitError::Other(format!("Object is not a commit: {}", e)))?;

        if commit.parent_ids().count() > 1 {
            return Ok(None);
        }

        let author = commit
            .author()
            .map_err(|e| GitError::Other(format!("Bad author in {}: {}", id, e)))?;
        let committer = commit
            .committer()
            .map_err(|e| GitError::Other(format!("Bad committer in {}: {}", id, e)))?;
        let seconds = commit
            .time()
            .map_err(|e| GitError::Other(format!("Bad commit time in {}: {}", id, e)))?
            .seconds;

        Ok(Some(CommitRecord {
            id: id.to_hex().to_string(),
            time: DateTime::from_timestamp(seconds, 0).unwrap_or_default(),
            author_name: author.name.to_string(),
            author_email: author.email.to_string(),
            committer_name: committer.name.to_string(),
            committer_email: committer.email.to_string(),
            message: commit.message_raw_sloppy().to_string(),
        }))
    }

    /// Object id of the tree entry at `path` in `commit`'s tree.
    fn entry_id(commit: &gix::Commit<'_>, path: &str) -> Result<Option<ObjectId>, GitError> {
        let tree = commit
            .tree()
            .map_err(|e| GitError::Other(format!("Failed to get tree: {}", e)))?;
        let entry = tree
            .lookup_entry_by_path(path)
            .map_err(|e| GitError::Other(format!("Failed to look up {}: {}", path, e)))?;
        Ok(entry.map(|entry| entry.object_id()))
    }

    /// Whether the commit `id` changes anything below `path`.
    ///
    /// Compares the entry at `path` with the one of the first parent, so a
    /// root commit touches `path` whenever it creates it.
    pub fn touches(&self, id: ObjectId, path: &str) -> Result<bool, GitError> {
        let commit = self
            .repo
            .find_object(id)
            .map_err(|e| GitError::Other(format!("Failed to find commit {}: {}", id, e)))?
            .try_into_commit()
            .map_err(|e| GitError::Other(format!("Object is not a commit: {}", e)))?;

        let current = Self::entry_id(&commit, path)?;
        let previous = match commit.parent_ids().next() {
            Some(parent) => {
                let parent = parent
                    .object()
                    .map_err(|e| GitError::Other(format!("Failed to find parent of {}: {}", id, e)))?
                    .try_into_commit()
                    .map_err(|e| GitError::Other(format!("Parent is not a commit: {}", e)))?;
                Self::entry_id(&parent, path)?
            }
            None => None,
        };
        Ok(current != previous)
    }

    /// The records among `commits` that change anything below `path`.
    pub fn touching(&self, commits: &[CommitRecord], path: &str) -> Result<Vec<CommitRecord>, GitError> {
        let mut touching = Vec::new();
        for record in commits {
            let id = ObjectId::from_hex(record.id.as_bytes())
                .map_err(|e| GitError::Other(format!("Bad commit id {}: {}", record.id, e)))?;
            if self.touches(id, path)? {
                touching.push(record.clone());
            }
        }
        log::debug!("{} of {} commits touch {}", touching.len(), commits.len(), path);
        Ok(touching)
    }

    /// Non-merge commits of `range`, oldest first.
    ///
    /// ## Arguments
    ///
    /// * `range` - `start..end`, `..end`, `start..` or a single revision
    pub fn commits(&self, range: &str) -> Result<Vec<CommitRecord>, GitError> {
        let (start, end) = parse_range(range);

        let hidden: HashSet<ObjectId> = match start {
            Some(start) => self.reachable(self.resolve(start)?)?.into_iter().collect(),
            None => HashSet::new(),
        };

        let mut records = Vec::new();
        for id in self.reachable(self.resolve(end)?)? {
            if hidden.contains(&id) {
                continue;
            }
            if let Some(record) = self.record(id)? {
                records.push(record);
            }
        }

        records.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.id.cmp(&b.id)));
        log::info!("read {} commits for range `{}`", records.len(), range);
        Ok(records)
    }
}
