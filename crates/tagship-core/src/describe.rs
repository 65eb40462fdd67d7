//! Repository description: nearest version tag, distance and cleanliness.
//!
//! The description of the working directory is computed at most once per
//! process. Every caller of [`describe`] gets the same [`Arc`], or the same
//! error if the first computation failed. Repository changes made while the
//! process runs are not picked up.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use git2::{Oid, Repository, StatusOptions};
use thiserror::Error;

use crate::tags::{VersionTag, select_version_tags};
use crate::walk::walk_history;

/// Failures while describing a repository.
#[derive(Error, Debug)]
pub enum DescribeError {
    /// The repository could not be opened.
    #[error("while opening repository at {}: {source}", path.display())]
    Open {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying libgit2 error.
        #[source]
        source: git2::Error,
    },

    /// The repository has no working directory to describe.
    #[error("repository at {} has no working tree", .0.display())]
    Bare(PathBuf),

    /// HEAD is missing, unborn, or does not point at a commit.
    #[error("while resolving HEAD: {0}")]
    Head(#[source] git2::Error),

    /// Working tree status could not be computed.
    #[error("while getting worktree status: {0}")]
    Status(#[source] git2::Error),

    /// Tag references could not be listed.
    #[error("while listing tag references: {0}")]
    References(#[source] git2::Error),

    /// A version tag could not be read.
    #[error("while reading version tag {name}: {source}")]
    Tag {
        /// Short name of the tag reference.
        name: String,
        /// Underlying libgit2 error.
        #[source]
        source: git2::Error,
    },

    /// The commit log could not be walked.
    #[error("while walking commit log: {0}")]
    Log(#[source] git2::Error),
}

/// The commit being described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribedRef {
    /// Shorthand of the HEAD reference (`main`, or `HEAD` when detached).
    pub name: String,
    /// Commit HEAD resolves to.
    pub commit: Oid,
}

/// Where a commit sits relative to the version tags in its history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    is_clean: bool,
    described: DescribedRef,
    nearest_tag: Option<VersionTag>,
    distance: u64,
    workdir: PathBuf,
}

impl Description {
    /// Whether the working tree had no changes (untracked files included).
    pub fn is_clean(&self) -> bool {
        self.is_clean
    }

    /// The described commit.
    pub fn described(&self) -> &DescribedRef {
        &self.described
    }

    /// The closest version tag reached by the history walk.
    pub fn nearest_tag(&self) -> Option<&VersionTag> {
        self.nearest_tag.as_ref()
    }

    /// Commits between the described commit and its nearest tag.
    ///
    /// `None` when there is no tag; the walk count means nothing then.
    pub fn distance(&self) -> Option<u64> {
        self.nearest_tag.as_ref().map(|_| self.distance)
    }

    /// Whether the described commit is itself the nearest tag's target.
    pub fn is_exact(&self) -> bool {
        self.nearest_tag.is_some() && self.distance == 0
    }

    /// Working directory of the described repository.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Assemble a description from parts, for callers that get history from
    /// somewhere other than [`describe_repo`].
    pub fn from_parts(
        is_clean: bool,
        described: DescribedRef,
        nearest_tag: Option<VersionTag>,
        distance: u64,
        workdir: PathBuf,
    ) -> Self {
        Self {
            is_clean,
            described,
            nearest_tag,
            distance,
            workdir,
        }
    }
}

/// Describe the repository whose working directory is `path`.
///
/// Unlike [`describe`] this is not cached and no parent directories are
/// searched for a repository.
///
/// # Errors
///
/// Any failure to open the repository, resolve HEAD, compute the status,
/// read tags, or walk the log.
pub fn describe_repo(path: &Path) -> Result<Description, DescribeError> {
    let repo = Repository::open(path).map_err(|source| DescribeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| DescribeError::Bare(path.to_path_buf()))?
        .to_path_buf();

    let head = repo.head().map_err(DescribeError::Head)?;
    let commit = head.peel_to_commit().map_err(DescribeError::Head)?;
    let described = DescribedRef {
        name: head.shorthand().unwrap_or("HEAD").to_string(),
        commit: commit.id(),
    };

    let is_clean = is_worktree_clean(&repo)?;
    let tags = select_version_tags(&repo)?;
    let walk = walk_history(&repo, described.commit, &tags).map_err(DescribeError::Log)?;

    match &walk.tag {
        Some(tag) => tracing::info!(
            "{} is {} commit(s) past {} (clean: {is_clean})",
            described.name,
            walk.distance,
            tag.name()
        ),
        None => tracing::info!("{} has no version tag in its history", described.name),
    }

    Ok(Description {
        is_clean,
        described,
        nearest_tag: walk.tag,
        distance: walk.distance,
        workdir,
    })
}

fn is_worktree_clean(repo: &Repository) -> Result<bool, DescribeError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);
    let statuses = repo
        .statuses(Some(&mut opts))
        .map_err(DescribeError::Status)?;
    tracing::debug!("{} changed path(s) in worktree", statuses.len());
    Ok(statuses.is_empty())
}

/// Shared outcome of a cached description.
pub type DescribeOutcome = Result<Arc<Description>, Arc<DescribeError>>;

/// A single-assignment slot for a description.
///
/// The first [`get_or_describe`](Self::get_or_describe) runs the computation
/// while holding the lock; concurrent callers wait and then receive clones of
/// the same outcome. Failures are cached too and never retried.
#[derive(Debug, Default)]
pub struct DescriptionCache {
    slot: Mutex<Option<DescribeOutcome>>,
}

impl DescriptionCache {
    /// An empty cache.
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Return the cached outcome, describing `path` if nothing is cached.
    ///
    /// `path` is ignored once an outcome is cached.
    ///
    /// # Errors
    ///
    /// The cached [`DescribeError`] of the first computation.
    pub fn get_or_describe(&self, path: &Path) -> DescribeOutcome {
        self.get_or_init(|| describe_repo(path))
    }

    /// Return the cached outcome, running `compute` if nothing is cached.
    ///
    /// # Errors
    ///
    /// The cached error of the first computation.
    pub fn get_or_init<F>(&self, compute: F) -> DescribeOutcome
    where
        F: FnOnce() -> Result<Description, DescribeError>,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert_with(|| compute().map(Arc::new).map_err(Arc::new))
            .clone()
    }

    /// Drop the cached outcome. Intended for test isolation only.
    pub fn reset(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

static PROCESS_DESCRIPTION: DescriptionCache = DescriptionCache::new();

/// Describe the repository in the current working directory, once per
/// process.
///
/// # Errors
///
/// The first computation's [`DescribeError`], shared by every caller.
pub fn describe() -> DescribeOutcome {
    PROCESS_DESCRIPTION.get_or_describe(Path::new("."))
}

/// Forget the process-wide description. Intended for test isolation only.
pub fn reset_process_description() {
    PROCESS_DESCRIPTION.reset();
}
