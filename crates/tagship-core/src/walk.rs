//! Commit history walk to the nearest version tag.

use std::collections::HashMap;

use git2::{Oid, Repository, Sort};

use crate::tags::VersionTag;

/// Outcome of walking history back from a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    /// The first tagged commit's tag, if any was reached.
    pub tag: Option<VersionTag>,
    /// Commits visited before the tagged one. When `tag` is `None` this is
    /// the total number of commits visited and carries no meaning.
    pub distance: u64,
}

/// Count commits from the front of `commits` until one is tagged.
///
/// The tag check happens before the counter moves, so a tagged first commit
/// yields distance 0.
///
/// # Errors
///
/// Stops at and returns the first error produced by `commits`.
pub fn find_nearest<I, E>(commits: I, tags: &HashMap<Oid, VersionTag>) -> Result<Walk, E>
where
    I: IntoIterator<Item = Result<Oid, E>>,
{
    let mut distance = 0;
    for commit in commits {
        if let Some(tag) = tags.get(&commit?) {
            return Ok(Walk {
                tag: Some(tag.clone()),
                distance,
            });
        }
        distance += 1;
    }
    Ok(Walk {
        tag: None,
        distance,
    })
}

/// Walk ancestry from `from` newest-first by committer time.
///
/// Ordering by time rather than topology means that with clock skew between
/// branches the tag found may not be the closest one in the graph.
///
/// # Errors
///
/// Returns any error libgit2 raises while setting up or advancing the walk.
pub fn walk_history(
    repo: &Repository,
    from: Oid,
    tags: &HashMap<Oid, VersionTag>,
) -> Result<Walk, git2::Error> {
    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TIME)?;
    revwalk.push(from)?;
    find_nearest(revwalk, tags)
}
