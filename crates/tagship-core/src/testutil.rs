//! Scratch git repositories for unit tests.

use std::path::Path;

use git2::{IndexAddOption, Oid, Repository, Signature, Time};
use tempfile::TempDir;

/// A throwaway repository with a working tree in a temp dir.
pub(crate) struct TestRepo {
    dir: TempDir,
    repo: Repository,
}

impl TestRepo {
    pub(crate) fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self { dir, repo }
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn repo(&self) -> &Repository {
        &self.repo
    }

    pub(crate) fn write(&self, rel: &str, contents: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    #[cfg(unix)]
    pub(crate) fn symlink(&self, target: &str, rel: &str) {
        std::os::unix::fs::symlink(target, self.dir.path().join(rel)).unwrap();
    }

    /// Writes `<message>.txt` and commits everything in the working tree.
    pub(crate) fn commit(&self, message: &str, time: i64) -> Oid {
        self.write(&format!("{message}.txt"), message);
        self.commit_all(message, time)
    }

    /// Stages every change in the working tree and commits it with the
    /// given committer time (seconds since the epoch).
    pub(crate) fn commit_all(&self, message: &str, time: i64) -> Oid {
        let mut index = self.repo.index().unwrap();
        index
            .add_all(["*"], IndexAddOption::DEFAULT, None)
            .unwrap();
        index.update_all(["*"], None).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();

        let sig = signature(time);
        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<_> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    pub(crate) fn annotated_tag(&self, name: &str, target: Oid) -> Oid {
        let object = self.repo.find_object(target, None).unwrap();
        self.repo
            .tag(name, &object, &signature(0), name, false)
            .unwrap()
    }

    pub(crate) fn lightweight_tag(&self, name: &str, target: Oid) -> Oid {
        let object = self.repo.find_object(target, None).unwrap();
        self.repo.tag_lightweight(name, &object, false).unwrap()
    }
}

fn signature(time: i64) -> Signature<'static> {
    Signature::new("Tagship Test", "test@tagship.invalid", &Time::new(time, 0)).unwrap()
}
