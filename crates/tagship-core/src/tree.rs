//! Listing the files of a tagged tree.

use git2::{Repository, Tree, TreeWalkMode, TreeWalkResult};

use crate::describe::Description;

/// Paths recorded in the nearest tag's tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeListing {
    /// Every path of the tree, directories before their contents.
    Listed(Vec<String>),
    /// There is no nearest tag to list.
    NoTag,
    /// The repository or the tag's tree could not be read.
    Unreadable {
        /// What went wrong.
        reason: String,
    },
}

impl TreeListing {
    /// Listed paths; empty unless the tree was read.
    pub fn entries(&self) -> &[String] {
        match self {
            Self::Listed(entries) => entries,
            Self::NoTag | Self::Unreadable { .. } => &[],
        }
    }
}

/// Every blob, subtree and submodule path under `tree`, depth first.
///
/// Paths are relative to `tree` and always use `/`.
///
/// # Errors
///
/// Returns the libgit2 error if the walk cannot read a subtree.
pub fn list_tree(tree: &Tree<'_>) -> Result<Vec<String>, git2::Error> {
    let mut entries = Vec::new();
    tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        entries.push(format!("{root}{}", String::from_utf8_lossy(entry.name_bytes())));
        TreeWalkResult::Ok
    })?;
    Ok(entries)
}

impl Description {
    /// List the nearest tag's tree.
    ///
    /// Never fails; read errors come back as [`TreeListing::Unreadable`] so
    /// the caller decides whether an empty listing is acceptable.
    pub fn list_entries(&self) -> TreeListing {
        let Some(tag) = self.nearest_tag() else {
            return TreeListing::NoTag;
        };

        let listed = Repository::open(self.workdir())
            .and_then(|repo| {
                let tree = repo.find_object(tag.tag_id(), None)?.peel_to_tree()?;
                list_tree(&tree)
            });

        match listed {
            Ok(entries) => {
                tracing::debug!("{} lists {} path(s)", tag.name(), entries.len());
                TreeListing::Listed(entries)
            }
            Err(err) => TreeListing::Unreadable {
                reason: format!("while reading tree of {}: {err}", tag.name()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::describe::describe_repo;
    use crate::testutil::TestRepo;

    #[test]
    fn test_lists_tag_tree_in_preorder() {
        let repo = TestRepo::new();
        repo.write("README.md", "hello");
        repo.write("src/lib.rs", "");
        repo.write("src/nested/mod.rs", "");
        let head = repo.commit_all("release", 1_000);
        repo.annotated_tag("v1.0.0", head);

        let desc = describe_repo(repo.path()).unwrap();
        assert_eq!(
            desc.list_entries(),
            TreeListing::Listed(vec![
                "README.md".to_string(),
                "src".to_string(),
                "src/lib.rs".to_string(),
                "src/nested".to_string(),
                "src/nested/mod.rs".to_string(),
            ])
        );
    }

    #[test]
    fn test_lists_tag_not_head() {
        let repo = TestRepo::new();
        repo.write("a.txt", "a");
        let tagged = repo.commit_all("release", 1_000);
        repo.annotated_tag("v1.0.0", tagged);
        repo.write("b.txt", "b");
        repo.commit_all("after", 2_000);

        let desc = describe_repo(repo.path()).unwrap();
        assert_eq!(desc.list_entries().entries(), ["a.txt".to_string()]);
    }

    #[test]
    fn test_no_tag() {
        let repo = TestRepo::new();
        repo.commit("init", 1_000);
        let desc = describe_repo(repo.path()).unwrap();
        assert_eq!(desc.list_entries(), TreeListing::NoTag);
        assert!(desc.list_entries().entries().is_empty());
    }

    #[test]
    fn test_unreadable_when_repository_gone() {
        let repo = TestRepo::new();
        let head = repo.commit("release", 1_000);
        repo.annotated_tag("v1.0.0", head);
        let desc = describe_repo(repo.path()).unwrap();

        std::fs::remove_dir_all(repo.path().join(".git")).unwrap();
        let listing = desc.list_entries();
        assert!(matches!(listing, TreeListing::Unreadable { .. }));
        assert!(listing.entries().is_empty());
    }
}
