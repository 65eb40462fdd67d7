//! Version tag selection.
//!
//! Scans `refs/tags/*` and keeps the annotated tags whose short name is a
//! semantic version behind a one-character marker (`v1.2.3`, `r0.4.0-rc.1`).
//! The result is keyed by the commit each tag points at, which is what the
//! history walk looks up.

use std::collections::HashMap;

use git2::{ObjectType, Oid, Repository};
use semver::Version;

use crate::describe::DescribeError;

/// An annotated tag whose name parses as a semantic version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag {
    name: String,
    version: Version,
    tag_id: Oid,
    target: Oid,
}

impl VersionTag {
    /// Short tag name as found in `refs/tags/` (e.g. `v1.2.3`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version parsed from the name.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Id of the annotated tag object.
    pub fn tag_id(&self) -> Oid {
        self.tag_id
    }

    /// Id of the object the tag points at (normally a commit).
    pub fn target(&self) -> Oid {
        self.target
    }
}

/// Parse a tag's short name as a version.
///
/// Exactly one leading character is stripped before parsing. Names with
/// nothing left after the marker, and names that do not parse, yield `None`.
///
/// ```
/// use tagship_core::tags::parse_tag_version;
///
/// assert_eq!(parse_tag_version("v1.2.3").unwrap().to_string(), "1.2.3");
/// assert!(parse_tag_version("not-a-version").is_none());
/// assert!(parse_tag_version("v").is_none());
/// ```
pub fn parse_tag_version(short_name: &str) -> Option<Version> {
    let mut chars = short_name.chars();
    chars.next()?;
    let rest = chars.as_str();
    if rest.is_empty() {
        return None;
    }
    Version::parse(rest).ok()
}

/// Collect every semver-named annotated tag, keyed by target id.
///
/// Lightweight tags (references pointing straight at a commit) are left out.
/// A reference whose object cannot be read fails the whole selection.
///
/// # Errors
///
/// Returns [`DescribeError::References`] if the tag references cannot be
/// listed and [`DescribeError::Tag`] if a matching tag cannot be read.
pub fn select_version_tags(repo: &Repository) -> Result<HashMap<Oid, VersionTag>, DescribeError> {
    let references = repo
        .references_glob("refs/tags/*")
        .map_err(DescribeError::References)?;

    let mut tags = HashMap::new();
    for reference in references {
        let reference = reference.map_err(DescribeError::References)?;
        let Some(name) = reference.shorthand() else {
            continue;
        };
        let Some(version) = parse_tag_version(name) else {
            tracing::trace!("skipping non-version tag {name}");
            continue;
        };
        let Some(oid) = reference.target() else {
            continue;
        };

        let object = repo.find_object(oid, None).map_err(|source| DescribeError::Tag {
            name: name.to_string(),
            source,
        })?;
        if object.kind() != Some(ObjectType::Tag) {
            tracing::debug!("skipping lightweight tag {name}");
            continue;
        }
        let tag = object.peel_to_tag().map_err(|source| DescribeError::Tag {
            name: name.to_string(),
            source,
        })?;

        tags.insert(
            tag.target_id(),
            VersionTag {
                name: name.to_string(),
                version,
                tag_id: tag.id(),
                target: tag.target_id(),
            },
        );
    }

    tracing::debug!("found {} version tags", tags.len());
    Ok(tags)
}
