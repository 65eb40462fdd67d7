//! Semantic version synthesis.
//!
//! A build exactly at a tag gets the tag's version. Anything past it gets a
//! pre-release that sorts after the tag and before the next release:
//!
//! | tag | distance | version |
//! |---|---|---|
//! | `v1.2.3` | 0 | `1.2.3` |
//! | `v1.2.3` | 5 | `1.2.4-alpha.4.devel.5` |
//! | `v1.2.3-rc.1` | 2 | `1.2.3-rc.1.devel.2` |
//!
//! The `alpha` number reuses the bumped patch number.

use semver::{Prerelease, Version};
use thiserror::Error;

use crate::describe::Description;

/// Failures while deriving a version.
#[derive(Error, Debug)]
pub enum VersionError {
    /// History holds no version tag to start from.
    #[error("no semver tags found")]
    NoTags,

    /// The synthesized pre-release did not parse.
    #[error("invalid pre-release {label}: {source}")]
    Prerelease {
        /// Label that was rejected.
        label: String,
        /// Parser error.
        #[source]
        source: semver::Error,
    },
}

/// Version for a build `distance` commits past a tag carrying `tagged`.
///
/// # Errors
///
/// Returns [`VersionError::Prerelease`] if the resulting label is not a valid
/// pre-release, which cannot happen for a `tagged` version that parsed.
pub fn synthesize(tagged: &Version, distance: u64) -> Result<Version, VersionError> {
    let mut version = tagged.clone();
    if distance == 0 {
        return Ok(version);
    }

    let mut label = version.pre.as_str().to_string();
    if label.is_empty() {
        version.patch += 1;
        label = format!("alpha.{}", version.patch);
    }
    label.push_str(&format!(".devel.{distance}"));

    version.pre = Prerelease::new(&label)
        .map_err(|source| VersionError::Prerelease { label, source })?;
    Ok(version)
}

impl Description {
    /// The semantic version of the described commit.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::NoTags`] when no version tag was found.
    pub fn semver(&self) -> Result<Version, VersionError> {
        let tag = self.nearest_tag().ok_or(VersionError::NoTags)?;
        let distance = self.distance().unwrap_or_default();
        synthesize(tag.version(), distance)
    }
}
