//! Core library for tagship.
//!
//! Derives a release version from git history and builds source archives of
//! the tagged tree:
//!
//! - [`tags`] selects annotated tags named like `v1.2.3`;
//! - [`walk`] finds the nearest one by walking history newest-first;
//! - [`describe`] caches the result for the process;
//! - [`version`] turns a description into a semantic version;
//! - [`tree`] lists the tag's files and [`archive`] packs them;
//! - [`package`] and [`toolchain`] cover the packaging and build steps
//!   around them.

pub mod archive;
pub mod config;
pub mod describe;
pub mod package;
pub mod tags;
pub mod toolchain;
pub mod tree;
pub mod version;
pub mod walk;

#[cfg(test)]
mod testutil;

pub use archive::{ArchiveFormat, GitArchive, write_archive};
pub use describe::{Description, describe, describe_repo};
pub use tree::TreeListing;
pub use version::synthesize;
