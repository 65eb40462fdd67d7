//! Source archives of a tagged tree.
//!
//! The list of paths comes from the tag's tree, but the bytes are read from
//! the working directory. An archive only matches the tag byte for byte when
//! the working tree is clean and checked out at the tag; [`GitArchive`]
//! refuses to build unless HEAD is the tag and warns when the tree is dirty.
//!
//! Entries are written one at a time with a single source file open at any
//! moment. Symlinks are never followed: tar stores them as link headers, zip
//! stores the link target as the entry body.

use std::fmt;
use std::fs::{self, File, Metadata};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Datelike, Timelike};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::describe::{DescribeError, Description, describe};
use crate::tree::TreeListing;

/// Output container format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveFormat {
    /// Gzip-compressed tar archive (`.tar.gz`).
    #[default]
    #[serde(rename = "tar.gz", alias = "tgz")]
    TarGz,
    /// Zip archive with Deflate entries (`.zip`).
    #[serde(rename = "zip")]
    Zip,
}

impl ArchiveFormat {
    /// Conventional file extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tar.gz" | "tgz" | "targz" => Ok(Self::TarGz),
            "zip" => Ok(Self::Zip),
            _ => Err(format!("Unknown archive format: {s}")),
        }
    }
}

/// Failures while building an archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The working directory could not be described.
    #[error(transparent)]
    Describe(#[from] Arc<DescribeError>),

    /// History holds no version tag.
    #[error("no tag found to create archive from")]
    NoTag,

    /// HEAD is past the nearest tag.
    #[error("tag {0} must also be HEAD")]
    NotHead(String),

    /// The tag's tree could not be listed.
    #[error("{0}")]
    UnreadableTree(String),

    /// A single entry could not be read or written.
    #[error("while {action} {path}: {source}")]
    Entry {
        /// What was being done, e.g. `opening file`.
        action: &'static str,
        /// Source path relative to the archive root.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Trailing archive or compression data could not be written.
    #[error("while finishing {format} archive: {source}")]
    Finish {
        /// Format being written.
        format: ArchiveFormat,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl ArchiveError {
    fn entry<'a>(action: &'static str, path: &'a str) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| Self::Entry {
            action,
            path: path.to_string(),
            source,
        }
    }
}

/// What a filesystem entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file; content is copied.
    File,
    /// Directory; name carries a trailing `/`.
    Directory,
    /// Symbolic link; the target is stored, not followed.
    Symlink,
    /// Device, socket, fifo and the like; written without content.
    Other,
}

/// One path about to be written, with its on-disk metadata.
#[derive(Debug)]
pub struct ArchiveEntry {
    /// Path relative to the archive root, as given.
    pub path: String,
    /// Where the entry is read from.
    pub source: PathBuf,
    /// Name inside the archive.
    pub name: String,
    /// Entry kind, from `lstat`.
    pub kind: EntryKind,
    metadata: Metadata,
}

impl ArchiveEntry {
    /// Stat `path` under `root` without following symlinks.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Entry`] if the path cannot be stat'ed.
    pub fn stat(root: &Path, prefix: &str, path: &str) -> Result<Self, ArchiveError> {
        let source = root.join(path);
        let metadata = fs::symlink_metadata(&source)
            .map_err(ArchiveError::entry("getting information for file", path))?;

        let file_type = metadata.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };

        Ok(Self {
            path: path.to_string(),
            name: entry_name(prefix, path, kind == EntryKind::Directory),
            source,
            kind,
            metadata,
        })
    }

    /// Filesystem metadata captured by [`stat`](Self::stat).
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn link_target(&self) -> Result<PathBuf, ArchiveError> {
        fs::read_link(&self.source).map_err(ArchiveError::entry("reading symlink", &self.path))
    }

    fn open(&self) -> Result<File, ArchiveError> {
        File::open(&self.source).map_err(ArchiveError::entry("opening file", &self.path))
    }
}

/// Join `prefix` and `path` with `/`, marking directories with a trailing
/// `/`.
///
/// ```
/// use tagship_core::archive::entry_name;
///
/// assert_eq!(entry_name("proj-1.0", "dir/b.txt", false), "proj-1.0/dir/b.txt");
/// assert_eq!(entry_name("proj-1.0/", "dir", true), "proj-1.0/dir/");
/// assert_eq!(entry_name("", "./a.txt", false), "a.txt");
/// ```
pub fn entry_name(prefix: &str, path: &str, is_dir: bool) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.strip_prefix("./").unwrap_or(path).trim_matches('/');
    let mut name = if prefix.is_empty() {
        path.to_string()
    } else if path.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}/{path}")
    };
    if is_dir {
        name.push('/');
    }
    name
}

/// Write an archive of `paths` (relative to `root`) into `sink`.
///
/// The sink is handed back once the archive, including trailing metadata, has
/// been written. On error the sink holds an incomplete archive and should be
/// discarded.
///
/// # Errors
///
/// Returns [`ArchiveError::Entry`] naming the first path that could not be
/// archived, or [`ArchiveError::Finish`] if the trailer could not be written.
pub fn write_archive<W: Write + Seek>(
    format: ArchiveFormat,
    sink: W,
    root: &Path,
    prefix: &str,
    paths: &[String],
) -> Result<W, ArchiveError> {
    tracing::info!(
        "writing {format} archive of {} path(s) under {prefix:?}",
        paths.len()
    );
    match format {
        ArchiveFormat::TarGz => write_tar_gz(sink, root, prefix, paths),
        ArchiveFormat::Zip => write_zip(sink, root, prefix, paths),
    }
}

fn write_tar_gz<W: Write>(
    sink: W,
    root: &Path,
    prefix: &str,
    paths: &[String],
) -> Result<W, ArchiveError> {
    let finish = |source| ArchiveError::Finish {
        format: ArchiveFormat::TarGz,
        source,
    };

    // On an early return the builder drops first and writes its end-of-archive
    // blocks, then the encoder drops and writes the gzip footer.
    let mut builder = tar::Builder::new(GzEncoder::new(sink, Compression::default()));
    for path in paths {
        let entry = ArchiveEntry::stat(root, prefix, path)?;
        append_tar(&mut builder, &entry)?;
    }

    let encoder = builder.into_inner().map_err(finish)?;
    encoder.finish().map_err(finish)
}

fn append_tar<W: Write>(
    builder: &mut tar::Builder<W>,
    entry: &ArchiveEntry,
) -> Result<(), ArchiveError> {
    tracing::trace!("tar: {}", entry.name);
    let write_err = ArchiveError::entry("writing tar entry for", &entry.path);

    let mut header = tar::Header::new_gnu();
    header.set_metadata(&entry.metadata);

    match entry.kind {
        EntryKind::File => {
            header.set_size(entry.metadata.len());
            let mut body = SizedReader::new(entry.open()?, entry.metadata.len());
            builder
                .append_data(&mut header, &entry.name, &mut body)
                .map_err(ArchiveError::entry("copying file to tar", &entry.path))?;
            body.finish()
                .map_err(ArchiveError::entry("copying file to tar", &entry.path))
        }
        EntryKind::Symlink => {
            let target = entry.link_target()?;
            header.set_size(0);
            builder
                .append_link(&mut header, &entry.name, &target)
                .map_err(write_err)
        }
        EntryKind::Directory | EntryKind::Other => {
            header.set_size(0);
            builder
                .append_data(&mut header, &entry.name, io::empty())
                .map_err(write_err)
        }
    }
}

/// Reads exactly the size recorded in a tar header.
///
/// The tar builder pads a short body with zeros, so a file that changed
/// size since it was stat'ed has to be caught here.
struct SizedReader<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> SizedReader<R> {
    fn new(inner: R, len: u64) -> Self {
        Self {
            inner,
            remaining: len,
        }
    }

    /// Fails if the source still has bytes past the recorded size.
    fn finish(mut self) -> io::Result<()> {
        let mut extra = [0u8; 1];
        if self.inner.read(&mut extra)? != 0 {
            return Err(io::Error::other("file grew while being archived"));
        }
        Ok(())
    }
}

impl<R: Read> Read for SizedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let max = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 && max > 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "file shrank while being archived",
            ));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

fn write_zip<W: Write + Seek>(
    sink: W,
    root: &Path,
    prefix: &str,
    paths: &[String],
) -> Result<W, ArchiveError> {
    let mut zip = ZipWriter::new(sink);
    for path in paths {
        let entry = ArchiveEntry::stat(root, prefix, path)?;
        append_zip(&mut zip, &entry)?;
    }

    zip.finish().map_err(|err| ArchiveError::Finish {
        format: ArchiveFormat::Zip,
        source: io::Error::from(err),
    })
}

fn append_zip<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    entry: &ArchiveEntry,
) -> Result<(), ArchiveError> {
    tracing::trace!("zip: {}", entry.name);
    let create_err = |err: zip::result::ZipError| ArchiveError::Entry {
        action: "creating zip entry for",
        path: entry.path.clone(),
        source: io::Error::from(err),
    };
    let copy_err = ArchiveError::entry("copying file to zip", &entry.path);

    let mut options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip_mtime(&entry.metadata))
        .large_file(entry.metadata.len() >= u64::from(u32::MAX));
    if let Some(mode) = unix_mode(&entry.metadata) {
        options = options.unix_permissions(mode);
    }

    match entry.kind {
        EntryKind::Directory => zip
            .add_directory(entry.name.as_str(), options)
            .map_err(create_err),
        EntryKind::File => {
            let mut file = entry.open()?;
            zip.start_file(entry.name.as_str(), options)
                .map_err(create_err)?;
            io::copy(&mut file, zip).map(drop).map_err(copy_err)
        }
        EntryKind::Symlink => {
            let target = entry.link_target()?;
            zip.start_file(entry.name.as_str(), options)
                .map_err(create_err)?;
            zip.write_all(target.to_string_lossy().as_bytes())
                .map_err(copy_err)
        }
        EntryKind::Other => zip
            .start_file(entry.name.as_str(), options)
            .map_err(create_err),
    }
}

/// Zip timestamps cannot predate 1980; such files get the format's epoch.
fn zip_mtime(metadata: &Metadata) -> zip::DateTime {
    metadata
        .modified()
        .ok()
        .map(chrono::DateTime::<chrono::Utc>::from)
        .and_then(|t| {
            zip::DateTime::from_date_and_time(
                t.year() as u16,
                t.month() as u8,
                t.day() as u8,
                t.hour() as u8,
                t.minute() as u8,
                t.second() as u8,
            )
            .ok()
        })
        .unwrap_or_default()
}

#[cfg(unix)]
fn unix_mode(metadata: &Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn unix_mode(_metadata: &Metadata) -> Option<u32> {
    None
}

/// Archive of the working tree at an exactly tagged HEAD.
#[derive(Debug)]
pub struct GitArchive {
    description: Arc<Description>,
    prefix: String,
    allow_unreadable_tree: bool,
}

impl GitArchive {
    /// Bind the process-wide description of the current directory.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be described, has no version tag, or
    /// HEAD is not the tagged commit.
    pub fn new(prefix: impl Into<String>) -> Result<Self, ArchiveError> {
        Self::from_description(describe()?, prefix)
    }

    /// Bind an existing description.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NoTag`] without a version tag and
    /// [`ArchiveError::NotHead`] when HEAD is past it.
    pub fn from_description(
        description: Arc<Description>,
        prefix: impl Into<String>,
    ) -> Result<Self, ArchiveError> {
        let tag = description.nearest_tag().ok_or(ArchiveError::NoTag)?;
        if !description.is_exact() {
            return Err(ArchiveError::NotHead(tag.name().to_string()));
        }
        Ok(Self {
            description,
            prefix: prefix.into(),
            allow_unreadable_tree: false,
        })
    }

    /// Archive only the extra paths when the tag's tree cannot be read,
    /// instead of failing.
    pub fn allow_unreadable_tree(mut self, allow: bool) -> Self {
        self.allow_unreadable_tree = allow;
        self
    }

    /// The description the archive is built from.
    pub fn description(&self) -> &Description {
        &self.description
    }

    /// Prefix every entry name starts with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Paths the archive will hold: the tag's tree followed by `extra`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::UnreadableTree`] if the tree cannot be listed
    /// and that was not allowed.
    pub fn paths(&self, extra: &[String]) -> Result<Vec<String>, ArchiveError> {
        let mut paths = match self.description.list_entries() {
            TreeListing::Listed(entries) => entries,
            TreeListing::NoTag => Vec::new(),
            TreeListing::Unreadable { reason } => {
                if !self.allow_unreadable_tree {
                    return Err(ArchiveError::UnreadableTree(reason));
                }
                tracing::warn!("{reason}; archiving extra paths only");
                Vec::new()
            }
        };
        paths.extend(extra.iter().cloned());
        Ok(paths)
    }

    /// Write the archive into `sink` and hand the sink back.
    ///
    /// # Errors
    ///
    /// See [`paths`](Self::paths) and [`write_archive`].
    pub fn create<W: Write + Seek>(
        &self,
        format: ArchiveFormat,
        sink: W,
        extra: &[String],
    ) -> Result<W, ArchiveError> {
        if !self.description.is_clean() {
            tracing::warn!("working tree has local changes; archive may not match the tag");
        }
        let paths = self.paths(extra)?;
        write_archive(
            format,
            sink,
            self.description.workdir(),
            &self.prefix,
            &paths,
        )
    }
}
