//! Archive command

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tagship_core::config::Config;
use tagship_core::{ArchiveFormat, GitArchive};

/// Options for [`archive`], as given on the command line
#[derive(Debug, Default)]
pub struct ArchiveArgs {
    pub format: Option<ArchiveFormat>,
    pub prefix: Option<String>,
    pub output: Option<PathBuf>,
    pub allow_unreadable_tree: bool,
    pub extra: Vec<String>,
}

/// Write an archive of the tagged tree and print its path
pub fn archive(config_path: &Path, args: ArchiveArgs) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let desc = tagship_core::describe().context("Failed to describe repository")?;
    let version = desc.semver()?;

    let fallback = match &config.package {
        Some(package) => package.name.clone(),
        None => desc
            .workdir()
            .canonicalize()
            .ok()
            .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "source".to_string()),
    };
    let prefix = args
        .prefix
        .unwrap_or_else(|| config.archive.resolve_prefix(&fallback, &version.to_string()));
    let format = args.format.unwrap_or(config.archive.format);
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{prefix}.{}", format.extension())));

    let mut extra = config.archive.extra.clone();
    extra.extend(args.extra);

    let archive = GitArchive::from_description(desc, prefix)?
        .allow_unreadable_tree(args.allow_unreadable_tree || config.archive.allow_unreadable_tree);

    tracing::info!(
        "archiving {} as {format} under {:?} to {}",
        archive.description().described().name,
        archive.prefix(),
        output.display()
    );

    let file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let written = archive
        .create(format, BufWriter::new(file), &extra)
        .context("Failed to create archive")
        .and_then(|mut sink| sink.flush().context("Failed to flush archive"));
    if let Err(err) = written {
        // A failed build leaves a truncated archive behind
        let _ = std::fs::remove_file(&output);
        return Err(err);
    }

    println!("{}", output.display());
    Ok(())
}
