//! Package command

use std::path::Path;

use anyhow::{Context, Result};
use tagship_core::config::Config;
use tagship_core::package::{PackageFormat, PackageInfo};

/// Print the package file name for the current version
pub fn package(config_path: &Path, arch: &str, format: PackageFormat) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let package = config
        .package
        .with_context(|| format!("No [package] table in {}", config_path.display()))?;

    let desc = tagship_core::describe().context("Failed to describe repository")?;
    let version = desc.semver()?;

    let info = PackageInfo::new(&package, format, &version.to_string(), arch)
        .context("Failed to get package information")?;
    println!("{}", info.target);
    Ok(())
}
