//! Describe, version and list commands

use anyhow::{Context, Result, bail};
use tagship_core::TreeListing;

/// Print the nearest tag, distance, cleanliness and HEAD
pub fn describe() -> Result<()> {
    let desc = tagship_core::describe().context("Failed to describe repository")?;
    let head = desc.described();

    match (desc.nearest_tag(), desc.distance()) {
        (Some(tag), Some(distance)) => {
            println!("tag:      {}", tag.name());
            println!("distance: {distance}");
        }
        _ => println!("tag:      none"),
    }
    println!("clean:    {}", desc.is_clean());
    println!("head:     {} ({})", head.name, head.commit);
    if let Ok(version) = desc.semver() {
        println!("version:  {version}");
    }
    Ok(())
}

/// Print the synthesized version of HEAD
pub fn version() -> Result<()> {
    let desc = tagship_core::describe().context("Failed to describe repository")?;
    println!("{}", desc.semver()?);
    Ok(())
}

/// Print every path of the nearest tag's tree
pub fn list() -> Result<()> {
    let desc = tagship_core::describe().context("Failed to describe repository")?;
    match desc.list_entries() {
        TreeListing::Listed(entries) => {
            for entry in entries {
                println!("{entry}");
            }
            Ok(())
        }
        TreeListing::NoTag => bail!("no semver tags found"),
        TreeListing::Unreadable { reason } => bail!(reason),
    }
}
