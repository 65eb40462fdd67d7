//! Toolchain commands

use anyhow::Result;
use tagship_core::toolchain::Toolchain;

/// Run unit tests, or the full suite with `integration`
pub fn test(integration: bool, args: &[String]) -> Result<()> {
    let cargo = Toolchain::cargo()?;
    if integration {
        cargo.run_integration_tests(args)?;
    } else {
        cargo.run_unit_tests(args)?;
    }
    Ok(())
}

/// Run cargo build
pub fn build(args: &[String]) -> Result<()> {
    Toolchain::cargo()?.build(args)?;
    Ok(())
}

/// Run cargo install
pub fn install(args: &[String]) -> Result<()> {
    Toolchain::cargo()?.install(args)?;
    Ok(())
}
