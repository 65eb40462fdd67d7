//! Package metadata for deb and rpm outputs.
//!
//! Turns a [`PackageConfig`] plus a version and architecture into a
//! validated [`PackageInfo`] carrying the conventional output file name.
//! Writing the package payload is left to a [`Packager`] implementation.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from package metadata handling.
#[derive(Error, Debug)]
pub enum PackageError {
    /// The package configuration could not be read.
    #[error("while reading configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The package configuration is not valid TOML for [`PackageConfig`].
    #[error("while reading configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The architecture has no name in the requested format.
    #[error("unsupported architecture {arch} for {format}")]
    UnsupportedArch {
        /// Architecture identifier as given.
        arch: String,
        /// Requested package format.
        format: PackageFormat,
    },

    /// A required field is missing or malformed.
    #[error("invalid package information: {0}")]
    Invalid(String),

    /// The packager failed to write the package.
    #[error("while writing package: {0}")]
    Write(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Package output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageFormat {
    /// Debian package (`.deb`).
    Deb,
    /// RPM package (`.rpm`).
    Rpm,
}

impl PackageFormat {
    /// File extension and packager name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deb => "deb",
            Self::Rpm => "rpm",
        }
    }
}

impl fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deb" => Ok(Self::Deb),
            "rpm" => Ok(Self::Rpm),
            _ => Err(format!("Unknown package format: {s}")),
        }
    }
}

/// Name of `arch` in the given package format.
///
/// `arch` uses Go-style identifiers (`amd64`, `arm64`, `386`, `arm7`, ...);
/// the Rust spellings `x86_64` and `aarch64` are accepted too.
///
/// # Errors
///
/// Returns [`PackageError::UnsupportedArch`] for unknown identifiers and for
/// combinations the format has no name for (e.g. `arm5` as rpm).
///
/// ```
/// use tagship_core::package::{PackageFormat, package_arch};
///
/// assert_eq!(package_arch("amd64", PackageFormat::Rpm).unwrap(), "x86_64");
/// assert_eq!(package_arch("ppc64le", PackageFormat::Deb).unwrap(), "ppc64el");
/// assert!(package_arch("mipsle", PackageFormat::Rpm).is_err());
/// ```
pub fn package_arch(arch: &str, format: PackageFormat) -> Result<&'static str, PackageError> {
    let (rpm, deb) = match arch {
        "all" => (Some("noarch"), "noarch"),
        "amd64" | "x86_64" => (Some("x86_64"), "amd64"),
        "386" => (Some("i386"), "i386"),
        "arm64" | "aarch64" => (Some("aarch64"), "arm64"),
        "ppc64le" => (Some("ppc64le"), "ppc64el"),
        "s390x" => (Some("s390x"), "s390x"),
        "arm" | "arm6" | "arm7" => (Some("armhfp"), "armhf"),
        "arm5" => (None, "armel"),
        "mipsle" => (None, "mipsel"),
        _ => (None, ""),
    };
    let name = match format {
        PackageFormat::Rpm => rpm,
        PackageFormat::Deb => Some(deb).filter(|d| !d.is_empty()),
    };
    name.ok_or_else(|| PackageError::UnsupportedArch {
        arch: arch.to_string(),
        format,
    })
}

/// Packaging settings, usually the `[package]` table of `tagship.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Package name.
    pub name: String,
    /// Distribution release number; `1` when unset.
    #[serde(default)]
    pub release: Option<String>,
    /// One-line summary.
    #[serde(default)]
    pub description: String,
    /// `Name <email>` of the maintainer.
    #[serde(default)]
    pub maintainer: String,
    /// Project homepage.
    #[serde(default)]
    pub homepage: String,
    /// License identifier.
    #[serde(default)]
    pub license: String,
}

impl PackageConfig {
    /// Parse a standalone package configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Parse`] on malformed TOML.
    pub fn parse(content: &str) -> Result<Self, PackageError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a package configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Io`] or [`PackageError::Parse`].
    pub fn load(path: &Path) -> Result<Self, PackageError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }
}

/// Everything a packager needs to produce one package file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
    /// Distribution release.
    pub release: String,
    /// Architecture, spelled for `format`.
    pub arch: String,
    /// Output format.
    pub format: PackageFormat,
    /// One-line summary.
    pub description: String,
    /// Maintainer.
    pub maintainer: String,
    /// Project homepage.
    pub homepage: String,
    /// License identifier.
    pub license: String,
    /// Conventional output file name.
    pub target: String,
}

impl PackageInfo {
    /// Resolve `config` for one version, architecture and format.
    ///
    /// # Errors
    ///
    /// Fails on an unsupported architecture or if validation fails.
    pub fn new(
        config: &PackageConfig,
        format: PackageFormat,
        version: &str,
        arch: &str,
    ) -> Result<Self, PackageError> {
        let arch = package_arch(arch, format)?.to_string();
        let release = config
            .release
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "1".to_string());

        let target = match format {
            // https://www.debian.org/doc/manuals/debian-faq/pkg-basics.en.html
            PackageFormat::Deb => format!("{}_{version}-{release}_{arch}.deb", config.name),
            // http://ftp.rpm.org/max-rpm/ch-rpm-file-format.html
            PackageFormat::Rpm => format!("{}-{version}-{release}.{arch}.rpm", config.name),
        };

        let info = Self {
            name: config.name.clone(),
            version: version.to_string(),
            release,
            arch,
            format,
            description: config.description.clone(),
            maintainer: config.maintainer.clone(),
            homepage: config.homepage.clone(),
            license: config.license.clone(),
            target,
        };
        info.validate()?;
        Ok(info)
    }

    /// Check the fields every package format requires.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Invalid`] describing the first problem.
    pub fn validate(&self) -> Result<(), PackageError> {
        if self.name.is_empty() {
            return Err(PackageError::Invalid("package name is empty".to_string()));
        }
        if self.version.is_empty() {
            return Err(PackageError::Invalid("package version is empty".to_string()));
        }
        if let Some(bad) = [&self.name, &self.version, &self.release]
            .into_iter()
            .find(|field| field.chars().any(char::is_whitespace))
        {
            return Err(PackageError::Invalid(format!(
                "{bad:?} must not contain whitespace"
            )));
        }
        Ok(())
    }
}

/// Writes a package payload for a resolved [`PackageInfo`].
pub trait Packager {
    /// Write the package described by `info` into `sink`.
    ///
    /// # Errors
    ///
    /// Any failure producing or writing the payload.
    fn package(
        &self,
        info: &PackageInfo,
        sink: &mut dyn Write,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A resolved package bound to the packager that writes it.
#[derive(Debug)]
pub struct Package<P> {
    /// Payload writer.
    pub packager: P,
    /// Resolved metadata.
    pub info: PackageInfo,
}

impl<P: Packager> Package<P> {
    /// Resolve `config` and bind `packager`.
    ///
    /// # Errors
    ///
    /// See [`PackageInfo::new`].
    pub fn new(
        packager: P,
        config: &PackageConfig,
        format: PackageFormat,
        version: &str,
        arch: &str,
    ) -> Result<Self, PackageError> {
        let info = PackageInfo::new(config, format, version, arch)?;
        Ok(Self { packager, info })
    }

    /// Write the package into `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Write`] wrapping the packager's failure.
    pub fn create(&self, sink: &mut dyn Write) -> Result<(), PackageError> {
        tracing::info!("writing {}", self.info.target);
        self.packager
            .package(&self.info, sink)
            .map_err(PackageError::Write)
    }
}
