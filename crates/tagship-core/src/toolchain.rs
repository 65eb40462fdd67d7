//! Running the cargo toolchain for test, build and install steps.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// Failures while running the toolchain.
#[derive(Error, Debug)]
pub enum ToolchainError {
    /// No cargo executable could be located.
    #[error("cargo not found: {0}")]
    NotFound(#[from] which::Error),

    /// The command could not be started.
    #[error("while running {command}: {source}")]
    Spawn {
        /// Command line that was attempted.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The command ran and reported failure.
    #[error("{command} failed with exit code: {code:?}")]
    Failed {
        /// Command line that failed.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
    },
}

/// A cargo executable plus the argument conventions of the release pipeline.
#[derive(Debug, Clone)]
pub struct Toolchain {
    program: PathBuf,
}

impl Toolchain {
    /// The cargo named by `$CARGO`, or the first `cargo` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::NotFound`] if neither is available.
    pub fn cargo() -> Result<Self, ToolchainError> {
        if let Some(cargo) = std::env::var_os("CARGO").filter(|c| !c.is_empty()) {
            return Ok(Self::with_program(cargo));
        }
        Ok(Self::with_program(which::which("cargo")?))
    }

    /// Use an explicit program instead of cargo.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The program being run.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments for a unit test run: library and binary targets only.
    pub fn unit_test_args(paths: &[String]) -> Vec<String> {
        let mut args = vec!["test".to_string(), "--lib".to_string(), "--bins".to_string()];
        args.extend(paths.iter().cloned());
        args
    }

    /// Arguments for a full test run that reports every failing target.
    pub fn integration_test_args(paths: &[String]) -> Vec<String> {
        let mut args = vec!["test".to_string(), "--no-fail-fast".to_string()];
        args.extend(paths.iter().cloned());
        args
    }

    /// Run unit tests.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_unit_tests(&self, paths: &[String]) -> Result<(), ToolchainError> {
        self.run(Self::unit_test_args(paths))
    }

    /// Run unit and integration tests.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_integration_tests(&self, paths: &[String]) -> Result<(), ToolchainError> {
        self.run(Self::integration_test_args(paths))
    }

    /// `cargo build` with extra arguments.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn build(&self, args: &[String]) -> Result<(), ToolchainError> {
        self.run(std::iter::once("build".to_string()).chain(args.iter().cloned()))
    }

    /// `cargo install` with extra arguments.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn install(&self, args: &[String]) -> Result<(), ToolchainError> {
        self.run(std::iter::once("install".to_string()).chain(args.iter().cloned()))
    }

    /// Run the program with `args`, streaming its output to ours.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::Spawn`] if the process cannot start and
    /// [`ToolchainError::Failed`] if it exits unsuccessfully.
    pub fn run<I, S>(&self, args: I) -> Result<(), ToolchainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        let command = display_command(&cmd);
        tracing::info!("exec: {command}");

        let status = cmd.status().map_err(|source| ToolchainError::Spawn {
            command: command.clone(),
            source,
        })?;
        if !status.success() {
            return Err(ToolchainError::Failed {
                command,
                code: status.code(),
            });
        }
        Ok(())
    }
}

fn display_command(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
