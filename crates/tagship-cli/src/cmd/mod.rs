//! Command implementations

pub mod archive;
pub mod describe;
pub mod package;
pub mod run;
