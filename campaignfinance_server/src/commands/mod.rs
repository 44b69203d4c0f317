//! CLI subcommand implementations.

pub mod import;
pub mod init;
pub mod serve;
