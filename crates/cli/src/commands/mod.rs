//! Subcommand implementations

use std::path::PathBuf;

pub mod config;
pub mod doctor;
pub mod run;
pub mod schedule;
pub mod state;
pub mod watch;

/// Options shared by every subcommand
#[derive(Debug, Clone)]
pub struct GlobalOpts {
    pub config_path: Option<PathBuf>,
    pub memory_state: bool,
}
