//! Command-line interface for genforge.
//!
//! Provides a `run` command (execute the engine against a manifest and
//! snippet map, writing a JSON report) and a `report` command (render an
//! existing report as Markdown, optionally diffed against a baseline).

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli};
