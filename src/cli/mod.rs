//! CLI module for toolstream - command-line interface and subcommands.
//!
//! Provides subcommands for printing the generated prompt, streaming model
//! output through the tool system and inspecting a manifest.

pub mod commands;

pub use commands::Cli;
