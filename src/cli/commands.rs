//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - prompt: print the system prompt for a manifest
//! - process: stream model output through the tool system
//! - tools: list the tools of a manifest
//! - check: run the coarse tag-balance check

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Toolstream - extract and dispatch tagged tool calls from LLM output
#[derive(Parser, Debug)]
#[command(name = "toolstream")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the system prompt generated from a manifest
    Prompt {
        /// Tool manifest (YAML)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Stream model output through the tool system
    Process {
        /// Tool manifest (YAML)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Input file; reads stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Chunk size in bytes (overrides the config)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Warn about unknown tags
        #[arg(long)]
        strict: bool,

        /// Match tags ignoring case
        #[arg(long)]
        lowercase: bool,

        /// Collapse whitespace in captured content
        #[arg(long)]
        normalize: bool,
    },

    /// List the tools declared in a manifest
    Tools {
        /// Tool manifest (YAML)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Check that opening and closing tags are balanced
    Check {
        /// Input file; reads stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process() {
        let cli = Cli::parse_from([
            "toolstream",
            "process",
            "-m",
            "tools.yml",
            "--chunk-size",
            "8",
            "--strict",
        ]);
        match cli.command {
            Commands::Process {
                manifest,
                input,
                chunk_size,
                strict,
                lowercase,
                normalize,
            } => {
                assert_eq!(manifest, Some(PathBuf::from("tools.yml")));
                assert!(input.is_none());
                assert_eq!(chunk_size, Some(8));
                assert!(strict);
                assert!(!lowercase);
                assert!(!normalize);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["toolstream", "check", "-v", "-c", "custom.yml"]);
        assert!(cli.is_verbose());
        assert_eq!(cli.config, Some(PathBuf::from("custom.yml")));
        assert!(matches!(cli.command, Commands::Check { input: None }));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["toolstream"]).is_err());
    }
}
