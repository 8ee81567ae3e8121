//! Command-line interface definitions and parsing
//!
//! This module defines the CLI structure for tagview using the `clap` crate.
//!
//! # Commands
//!
//! - **browse**: Step through the window interactively (default)
//! - **filter**: Tag-filter search, printed grouped by day
//! - **prompt**: Free-text search, printed grouped by score band
//! - **tags**: List, create and delete tags
//! - **date**: Jump to the media nearest a date
//! - **sync**: Ask the backend to rescan its media
//! - **config**: Show the configuration or change the backend
//! - **completions**: Print a shell completion script
//!
//! # Design Features
//!
//! - Global `--quiet` flag for scripting-friendly output
//! - Global `--backend` to override the configured backend for one run
//! - Command aliases (e.g., `b` for `browse`, `f` for `filter`)

use chrono::{Local, NaiveDate};
use clap::{Command, Parser, Subcommand};
use clap_complete::Shell;
use std::io::Write;

/// Tag management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TagsCommands {
    /// List all tags
    #[command(visible_alias = "ls")]
    List,

    /// Create a tag
    New {
        /// Name of the new tag
        name: String,
    },

    /// Delete a tag and all its assignments
    #[command(visible_alias = "rm")]
    Delete {
        /// Name of the tag to delete
        name: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
}

/// Configuration management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the current configuration
    Show,

    /// Change the backend URL
    #[command(name = "set-backend")]
    SetBackend {
        /// Base URL of the backend (e.g., http://127.0.0.1:8000)
        #[arg(value_name = "URL")]
        url: String,
    },
}

#[derive(Parser, Debug)]
#[command(name = "tagview")]
#[command(about = "Browse and tag a media collection", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Suppress informational output (only print results)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Log engine activity to stderr
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Backend URL for this run (overrides config)
    #[arg(long = "backend", value_name = "URL", global = true)]
    pub backend: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Step through media interactively (default)
    #[command(visible_alias = "b")]
    Browse {
        /// Tags to filter by (can specify multiple: -t tag1 -t tag2)
        #[arg(short = 't', long = "tag", value_name = "TAG", num_args = 0..)]
        tags: Vec<String>,

        /// Browse prompt results instead of a tag filter
        #[arg(long = "prompt", value_name = "TEXT", conflicts_with = "tags")]
        prompt: Option<String>,
    },

    /// Show media carrying every given tag
    #[command(visible_alias = "f")]
    Filter {
        /// Tags to filter by (none means all media)
        #[arg(short = 't', long = "tag", value_name = "TAG", num_args = 0..)]
        tags: Vec<String>,
    },

    /// Show the media best matching a text prompt
    #[command(visible_alias = "p")]
    Prompt {
        /// Free-text query
        #[arg(value_name = "TEXT")]
        text: String,

        /// Number of results (defaults to the configured limit)
        #[arg(short = 'n', long = "limit", value_name = "N")]
        limit: Option<usize>,
    },

    /// Manage tags
    #[command(visible_alias = "t")]
    Tags {
        #[command(subcommand)]
        command: TagsCommands,
    },

    /// Show media around the item nearest a date
    Date {
        /// Date as YYYY-MM-DD (local time)
        #[arg(value_name = "DATE")]
        date: NaiveDate,
    },

    /// Ask the backend to rescan its media
    Sync,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Print a shell completion script
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Parse command line arguments
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the command, defaulting to Browse if none specified
    #[must_use]
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Browse {
            tags: Vec::new(),
            prompt: None,
        })
    }
}

/// Write a completion script for `shell` to `buf`
pub fn generate_completions<W: Write>(shell: Shell, cmd: &mut Command, buf: &mut W) {
    clap_complete::generate(shell, cmd, cmd.get_name().to_string(), buf);
}

/// Local midnight of `date` as a UNIX timestamp
#[must_use]
pub fn date_to_timestamp(date: NaiveDate) -> Option<f64> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    let local = midnight.and_local_timezone(Local).earliest()?;
    #[allow(clippy::cast_precision_loss)]
    Some(local.timestamp() as f64)
}

/// One line of input in the browse loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseAction {
    Next,
    Prev,
    /// Toggle a tag on the current item
    Toggle(String),
    /// Delete the current item
    Delete,
    Help,
    Quit,
}

impl BrowseAction {
    /// Parses a browse command; `None` for unrecognised input
    ///
    /// An empty line means "next".
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));
        match word {
            "" | "n" | "next" => Some(Self::Next),
            "p" | "prev" => Some(Self::Prev),
            "t" | "tag" if !rest.is_empty() => Some(Self::Toggle(rest.to_string())),
            "d" | "delete" => Some(Self::Delete),
            "?" | "h" | "help" => Some(Self::Help),
            "q" | "quit" => Some(Self::Quit),
            _ => None,
        }
    }
}
