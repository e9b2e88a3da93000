//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the yeticli binary.

mod files;

pub use files::{collect_paths, confirm_upload, parse_tags, UploadPlan};

use clap::{Parser, Subcommand};

use crate::config::ClientConfig;
use crate::error::Result;

/// Yeti API command-line interface.
#[derive(Parser, Debug)]
#[command(name = "yeticli", about = "Yeti threat-intelligence CLI", version)]
pub struct Cli {
    /// Output results as JSON instead of a table.
    #[arg(long, short = 'j', global = true, default_value = "false")]
    pub json: bool,

    /// Yeti API base URL.
    #[arg(long, global = true, env = "YETI_URL", default_value = "http://localhost:5000/api")]
    pub url: String,

    /// Yeti API key.
    #[arg(long, global = true, env = "YETI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Skip TLS certificate verification.
    #[arg(long, global = true, default_value = "false")]
    pub insecure: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Client configuration from the global flags.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::new(&self.url)?.with_verify_tls(!self.insecure);
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key.clone());
        }
        Ok(config)
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload files to Yeti.
    Addfiles {
        /// File, directory or glob pattern (quote it) to upload.
        path: String,

        /// Comma-separated tags.
        #[arg(long)]
        tags: Option<String>,

        /// Walk a directory and upload every file in it.
        #[arg(long)]
        recurse: bool,

        /// Do not ask for confirmation before large uploads.
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Show a stored file by hash.
    Getfile {
        /// MD5, SHA1 or SHA256 of the file.
        hash: String,

        /// Write the file content to this path.
        #[arg(long)]
        save: Option<String>,
    },

    /// Match values against known observables and indicators.
    Match {
        /// Values to match.
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Run a oneshot analytic against a value.
    Oneshot {
        /// Analytic name, as listed by the server.
        analytic: String,

        /// Observable value to analyze.
        value: String,

        /// Give up after this many seconds.
        #[arg(long, default_value = "600")]
        timeout: u64,
    },
}
