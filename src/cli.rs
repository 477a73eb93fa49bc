use crate::config::{Config, DEFAULT_BASE_URL};
use crate::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "userdeck")]
#[command(about = "Browse the user directory and claim records")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory API base URL
    #[arg(long, global = true, env = "USERDECK_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Request timeout
    #[arg(long, global = true, env = "USERDECK_TIMEOUT", default_value = "15s", value_parser = parse_duration)]
    pub timeout: Duration,

    /// How long a fetched page is served without refetching
    #[arg(long, global = true, env = "USERDECK_STALE_TIME", default_value = "30s", value_parser = parse_duration)]
    pub stale_time: Duration,

    /// Write logs to this file (the viewer otherwise discards them)
    #[arg(long, global = true, env = "USERDECK_LOG")]
    pub log_file: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Page to open the viewer on
    #[arg(long, short = 'p', default_value = "1")]
    pub page: u32,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print one page of users and the claim counters
    Page {
        /// Page number (1-indexed)
        #[arg(default_value = "1")]
        page: u32,

        /// Output as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,

        /// Output as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Copy a record to the clipboard and lock it
    Claim {
        /// Record identifier
        id: String,

        /// Page the record is listed on
        #[arg(long, short = 'p', default_value = "1")]
        page: u32,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    // Try humantime first
    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }

    // Bare number as seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    Err(format!(
        "Invalid duration '{}'. Examples: 500ms, 15s, 2m, 90",
        s
    ))
}

impl Cli {
    pub fn validate(&self) -> std::result::Result<(), String> {
        let page = match &self.command {
            Some(Command::Page { page, .. }) | Some(Command::Claim { page, .. }) => *page,
            _ => self.page,
        };
        if page == 0 {
            return Err("Pages are numbered from 1".to_string());
        }

        if self.timeout.is_zero() {
            return Err("Timeout must be greater than zero".to_string());
        }

        if let Some(Command::Claim { id, .. }) = &self.command
            && id.trim().is_empty()
        {
            return Err("Record id must not be empty".to_string());
        }

        Ok(())
    }

    pub fn config(&self) -> Result<Config> {
        Config::new(&self.base_url, self.timeout, self.stale_time)
    }
}
