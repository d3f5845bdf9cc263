//! CLI - Command Line Interface for Autocast
//!
//! Every command is scriptable. With `--json`, stdout carries exactly one JSON
//! document and exit codes are semantic.
//!
//! # Examples
//!
//! ```bash
//! # Search every provider
//! autocast search "Inception" --year 2010 --json
//!
//! # Cast the first stream to a configured Roku
//! autocast cast -t Inception -y 2010 --device "Living Room TV"
//!
//! # Is the TV awake? Wake it if not
//! autocast status --device "Bedroom TV" --wake
//! ```

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::models::MediaRequest;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Device not found
    DeviceNotFound = 4,
    /// No streams available
    NoStreams = 5,
    /// Cast failed
    CastFailed = 6,
    /// No catalog entry for the request
    MetadataNotFound = 7,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// Autocast - find a stream for a movie and play it on a Roku
#[derive(Parser, Debug)]
#[command(
    name = "autocast",
    version,
    about = "Find a stream for a movie and play it on a Roku",
    long_about = "Searches several stream providers for a movie, picks one \
                  candidate, wakes the target Roku if needed and launches \
                  playback through Media Assistant.",
    after_help = "EXAMPLES:\n\
                  autocast search Inception -y 2010      Search all providers\n\
                  autocast cast -i tt1375666 -d TV       Cast to device\n\
                  autocast devices                       List configured devices\n\
                  autocast status -d TV --wake           Check / wake a device"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Target device name or address
    #[arg(long, short = 'd', global = true)]
    pub device: Option<String>,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search all providers for streams
    #[command(visible_alias = "s")]
    Search(SearchCmd),

    /// Find a stream and play it on a device
    Cast(CastCmd),

    /// List configured devices
    #[command(visible_alias = "dev")]
    Devices(DevicesCmd),

    /// Check whether a device is reachable
    Status(StatusCmd),
}

// =============================================================================
// Media Arguments
// =============================================================================

/// What to look for; at least a title or an IMDB ID
#[derive(Args, Debug, Clone, Default)]
pub struct MediaArgs {
    /// Movie title
    #[arg(conflicts_with = "title")]
    pub query: Option<String>,

    /// Movie title (alternative to the positional argument)
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// IMDB ID (e.g., tt1375666)
    #[arg(long, short = 'i')]
    pub imdb_id: Option<String>,

    /// Release year
    #[arg(long, short = 'y')]
    pub year: Option<u16>,
}

impl MediaArgs {
    /// Validate the arguments into a request
    pub fn to_request(&self, device: Option<&str>) -> Result<MediaRequest, String> {
        if let Some(id) = self.imdb_id.as_deref() {
            validate_imdb_id(id.trim()).map_err(str::to_string)?;
        }

        MediaRequest::new(
            self.title.clone().or_else(|| self.query.clone()),
            self.imdb_id.as_ref().map(|id| id.trim().to_string()),
            self.year,
            device.map(str::to_string),
        )
        .map_err(|e| e.to_string())
    }
}

// =============================================================================
// Search Command
// =============================================================================

/// Resolve metadata and list every candidate stream
#[derive(Args, Debug)]
pub struct SearchCmd {
    #[command(flatten)]
    pub media: MediaArgs,
}

// =============================================================================
// Cast Command
// =============================================================================

/// Find a stream and play it on a Roku device
#[derive(Args, Debug)]
pub struct CastCmd {
    #[command(flatten)]
    pub media: MediaArgs,

    /// Stream index from `search` output (out of range picks the last)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub index: i64,
}

// =============================================================================
// Devices Command
// =============================================================================

/// List devices from the config file
#[derive(Args, Debug)]
pub struct DevicesCmd {}

// =============================================================================
// Status Command
// =============================================================================

/// Check whether a device responds
#[derive(Args, Debug)]
pub struct StatusCmd {
    /// Send a wake command and wait for boot if the device is asleep
    #[arg(long, short = 'w')]
    pub wake: bool,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create failure output that still carries data
    pub fn failure(data: T, msg: impl Into<String>, code: ExitCode) -> Self {
        Self {
            data: Some(data),
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data (JSON mode)
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        let output = JsonOutput::success(data);
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    /// Print data alongside an error, then return the exit code
    pub fn fail_with<T: Serialize>(&self, data: T, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::failure(data, &msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                println!("{}", json);
            }
            code
        } else {
            self.error(msg, code)
        }
    }

    /// Print a line of human-readable results (non-JSON mode)
    pub fn text(&self, msg: impl std::fmt::Display) {
        if !self.json {
            println!("{}", msg);
        }
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// IMDB ID Validation
// =============================================================================

/// Validate IMDB ID format (tt followed by digits)
pub fn validate_imdb_id(id: &str) -> Result<&str, &'static str> {
    if id.starts_with("tt") && id.len() >= 9 && id[2..].chars().all(|c| c.is_ascii_digit()) {
        Ok(id)
    } else {
        Err("Invalid IMDB ID format (expected tt followed by 7+ digits)")
    }
}

// =============================================================================
// Tests
// =============================================================================
