//! CLI - Command-line argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vigil_common::ActivityKind;

/// Vigil progression CLI
#[derive(Parser)]
#[command(name = "vigilctl")]
#[command(about = "Vigil - scam awareness training progress", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Config file (overrides $VIGIL_CONFIG and the default location)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Show level, XP, vigilance and badges
    Status {
        /// Output the raw record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a finished scenario or game
    Complete {
        /// Scenario or game id
        #[arg(long)]
        id: String,

        /// scenario or game
        #[arg(long, default_value = "scenario")]
        kind: ActivityKind,

        /// Raw score (0-100)
        #[arg(long)]
        score: u8,

        /// Seconds spent on the activity
        #[arg(long, default_value_t = 0)]
        time: u32,

        /// Hints used (games only)
        #[arg(long, default_value_t = 0)]
        hints: u32,
    },

    /// Sign in; existing account progress always wins over guest progress
    Login {
        /// User id from the identity provider
        user: String,
    },

    /// Return to guest mode
    Logout,

    /// Push progress cached while the remote store was unavailable
    Sync,

    /// Erase all progress for the current identity
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Export progress as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Replace current progress with an exported document
    Import {
        /// Export file to read
        file: PathBuf,
    },

    /// List all badges and which ones are earned
    Badges,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete() {
        let cli = Cli::try_parse_from([
            "vigilctl", "complete", "--id", "url-detective", "--kind", "game", "--score", "85",
            "--hints", "2",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Commands::Complete {
                id: "url-detective".to_string(),
                kind: ActivityKind::Game,
                score: 85,
                time: 0,
                hints: 2,
            }
        );
    }

    #[test]
    fn test_score_out_of_u8_range_rejected() {
        assert!(Cli::try_parse_from(["vigilctl", "complete", "--id", "usb-drop", "--score", "300"])
            .is_err());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(Cli::try_parse_from([
            "vigilctl", "complete", "--id", "usb-drop", "--kind", "quiz", "--score", "50"
        ])
        .is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["vigilctl", "status", "--config", "/tmp/vigil.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/vigil.toml")));
        assert_eq!(cli.command, Commands::Status { json: false });
    }
}
