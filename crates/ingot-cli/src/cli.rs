//! Command line definition.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Parser)]
#[command(name = "ingot")]
#[command(about = "ingot - transpile note query scripts to Lua")]
#[command(version)]
pub struct Cli {
    /// Query script to transpile (stdin when omitted)
    pub input: Option<PathBuf>,

    /// Write the Lua output here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the token stream as JSON instead of transpiling
    #[arg(long)]
    pub dump_tokens: bool,

    /// Drop source comments from the output
    #[arg(long)]
    pub no_comments: bool,

    /// Name of the sandbox helper table the generated code targets
    #[arg(long, default_value = "util")]
    pub helper_table: String,

    /// Set log level (off, error, warn, info, debug, trace)
    #[arg(short = 'l', long, value_enum, default_value = "off")]
    pub log_level: LogLevel,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_defaults() {
        let cli = Cli::try_parse_from(["ingot"]).unwrap();
        assert!(cli.input.is_none());
        assert!(!cli.dump_tokens);
        assert_eq!(cli.helper_table, "util");
        assert_eq!(cli.log_level, LogLevel::Off);
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "ingot",
            "query.js",
            "--output",
            "query.lua",
            "--no-comments",
            "--helper-table",
            "qapi",
            "-l",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.input.unwrap().to_str().unwrap(), "query.js");
        assert_eq!(cli.output.unwrap().to_str().unwrap(), "query.lua");
        assert!(cli.no_comments);
        assert_eq!(cli.helper_table, "qapi");
        assert_eq!(cli.log_level, LogLevel::Debug);
    }
}
