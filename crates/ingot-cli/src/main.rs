//! `ingot` - transpile note query scripts to Lua from the command line.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use ingot_script::{lexer, transpile, TranspileOptions};
use std::io::Read;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

use cli::Cli;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(cli: &Cli) {
    let level: LevelFilter = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        cli.log_level.into()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let source = read_input(cli.input.as_deref())?;
    info!(bytes = source.len(), "read query script");

    if cli.dump_tokens {
        let tokens = lexer::tokenize(&source);
        let json = serde_json::to_string_pretty(&tokens)?;
        return write_output(cli.output.as_deref(), &json);
    }

    let options = TranspileOptions {
        preserve_comments: !cli.no_comments,
        helper_table: cli.helper_table.clone(),
    };
    let lua = transpile(&source, &options)?;
    write_output(cli.output.as_deref(), &lua)
}

fn read_input(path: Option<&std::path::Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&std::path::Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}
