mod commands;
mod diagnostics;
mod info;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use textref::config::Config;
use textref::{Error, Lang};

/// Top-level arguments.
#[derive(Parser)]
#[command(name = "textref", about = "Structural addressing and citation linking for interlinked texts")]
struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Config file to use instead of `.textref.toml` in the working directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Link documents and log ambiguous or unresolved citations for review
    Check {
        /// Documents to scan
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show usage, configuration, and a summary of the loaded library
    Info {
        /// Output as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
    /// Find and resolve the citations in a document
    Link {
        /// Citation of the text this document comments on
        #[arg(long)]
        context: Option<String>,
        /// The document
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse a citation and show its canonical forms
    Parse {
        /// The citation, e.g. "Genesis 1:1-5"
        citation: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the review log
    Review {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Split a spanning range into section-sized pieces
    Split {
        /// The citation, e.g. "Genesis 1:29-2:3"
        citation: String,
        /// Split into single positions instead
        #[arg(long)]
        segments: bool,
    },
    /// Print the text a citation addresses
    Text {
        /// The citation
        citation: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Language of the text (defaults to the configured language)
        #[arg(long)]
        lang: Option<Lang>,
        /// Version title to read instead of the merged text
        #[arg(long)]
        version: Option<String>,
    },
}

/// Install the stderr log subscriber. `TEXTREF_LOG` wins over `RUST_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("TEXTREF_LOG")
        .or_else(|_| return EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| return EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Load the named config, or `.textref.toml` from the working directory.
///
/// # Errors
///
/// Returns `Error::ConfigNotFound` for a missing named file, or the parse
/// errors of `Config::load`.
fn load_config(root: &Path, path: Option<&Path>) -> Result<Config, Error> {
    return match path {
        Some(path) => Config::load_file(path),
        None => Config::load(root),
    };
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let root = PathBuf::from(".");

    let result = load_config(&root, cli.config.as_deref()).and_then(|config| {
        return match cli.command {
            Commands::Check { files } => commands::check(&config, &files),
            Commands::Info { json } => {
                commands::info(&root, &config, json);
                Ok(ExitCode::SUCCESS)
            },
            Commands::Link { context, file, json } => commands::link(&config, &file, context.as_deref(), json),
            Commands::Parse { citation, json } => commands::parse(&config, &citation, json),
            Commands::Review { json } => commands::review(&config, json),
            Commands::Split { citation, segments } => commands::split(&config, &citation, segments),
            Commands::Text {
                citation,
                json,
                lang,
                version,
            } => commands::text(&config, &citation, lang, version.as_deref(), json),
        };
    });

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(3)
        },
    };
}
