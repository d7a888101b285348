//! loraprep CLI - prepare image datasets for LoRA training.
//!
//! Captions images through hosted models, optionally rewrites the captions
//! around a subject name, resizes images to square training resolutions and
//! zips the result for upload to a trainer.
//!
//! # Usage
//!
//! ```bash
//! # Caption ./images/cats into ./output/cats
//! loraprep caption cats
//!
//! # Caption and refine around a subject name
//! loraprep caption cats --refine chonky --suffix _caption
//!
//! # Resize to 1024x1024 and package with a trigger word
//! loraprep resize cats --size 1024
//! loraprep package cats TOK
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// loraprep - caption, resize and package image datasets for LoRA training.
#[derive(Parser, Debug)]
#[command(name = "loraprep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, env = "LORAPREP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Caption every image of a dataset into a fresh output directory
    Caption(cli::caption::CaptionArgs),

    /// Rewrite the captions of an output dataset around a subject name
    Refine(cli::refine::RefineArgs),

    /// Resize every image of a dataset to a square
    Resize(cli::resize::ResizeArgs),

    /// Verify, rename and zip a resized dataset for training
    Package(cli::package::PackageArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Provider keys may live in a local .env file
    dotenv::dotenv().ok();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match &cli.config {
        Some(path) => {
            let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
            loraprep_core::Config::load_from(&expanded)?
        }
        None => match loraprep_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `loraprep config path`."
                );
                loraprep_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("loraprep v{}", loraprep_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Caption(args) => cli::caption::execute(args, config).await,
        Commands::Refine(args) => cli::refine::execute(args, config).await,
        Commands::Resize(args) => cli::resize::execute(args, config).await,
        Commands::Package(args) => cli::package::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, cli.config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_package_requires_trigger_word() {
        let err = Cli::try_parse_from(["loraprep", "package", "cats"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_caption_requires_dataset() {
        let err = Cli::try_parse_from(["loraprep", "caption"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_caption_parses_options() {
        let cli = Cli::try_parse_from([
            "loraprep",
            "caption",
            "cats",
            "--prompt",
            "Describe the cat:",
            "--refine",
            "chonky",
            "--naming",
            "sequential",
            "--suffix",
            "_caption",
        ])
        .unwrap();
        match cli.command {
            Commands::Caption(args) => {
                assert_eq!(args.dataset, "cats");
                assert_eq!(args.prompt.as_deref(), Some("Describe the cat:"));
                assert_eq!(args.refine.as_deref(), Some("chonky"));
                assert_eq!(args.suffix.as_deref(), Some("_caption"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
