//! The `loraprep config` command for configuration management.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use loraprep_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize a new config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command.
///
/// `config_path` is the `--config` override, if any.
pub async fn execute(args: ConfigArgs, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path
        .map(|p| PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).into_owned()))
        .unwrap_or_else(Config::default_path);

    match args.command {
        ConfigCommand::Show => {
            let config = if path.exists() {
                Config::load_from(&path)?
            } else {
                Config::default()
            };
            println!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            println!("{}", path.display());
        }

        ConfigCommand::Init { force } => {
            init(&path, force)?;
            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let toml = Config::default().to_toml()?;
    std::fs::write(path, toml)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init(&path, false).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.package.target_dimension, 1024);
    }

    #[test]
    fn test_init_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# mine").unwrap();

        assert!(init(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");

        init(&path, true).unwrap();
        assert!(Config::load_from(&path).is_ok());
    }
}
