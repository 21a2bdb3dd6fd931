//! Command-line interface for the loader.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;

use crate::configuration::Configuration;
use crate::dump::{save_yaml, to_yaml};
use crate::error::Result;
use crate::loader::Loader;
use crate::resolver::ParameterResolver;

/// Servicewire - Load and inspect service container configuration files.
#[derive(Parser)]
#[command(name = "servicewire")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a configuration file and print a summary.
    Check {
        /// Configuration file (.xml, .yml, .yaml or .ini)
        file: String,

        /// Directory to search for the file and its imports (repeatable)
        #[arg(short = 'p', long = "path")]
        paths: Vec<PathBuf>,
    },

    /// Load a configuration file and print it as YAML.
    Dump {
        /// Configuration file (.xml, .yml, .yaml or .ini)
        file: String,

        /// Directory to search for the file and its imports (repeatable)
        #[arg(short = 'p', long = "path")]
        paths: Vec<PathBuf>,

        /// Expand %parameter% placeholders before dumping
        #[arg(long)]
        resolve: bool,

        /// Write to this file instead of standard output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { file, paths } => check_command(&file, paths),
        Commands::Dump {
            file,
            paths,
            resolve,
            output,
        } => dump_command(&file, paths, resolve, output.as_deref()),
    }
}

fn load(file: &str, paths: Vec<PathBuf>) -> Result<Configuration> {
    Loader::builder().paths(paths).build().load(file)
}

/// Execute the check command.
fn check_command(file: &str, paths: Vec<PathBuf>) -> Result<()> {
    let configuration = load(file, paths)?;

    println!("{} {}", style("Loaded").bold(), style(file).cyan());
    println!();
    println!("  Parameters:  {}", configuration.parameters().len());
    println!("  Definitions: {}", configuration.definitions().len());
    println!("  Aliases:     {}", configuration.aliases().len());
    println!("  Files:");
    for resource in configuration.resources() {
        println!("    {}", style(resource.display()).dim());
    }

    println!();
    println!("{}", style("Configuration is valid").green().bold());
    Ok(())
}

/// Execute the dump command.
fn dump_command(
    file: &str,
    paths: Vec<PathBuf>,
    resolve: bool,
    output: Option<&Path>,
) -> Result<()> {
    let mut configuration = load(file, paths)?;
    if resolve {
        configuration = ParameterResolver::new(&configuration).resolve_configuration()?;
    }

    match output {
        Some(output) => {
            save_yaml(&configuration, output)?;
            eprintln!(
                "{} {}",
                style("Saved to:").green().bold(),
                output.display()
            );
        }
        None => print!("{}", to_yaml(&configuration)?),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_check() {
        let cli = Cli::parse_from(["servicewire", "check", "services.xml", "-p", "config"]);

        let Commands::Check { file, paths } = cli.command else {
            panic!("expected check command");
        };
        assert_eq!(file, "services.xml");
        assert_eq!(paths, vec![PathBuf::from("config")]);
    }

    #[test]
    fn test_cli_parse_dump() {
        let cli = Cli::parse_from([
            "servicewire",
            "dump",
            "services.yml",
            "--path",
            "a",
            "--path",
            "b",
            "--resolve",
        ]);

        let Commands::Dump {
            file,
            paths,
            resolve,
            output,
        } = cli.command
        else {
            panic!("expected dump command");
        };
        assert_eq!(file, "services.yml");
        assert_eq!(paths.len(), 2);
        assert!(resolve);
        assert!(output.is_none());
    }
}
