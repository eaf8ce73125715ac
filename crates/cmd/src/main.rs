// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Write};

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod common;

use commands::{cat_command, list_command, stat_command, walk_command};
use common::{SourceArgs, open_fs};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "ghfs")]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a directory, e.g. `org/repo/git/main/src`
    Ls {
        /// Path to list, `.` for the root
        #[arg(default_value = ".")]
        path: String,
        /// Show mode, size and modification time
        #[arg(short, long)]
        long: bool,
    },
    /// Print the content of files
    Cat {
        /// Files to print
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Show metadata of a file or directory
    Stat {
        path: String,
    },
    /// Print every path below a directory
    Walk {
        #[arg(default_value = ".")]
        path: String,
        /// Show mode, size and modification time
        #[arg(short, long)]
        long: bool,
    },
}

fn main() -> Result<()> {
    diagnostics::init_diagnostics();

    let cli = Cli::parse();
    let fs = open_fs(&cli.source)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Commands::Ls { path, long } => list_command(&fs, path, *long, &mut out)?,
        Commands::Cat { paths } => cat_command(&fs, paths, &mut out)?,
        Commands::Stat { path } => stat_command(&fs, path, &mut out)?,
        Commands::Walk { path, long } => walk_command(&fs, path, *long, &mut out)?,
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "ghfs",
            "--repo",
            "acme/widgets@dev",
            "--org",
            "acme",
            "ls",
            "-l",
            "acme",
        ])
        .unwrap();
        assert_eq!(cli.source.repo, ["acme/widgets@dev"]);
        assert_eq!(cli.source.org, ["acme"]);
        match cli.command {
            Commands::Ls { path, long } => {
                assert_eq!(path, "acme");
                assert!(long);
            }
            _ => panic!("expected ls"),
        }
    }

    #[test]
    fn test_cat_requires_path() {
        assert!(Cli::try_parse_from(["ghfs", "--org", "acme", "cat"]).is_err());
    }
}
