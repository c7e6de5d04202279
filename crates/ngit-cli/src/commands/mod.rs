pub mod cat_file;
pub mod check_ignore;
pub mod hash_object;
pub mod log;
pub mod ls_files;
pub mod ls_tree;
pub mod status;

use anyhow::Result;
use clap::Subcommand;

use crate::Cli;

#[derive(Subcommand)]
pub enum Commands {
    /// Show commit logs starting at HEAD
    Log(log::LogArgs),
    /// Show the working tree status
    Status(status::StatusArgs),
    /// Provide content or type and size information for repository objects
    CatFile(cat_file::CatFileArgs),
    /// Compute object ID and optionally create a blob from a file
    HashObject(hash_object::HashObjectArgs),
    /// Tell whether a path is excluded by the ignore rules
    CheckIgnore(check_ignore::CheckIgnoreArgs),
    /// Show information about files in the index
    LsFiles(ls_files::LsFilesArgs),
    /// List the contents of a tree object
    LsTree(ls_tree::LsTreeArgs),
}

/// Open the repository by walking up from the current directory.
pub fn open_repo() -> Result<ngit_repository::Repository> {
    Ok(ngit_repository::Repository::discover(".")?)
}

pub fn run(cli: Cli) -> Result<i32> {
    match &cli.command {
        Commands::Log(args) => log::run(args),
        Commands::Status(args) => status::run(args),
        Commands::CatFile(args) => cat_file::run(args),
        Commands::HashObject(args) => hash_object::run(args),
        Commands::CheckIgnore(args) => check_ignore::run(args),
        Commands::LsFiles(args) => ls_files::run(args),
        Commands::LsTree(args) => ls_tree::run(args),
    }
}
