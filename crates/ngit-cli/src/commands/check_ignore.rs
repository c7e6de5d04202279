use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use bstr::BStr;
use clap::Args;

use super::open_repo;

#[derive(Args)]
pub struct CheckIgnoreArgs {
    /// Path to check, relative to the worktree root
    #[arg(value_name = "path")]
    path: String,
}

pub fn run(args: &CheckIgnoreArgs) -> Result<i32> {
    let mut repo = open_repo()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let is_dir = repo
        .work_tree()
        .map(|wt| wt.join(Path::new(&args.path)).is_dir())
        .unwrap_or(false);
    let ignored = repo.is_ignored(BStr::new(args.path.as_bytes()), is_dir)?;

    if ignored {
        writeln!(out, "Ignored")?;
        Ok(0)
    } else {
        writeln!(out, "Not ignored")?;
        Ok(1)
    }
}
