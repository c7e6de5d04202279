use std::io::{self, Write};

use anyhow::Result;
use bstr::ByteSlice;
use clap::Args;

use super::open_repo;

#[derive(Args)]
pub struct LsFilesArgs {}

pub fn run(_args: &LsFilesArgs) -> Result<i32> {
    let repo = open_repo()?;
    let index = repo.index()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for entry in index.iter() {
        writeln!(out, "{}", entry.path.as_bstr())?;
    }
    Ok(0)
}
