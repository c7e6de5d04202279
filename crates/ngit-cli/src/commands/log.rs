use std::collections::HashSet;
use std::io::{self, Write};

use anyhow::Result;
use bstr::ByteSlice;
use clap::Args;
use ngit_hash::Oid;

use super::open_repo;

#[derive(Args)]
pub struct LogArgs {
    /// Limit the number of commits shown
    #[arg(short = 'n', long = "max-count")]
    max_count: Option<usize>,
}

pub fn run(args: &LogArgs) -> Result<i32> {
    let repo = open_repo()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let head = repo.head()?;
    let mut pending: Vec<Oid> = vec![*head.commit()];
    let mut seen: HashSet<Oid> = HashSet::new();
    let mut shown = 0usize;

    while let Some(oid) = pending.pop() {
        if !seen.insert(oid) {
            continue;
        }
        if let Some(max) = args.max_count {
            if shown >= max {
                break;
            }
        }

        let commit = repo.commit(&oid)?;

        writeln!(out, "commit {}", oid.to_hex())?;
        writeln!(
            out,
            "Author: {} <{}>",
            commit.author.name.as_bstr(),
            commit.author.email.as_bstr()
        )?;
        if commit.committer.name != commit.author.name
            || commit.committer.email != commit.author.email
        {
            writeln!(
                out,
                "Committer: {} <{}>",
                commit.committer.name.as_bstr(),
                commit.committer.email.as_bstr()
            )?;
        }
        writeln!(out, "Date:   {}", commit.author.date.format_default())?;
        writeln!(out)?;
        for line in commit.message.lines() {
            writeln!(out, "    {}", line.as_bstr())?;
        }
        writeln!(out)?;
        shown += 1;

        // Parents are walked depth-first, first parent last so it is
        // popped next and linear history stays chronological.
        for parent in commit.parents.iter().rev() {
            if !seen.contains(parent) {
                pending.push(*parent);
            }
        }
    }

    Ok(0)
}
