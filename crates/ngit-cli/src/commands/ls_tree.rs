use std::io::{self, Write};

use anyhow::{bail, Result};
use bstr::ByteSlice;
use clap::Args;
use ngit_hash::Oid;
use ngit_repository::Repository;

use super::open_repo;

#[derive(Args)]
pub struct LsTreeArgs {
    /// Recurse into sub-trees
    #[arg(short = 'r')]
    recurse: bool,

    /// Tree to list
    #[arg(value_name = "tree")]
    tree: String,
}

pub fn run(args: &LsTreeArgs) -> Result<i32> {
    let repo = open_repo()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if !ngit_hash::is_hash(&args.tree) {
        bail!("not a valid object name: {}", args.tree);
    }
    let oid = Oid::from_hex(&args.tree)?;

    list_tree(&repo, &oid, "", args.recurse, &mut out)?;
    Ok(0)
}

fn list_tree(
    repo: &Repository,
    tree_oid: &Oid,
    prefix: &str,
    recurse: bool,
    out: &mut impl Write,
) -> Result<()> {
    let tree = repo.tree(tree_oid)?;

    for entry in tree.iter() {
        let name = entry.name.to_str_lossy();
        let full_path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        };

        if entry.mode.is_tree() && recurse {
            list_tree(repo, &entry.oid, &full_path, recurse, out)?;
        } else {
            writeln!(
                out,
                "{:06o} {} {}",
                entry.mode.raw(),
                entry.oid.to_hex(),
                full_path
            )?;
        }
    }
    Ok(())
}
