use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use ngit_object::ObjectKind;

use super::open_repo;

#[derive(Args)]
pub struct HashObjectArgs {
    /// Object kind (default: blob)
    #[arg(short = 't', default_value = "blob", value_name = "kind")]
    kind: ObjectKind,

    /// Skip line-ending filters
    #[arg(long = "no-filters")]
    no_filters: bool,

    /// Write the object into the object database
    #[arg(short = 'w')]
    write: bool,

    /// File to hash
    #[arg(value_name = "file")]
    file: String,
}

pub fn run(args: &HashObjectArgs) -> Result<i32> {
    let mut repo = open_repo()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let data = std::fs::read(&args.file)?;
    let apply_filters = !args.no_filters;

    let oid = if args.write {
        repo.write_object(args.kind, &data, Some(&args.file), apply_filters)?
    } else {
        repo.hash_object(args.kind, &data, Some(&args.file), apply_filters)?
    };
    writeln!(out, "{}", oid.to_hex())?;
    Ok(0)
}
