use std::io::{self, Write};

use anyhow::{bail, Result};
use bstr::ByteSlice;
use clap::{ArgGroup, Args};
use ngit_hash::Oid;
use ngit_object::Object;

use super::open_repo;

#[derive(Args)]
#[command(group(ArgGroup::new("mode").required(true).args(["type_only", "size", "pretty"])))]
pub struct CatFileArgs {
    /// Show object type
    #[arg(short = 't')]
    type_only: bool,

    /// Show object size
    #[arg(short = 's')]
    size: bool,

    /// Pretty-print the object content
    #[arg(short = 'p')]
    pretty: bool,

    /// Object to inspect
    #[arg(value_name = "object")]
    object: String,
}

pub fn run(args: &CatFileArgs) -> Result<i32> {
    let repo = open_repo()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let oid = parse_oid(&args.object)?;

    if args.type_only {
        let info = repo.object_info(&oid)?;
        writeln!(out, "{}", info.kind)?;
        return Ok(0);
    }
    if args.size {
        let info = repo.object_info(&oid)?;
        writeln!(out, "{}", info.size)?;
        return Ok(0);
    }

    match repo.object(&oid)? {
        Object::Tree(tree) => {
            for entry in tree.iter() {
                writeln!(
                    out,
                    "{} {} {}",
                    entry.mode.as_bytes().as_bstr(),
                    entry.oid.to_hex(),
                    entry.name.as_bstr()
                )?;
            }
        }
        other => {
            out.write_all(&other.serialize_payload())?;
        }
    }
    Ok(0)
}

fn parse_oid(spec: &str) -> Result<Oid> {
    if !ngit_hash::is_hash(spec) {
        bail!("not a valid object name: {spec}");
    }
    Ok(Oid::from_hex(spec)?)
}
