use std::io::{self, Write};

use anyhow::Result;
use bstr::ByteSlice;
use clap::Args;
use ngit_repository::{Head, RepoError, StagingStatus, Status, StatusRecord};

use super::open_repo;

#[derive(Args)]
pub struct StatusArgs {}

pub fn run(_args: &StatusArgs) -> Result<i32> {
    let mut repo = open_repo()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    // An unborn branch (HEAD names a ref with no commits yet) still has
    // a meaningful status: everything in the index is to be committed.
    let (headline, root_tree) = match repo.head() {
        Ok(Head::Branch { name, commit }) => {
            let tree = repo.commit(&commit)?.tree;
            (format!("On branch {name}"), Some(tree))
        }
        Ok(Head::Tag { name, commit }) => {
            let tree = repo.commit(&commit)?.tree;
            (format!("HEAD points at tag {name}"), Some(tree))
        }
        Ok(Head::Detached { commit }) => {
            let tree = repo.commit(&commit)?.tree;
            (format!("HEAD detached at {}", &commit.to_hex()[..7]), Some(tree))
        }
        Err(RepoError::Ref(ngit_ref::RefError::NotFound(_))) => {
            ("No commits yet".to_string(), None)
        }
        Err(e) => return Err(e.into()),
    };
    writeln!(out, "{headline}")?;

    let index = repo.index()?;
    let records = repo.working_dir_status(&index, root_tree.as_ref())?;

    let staged: Vec<&StatusRecord> = records.iter().filter(|r| r.status == Status::Staged).collect();
    let unstaged: Vec<&StatusRecord> =
        records.iter().filter(|r| r.status == Status::Modified).collect();
    let untracked: Vec<&StatusRecord> =
        records.iter().filter(|r| r.status == Status::Untracked).collect();

    if !staged.is_empty() {
        writeln!(out, "\nChanges to be committed:")?;
        for record in &staged {
            let label = match record.staging {
                Some(StagingStatus::Added) => "new file",
                Some(StagingStatus::Modified) => "modified",
                Some(StagingStatus::Deleted) => "deleted",
                None => "changed",
            };
            writeln!(out, "\t{}:   {}", label, record.path.as_bstr())?;
        }
    }

    if !unstaged.is_empty() {
        writeln!(out, "\nChanges not staged for commit:")?;
        for record in &unstaged {
            writeln!(out, "\tmodified:   {}", record.path.as_bstr())?;
        }
    }

    if !untracked.is_empty() {
        writeln!(out, "\nUntracked files:")?;
        for record in &untracked {
            writeln!(out, "\t{}", record.path.as_bstr())?;
        }
    }

    if staged.is_empty() && unstaged.is_empty() && untracked.is_empty() {
        writeln!(out, "nothing to commit, working tree clean")?;
    }

    Ok(0)
}
