//! Shared harness for ngit CLI tests: a process runner and fixture
//! repository builders.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use ngit_hash::Oid;
use ngit_object::ObjectKind;
use ngit_odb::ObjectDatabase;

/// Captured output from running a command.
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Discover the path to the compiled `ngit` binary.
pub fn ngit_bin() -> PathBuf {
    let mut path = std::env::current_exe()
        .unwrap()
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf();
    path.push("ngit");
    path
}

/// Run the ngit binary in `dir` with the given arguments.
pub fn ngit(dir: &Path, args: &[&str]) -> CommandResult {
    let output = Command::new(ngit_bin())
        .args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .output()
        .expect("failed to run ngit");
    CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    }
}

/// A fixture repository on disk.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
}

impl TestRepo {
    /// Create an empty repository skeleton with `main` checked out.
    pub fn init() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let git = dir.path().join(".git");
        for sub in ["objects", "refs/heads", "refs/tags"] {
            std::fs::create_dir_all(git.join(sub)).unwrap();
        }
        std::fs::write(git.join("HEAD"), "ref: refs/heads/main\n").unwrap();
        std::fs::write(git.join("config"), "[core]\n\tautocrlf = false\n").unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git_dir(&self) -> PathBuf {
        self.dir.path().join(".git")
    }

    fn odb(&self) -> ObjectDatabase {
        ObjectDatabase::open(self.git_dir().join("objects")).unwrap()
    }

    pub fn write_blob(&self, data: &[u8]) -> Oid {
        self.odb().write_raw(ObjectKind::Blob, data).unwrap()
    }

    pub fn write_tree(&self, entries: &[(&str, &str, Oid)]) -> Oid {
        let mut payload = Vec::new();
        for (mode, name, oid) in entries {
            payload.extend_from_slice(mode.as_bytes());
            payload.push(b' ');
            payload.extend_from_slice(name.as_bytes());
            payload.push(0);
            payload.extend_from_slice(oid.as_bytes());
        }
        self.odb().write_raw(ObjectKind::Tree, &payload).unwrap()
    }

    pub fn write_commit(&self, tree: &Oid, parents: &[Oid], message: &str) -> Oid {
        let mut payload = Vec::new();
        payload.extend_from_slice(format!("tree {}\n", tree.to_hex()).as_bytes());
        for parent in parents {
            payload.extend_from_slice(format!("parent {}\n", parent.to_hex()).as_bytes());
        }
        payload.extend_from_slice(b"author Ada Lovelace <ada@example.com> 1234567890 +0000\n");
        payload
            .extend_from_slice(b"committer Ada Lovelace <ada@example.com> 1234567890 +0000\n\n");
        payload.extend_from_slice(message.as_bytes());
        self.odb().write_raw(ObjectKind::Commit, &payload).unwrap()
    }

    pub fn set_ref(&self, name: &str, oid: &Oid) {
        let path = self.git_dir().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, format!("{}\n", oid.to_hex())).unwrap();
    }

    /// Install a DIRC v2 index with regular-file entries.
    pub fn install_index(&self, entries: &[(&str, Oid)]) {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"DIRC");
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&(entries.len() as u32).to_be_bytes());
        for (path, oid) in entries {
            let start = buf.len();
            for _ in 0..6 {
                buf.extend_from_slice(&0u32.to_be_bytes());
            }
            buf.extend_from_slice(&0o100644u32.to_be_bytes());
            for _ in 0..3 {
                buf.extend_from_slice(&0u32.to_be_bytes());
            }
            buf.extend_from_slice(oid.as_bytes());
            buf.extend_from_slice(&(path.len() as u16).to_be_bytes());
            buf.extend_from_slice(path.as_bytes());
            let entry_size = (62 + path.len() + 8) & !7;
            while buf.len() - start < entry_size {
                buf.push(0);
            }
        }
        let checksum = ngit_hash::Hasher::digest(&buf).unwrap();
        buf.extend_from_slice(checksum.as_bytes());
        std::fs::write(self.git_dir().join("index"), &buf).unwrap();
    }

    /// One commit with `file.txt`, `main` pointing at it, matching index
    /// and worktree file. Returns `(blob, tree, commit)`.
    pub fn seed_clean_commit(&self) -> (Oid, Oid, Oid) {
        let blob = self.write_blob(b"hello\n");
        let tree = self.write_tree(&[("100644", "file.txt", blob)]);
        let commit = self.write_commit(&tree, &[], "initial commit\n");
        self.set_ref("refs/heads/main", &commit);
        self.install_index(&[("file.txt", blob)]);
        std::fs::write(self.path().join("file.txt"), b"hello\n").unwrap();
        (blob, tree, commit)
    }
}
