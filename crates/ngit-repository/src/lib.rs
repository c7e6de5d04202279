//! Repository facade: composes the object database, refs, config, index,
//! and ignore rules behind one handle.
//!
//! Config and the ignore matcher are lazy per-repository caches, so most
//! operations take `&mut self`. A `Repository` is single-writer; loaded
//! pack and index data is immutable and safe to share read-only.

mod discover;
pub mod status;

pub use discover::{dir_exists, file_exists, find_repo};
pub use status::{StagingStatus, Status, StatusRecord};

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use bstr::BStr;
use ngit_config::Config;
use ngit_hash::{Hasher, Oid};
use ngit_index::{filter, IgnoreMatcher, Index};
use ngit_object::{Commit, Object, ObjectKind, Tag, Tree};
use ngit_odb::{ObjectDatabase, ObjectInfo, RawObject};
use ngit_ref::RefStore;

/// Errors surfaced by the repository facade.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not a git repository (or any parent): {0}")]
    NotARepository(PathBuf),

    #[error("invalid HEAD: {0}")]
    InvalidHead(String),

    #[error("object {oid} is a {actual}, expected {expected}")]
    UnexpectedKind {
        oid: Oid,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    #[error(transparent)]
    Odb(#[from] ngit_odb::OdbError),

    #[error(transparent)]
    Ref(#[from] ngit_ref::RefError),

    #[error(transparent)]
    Config(#[from] ngit_config::ConfigError),

    #[error(transparent)]
    Index(#[from] ngit_index::IndexError),

    #[error(transparent)]
    Object(#[from] ngit_object::ObjectError),

    #[error(transparent)]
    Hash(#[from] ngit_hash::HashError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Resolved HEAD state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// Symbolic ref into `refs/heads/`.
    Branch { name: String, commit: Oid },
    /// Symbolic ref into `refs/tags/`.
    Tag { name: String, commit: Oid },
    /// A raw commit OID.
    Detached { commit: Oid },
}

impl Head {
    /// The commit HEAD ultimately points at.
    pub fn commit(&self) -> &Oid {
        match self {
            Head::Branch { commit, .. } | Head::Tag { commit, .. } | Head::Detached { commit } => {
                commit
            }
        }
    }
}

/// An open repository.
pub struct Repository {
    git_dir: PathBuf,
    work_tree: Option<PathBuf>,
    odb: ObjectDatabase,
    refs: RefStore,
    /// Lazily loaded config; `None` until first use.
    config: Option<Config>,
    /// Lazily built ignore matcher; `None` until first use.
    ignore: Option<IgnoreMatcher>,
}

impl Repository {
    /// Discover a repository by walking up from `start`.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self, RepoError> {
        let git_dir = find_repo(start.as_ref())?;
        Self::from_git_dir(git_dir)
    }

    /// Open a repository given its worktree root or git directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let path = path.as_ref();
        let dot_git = path.join(".git");
        if dot_git.is_dir() {
            return Self::from_git_dir(
                std::fs::canonicalize(&dot_git)
                    .map_err(|_| RepoError::NotARepository(path.to_path_buf()))?,
            );
        }
        if path.join("HEAD").is_file() && path.join("objects").is_dir() {
            let git_dir = std::fs::canonicalize(path)
                .map_err(|_| RepoError::NotARepository(path.to_path_buf()))?;
            let odb = ObjectDatabase::open(git_dir.join("objects"))?;
            let refs = RefStore::new(&git_dir);
            return Ok(Self {
                git_dir,
                work_tree: None,
                odb,
                refs,
                config: None,
                ignore: None,
            });
        }
        Err(RepoError::NotARepository(path.to_path_buf()))
    }

    fn from_git_dir(git_dir: PathBuf) -> Result<Self, RepoError> {
        let work_tree = git_dir.parent().map(|p| p.to_path_buf());
        let odb = ObjectDatabase::open(git_dir.join("objects"))?;
        let refs = RefStore::new(&git_dir);
        Ok(Self {
            git_dir,
            work_tree,
            odb,
            refs,
            config: None,
            ignore: None,
        })
    }

    // --- Paths and subsystems ---

    /// Path to the `.git` directory.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Path to the working tree, if there is one.
    pub fn work_tree(&self) -> Option<&Path> {
        self.work_tree.as_deref()
    }

    /// The object database.
    pub fn odb(&self) -> &ObjectDatabase {
        &self.odb
    }

    /// Merged configuration, loaded on first use.
    pub fn config(&mut self) -> Result<&Config, RepoError> {
        if self.config.is_none() {
            self.config = Some(Config::load(&self.git_dir)?);
        }
        Ok(self.config.as_ref().expect("just populated"))
    }

    /// Ignore matcher over the worktree, built on first use.
    pub fn ignore_matcher(&mut self) -> Result<&IgnoreMatcher, RepoError> {
        if self.ignore.is_none() {
            let work_tree = self
                .work_tree
                .clone()
                .ok_or_else(|| RepoError::NotARepository(self.git_dir.clone()))?;
            let ignore_case = self.config()?.ignore_case();
            let mut matcher = IgnoreMatcher::new(work_tree, ignore_case);
            matcher.init()?;
            self.ignore = Some(matcher);
        }
        Ok(self.ignore.as_ref().expect("just populated"))
    }

    /// Read and parse the staging index; a missing file is an empty index.
    pub fn index(&self) -> Result<Index, RepoError> {
        let path = self.git_dir.join("index");
        if !path.is_file() {
            return Ok(Index::empty());
        }
        Ok(Index::read_from(path)?)
    }

    // --- Objects ---

    /// Read an object by OID from loose or packed storage.
    pub fn object(&self, oid: &Oid) -> Result<Object, RepoError> {
        Ok(self.odb.read(oid)?)
    }

    /// Read an object's kind and raw payload.
    pub fn object_raw(&self, oid: &Oid) -> Result<RawObject, RepoError> {
        Ok(self.odb.read_raw(oid)?)
    }

    /// Read an object's kind and size.
    pub fn object_info(&self, oid: &Oid) -> Result<ObjectInfo, RepoError> {
        Ok(self.odb.read_info(oid)?)
    }

    /// Read a commit, failing when the OID names something else.
    pub fn commit(&self, oid: &Oid) -> Result<Commit, RepoError> {
        match self.object(oid)? {
            Object::Commit(c) => Ok(c),
            other => Err(RepoError::UnexpectedKind {
                oid: *oid,
                expected: ObjectKind::Commit,
                actual: other.kind(),
            }),
        }
    }

    /// Read a tree, failing when the OID names something else.
    pub fn tree(&self, oid: &Oid) -> Result<Tree, RepoError> {
        match self.object(oid)? {
            Object::Tree(t) => Ok(t),
            other => Err(RepoError::UnexpectedKind {
                oid: *oid,
                expected: ObjectKind::Tree,
                actual: other.kind(),
            }),
        }
    }

    /// Read a tag, failing when the OID names something else.
    pub fn tag(&self, oid: &Oid) -> Result<Tag, RepoError> {
        match self.object(oid)? {
            Object::Tag(t) => Ok(t),
            other => Err(RepoError::UnexpectedKind {
                oid: *oid,
                expected: ObjectKind::Tag,
                actual: other.kind(),
            }),
        }
    }

    /// Follow tag objects until a commit is reached.
    pub fn peel_to_commit(&self, oid: &Oid) -> Result<Oid, RepoError> {
        let mut current = *oid;
        // Tag chains are short; the bound guards against cycles on disk.
        for _ in 0..10 {
            match self.object_info(&current)?.kind {
                ObjectKind::Commit => return Ok(current),
                ObjectKind::Tag => {
                    current = self.tag(&current)?.target;
                }
                kind => {
                    return Err(RepoError::UnexpectedKind {
                        oid: current,
                        expected: ObjectKind::Commit,
                        actual: kind,
                    })
                }
            }
        }
        Err(RepoError::InvalidHead(format!("tag chain too deep at {oid}")))
    }

    // --- Hashing and writing ---

    /// Hash content in the canonical object framing.
    ///
    /// With `apply_filters`, textual content is line-ending-normalized
    /// when `core.autocrlf` is `true` or `input`.
    pub fn hash_object(
        &mut self,
        kind: ObjectKind,
        data: &[u8],
        filename: Option<&str>,
        apply_filters: bool,
    ) -> Result<Oid, RepoError> {
        let filtered = self.filtered(data, filename, apply_filters)?;
        Ok(Hasher::hash_object(kind.as_str(), &filtered)?)
    }

    /// Hash content and store it as a loose object.
    pub fn write_object(
        &mut self,
        kind: ObjectKind,
        data: &[u8],
        filename: Option<&str>,
        apply_filters: bool,
    ) -> Result<Oid, RepoError> {
        let filtered = self.filtered(data, filename, apply_filters)?.into_owned();
        Ok(self.odb.write_raw(kind, &filtered)?)
    }

    fn filtered<'a>(
        &mut self,
        data: &'a [u8],
        filename: Option<&str>,
        apply_filters: bool,
    ) -> Result<Cow<'a, [u8]>, RepoError> {
        if apply_filters
            && self.config()?.autocrlf().normalizes_on_write()
            && !filter::is_binary(filename, data)
        {
            if let Some(normalized) = filter::normalize_eol(data) {
                return Ok(Cow::Owned(normalized));
            }
        }
        Ok(Cow::Borrowed(data))
    }

    // --- Refs and HEAD ---

    /// Resolve a ref given as a path under `refs/` (e.g. `heads/main`),
    /// or a full `refs/...` name.
    pub fn resolve_ref(&self, name: &str) -> Result<Oid, RepoError> {
        let full = if name.starts_with("refs/") {
            name.to_string()
        } else {
            format!("refs/{name}")
        };
        Ok(self.refs.resolve(&full)?)
    }

    /// Resolve a branch name to its commit.
    pub fn branch(&self, name: &str) -> Result<Oid, RepoError> {
        self.resolve_ref(&format!("heads/{name}"))
    }

    /// Resolve HEAD.
    pub fn head(&self) -> Result<Head, RepoError> {
        let raw = std::fs::read_to_string(self.git_dir.join("HEAD"))
            .map_err(|_| RepoError::InvalidHead("missing HEAD file".into()))?;
        let raw = raw.trim();

        if let Some(name) = raw.strip_prefix("ref: refs/heads/") {
            let target = self.resolve_ref(&format!("heads/{name}"))?;
            let commit = self.peel_to_commit(&target)?;
            return Ok(Head::Branch {
                name: name.to_string(),
                commit,
            });
        }
        if let Some(name) = raw.strip_prefix("ref: refs/tags/") {
            let target = self.resolve_ref(&format!("tags/{name}"))?;
            let commit = self.peel_to_commit(&target)?;
            return Ok(Head::Tag {
                name: name.to_string(),
                commit,
            });
        }
        if ngit_hash::is_hash(raw) {
            let oid = Oid::from_hex(raw)?;
            // A detached HEAD must name a commit.
            let info = self.object_info(&oid)?;
            if info.kind != ObjectKind::Commit {
                return Err(RepoError::InvalidHead(format!(
                    "detached HEAD points at a {}",
                    info.kind
                )));
            }
            return Ok(Head::Detached { commit: oid });
        }
        Err(RepoError::InvalidHead(format!("unrecognized HEAD: {raw}")))
    }

    // --- Status ---

    /// Compare the index against a committed root tree. `None` stands
    /// for the empty tree of an unborn branch.
    pub fn tree_status(
        &self,
        index: &Index,
        root_tree: Option<&Oid>,
    ) -> Result<Vec<StatusRecord>, RepoError> {
        status::index_vs_tree(self, index, root_tree)
    }

    /// Full working-directory status: staged, unstaged, and untracked.
    pub fn working_dir_status(
        &mut self,
        index: &Index,
        root_tree: Option<&Oid>,
    ) -> Result<Vec<StatusRecord>, RepoError> {
        status::working_dir_status(self, index, root_tree)
    }

    /// Is `path` (worktree-relative) ignored?
    pub fn is_ignored(&mut self, path: &BStr, is_dir: bool) -> Result<bool, RepoError> {
        Ok(self.ignore_matcher()?.is_ignored(path, is_dir))
    }
}
