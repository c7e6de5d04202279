//! Ignore rule evaluation.
//!
//! [`IgnoreMatcher::init`] walks the working tree once, reading every
//! `.gitignore` it encounters (never descending into directories that are
//! themselves ignored) and scoping each file's patterns to the directory
//! that contains it. `.git` is implicitly ignored. Evaluation is
//! last-match-wins, with `!` patterns re-including.

use std::path::{Path, PathBuf};

use bstr::{BStr, BString, ByteSlice, ByteVec};
use ngit_utils::wildmatch::{wildmatch, WildmatchFlags};

use crate::IndexError;

/// A single ignore pattern with its scope.
#[derive(Debug, Clone)]
struct IgnorePattern {
    /// The pattern body, negation/anchoring markers stripped.
    pattern: BString,
    /// `!pattern` re-includes a previously ignored path.
    negated: bool,
    /// `pattern/` matches directories only.
    directory_only: bool,
    /// Patterns containing a slash match relative to their base only.
    anchored: bool,
    /// Directory prefix (relative to the worktree) of the `.gitignore`
    /// the pattern came from; empty at the root.
    base: BString,
}

/// Worktree-wide ignore matcher.
pub struct IgnoreMatcher {
    work_tree: PathBuf,
    flags: WildmatchFlags,
    patterns: Vec<IgnorePattern>,
}

impl IgnoreMatcher {
    /// Create a matcher for the given worktree root.
    pub fn new(work_tree: impl AsRef<Path>, ignore_case: bool) -> Self {
        let mut flags = WildmatchFlags::PATHNAME;
        if ignore_case {
            flags |= WildmatchFlags::CASEFOLD;
        }
        Self {
            work_tree: work_tree.as_ref().to_path_buf(),
            flags,
            patterns: Vec::new(),
        }
    }

    /// Walk the worktree and collect ignore files.
    pub fn init(&mut self) -> Result<(), IndexError> {
        self.patterns.clear();
        let root = self.work_tree.clone();
        self.walk(&root, &BString::from(""))
    }

    fn walk(&mut self, dir: &Path, rel: &BString) -> Result<(), IndexError> {
        self.add_ignore_file(&dir.join(".gitignore"), rel)?;

        let mut subdirs: Vec<(BString, PathBuf)> = Vec::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(IndexError::Io(e)),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = os_bytes(&entry.file_name());
            if name.as_slice() == b".git" {
                continue;
            }
            let mut child_rel = rel.clone();
            if !child_rel.is_empty() {
                child_rel.push_byte(b'/');
            }
            child_rel.push_str(&name);
            subdirs.push((child_rel, entry.path()));
        }
        subdirs.sort_by(|a, b| a.0.cmp(&b.0));

        for (child_rel, path) in subdirs {
            // Ignore files inside ignored directories are never read.
            if self.is_ignored(child_rel.as_bstr(), true) {
                continue;
            }
            self.walk(&path, &child_rel)?;
        }
        Ok(())
    }

    /// Add one ignore file's patterns; a missing file adds nothing.
    fn add_ignore_file(&mut self, path: &Path, base: &BString) -> Result<(), IndexError> {
        let content = match std::fs::read(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(IndexError::Io(e)),
        };
        self.add_patterns(&content, base.as_bstr());
        Ok(())
    }

    /// Parse and add patterns scoped to `base`.
    pub fn add_patterns(&mut self, content: &[u8], base: &BStr) {
        for line in content.lines() {
            if let Some(pattern) = parse_ignore_line(line, base) {
                self.patterns.push(pattern);
            }
        }
    }

    /// Is `path` (worktree-relative, `/`-separated) ignored?
    ///
    /// A path inside an ignored directory is ignored regardless of later
    /// patterns, so every ancestor is consulted first.
    pub fn is_ignored(&self, path: &BStr, is_dir: bool) -> bool {
        if path.as_bytes() == b".git" || path.starts_with(b".git/") {
            return true;
        }
        for (i, &b) in path.iter().enumerate() {
            if b == b'/' && self.matches_patterns(BStr::new(&path[..i]), true) {
                return true;
            }
        }
        self.matches_patterns(path, is_dir)
    }

    /// Number of patterns loaded.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn matches_patterns(&self, path: &BStr, is_dir: bool) -> bool {
        let mut ignored = false;
        for pat in &self.patterns {
            if pat.directory_only && !is_dir {
                continue;
            }
            if self.pattern_matches(pat, path) {
                ignored = !pat.negated;
            }
        }
        ignored
    }

    fn pattern_matches(&self, pat: &IgnorePattern, path: &BStr) -> bool {
        // Scope to the directory holding the ignore file.
        let rel: &[u8] = if pat.base.is_empty() {
            path.as_bytes()
        } else {
            let base_len = pat.base.len();
            if path.len() <= base_len
                || !path.starts_with(&pat.base)
                || path[base_len] != b'/'
            {
                return false;
            }
            &path[base_len + 1..]
        };
        let rel = BStr::new(rel);

        if self.matches_rel(pat, rel) {
            return true;
        }
        if !pat.anchored {
            // Unanchored patterns also match the basename alone.
            if let Some(slash_pos) = rel.rfind_byte(b'/') {
                return self.matches_rel(pat, BStr::new(&rel[slash_pos + 1..]));
            }
        }
        false
    }

    fn matches_rel(&self, pat: &IgnorePattern, rel: &BStr) -> bool {
        wildmatch(pat.pattern.as_bstr(), rel, self.flags)
    }
}

/// Parse a single ignore line. Comments and blanks yield nothing.
fn parse_ignore_line(line: &[u8], base: &BStr) -> Option<IgnorePattern> {
    let mut line = line;

    if line.is_empty() || line[0] == b'#' {
        return None;
    }

    // Trailing spaces are stripped unless escaped.
    while line.len() > 1 && line.last() == Some(&b' ') && line[line.len() - 2] != b'\\' {
        line = &line[..line.len() - 1];
    }
    if line.iter().all(|&b| b == b' ') {
        return None;
    }

    let negated = line[0] == b'!';
    if negated {
        line = &line[1..];
        if line.is_empty() {
            return None;
        }
    }

    // `\#` and `\!` escape the special leading characters.
    if line[0] == b'\\' && line.len() > 1 && (line[1] == b'#' || line[1] == b'!') {
        line = &line[1..];
    }

    let directory_only = line.last() == Some(&b'/');
    let line = if directory_only {
        &line[..line.len() - 1]
    } else {
        line
    };
    if line.is_empty() {
        return None;
    }

    // A slash anywhere anchors the pattern to the base directory.
    let anchored = line.contains(&b'/');
    let pattern = if line[0] == b'/' { &line[1..] } else { line };

    Some(IgnorePattern {
        pattern: BString::from(pattern),
        negated,
        directory_only,
        anchored,
        base: BString::from(base),
    })
}

#[cfg(unix)]
fn os_bytes(name: &std::ffi::OsStr) -> BString {
    use std::os::unix::ffi::OsStrExt;
    BString::from(name.as_bytes())
}

#[cfg(not(unix))]
fn os_bytes(name: &std::ffi::OsStr) -> BString {
    BString::from(name.to_string_lossy().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher_with(content: &[u8]) -> IgnoreMatcher {
        let mut matcher = IgnoreMatcher::new("/nonexistent", false);
        matcher.add_patterns(content, BStr::new(""));
        matcher
    }

    #[test]
    fn basic_glob() {
        let m = matcher_with(b"*.o\n");
        assert!(m.is_ignored(BStr::new("test.o"), false));
        assert!(m.is_ignored(BStr::new("deep/dir/test.o"), false));
        assert!(!m.is_ignored(BStr::new("test.c"), false));
    }

    #[test]
    fn negation_reincludes() {
        let m = matcher_with(b"*.o\n!important.o\n");
        assert!(m.is_ignored(BStr::new("test.o"), false));
        assert!(!m.is_ignored(BStr::new("important.o"), false));
    }

    #[test]
    fn directory_only_pattern() {
        let m = matcher_with(b"build/\n");
        assert!(m.is_ignored(BStr::new("build"), true));
        assert!(!m.is_ignored(BStr::new("build"), false));
        // Files under an ignored directory are ignored too.
        assert!(m.is_ignored(BStr::new("build/out.o"), false));
    }

    #[test]
    fn anchored_pattern_scopes_to_root() {
        let m = matcher_with(b"/root_only\n");
        assert!(m.is_ignored(BStr::new("root_only"), false));
        assert!(!m.is_ignored(BStr::new("sub/root_only"), false));
    }

    #[test]
    fn slash_in_pattern_anchors() {
        let m = matcher_with(b"docs/*.tmp\n");
        assert!(m.is_ignored(BStr::new("docs/a.tmp"), false));
        assert!(!m.is_ignored(BStr::new("other/docs/a.tmp"), false));
    }

    #[test]
    fn comments_and_blanks_skipped() {
        let m = matcher_with(b"# comment\n\n   \n*.log\n");
        assert_eq!(m.len(), 1);
        assert!(m.is_ignored(BStr::new("x.log"), false));
    }

    #[test]
    fn escaped_hash_is_literal() {
        let m = matcher_with(b"\\#literal\n");
        assert!(m.is_ignored(BStr::new("#literal"), false));
    }

    #[test]
    fn git_dir_implicitly_ignored() {
        let m = matcher_with(b"");
        assert!(m.is_ignored(BStr::new(".git"), true));
        assert!(m.is_ignored(BStr::new(".git/config"), false));
        assert!(!m.is_ignored(BStr::new(".gitignore"), false));
    }

    #[test]
    fn base_dir_scoping() {
        let mut m = IgnoreMatcher::new("/nonexistent", false);
        m.add_patterns(b"*.tmp\n", BStr::new("sub"));
        assert!(m.is_ignored(BStr::new("sub/x.tmp"), false));
        assert!(m.is_ignored(BStr::new("sub/deeper/x.tmp"), false));
        assert!(!m.is_ignored(BStr::new("x.tmp"), false));
        assert!(!m.is_ignored(BStr::new("subx/x.tmp"), false));
    }

    #[test]
    fn case_insensitive_matching() {
        let mut m = IgnoreMatcher::new("/nonexistent", true);
        m.add_patterns(b"*.TMP\n", BStr::new(""));
        assert!(m.is_ignored(BStr::new("file.tmp"), false));
    }

    #[test]
    fn init_walks_nested_ignore_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("target/debug")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target/\n*.bak\n").unwrap();
        std::fs::write(dir.path().join("src/.gitignore"), "generated.rs\n").unwrap();
        // This file must never be read: target/ is already ignored.
        std::fs::write(dir.path().join("target/.gitignore"), "!debug\n").unwrap();

        let mut m = IgnoreMatcher::new(dir.path(), false);
        m.init().unwrap();

        assert!(m.is_ignored(BStr::new("target"), true));
        assert!(m.is_ignored(BStr::new("target/debug"), true));
        assert!(m.is_ignored(BStr::new("notes.bak"), false));
        assert!(m.is_ignored(BStr::new("src/generated.rs"), false));
        assert!(!m.is_ignored(BStr::new("generated.rs"), false));
        assert!(!m.is_ignored(BStr::new("src/main.rs"), false));
    }
}
