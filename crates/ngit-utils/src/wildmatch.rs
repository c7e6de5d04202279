//! Shell-style pattern matching with git's `**` extension.
//!
//! Semantics follow C git's `wildmatch()`: `*` and `?` never cross `/` in
//! pathname mode, `**` crosses directories when bounded by slashes or the
//! pattern edges, and bracket expressions support ranges, negation, and
//! POSIX character classes.

use bstr::{BStr, BString};

bitflags::bitflags! {
    /// Flags controlling wildmatch behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WildmatchFlags: u32 {
        /// Case-insensitive matching.
        const CASEFOLD = 0x01;
        /// Wildcards do not match '/'.
        const PATHNAME = 0x02;
    }
}

/// Internal verdicts. The abort variants prune backtracking: ABORT_ALL
/// stops the whole match, ABORT_TO_STARSTAR unwinds to the nearest
/// slash-crossing star.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wm {
    Match,
    NoMatch,
    AbortAll,
    AbortToStarStar,
}

fn fold(b: u8, flags: WildmatchFlags) -> u8 {
    if flags.contains(WildmatchFlags::CASEFOLD) {
        b.to_ascii_lowercase()
    } else {
        b
    }
}

fn dowild(p: &[u8], t: &[u8], flags: WildmatchFlags) -> Wm {
    let mut pi = 0;
    let mut ti = 0;

    while pi < p.len() {
        let pc = p[pi];
        if ti >= t.len() && pc != b'*' {
            return Wm::AbortAll;
        }

        match pc {
            b'\\' => {
                pi += 1;
                if pi >= p.len() {
                    return Wm::AbortAll;
                }
                if fold(t[ti], flags) != fold(p[pi], flags) {
                    return Wm::NoMatch;
                }
                ti += 1;
                pi += 1;
            }
            b'?' => {
                if flags.contains(WildmatchFlags::PATHNAME) && t[ti] == b'/' {
                    return Wm::NoMatch;
                }
                ti += 1;
                pi += 1;
            }
            b'*' => return match_star(p, pi, t, ti, flags),
            b'[' => {
                let mut at = pi;
                let verdict = match_bracket(p, &mut at, t[ti], flags);
                if verdict != Wm::Match {
                    return verdict;
                }
                pi = at + 1; // past the ']'
                ti += 1;
            }
            _ => {
                if fold(t[ti], flags) != fold(pc, flags) {
                    return Wm::NoMatch;
                }
                ti += 1;
                pi += 1;
            }
        }
    }

    if ti < t.len() {
        Wm::NoMatch
    } else {
        Wm::Match
    }
}

/// Handle a star at `p[star_at]`, with text position `ti`.
fn match_star(p: &[u8], star_at: usize, t: &[u8], ti: usize, flags: WildmatchFlags) -> Wm {
    let mut pi = star_at + 1;
    let match_slash;

    if pi < p.len() && p[pi] == b'*' {
        while pi < p.len() && p[pi] == b'*' {
            pi += 1;
        }
        if !flags.contains(WildmatchFlags::PATHNAME) {
            match_slash = true;
        } else if (star_at == 0 || p[star_at - 1] == b'/')
            && (pi >= p.len()
                || p[pi] == b'/'
                || (p[pi] == b'\\' && pi + 1 < p.len() && p[pi + 1] == b'/'))
        {
            // A `**` bounded by slashes or the pattern edges. For `**/`,
            // also try matching zero directories.
            if pi < p.len() && p[pi] == b'/' && dowild(&p[pi + 1..], &t[ti..], flags) == Wm::Match
            {
                return Wm::Match;
            }
            match_slash = true;
        } else {
            // `**` glued to other text degrades to a single star.
            match_slash = false;
        }
    } else {
        match_slash = !flags.contains(WildmatchFlags::PATHNAME);
    }

    let rest = &p[pi..];
    if rest.is_empty() {
        // Trailing star: a slash-confined star must not swallow separators.
        if !match_slash && t[ti..].contains(&b'/') {
            return Wm::AbortToStarStar;
        }
        return Wm::Match;
    }

    // Try every possible span for the star, shortest first.
    let mut i = ti;
    loop {
        let verdict = dowild(rest, &t[i..], flags);
        if verdict != Wm::NoMatch && (!match_slash || verdict != Wm::AbortToStarStar) {
            return verdict;
        }
        if i >= t.len() {
            break;
        }
        if !match_slash && t[i] == b'/' {
            return Wm::AbortToStarStar;
        }
        i += 1;
    }
    Wm::AbortAll
}

/// Match a bracket expression starting at `p[*at] == b'['` against `t_ch`.
/// On success `*at` is left on the closing `]`.
fn match_bracket(p: &[u8], at: &mut usize, t_ch: u8, flags: WildmatchFlags) -> Wm {
    let tc = fold(t_ch, flags);

    *at += 1; // past '['
    if *at >= p.len() {
        return Wm::AbortAll;
    }

    let negated = p[*at] == b'!' || p[*at] == b'^';
    if negated {
        *at += 1;
        if *at >= p.len() {
            return Wm::AbortAll;
        }
    }

    let mut matched = false;
    let mut prev: Option<u8> = None;
    let mut first = true;

    loop {
        if *at >= p.len() {
            return Wm::AbortAll;
        }
        let mut pc = p[*at];
        if pc == b']' && !first {
            break;
        }
        first = false;

        if pc == b'\\' {
            *at += 1;
            if *at >= p.len() {
                return Wm::AbortAll;
            }
            pc = p[*at];
            if tc == fold(pc, flags) {
                matched = true;
            }
            prev = Some(pc);
        } else if pc == b'-' && prev.is_some() && *at + 1 < p.len() && p[*at + 1] != b']' {
            *at += 1;
            let mut hi = p[*at];
            if hi == b'\\' {
                *at += 1;
                if *at >= p.len() {
                    return Wm::AbortAll;
                }
                hi = p[*at];
            }
            let lo = prev.take().unwrap();
            if tc >= lo && tc <= hi {
                matched = true;
            } else if flags.contains(WildmatchFlags::CASEFOLD) && tc.is_ascii_lowercase() {
                let up = tc.to_ascii_uppercase();
                if up >= lo && up <= hi {
                    matched = true;
                }
            }
        } else if pc == b'[' && *at + 1 < p.len() && p[*at + 1] == b':' {
            // POSIX class: [:name:]
            let start = *at + 2;
            let mut end = start;
            while end < p.len() && p[end] != b']' {
                end += 1;
            }
            if end >= p.len() {
                return Wm::AbortAll;
            }
            if end > start && p[end - 1] == b':' {
                let name = &p[start..end - 1];
                if match_char_class(name, tc, flags) {
                    matched = true;
                }
                *at = end;
                prev = None;
            } else {
                // No closing ":]": treat '[' as a literal.
                if tc == fold(b'[', flags) {
                    matched = true;
                }
                prev = Some(b'[');
            }
        } else {
            if tc == fold(pc, flags) {
                matched = true;
            }
            prev = Some(pc);
        }

        *at += 1;
    }

    if matched == negated || (flags.contains(WildmatchFlags::PATHNAME) && t_ch == b'/') {
        return Wm::NoMatch;
    }
    Wm::Match
}

fn match_char_class(class: &[u8], ch: u8, flags: WildmatchFlags) -> bool {
    match class {
        b"alnum" => ch.is_ascii_alphanumeric(),
        b"alpha" => ch.is_ascii_alphabetic(),
        b"blank" => ch == b' ' || ch == b'\t',
        b"cntrl" => ch.is_ascii_control(),
        b"digit" => ch.is_ascii_digit(),
        b"graph" => ch.is_ascii_graphic(),
        b"lower" => ch.is_ascii_lowercase(),
        b"print" => ch.is_ascii_graphic() || ch == b' ',
        b"punct" => ch.is_ascii_punctuation(),
        b"space" => ch.is_ascii_whitespace(),
        b"upper" => {
            ch.is_ascii_uppercase()
                || (flags.contains(WildmatchFlags::CASEFOLD) && ch.is_ascii_lowercase())
        }
        b"xdigit" => ch.is_ascii_hexdigit(),
        _ => false,
    }
}

/// A pattern paired with its matching flags.
#[derive(Debug, Clone)]
pub struct WildmatchPattern {
    pattern: BString,
    flags: WildmatchFlags,
}

impl WildmatchPattern {
    pub fn new(pattern: &BStr, flags: WildmatchFlags) -> Self {
        Self {
            pattern: pattern.into(),
            flags,
        }
    }

    /// Match against text. Returns true if the pattern matches.
    pub fn matches(&self, text: &BStr) -> bool {
        wildmatch(self.pattern.as_ref(), text, self.flags)
    }
}

/// Match `pattern` against `text` under the given flags.
pub fn wildmatch(pattern: &BStr, text: &BStr, flags: WildmatchFlags) -> bool {
    dowild(pattern.as_ref(), text.as_ref(), flags) == Wm::Match
}
