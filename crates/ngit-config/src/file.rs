use std::path::Path;

use crate::ConfigError;

/// A single parsed configuration file.
///
/// Keys are flattened to `"section.key"` (or `"section.subsection.key"`),
/// with section and variable names lowercased. Later assignments to the
/// same key win.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    /// Entries in file order.
    entries: Vec<(String, String)>,
}

impl ConfigFile {
    /// Load and parse a config file. A missing file parses as empty.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Self::parse(&content)
    }

    /// Parse config text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut entries = Vec::new();
        let mut section: Option<String> = None;

        for (idx, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let inner = rest
                    .strip_suffix(']')
                    .ok_or(ConfigError::Syntax {
                        line: idx + 1,
                        reason: "unterminated section header",
                    })?
                    .trim();
                section = Some(parse_section_header(inner, idx + 1)?);
                continue;
            }

            let section = section.as_deref().ok_or(ConfigError::Syntax {
                line: idx + 1,
                reason: "assignment outside any section",
            })?;

            let (key, value) = match line.split_once('=') {
                Some((k, v)) => (k.trim(), unquote(v.trim())),
                // A bare key is shorthand for a true boolean.
                None => (line, "true".to_string()),
            };
            if key.is_empty() {
                return Err(ConfigError::Syntax {
                    line: idx + 1,
                    reason: "empty key",
                });
            }
            check_key_allowed(key)?;

            entries.push((format!("{}.{}", section, key.to_ascii_lowercase()), value));
        }

        Ok(Self { entries })
    }

    /// Last assignment for a flattened key, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All entries in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse `section` or `section "subsection"` from a header's inner text.
fn parse_section_header(inner: &str, line: usize) -> Result<String, ConfigError> {
    if let Some((name, rest)) = inner.split_once(char::is_whitespace) {
        let sub = rest.trim();
        let sub = sub
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .ok_or(ConfigError::Syntax {
                line,
                reason: "subsection must be quoted",
            })?;
        check_key_allowed(name)?;
        check_key_allowed(sub)?;
        Ok(format!("{}.{}", name.to_ascii_lowercase(), sub))
    } else {
        check_key_allowed(inner)?;
        Ok(inner.to_ascii_lowercase())
    }
}

/// Strip surrounding double quotes and any unquoted trailing comment.
fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        return value[1..value.len() - 1].to_string();
    }
    let cut = value
        .find(|c| c == '#' || c == ';')
        .map(|p| value[..p].trim_end())
        .unwrap_or(value);
    cut.to_string()
}

/// Names that could override built-in map behavior in the source's
/// prototype-based host are rejected outright.
fn check_key_allowed(name: &str) -> Result<(), ConfigError> {
    let lowered = name.to_ascii_lowercase();
    for forbidden in ["__proto__", "constructor", "prototype"] {
        if lowered.contains(forbidden) {
            return Err(ConfigError::ForbiddenKey(name.to_string()));
        }
    }
    Ok(())
}
