//! `.tdmignore` support.
//!
//! One glob per line; blank lines and `#` comments are skipped. A leading `/`
//! is dropped. `dir/` ignores the directory and everything below it, and so
//! does a pattern containing a `/`. A path is ignored when the whole relative
//! path or any one of its components matches.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use fast_glob::glob_match;

use crate::config::IGNORE_FILE;
use crate::error::TemplateError;

#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    patterns: Vec<String>,
}

impl IgnoreRules {
    /// Reads `<root>/.tdmignore`; a missing file yields no rules.
    pub fn load(root: &Path) -> Result<Self, TemplateError> {
        let path = root.join(IGNORE_FILE);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Self::parse(&contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(TemplateError::io(path, e)),
        }
    }

    pub fn parse(contents: &str) -> Self {
        let mut patterns = Vec::new();

        for line in contents.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let pattern = trimmed.strip_prefix('/').unwrap_or(trimmed);
            if let Some(dir) = pattern.strip_suffix('/') {
                patterns.push(dir.to_owned());
                patterns.push(format!("{dir}/**"));
            } else if pattern.contains('/') {
                patterns.push(pattern.to_owned());
                patterns.push(format!("{pattern}/**"));
            } else {
                patterns.push(pattern.to_owned());
            }
        }

        Self { patterns }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Matches a root-relative path against the rules.
    pub fn is_ignored(&self, relative: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        let normalized = relative.replace('\\', "/");
        let normalized = normalized.strip_prefix("./").unwrap_or(&normalized);

        self.patterns.iter().any(|pattern| {
            glob_match(pattern, normalized) || normalized.split('/').any(|component| glob_match(pattern, component))
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_parse_skips_comments() {
        let rules = IgnoreRules::parse("# build output\n\n   \n*.log\n");
        assert!(!rules.is_empty());
        assert!(rules.is_ignored("server.log"));
        assert!(rules.is_ignored("logs/today/server.log"));
        assert!(!rules.is_ignored("server.txt"));
    }

    #[test]
    fn test_directory_pattern() {
        let rules = IgnoreRules::parse("target/\n");
        assert!(rules.is_ignored("target"));
        assert!(rules.is_ignored("target/debug/app"));
        assert!(rules.is_ignored("crates/a/target/x"));
        assert!(!rules.is_ignored("targets.txt"));
    }

    #[test]
    fn test_nested_and_rooted_patterns() {
        let rules = IgnoreRules::parse("/docs/generated\n");
        assert!(rules.is_ignored("docs/generated"));
        assert!(rules.is_ignored("docs/generated/index.html"));
        assert!(!rules.is_ignored("docs/manual.md"));
    }

    #[test]
    fn test_windows_separators() {
        let rules = IgnoreRules::parse("node_modules/\n");
        assert!(rules.is_ignored(r"web\node_modules\pkg\index.js"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        assert!(IgnoreRules::load(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_load_from_root() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(IGNORE_FILE), "*.tmp\n").unwrap();

        let rules = IgnoreRules::load(dir.path()).unwrap();
        assert!(rules.is_ignored("a/b.tmp"));
    }
}
