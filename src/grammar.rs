//! Token contract for proof annotations.
//!
//! Three comment-level markers make up the grammar:
//! - `# PROOF: [<level>/<descriptor>] <- <parent>` on one of the first
//!   lines of a file (the `<- parent` clause is optional)
//! - `# PURPOSE: <text>` directly above a function or class definition
//! - `PURPOSE:` / `REASON:` lines inside a directory's `PROOF.md`

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::CheckConfig;
use crate::model::Level;

lazy_static! {
    /// `# PROOF: [level]` with an optional `<- parent` clause.
    pub static ref PROOF_PATTERN: Regex =
        Regex::new(r"#\s*PROOF:\s*\[([^\]]+)\](?:\s*<-\s*([^\s#]+))?").unwrap();

    /// `# PURPOSE: text` (requires non-empty text).
    pub static ref PURPOSE_PATTERN: Regex = Regex::new(r"#\s*PURPOSE:\s*(.+)").unwrap();

    /// `REASON: text`, with or without a leading comment marker.
    pub static ref REASON_PATTERN: Regex = Regex::new(r"^#?\s*REASON:\s*(.*)").unwrap();

    /// `PURPOSE: text` inside PROOF.md (no comment marker required).
    pub static ref MD_PURPOSE_PATTERN: Regex = Regex::new(r"^#?\s*PURPOSE:\s*(.+)").unwrap();
}

/// A syntactically matched proof header, before level/parent validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    /// Raw text inside the brackets, e.g. `L2/infra`.
    pub level_token: String,
    /// Parent reference after `<-`, if present.
    pub parent: Option<String>,
    /// 1-indexed line the header was found on.
    pub line_number: usize,
}

/// Scan for a proof header among the first `scan_lines` lines.
///
/// Only lines whose first non-whitespace character is the comment marker
/// qualify; header-looking text inside a docstring body does not start
/// with `#` and is never matched.
pub fn find_header(lines: &[String], scan_lines: usize) -> Option<HeaderMatch> {
    for (idx, line) in lines.iter().take(scan_lines).enumerate() {
        if !line.trim_start().starts_with('#') {
            continue;
        }
        if let Some(caps) = PROOF_PATTERN.captures(line) {
            return Some(HeaderMatch {
                level_token: caps[1].trim().to_string(),
                parent: caps.get(2).map(|m| m.as_str().to_string()),
                line_number: idx + 1,
            });
        }
    }
    None
}

/// Parse the level prefix out of a bracket token like `L2/infra`.
/// Returns `None` for malformed tokens; that is a strict `Invalid`,
/// never coerced to `Unknown`.
pub fn parse_level(token: &str) -> Option<Level> {
    let prefix = token.split('/').next().unwrap_or("");
    Level::parse(prefix)
}

/// Validate a parent reference string.
///
/// Returns `Ok(())` or a specific rejection reason. Sentinel parents
/// (external/non-project references) pass without a filesystem check;
/// traversal segments, absolute paths, and oversized strings are rejected
/// before any disk access so the checks hold with or without a project
/// root.
pub fn validate_parent(parent: &str, config: &CheckConfig) -> Result<(), String> {
    if config.special_parents.iter().any(|s| s == parent) {
        return Ok(());
    }
    if parent.split('/').any(|seg| seg == "..") {
        return Err(format!("path traversal in parent reference: {}", parent));
    }
    if parent.starts_with('/') {
        return Err(format!("absolute path not allowed as parent: {}", parent));
    }
    if parent.len() > 255 {
        return Err(format!("parent reference too long ({} bytes)", parent.len()));
    }
    if let Some(root) = &config.project_root {
        let resolved = root.join(parent.trim_end_matches('/'));
        if !path_exists(&resolved) {
            return Err(format!("parent path does not exist: {}", parent));
        }
    }
    Ok(())
}

fn path_exists(path: &Path) -> bool {
    path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;

    fn lines(src: &str) -> Vec<String> {
        src.lines().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_header_with_parent() {
        let ls = lines("# PROOF: [L2/infra] <- core/engine/\n\"docstring\"\n");
        let m = find_header(&ls, 10).unwrap();
        assert_eq!(m.level_token, "L2/infra");
        assert_eq!(m.parent.as_deref(), Some("core/engine/"));
        assert_eq!(m.line_number, 1);
    }

    #[test]
    fn test_header_without_parent() {
        let ls = lines("# PROOF: [L1/core]\nx = 1\n");
        let m = find_header(&ls, 10).unwrap();
        assert_eq!(m.parent, None);
    }

    #[test]
    fn test_header_beyond_scan_window_ignored() {
        let mut src = String::new();
        for _ in 0..10 {
            src.push_str("# filler comment\n");
        }
        src.push_str("# PROOF: [L1/late]\n");
        assert!(find_header(&lines(&src), 10).is_none());
    }

    #[test]
    fn test_header_inside_docstring_ignored() {
        let ls = lines("\"\"\"\nPROOF: [L1/fake] in prose\n\"\"\"\n");
        assert!(find_header(&ls, 10).is_none());
    }

    #[test]
    fn test_parse_level_strict() {
        assert_eq!(parse_level("L2/infra"), Some(Level::L2));
        assert_eq!(parse_level("l1/core"), Some(Level::L1));
        assert_eq!(parse_level("L9/bogus"), None);
        assert_eq!(parse_level("infra"), None);
    }

    #[test]
    fn test_special_parent_passes() {
        let config = CheckConfig::default();
        assert!(validate_parent("external", &config).is_ok());
        assert!(validate_parent("legacy", &config).is_ok());
    }

    #[test]
    fn test_path_traversal_rejected() {
        let config = CheckConfig::default();
        let err = validate_parent("../../etc/passwd", &config).unwrap_err();
        assert!(err.contains("traversal"));
    }

    #[test]
    fn test_absolute_path_rejected() {
        let config = CheckConfig::default();
        let err = validate_parent("/etc/passwd", &config).unwrap_err();
        assert!(err.contains("absolute"));
    }

    #[test]
    fn test_too_long_parent_rejected() {
        let config = CheckConfig::default();
        let err = validate_parent(&"a".repeat(300), &config).unwrap_err();
        assert!(err.contains("too long"));
    }

    #[test]
    fn test_nonexistent_parent_with_root() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("present")).unwrap();
        let config = CheckConfig {
            project_root: Some(temp.path().to_path_buf()),
            ..CheckConfig::default()
        };
        assert!(validate_parent("present/", &config).is_ok());
        assert!(validate_parent("absent/", &config).is_err());
    }

    #[test]
    fn test_purpose_pattern_requires_text() {
        assert!(PURPOSE_PATTERN.captures("# PURPOSE: explain the why").is_some());
        assert!(PURPOSE_PATTERN.captures("# PURPOSE:").is_none());
        assert!(PURPOSE_PATTERN.captures("PURPOSE: no marker").is_none());
    }

    #[test]
    fn test_reason_pattern() {
        assert!(REASON_PATTERN.is_match("REASON: because"));
        assert!(REASON_PATTERN.is_match("# REASON: because"));
        assert!(!REASON_PATTERN.is_match("NOT A REASON"));
    }
}
