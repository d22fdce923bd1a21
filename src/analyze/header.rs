//! L1 file-header and L0 directory proof analysis.

use std::path::Path;

use crate::config::{CheckConfig, HEADER_SCAN_LINES};
use crate::grammar::{self, MD_PURPOSE_PATTERN, REASON_PATTERN};
use crate::model::{DirProof, FileProof, Level, Status};

/// Check the proof header of one file, given its raw lines.
///
/// Works without a parse tree; unreadable files are turned into `Invalid`
/// records by the walker before this runs.
pub fn analyze_file_header(rel_path: &Path, lines: &[String], config: &CheckConfig) -> FileProof {
    let header = match grammar::find_header(lines, HEADER_SCAN_LINES) {
        Some(h) => h,
        None => {
            let mut proof = FileProof::new(rel_path.to_path_buf(), Status::Missing);
            proof.reason = Some("no PROOF header in the first 10 comment lines".to_string());
            return proof;
        }
    };

    let mut proof = FileProof::new(rel_path.to_path_buf(), Status::Ok);
    proof.line_number = Some(header.line_number);

    let level = match grammar::parse_level(&header.level_token) {
        Some(l) => l,
        None => {
            proof.status = Status::Invalid;
            proof.level = Some(Level::Unknown);
            proof.reason = Some(format!("invalid level format: [{}]", header.level_token));
            return proof;
        }
    };
    proof.level = Some(level);

    match header.parent {
        Some(parent) => match grammar::validate_parent(&parent, config) {
            Ok(()) => {
                proof.parent = Some(parent);
            }
            Err(reason) => {
                proof.status = Status::Invalid;
                proof.reason = Some(reason);
            }
        },
        None => {
            proof.status = Status::Orphan;
            proof.reason = Some("no parent reference".to_string());
        }
    }

    proof
}

/// Check the `PROOF.md` contract of one directory.
pub fn analyze_dir(rel_path: &Path, abs_path: &Path, config: &CheckConfig) -> DirProof {
    let mut proof = DirProof {
        path: rel_path.to_path_buf(),
        status: Status::Missing,
        has_proof_md: false,
        parent: None,
        purpose_text: None,
        reason_text: None,
        has_reason: false,
        reason: None,
    };

    if config.is_exempt(rel_path) {
        proof.status = Status::Exempt;
        return proof;
    }

    let proof_md = abs_path.join("PROOF.md");
    let content = match std::fs::read_to_string(&proof_md) {
        Ok(c) => c,
        Err(_) => {
            proof.reason = Some("no PROOF.md".to_string());
            return proof;
        }
    };
    proof.has_proof_md = true;

    if content.trim().is_empty() {
        proof.status = Status::Weak;
        proof.reason = Some("PROOF.md is empty".to_string());
        return proof;
    }

    proof.status = Status::Ok;
    let lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();

    // Same header grammar as files; only validity of the parent can
    // downgrade the directory, absence of a header leaves free text as Ok.
    if let Some(header) = grammar::find_header(&lines, lines.len()) {
        match header.parent {
            Some(parent) => match grammar::validate_parent(&parent, config) {
                Ok(()) => proof.parent = Some(parent),
                Err(reason) => {
                    proof.status = Status::Invalid;
                    proof.reason = Some(reason);
                }
            },
            None => {}
        }
    }

    for line in &lines {
        if proof.purpose_text.is_none() {
            if let Some(caps) = MD_PURPOSE_PATTERN.captures(line) {
                proof.purpose_text = Some(caps[1].trim().to_string());
                continue;
            }
        }
        if proof.reason_text.is_none() {
            if let Some(caps) = REASON_PATTERN.captures(line) {
                proof.has_reason = true;
                proof.reason_text = Some(caps[1].trim().to_string());
            }
        }
    }

    proof
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lines(src: &str) -> Vec<String> {
        src.lines().map(|l| l.to_string()).collect()
    }

    fn config() -> CheckConfig {
        CheckConfig::without_exemptions()
    }

    #[test]
    fn test_valid_header_with_parent() {
        let proof = analyze_file_header(
            Path::new("mod.py"),
            &lines("# PROOF: [L2/infra] <- external\n\"doc\"\n"),
            &config(),
        );
        assert_eq!(proof.status, Status::Ok);
        assert_eq!(proof.level, Some(Level::L2));
        assert_eq!(proof.parent.as_deref(), Some("external"));
        assert_eq!(proof.line_number, Some(1));
    }

    #[test]
    fn test_missing_header() {
        let proof = analyze_file_header(
            Path::new("mod.py"),
            &lines("\"module without proof\"\ndef foo():\n    pass\n"),
            &config(),
        );
        assert_eq!(proof.status, Status::Missing);
    }

    #[test]
    fn test_orphan_header() {
        let proof = analyze_file_header(
            Path::new("mod.py"),
            &lines("# PROOF: [L1/core]\n"),
            &config(),
        );
        assert_eq!(proof.status, Status::Orphan);
        assert_eq!(proof.level, Some(Level::L1));
    }

    #[test]
    fn test_bad_level_is_invalid() {
        let proof = analyze_file_header(
            Path::new("mod.py"),
            &lines("# PROOF: [core/stuff] <- external\n"),
            &config(),
        );
        assert_eq!(proof.status, Status::Invalid);
        assert!(proof.reason.unwrap().contains("level format"));
    }

    #[test]
    fn test_traversal_parent_is_invalid() {
        let proof = analyze_file_header(
            Path::new("mod.py"),
            &lines("# PROOF: [L1/core] <- ../../etc/passwd\n"),
            &config(),
        );
        assert_eq!(proof.status, Status::Invalid);
        assert!(proof.reason.unwrap().contains("traversal"));
    }

    #[test]
    fn test_dir_with_proof_md() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("PROOF.md"),
            "# PROOF: [L0/core] <- external\n\nPURPOSE: group the engine modules\nREASON: one import surface\n",
        )
        .unwrap();
        let proof = analyze_dir(Path::new("engine"), temp.path(), &config());
        assert_eq!(proof.status, Status::Ok);
        assert!(proof.has_proof_md);
        assert!(proof.has_reason);
        assert_eq!(proof.purpose_text.as_deref(), Some("group the engine modules"));
        assert_eq!(proof.reason_text.as_deref(), Some("one import surface"));
    }

    #[test]
    fn test_dir_without_proof_md() {
        let temp = TempDir::new().unwrap();
        let proof = analyze_dir(Path::new("engine"), temp.path(), &config());
        assert_eq!(proof.status, Status::Missing);
        assert!(!proof.has_proof_md);
    }

    #[test]
    fn test_dir_with_empty_proof_md() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("PROOF.md"), "").unwrap();
        let proof = analyze_dir(Path::new("engine"), temp.path(), &config());
        assert_eq!(proof.status, Status::Weak);
        assert!(proof.has_proof_md);
        assert!(proof.reason.unwrap().contains("empty"));
    }

    #[test]
    fn test_exempt_dir() {
        let temp = TempDir::new().unwrap();
        let proof = analyze_dir(Path::new("__pycache__"), temp.path(), &CheckConfig::default());
        assert_eq!(proof.status, Status::Exempt);
    }
}
