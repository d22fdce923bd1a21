//! L2 purpose analysis: every function and class carries a comment that
//! says why it exists, and the text must state a motive rather than a
//! description.

use crate::config::{CheckConfig, PURPOSE_SCAN_LINES};
use crate::grammar::PURPOSE_PATTERN;
use crate::model::{FunctionProof, Status};
use crate::parser::{collect_defs, FileView};

/// Check every function/class definition in a file for a purpose comment.
/// Dunder methods are skipped unconditionally and produce no record.
pub fn analyze_purposes(view: &FileView, config: &CheckConfig) -> Vec<FunctionProof> {
    let mut proofs = Vec::new();

    for def in collect_defs(view) {
        if def.is_dunder() {
            continue;
        }

        let purpose = find_purpose_above(view, def.node.start_position().row);
        let mut proof = FunctionProof {
            name: def.name.clone(),
            path: view.rel_path.clone(),
            line_number: def.line(),
            status: Status::Ok,
            purpose_text: None,
            is_private: def.is_private(),
            quality_issue: None,
        };

        match purpose {
            Some(text) => {
                proof.purpose_text = Some(text.clone());
                if let Some(issue) = classify_purpose(&text, config) {
                    proof.status = Status::Weak;
                    proof.quality_issue = Some(issue);
                }
            }
            None => {
                proof.status = if def.is_private() {
                    Status::Exempt
                } else {
                    Status::Missing
                };
            }
        }

        proofs.push(proof);
    }

    proofs
}

/// Scan upward from the line above `def_row` (0-indexed, the `def`/`class`
/// line) across up to 10 contiguous comment lines, stopping at the first
/// blank or non-comment line. Decorator lines are scanned through without
/// consuming the comment window, so the marker may sit above the
/// decorators or between a decorator and the definition.
fn find_purpose_above(view: &FileView, def_row: usize) -> Option<String> {
    let mut scanned = 0;
    let mut row = def_row;
    while row > 0 && scanned < PURPOSE_SCAN_LINES {
        row -= 1;
        let line = view.lines.get(row)?;
        let trimmed = line.trim_start();
        if trimmed.starts_with('@') {
            continue;
        }
        if !trimmed.starts_with('#') {
            return None;
        }
        if let Some(caps) = PURPOSE_PATTERN.captures(line) {
            return Some(caps[1].trim().to_string());
        }
        scanned += 1;
    }
    None
}

/// Run a purpose text through the weak-pattern classifier.
/// Returns the explanation of the first matching pattern, or `None` when
/// the text passes. A flat ordered list keeps the verdict deterministic
/// and auditable.
pub fn classify_purpose(text: &str, config: &CheckConfig) -> Option<String> {
    config
        .weak_purpose_patterns
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(_, explanation)| explanation.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PythonParser;
    use std::path::Path;

    fn analyze(source: &str) -> Vec<FunctionProof> {
        let view = PythonParser::new().parse(Path::new("sample.py"), source.as_bytes().to_vec());
        analyze_purposes(&view, &CheckConfig::without_exemptions())
    }

    #[test]
    fn test_function_with_purpose() {
        let proofs = analyze(
            "# PROOF: [L2/x] <- external\n\
             # PURPOSE: centralize user authentication so callers cannot skip it\n\
             def authenticate(user, password):\n    pass\n",
        );
        assert_eq!(proofs.len(), 1);
        assert_eq!(proofs[0].status, Status::Ok);
        assert!(proofs[0].purpose_text.as_deref().unwrap().starts_with("centralize"));
    }

    #[test]
    fn test_function_without_purpose() {
        let proofs = analyze("def authenticate(user, password):\n    pass\n");
        assert_eq!(proofs[0].status, Status::Missing);
    }

    #[test]
    fn test_class_with_purpose() {
        let proofs = analyze(
            "# PURPOSE: encapsulate the auth flow so tokens never leak to callers\n\
             class AuthService:\n    pass\n",
        );
        assert_eq!(proofs[0].name, "AuthService");
        assert_eq!(proofs[0].status, Status::Ok);
    }

    #[test]
    fn test_private_function_exempt() {
        let proofs = analyze("def _helper():\n    pass\n");
        assert_eq!(proofs.len(), 1);
        assert!(proofs[0].is_private);
        assert_eq!(proofs[0].status, Status::Exempt);
    }

    #[test]
    fn test_dunder_skipped() {
        let proofs = analyze(
            "class Foo:\n    def __init__(self):\n        pass\n    def __repr__(self):\n        pass\n",
        );
        let names: Vec<&str> = proofs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Foo"]);
    }

    #[test]
    fn test_purpose_above_decorator() {
        let proofs = analyze(
            "# PURPOSE: expose coverage as a property so reports stay cheap\n\
             @property\n\
             def coverage(self):\n    return 100.0\n",
        );
        assert_eq!(proofs[0].status, Status::Ok);
    }

    #[test]
    fn test_purpose_between_decorator_and_def() {
        let proofs = analyze(
            "@staticmethod\n\
             # PURPOSE: verify tokens centrally so expiry rules stay uniform\n\
             def verify(token):\n    pass\n",
        );
        assert_eq!(proofs[0].status, Status::Ok);
        assert!(proofs[0].purpose_text.as_deref().unwrap().starts_with("verify tokens"));
    }

    #[test]
    fn test_blank_line_stops_scan() {
        let proofs = analyze(
            "# PURPOSE: too far away to count\n\
             \n\
             def detached():\n    pass\n",
        );
        assert_eq!(proofs[0].status, Status::Missing);
    }

    #[test]
    fn test_weak_purpose_detected() {
        let proofs = analyze(
            "# PURPOSE: Represents the current state\n\
             class MyEnum:\n    pass\n",
        );
        assert_eq!(proofs[0].status, Status::Weak);
        assert!(proofs[0].quality_issue.is_some());
    }

    #[test]
    fn test_weak_japanese_pattern() {
        let config = CheckConfig::default();
        assert!(classify_purpose("PROOF の状態を表す列挙型", &config).is_some());
        assert!(classify_purpose("ファイル情報を保持するデータクラス", &config).is_some());
        assert!(classify_purpose("検証ロジックを提供するクラス", &config).is_some());
    }

    #[test]
    fn test_good_purpose_passes_classifier() {
        let config = CheckConfig::default();
        assert!(classify_purpose("チェック結果の分類と後続処理の分岐を可能にする", &config).is_none());
        assert!(classify_purpose(
            "Prevent memory leaks by closing idle connections after timeout",
            &config
        )
        .is_none());
    }

    #[test]
    fn test_weak_english_handles_manages() {
        let config = CheckConfig::default();
        assert!(classify_purpose("Handles the user data", &config).is_some());
        assert!(classify_purpose("Manages the connection pool", &config).is_some());
    }
}
