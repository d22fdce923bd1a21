//! Core types for proof records and the aggregated check result.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Outcome of a single existence check.
///
/// Ordering is by severity: `Ok` is best, `Weak` is worst among the
/// non-failing states, `Missing`/`Invalid` fail the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Missing,
    Invalid,
    Exempt,
    Orphan,
    Weak,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Missing => "missing",
            Status::Invalid => "invalid",
            Status::Exempt => "exempt",
            Status::Orphan => "orphan",
            Status::Weak => "weak",
        }
    }

    /// Whether this status counts as "has a proof" for coverage purposes.
    /// Orphans carry a reason class without a traceable parent, which is a
    /// warning rather than a failure.
    pub fn counts_as_proven(&self) -> bool {
        matches!(self, Status::Ok | Status::Orphan)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Depth layer of a checked unit.
///
/// - `L0`: directory (context)
/// - `L1`: file (essence)
/// - `L2`: function/class (motive)
/// - `L3`: variable/signature (precision)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    L0,
    L1,
    L2,
    L3,
    Unknown,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::L0 => "L0",
            Level::L1 => "L1",
            Level::L2 => "L2",
            Level::L3 => "L3",
            Level::Unknown => "unknown",
        }
    }

    /// Parse a level token case-insensitively. Returns `None` for anything
    /// that is not exactly L0..L3; callers must treat that as `Invalid`
    /// rather than coercing to `Unknown`.
    pub fn parse(token: &str) -> Option<Level> {
        match token.trim().to_ascii_uppercase().as_str() {
            "L0" => Some(Level::L0),
            "L1" => Some(Level::L1),
            "L2" => Some(Level::L2),
            "L3" => Some(Level::L3),
            _ => None,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Existence proof for one source file (L1 header).
#[derive(Debug, Clone)]
pub struct FileProof {
    pub path: PathBuf,
    pub status: Status,
    pub level: Option<Level>,
    pub parent: Option<String>,
    pub reason: Option<String>,
    pub line_number: Option<usize>,
}

impl FileProof {
    pub fn new(path: PathBuf, status: Status) -> Self {
        Self {
            path,
            status,
            level: None,
            parent: None,
            reason: None,
            line_number: None,
        }
    }
}

/// Existence proof for one directory (L0, `PROOF.md`).
#[derive(Debug, Clone)]
pub struct DirProof {
    pub path: PathBuf,
    pub status: Status,
    pub has_proof_md: bool,
    pub parent: Option<String>,
    pub purpose_text: Option<String>,
    pub reason_text: Option<String>,
    pub has_reason: bool,
    pub reason: Option<String>,
}

/// Purpose proof for one function or class (L2).
#[derive(Debug, Clone)]
pub struct FunctionProof {
    pub name: String,
    pub path: PathBuf,
    pub line_number: usize,
    pub status: Status,
    pub purpose_text: Option<String>,
    pub is_private: bool,
    pub quality_issue: Option<String>,
}

/// Kind of L3 lexical check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableCheck {
    TypeHint,
    ShortName,
}

impl VariableCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableCheck::TypeHint => "type_hint",
            VariableCheck::ShortName => "short_name",
        }
    }
}

/// Precision proof for one signature element or local name (L3).
#[derive(Debug, Clone)]
pub struct VariableProof {
    pub name: String,
    pub path: PathBuf,
    pub line_number: usize,
    pub status: Status,
    pub check: VariableCheck,
    pub reason: Option<String>,
}

/// Kind of structural reference being resolved (NF2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureCheck {
    Import,
    Call,
    TypeRef,
    DirRef,
}

impl StructureCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            StructureCheck::Import => "import",
            StructureCheck::Call => "call",
            StructureCheck::TypeRef => "type_ref",
            StructureCheck::DirRef => "dir_ref",
        }
    }
}

/// Resolution result for one import/call/type reference (NF2).
#[derive(Debug, Clone)]
pub struct StructureProof {
    pub name: String,
    pub path: PathBuf,
    pub line_number: usize,
    pub status: Status,
    pub check: StructureCheck,
    pub target: Option<String>,
    pub reason: Option<String>,
}

/// Kind of function-quality metric (NF3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityCheck {
    Complexity,
    Similarity,
    Reassign,
}

impl QualityCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityCheck::Complexity => "complexity",
            QualityCheck::Similarity => "similarity",
            QualityCheck::Reassign => "reassign",
        }
    }
}

/// Quality measurement for one function or function pair (NF3).
#[derive(Debug, Clone)]
pub struct FunctionQualityProof {
    pub name: String,
    pub path: PathBuf,
    pub line_number: usize,
    pub status: Status,
    pub check: QualityCheck,
    pub metric_value: Option<i64>,
    pub threshold: Option<i64>,
    pub reason: Option<String>,
}

/// Kind of project-wide liveness check (BCNF).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationCheck {
    FileImportCount,
    DeadFunc,
    UnusedVar,
}

impl VerificationCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationCheck::FileImportCount => "file_import_count",
            VerificationCheck::DeadFunc => "dead_func",
            VerificationCheck::UnusedVar => "unused_var",
        }
    }
}

/// Indispensability result for one unit (BCNF).
#[derive(Debug, Clone)]
pub struct VerificationProof {
    pub name: String,
    pub path: PathBuf,
    pub line_number: usize,
    pub status: Status,
    pub check: VerificationCheck,
    pub ref_count: usize,
    pub reason: Option<String>,
}

/// Aggregated result of one `check()` invocation.
///
/// Owns every record produced during the walk; nothing outlives the call
/// and re-running the checker builds an entirely new value.
#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    pub total_files: usize,
    pub files_with_proof: usize,
    pub files_missing_proof: usize,
    pub files_invalid_proof: usize,
    pub files_exempt: usize,
    pub files_orphan: usize,
    pub file_proofs: Vec<FileProof>,
    pub dir_proofs: Vec<DirProof>,

    pub total_functions: usize,
    pub functions_with_purpose: usize,
    pub functions_missing_purpose: usize,
    pub functions_weak_purpose: usize,
    pub function_proofs: Vec<FunctionProof>,

    pub total_checked_signatures: usize,
    pub signatures_with_hints: usize,
    pub signatures_missing_hints: usize,
    pub short_name_violations: usize,
    pub variable_proofs: Vec<VariableProof>,

    /// Count of OK/orphan file proofs by declared level.
    pub level_stats: BTreeMap<String, usize>,

    pub total_structure_checks: usize,
    pub structure_ok: usize,
    pub structure_missing: usize,
    pub structure_proofs: Vec<StructureProof>,

    pub total_quality_checks: usize,
    pub quality_ok: usize,
    pub quality_weak: usize,
    pub quality_proofs: Vec<FunctionQualityProof>,

    pub total_verification_checks: usize,
    pub verification_ok: usize,
    pub verification_weak: usize,
    pub verification_proofs: Vec<VerificationProof>,
}

impl CheckResult {
    /// Proof coverage over checkable files, in percent.
    /// Orphans count as proven; exempt files leave the denominator.
    pub fn coverage(&self) -> f64 {
        let checkable = self.total_files.saturating_sub(self.files_exempt);
        if checkable == 0 {
            return 100.0;
        }
        let with_proof = self.files_with_proof + self.files_orphan;
        (with_proof as f64 / checkable as f64) * 100.0
    }

    /// CI pass condition. Only file-level missing/invalid proofs fail the
    /// build; function, variable, and structural weaknesses are advisory.
    pub fn is_passing(&self) -> bool {
        self.files_missing_proof == 0 && self.files_invalid_proof == 0
    }

    /// Total checks across the NF2/NF3/BCNF layers.
    pub fn ept_total(&self) -> usize {
        self.total_structure_checks + self.total_quality_checks + self.total_verification_checks
    }

    /// Share of passing NF2/NF3/BCNF checks, in percent.
    pub fn ept_score(&self) -> f64 {
        let total = self.ept_total();
        if total == 0 {
            return 100.0;
        }
        let ok = self.structure_ok + self.quality_ok + self.verification_ok;
        (ok as f64 / total as f64) * 100.0
    }

    /// Paths of files with a missing proof header, in walk order.
    pub fn missing_files(&self) -> Vec<String> {
        self.file_proofs
            .iter()
            .filter(|p| p.status == Status::Missing)
            .map(|p| p.path.display().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse_case_insensitive() {
        assert_eq!(Level::parse("l2"), Some(Level::L2));
        assert_eq!(Level::parse("L0"), Some(Level::L0));
        assert_eq!(Level::parse(" l3 "), Some(Level::L3));
        assert_eq!(Level::parse("L4"), None);
        assert_eq!(Level::parse("core"), None);
    }

    #[test]
    fn test_coverage_excludes_exempt() {
        let result = CheckResult {
            total_files: 3,
            files_with_proof: 2,
            files_exempt: 1,
            ..Default::default()
        };
        assert_eq!(result.coverage(), 100.0);
    }

    #[test]
    fn test_coverage_empty_tree_is_full() {
        let result = CheckResult::default();
        assert_eq!(result.coverage(), 100.0);
        assert!(result.is_passing());
    }

    #[test]
    fn test_orphan_counts_toward_coverage() {
        let result = CheckResult {
            total_files: 4,
            files_with_proof: 2,
            files_orphan: 2,
            ..Default::default()
        };
        assert_eq!(result.coverage(), 100.0);
    }

    #[test]
    fn test_is_passing_ignores_weak_layers() {
        let result = CheckResult {
            total_files: 1,
            files_with_proof: 1,
            functions_weak_purpose: 3,
            quality_weak: 2,
            ..Default::default()
        };
        assert!(result.is_passing());
    }

    #[test]
    fn test_is_passing_fails_on_invalid() {
        let result = CheckResult {
            total_files: 1,
            files_invalid_proof: 1,
            ..Default::default()
        };
        assert!(!result.is_passing());
    }
}
