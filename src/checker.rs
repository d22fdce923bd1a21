//! Checker that walks a source tree and orchestrates all analyzers.
//!
//! Two phases: a depth-first walk producing per-file records and retaining
//! parsed views, then one project-wide verification pass over the retained
//! views. A final fold turns the record vectors into counters.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::analyze::{header, purpose, quality, signature, structure, verify};
use crate::config::{CheckConfig, MAX_FILE_SIZE};
use crate::model::{CheckResult, FileProof, Status};
use crate::parser::{FileView, PythonParser};

/// Fatal engine errors. Per-file problems never surface here; they
/// degrade to `Invalid` records during the walk.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("path does not exist: {0}")]
    RootNotFound(PathBuf),
    #[error("not a Python file or directory: {0}")]
    UnsupportedRoot(PathBuf),
}

/// Executes the full check pipeline against one tree.
pub struct Checker {
    root: PathBuf,
    config: CheckConfig,
}

impl Checker {
    /// Create a checker for a scan root. The root doubles as the base for
    /// parent-reference and import resolution unless the config already
    /// names one.
    pub fn new<P: AsRef<Path>>(root: P, mut config: CheckConfig) -> Self {
        let root = root.as_ref().to_path_buf();
        if config.project_root.is_none() {
            // In single-file mode the containing directory anchors
            // parent references and import resolution.
            let base = if root.is_file() {
                root.parent().map(Path::to_path_buf)
            } else {
                Some(root.clone())
            };
            config.project_root = base;
        }
        Self { root, config }
    }

    /// Run every layer and aggregate.
    pub fn check(&self) -> Result<CheckResult, EngineError> {
        let mut result = CheckResult::default();
        let views = self.walk(&mut result)?;

        if self.config.check_verification {
            result.verification_proofs = verify::analyze_project(&views, &self.config);
        }

        fold_counts(&mut result);
        Ok(result)
    }

    /// Run only the purpose layer, for `proofcheck purpose`.
    pub fn check_purposes(&self) -> Result<CheckResult, EngineError> {
        let parser = PythonParser::new();
        let mut result = CheckResult::default();

        for (rel, abs) in self.python_files()? {
            let source = match std::fs::read(&abs) {
                Ok(s) => s,
                Err(_) => continue,
            };
            let view = parser.parse(&rel, source);
            result
                .function_proofs
                .extend(purpose::analyze_purposes(&view, &self.config));
        }

        fold_counts(&mut result);
        Ok(result)
    }

    /// Depth-first walk producing per-file/per-dir records and the view
    /// arena for the verification phase.
    fn walk(&self, result: &mut CheckResult) -> Result<Vec<FileView>, EngineError> {
        let parser = PythonParser::new();
        let mut views = Vec::new();

        if !self.root.exists() {
            return Err(EngineError::RootNotFound(self.root.clone()));
        }

        if self.root.is_file() {
            // Single-file mode: the file's own directory anchors imports.
            let rel = PathBuf::from(
                self.root
                    .file_name()
                    .ok_or_else(|| EngineError::UnsupportedRoot(self.root.clone()))?,
            );
            if self.root.extension().map(|e| e == "py") != Some(true) {
                return Err(EngineError::UnsupportedRoot(self.root.clone()));
            }
            self.check_file(&parser, &rel, &self.root, result, &mut views);
            return Ok(views);
        }

        let mut walker = WalkDir::new(&self.root).sort_by_file_name().into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let rel = match entry.path().strip_prefix(&self.root) {
                Ok(r) if !r.as_os_str().is_empty() => r.to_path_buf(),
                _ => continue,
            };

            if entry.file_type().is_dir() {
                if self.config.is_exempt(&rel) {
                    if self.config.check_dirs {
                        result
                            .dir_proofs
                            .push(header::analyze_dir(&rel, entry.path(), &self.config));
                    }
                    walker.skip_current_dir();
                    continue;
                }
                if self.config.check_dirs {
                    result
                        .dir_proofs
                        .push(header::analyze_dir(&rel, entry.path(), &self.config));
                }
                continue;
            }

            if entry.path().extension().map(|e| e == "py") != Some(true) {
                continue;
            }
            self.check_file(&parser, &rel, entry.path(), result, &mut views);
        }

        Ok(views)
    }

    fn check_file(
        &self,
        parser: &PythonParser,
        rel: &Path,
        abs: &Path,
        result: &mut CheckResult,
        views: &mut Vec<FileView>,
    ) {
        if self.config.is_exempt(rel) {
            result
                .file_proofs
                .push(FileProof::new(rel.to_path_buf(), Status::Exempt));
            return;
        }

        let source = match read_source(abs) {
            Ok(s) => s,
            Err(reason) => {
                let mut proof = FileProof::new(rel.to_path_buf(), Status::Invalid);
                proof.reason = Some(reason);
                result.file_proofs.push(proof);
                return;
            }
        };

        let lines: Vec<String> = String::from_utf8_lossy(&source)
            .lines()
            .map(|l| l.to_string())
            .collect();
        result
            .file_proofs
            .push(header::analyze_file_header(rel, &lines, &self.config));

        let view = parser.parse(rel, source);
        result
            .function_proofs
            .extend(purpose::analyze_purposes(&view, &self.config));
        result
            .variable_proofs
            .extend(signature::analyze_signatures(&view, &self.config));
        if self.config.check_structure {
            result
                .structure_proofs
                .extend(structure::analyze_structure(&view, &self.config));
        }
        if self.config.check_quality {
            result
                .quality_proofs
                .extend(quality::analyze_quality(&view, &self.config));
        }
        views.push(view);
    }

    /// Non-exempt Python files under the root, in walk order.
    fn python_files(&self) -> Result<Vec<(PathBuf, PathBuf)>, EngineError> {
        if !self.root.exists() {
            return Err(EngineError::RootNotFound(self.root.clone()));
        }
        if self.root.is_file() {
            let rel = PathBuf::from(
                self.root
                    .file_name()
                    .ok_or_else(|| EngineError::UnsupportedRoot(self.root.clone()))?,
            );
            return Ok(vec![(rel, self.root.clone())]);
        }

        let mut files = Vec::new();
        let mut walker = WalkDir::new(&self.root).sort_by_file_name().into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let rel = match entry.path().strip_prefix(&self.root) {
                Ok(r) if !r.as_os_str().is_empty() => r.to_path_buf(),
                _ => continue,
            };
            if entry.file_type().is_dir() {
                if self.config.is_exempt(&rel) {
                    walker.skip_current_dir();
                }
                continue;
            }
            if entry.path().extension().map(|e| e == "py") != Some(true)
                || self.config.is_exempt(&rel)
            {
                continue;
            }
            files.push((rel, entry.path().to_path_buf()));
        }
        Ok(files)
    }
}

/// Read a file's bytes, converting size and encoding problems into the
/// reason string of an `Invalid` record.
fn read_source(path: &Path) -> Result<Vec<u8>, String> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > MAX_FILE_SIZE => {
            return Err(format!("file exceeds {} bytes", MAX_FILE_SIZE));
        }
        Ok(_) => {}
        Err(e) => return Err(format!("cannot stat file: {}", e)),
    }
    let bytes = std::fs::read(path).map_err(|e| format!("cannot read file: {}", e))?;
    if std::str::from_utf8(&bytes).is_err() {
        return Err("not valid UTF-8".to_string());
    }
    Ok(bytes)
}

/// Derive every counter from the record vectors.
fn fold_counts(result: &mut CheckResult) {
    result.total_files = result.file_proofs.len();
    result.files_with_proof = count_status(&result.file_proofs, Status::Ok, |p| p.status);
    result.files_missing_proof = count_status(&result.file_proofs, Status::Missing, |p| p.status);
    result.files_invalid_proof = count_status(&result.file_proofs, Status::Invalid, |p| p.status);
    result.files_exempt = count_status(&result.file_proofs, Status::Exempt, |p| p.status);
    result.files_orphan = count_status(&result.file_proofs, Status::Orphan, |p| p.status);

    result.level_stats.clear();
    for proof in &result.file_proofs {
        if proof.status.counts_as_proven() {
            if let Some(level) = proof.level {
                *result
                    .level_stats
                    .entry(level.as_str().to_string())
                    .or_insert(0) += 1;
            }
        }
    }

    result.total_functions = result.function_proofs.len();
    result.functions_with_purpose =
        count_status(&result.function_proofs, Status::Ok, |p| p.status);
    result.functions_missing_purpose =
        count_status(&result.function_proofs, Status::Missing, |p| p.status);
    result.functions_weak_purpose =
        count_status(&result.function_proofs, Status::Weak, |p| p.status);

    use crate::model::VariableCheck;
    let hints = result
        .variable_proofs
        .iter()
        .filter(|p| p.check == VariableCheck::TypeHint);
    result.total_checked_signatures = hints.clone().count();
    result.signatures_with_hints = hints.clone().filter(|p| p.status == Status::Ok).count();
    result.signatures_missing_hints = hints.filter(|p| p.status == Status::Missing).count();
    result.short_name_violations = result
        .variable_proofs
        .iter()
        .filter(|p| p.check == VariableCheck::ShortName)
        .count();

    result.total_structure_checks = result.structure_proofs.len();
    result.structure_ok = count_status(&result.structure_proofs, Status::Ok, |p| p.status);
    result.structure_missing =
        count_status(&result.structure_proofs, Status::Missing, |p| p.status);

    result.total_quality_checks = result.quality_proofs.len();
    result.quality_ok = count_status(&result.quality_proofs, Status::Ok, |p| p.status);
    result.quality_weak = count_status(&result.quality_proofs, Status::Weak, |p| p.status);

    result.total_verification_checks = result.verification_proofs.len();
    result.verification_ok =
        count_status(&result.verification_proofs, Status::Ok, |p| p.status);
    result.verification_weak =
        count_status(&result.verification_proofs, Status::Weak, |p| p.status);
}

fn count_status<T, F: Fn(&T) -> Status>(items: &[T], status: Status, get: F) -> usize {
    items.iter().filter(|item| get(item) == status).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    fn checker(root: &Path) -> Checker {
        Checker::new(root, CheckConfig::without_exemptions())
    }

    #[test]
    fn test_empty_tree() {
        let temp = TempDir::new().unwrap();
        let result = checker(temp.path()).check().unwrap();
        assert_eq!(result.total_files, 0);
        assert_eq!(result.coverage(), 100.0);
        assert!(result.is_passing());
    }

    #[test]
    fn test_mixed_tree_counts() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "good.py",
            "# PROOF: [L1/core] <- external\nvalue = 1\n",
        );
        write(temp.path(), "bad.py", "value = 2\n");
        write(temp.path(), "orphan.py", "# PROOF: [L2/api]\nvalue = 3\n");
        let result = checker(temp.path()).check().unwrap();

        assert_eq!(result.total_files, 3);
        assert_eq!(result.files_with_proof, 1);
        assert_eq!(result.files_missing_proof, 1);
        assert_eq!(result.files_orphan, 1);
        assert!(!result.is_passing());
        assert_eq!(result.missing_files(), vec!["bad.py"]);
        assert_eq!(result.level_stats.get("L1"), Some(&1));
        assert_eq!(result.level_stats.get("L2"), Some(&1));
    }

    #[test]
    fn test_exempt_file_counted() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "mod.py", "# PROOF: [L1/x] <- external\n");
        write(temp.path(), "generated.py", "value = 1\n");
        let mut config = CheckConfig::without_exemptions();
        config.exempt_patterns = vec![regex::Regex::new("generated").unwrap()];
        let result = Checker::new(temp.path(), config).check().unwrap();
        assert_eq!(result.total_files, 2);
        assert_eq!(result.files_exempt, 1);
        assert_eq!(result.coverage(), 100.0);
    }

    #[test]
    fn test_exempt_dir_skipped_entirely() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "mod.py", "# PROOF: [L1/x] <- external\n");
        write(temp.path(), "vendor/dep.py", "value = 1\n");
        let mut config = CheckConfig::without_exemptions();
        config.exempt_patterns = vec![regex::Regex::new("vendor").unwrap()];
        let result = Checker::new(temp.path(), config).check().unwrap();
        assert_eq!(result.total_files, 1);
        let vendor = result
            .dir_proofs
            .iter()
            .find(|d| d.path == Path::new("vendor"))
            .unwrap();
        assert_eq!(vendor.status, Status::Exempt);
    }

    #[test]
    fn test_non_python_ignored() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "notes.txt", "no proof here\n");
        write(temp.path(), "mod.py", "# PROOF: [L1/x] <- external\n");
        let result = checker(temp.path()).check().unwrap();
        assert_eq!(result.total_files, 1);
    }

    #[test]
    fn test_non_utf8_file_invalid() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("binary.py"), [0x80u8, 0xFF, 0x00]).unwrap();
        let result = checker(temp.path()).check().unwrap();
        assert_eq!(result.files_invalid_proof, 1);
        assert!(!result.is_passing());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let err = checker(Path::new("/nonexistent/tree")).check().unwrap_err();
        assert!(matches!(err, EngineError::RootNotFound(_)));
    }

    #[test]
    fn test_single_file_mode() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "solo.py", "# PROOF: [L1/x] <- external\n");
        let result = checker(&temp.path().join("solo.py")).check().unwrap();
        assert_eq!(result.total_files, 1);
        assert_eq!(result.files_with_proof, 1);
    }

    #[test]
    fn test_dir_proofs_collected() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "pkg/PROOF.md",
            "PURPOSE: keep the engine in one import surface\n",
        );
        write(temp.path(), "pkg/mod.py", "# PROOF: [L1/x] <- external\n");
        let result = checker(temp.path()).check().unwrap();
        let pkg = result
            .dir_proofs
            .iter()
            .find(|d| d.path == Path::new("pkg"))
            .unwrap();
        assert_eq!(pkg.status, Status::Ok);
    }

    #[test]
    fn test_no_dirs_toggle() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "pkg/mod.py", "# PROOF: [L1/x] <- external\n");
        let mut config = CheckConfig::without_exemptions();
        config.check_dirs = false;
        let result = Checker::new(temp.path(), config).check().unwrap();
        assert!(result.dir_proofs.is_empty());
    }

    #[test]
    fn test_check_is_idempotent() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.py", "# PROOF: [L1/x] <- external\n");
        write(temp.path(), "b.py", "value = 1\n");
        let checker = checker(temp.path());
        let first = checker.check().unwrap();
        let second = checker.check().unwrap();
        assert_eq!(first.total_files, second.total_files);
        assert_eq!(first.coverage(), second.coverage());
        assert_eq!(first.missing_files(), second.missing_files());
    }

    #[test]
    fn test_purpose_only_mode() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "mod.py",
            "# PURPOSE: gate auth so callers cannot skip it\ndef authenticate():\n    pass\n\ndef bare():\n    pass\n",
        );
        let result = checker(temp.path()).check_purposes().unwrap();
        assert_eq!(result.total_functions, 2);
        assert_eq!(result.functions_with_purpose, 1);
        assert_eq!(result.functions_missing_purpose, 1);
        assert_eq!(result.total_files, 0);
    }
}
