//! Output formatting for check results.
//!
//! Rendering is pure: every format maps a `CheckResult` to a `String`,
//! and the CLI decides where it goes. Four formats:
//! - text: colored terminal output for human readability
//! - markdown: tables for commit comments and docs
//! - json: structured output for programmatic consumption
//! - ci: one-glance lines for pipeline logs

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use colored::*;
use serde::Serialize;

use crate::model::{CheckResult, Status};

/// Output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Text,
    Markdown,
    Json,
    Ci,
}

/// Render a full check result in the requested format.
pub fn render(result: &CheckResult, root: &Path, format: Format) -> String {
    match format {
        Format::Text => render_text(result, root),
        Format::Markdown => render_markdown(result, root),
        Format::Json => render_json(result),
        Format::Ci => render_ci(result),
    }
}

// =============================================================================
// JSON
// =============================================================================

#[derive(Serialize)]
struct JsonReport {
    total_files: usize,
    files_with_proof: usize,
    files_missing_proof: usize,
    files_invalid_proof: usize,
    files_exempt: usize,
    files_orphan: usize,
    coverage: f64,
    is_passing: bool,
    level_stats: BTreeMap<String, usize>,
    missing_files: Vec<String>,
    purpose: JsonPurpose,
    type_hints: JsonTypeHints,
    short_name_violations: usize,
    ept: JsonEpt,
}

#[derive(Serialize)]
struct JsonPurpose {
    total: usize,
    ok: usize,
    weak: usize,
    missing: usize,
}

#[derive(Serialize)]
struct JsonTypeHints {
    total: usize,
    ok: usize,
    missing: usize,
}

#[derive(Serialize)]
struct JsonEpt {
    nf2: usize,
    nf3: usize,
    bcnf: usize,
    score: f64,
    total: usize,
}

fn render_json(result: &CheckResult) -> String {
    let report = JsonReport {
        total_files: result.total_files,
        files_with_proof: result.files_with_proof,
        files_missing_proof: result.files_missing_proof,
        files_invalid_proof: result.files_invalid_proof,
        files_exempt: result.files_exempt,
        files_orphan: result.files_orphan,
        coverage: result.coverage(),
        is_passing: result.is_passing(),
        level_stats: result.level_stats.clone(),
        missing_files: result.missing_files(),
        purpose: JsonPurpose {
            total: result.total_functions,
            ok: result.functions_with_purpose,
            weak: result.functions_weak_purpose,
            missing: result.functions_missing_purpose,
        },
        type_hints: JsonTypeHints {
            total: result.total_checked_signatures,
            ok: result.signatures_with_hints,
            missing: result.signatures_missing_hints,
        },
        short_name_violations: result.short_name_violations,
        ept: JsonEpt {
            nf2: result.structure_ok,
            nf3: result.quality_ok,
            bcnf: result.verification_ok,
            score: result.ept_score(),
            total: result.ept_total(),
        },
    };
    // A report this small cannot fail to serialize.
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
}

// =============================================================================
// Text
// =============================================================================

fn render_text(result: &CheckResult, root: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "proofcheck".cyan().bold(), root.display());
    let _ = writeln!(out);

    if result.is_passing() {
        let _ = writeln!(out, "{}", "✅ PASS".green().bold());
    } else {
        let _ = writeln!(out, "{}", "❌ FAIL".red().bold());
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", "Files:".bold());
    let _ = writeln!(out, "  {:<9}{}", "Total:", result.total_files);
    let _ = writeln!(out, "  {:<9}{}", "OK:", result.files_with_proof);
    let _ = writeln!(out, "  {:<9}{}", "Missing:", result.files_missing_proof);
    let _ = writeln!(out, "  {:<9}{}", "Invalid:", result.files_invalid_proof);
    let _ = writeln!(out, "  {:<9}{}", "Orphan:", result.files_orphan);
    let _ = writeln!(out, "  {:<9}{}", "Exempt:", result.files_exempt);
    let _ = writeln!(out, "Coverage: {:.1}%", result.coverage());

    if !result.level_stats.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Levels:".bold());
        for (level, count) in &result.level_stats {
            let _ = writeln!(out, "  {:<9}{}", format!("{}:", level), count);
        }
    }

    let missing = result.missing_files();
    if !missing.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Missing PROOF:".red().bold());
        for path in &missing {
            let _ = writeln!(out, "  - {}", path);
        }
    }
    let invalid: Vec<&crate::model::FileProof> = result
        .file_proofs
        .iter()
        .filter(|p| p.status == Status::Invalid)
        .collect();
    if !invalid.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Invalid PROOF:".red().bold());
        for proof in invalid {
            let _ = writeln!(
                out,
                "  - {} ({})",
                proof.path.display(),
                proof.reason.as_deref().unwrap_or("invalid")
            );
        }
    }

    if result.total_functions > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "L2 Purpose:".bold());
        let _ = writeln!(out, "  {:<9}{}", "OK:", result.functions_with_purpose);
        let _ = writeln!(out, "  {:<9}{}", "Weak:", result.functions_weak_purpose);
        let _ = writeln!(out, "  {:<9}{}", "Missing:", result.functions_missing_purpose);
    }

    if result.total_checked_signatures > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "L3 Type Hints:".bold());
        let _ = writeln!(out, "  {:<9}{}", "OK:", result.signatures_with_hints);
        let _ = writeln!(out, "  {:<9}{}", "Missing:", result.signatures_missing_hints);
        if result.short_name_violations > 0 {
            let _ = writeln!(out, "  Short names: {}", result.short_name_violations);
        }
    }

    if result.ept_total() > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Quality Tensor:".bold());
        let _ = writeln!(
            out,
            "  {:<9}{}/{}",
            "NF2:", result.structure_ok, result.total_structure_checks
        );
        let _ = writeln!(
            out,
            "  {:<9}{}/{}",
            "NF3:", result.quality_ok, result.total_quality_checks
        );
        let _ = writeln!(
            out,
            "  {:<9}{}/{}",
            "BCNF:", result.verification_ok, result.total_verification_checks
        );
        let _ = writeln!(out, "  Score:   {:.1}%", result.ept_score());
    }

    out
}

// =============================================================================
// Markdown
// =============================================================================

fn table(out: &mut String, rows: &[(&str, usize)]) {
    let _ = writeln!(out, "| Status | Count |");
    let _ = writeln!(out, "|--------|-------|");
    for (label, count) in rows {
        let _ = writeln!(out, "| {} | {} |", label, count);
    }
}

fn render_markdown(result: &CheckResult, root: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Proof Check: {}", root.display());
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "**{}** (coverage {:.1}%)",
        if result.is_passing() { "PASS" } else { "FAIL" },
        result.coverage()
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "## L1 Files");
    let _ = writeln!(out);
    table(
        &mut out,
        &[
            ("Total", result.total_files),
            ("OK", result.files_with_proof),
            ("Missing", result.files_missing_proof),
            ("Invalid", result.files_invalid_proof),
            ("Orphan", result.files_orphan),
            ("Exempt", result.files_exempt),
        ],
    );

    if !result.level_stats.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Levels");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Level | Count |");
        let _ = writeln!(out, "|-------|-------|");
        for (level, count) in &result.level_stats {
            let _ = writeln!(out, "| {} | {} |", level, count);
        }
    }

    if result.total_functions > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "## L2 Purpose Quality");
        let _ = writeln!(out);
        table(
            &mut out,
            &[
                ("OK", result.functions_with_purpose),
                ("Weak", result.functions_weak_purpose),
                ("Missing", result.functions_missing_purpose),
            ],
        );
    }

    if result.total_checked_signatures > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "## L3 Type Hints");
        let _ = writeln!(out);
        table(
            &mut out,
            &[
                ("OK", result.signatures_with_hints),
                ("Missing", result.signatures_missing_hints),
                ("Short names", result.short_name_violations),
            ],
        );
    }

    if result.ept_total() > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Quality Tensor");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Layer | OK | Total |");
        let _ = writeln!(out, "|-------|----|-------|");
        let _ = writeln!(
            out,
            "| NF2 | {} | {} |",
            result.structure_ok, result.total_structure_checks
        );
        let _ = writeln!(
            out,
            "| NF3 | {} | {} |",
            result.quality_ok, result.total_quality_checks
        );
        let _ = writeln!(
            out,
            "| BCNF | {} | {} |",
            result.verification_ok, result.total_verification_checks
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "Score: {:.1}%", result.ept_score());
    }

    let missing = result.missing_files();
    if !missing.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Missing PROOF");
        let _ = writeln!(out);
        for path in &missing {
            let _ = writeln!(out, "- `{}`", path);
        }
    }

    out
}

// =============================================================================
// CI
// =============================================================================

fn render_ci(result: &CheckResult) -> String {
    let mut out = String::new();
    if result.is_passing() {
        let _ = writeln!(
            out,
            "✅ proofcheck: {} files, {:.1}% coverage",
            result.total_files,
            result.coverage()
        );
    } else {
        let failing = result.files_missing_proof + result.files_invalid_proof;
        let _ = writeln!(out, "❌ proofcheck: {} files missing or invalid PROOF", failing);
        for path in result.missing_files() {
            let _ = writeln!(out, "  - {}", path);
        }
        for proof in result
            .file_proofs
            .iter()
            .filter(|p| p.status == Status::Invalid)
        {
            let _ = writeln!(out, "  - {} (invalid)", proof.path.display());
        }
    }
    if result.total_functions > 0 {
        let _ = writeln!(
            out,
            "Purpose: {} ok, {} weak, {} missing",
            result.functions_with_purpose,
            result.functions_weak_purpose,
            result.functions_missing_purpose
        );
    }
    out
}

// =============================================================================
// Purpose-only output
// =============================================================================

/// Render the result of `proofcheck purpose`. The terse form is one
/// summary line; the full form lists each problem with its location.
pub fn render_purpose(result: &CheckResult, terse: bool) -> String {
    let mut out = String::new();
    if terse {
        let _ = writeln!(
            out,
            "Purpose: {} ok, {} weak, {} missing",
            result.functions_with_purpose,
            result.functions_weak_purpose,
            result.functions_missing_purpose
        );
        return out;
    }

    for proof in &result.function_proofs {
        match proof.status {
            Status::Missing => {
                let _ = writeln!(
                    out,
                    "{} {}:{} {}",
                    "MISSING".red(),
                    proof.path.display(),
                    proof.line_number,
                    proof.name
                );
            }
            Status::Weak => {
                let _ = writeln!(
                    out,
                    "{} {}:{} {} ({})",
                    "WEAK".yellow(),
                    proof.path.display(),
                    proof.line_number,
                    proof.name,
                    proof.quality_issue.as_deref().unwrap_or("weak purpose")
                );
            }
            _ => {}
        }
    }
    let _ = writeln!(
        out,
        "Purpose: {} ok, {} weak, {} missing",
        result.functions_with_purpose,
        result.functions_weak_purpose,
        result.functions_missing_purpose
    );
    out
}
