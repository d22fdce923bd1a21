//! NF3 function-quality analysis: size/branching complexity, near-duplicate
//! detection, and reassignment churn.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor};

use crate::config::CheckConfig;
use crate::model::{FunctionQualityProof, QualityCheck, Status};
use crate::parser::{collect_functions, descendants, FileView, PyDef};

/// Every node kind that opens a branch in control flow. Boolean operators
/// and conditional expressions count because each adds a path through the
/// function even without a statement-level keyword.
static BRANCH_QUERY: Lazy<Query> = Lazy::new(|| {
    Query::new(
        &tree_sitter_python::LANGUAGE.into(),
        r#"
        [
          (if_statement)
          (elif_clause)
          (for_statement)
          (while_statement)
          (except_clause)
          (with_statement)
          (assert_statement)
          (boolean_operator)
          (conditional_expression)
        ] @branch
        "#,
    )
    .expect("branch query must compile")
});

/// Run the three NF3 passes over the non-private functions of one file.
pub fn analyze_quality(view: &FileView, config: &CheckConfig) -> Vec<FunctionQualityProof> {
    let functions: Vec<PyDef> = collect_functions(view)
        .into_iter()
        .filter(|def| !def.name.starts_with('_'))
        .collect();

    let mut proofs = Vec::new();
    for def in &functions {
        check_complexity(view, def, config, &mut proofs);
        check_reassignment(view, def, config, &mut proofs);
    }
    check_similarity(view, &functions, config, &mut proofs);
    proofs
}

fn count_branches(view: &FileView, node: Node) -> i64 {
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&BRANCH_QUERY, node, view.source.as_slice());
    let mut count = 0i64;
    while matches.next().is_some() {
        count += 1;
    }
    count
}

fn count_params(view: &FileView, node: Node) -> i64 {
    let params = match node.child_by_field_name("parameters") {
        Some(p) => p,
        None => return 0,
    };
    let mut count = 0i64;
    for i in 0..params.child_count() {
        let param = match params.child(i) {
            Some(p) => p,
            None => continue,
        };
        let counted = matches!(
            param.kind(),
            "identifier"
                | "typed_parameter"
                | "default_parameter"
                | "typed_default_parameter"
                | "list_splat_pattern"
                | "dictionary_splat_pattern"
        );
        if !counted {
            continue;
        }
        let text = view.node_text(param);
        let name = text.trim_start_matches(['*', ' ']);
        if name == "self" || name.starts_with("self:") || name == "cls" || name.starts_with("cls:")
        {
            continue;
        }
        count += 1;
    }
    count
}

fn check_complexity(
    view: &FileView,
    def: &PyDef,
    config: &CheckConfig,
    proofs: &mut Vec<FunctionQualityProof>,
) {
    let node = def.node;
    let lines = (node.end_position().row - node.start_position().row + 1) as i64;
    let branches = match node.child_by_field_name("body") {
        Some(body) => count_branches(view, body),
        None => 0,
    };
    let params = count_params(view, node);

    let violations = [
        (lines, config.max_function_lines, "lines"),
        (branches, config.max_branches, "branches"),
        (params, config.max_params, "parameters"),
    ];

    let mut any = false;
    for (value, threshold, metric) in violations {
        if value > threshold {
            any = true;
            proofs.push(FunctionQualityProof {
                name: def.name.clone(),
                path: view.rel_path.clone(),
                line_number: def.line(),
                status: Status::Weak,
                check: QualityCheck::Complexity,
                metric_value: Some(value),
                threshold: Some(threshold),
                reason: Some(format!("{} {} exceeds limit of {}", value, metric, threshold)),
            });
        }
    }
    if !any {
        proofs.push(FunctionQualityProof {
            name: def.name.clone(),
            path: view.rel_path.clone(),
            line_number: def.line(),
            status: Status::Ok,
            check: QualityCheck::Complexity,
            metric_value: Some(lines),
            threshold: Some(config.max_function_lines),
            reason: None,
        });
    }
}

/// Flatten a function subtree into (preorder position, node kind) pairs.
/// Position keeps two structurally identical bodies from matching bodies
/// that merely share a bag of node kinds.
fn shape_of(node: Node) -> HashSet<(usize, &'static str)> {
    descendants(node)
        .into_iter()
        .enumerate()
        .map(|(i, n)| (i, n.kind()))
        .collect()
}

fn jaccard(a: &HashSet<(usize, &'static str)>, b: &HashSet<(usize, &'static str)>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn check_similarity(
    view: &FileView,
    functions: &[PyDef],
    config: &CheckConfig,
    proofs: &mut Vec<FunctionQualityProof>,
) {
    let shapes: Vec<HashSet<(usize, &'static str)>> = functions
        .iter()
        .map(|def| match def.node.child_by_field_name("body") {
            Some(body) => shape_of(body),
            None => HashSet::new(),
        })
        .collect();

    for i in 0..functions.len() {
        for j in (i + 1)..functions.len() {
            let score = jaccard(&shapes[i], &shapes[j]);
            if score > config.similarity_threshold {
                proofs.push(FunctionQualityProof {
                    name: format!("{} ~ {}", functions[i].name, functions[j].name),
                    path: view.rel_path.clone(),
                    line_number: functions[i].line(),
                    status: Status::Weak,
                    check: QualityCheck::Similarity,
                    metric_value: Some((score * 100.0).round() as i64),
                    threshold: Some((config.similarity_threshold * 100.0).round() as i64),
                    reason: Some(format!(
                        "{:.0}% structural overlap with '{}'",
                        score * 100.0,
                        functions[j].name
                    )),
                });
            }
        }
    }
}

/// Assignment targets inside the function's own scope; nested definitions
/// open a new scope and are excluded.
fn own_scope_targets<'a>(view: &'a FileView, body: Node<'a>) -> Vec<(String, usize)> {
    let mut targets = Vec::new();
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if matches!(node.kind(), "function_definition" | "class_definition") && node != body {
            continue;
        }
        if matches!(node.kind(), "assignment" | "augmented_assignment") {
            if let Some(left) = node.child_by_field_name("left") {
                if left.kind() == "identifier" {
                    targets.push((
                        view.node_text(left).to_string(),
                        left.start_position().row + 1,
                    ));
                }
            }
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
    targets
}

fn check_reassignment(
    view: &FileView,
    def: &PyDef,
    config: &CheckConfig,
    proofs: &mut Vec<FunctionQualityProof>,
) {
    let body = match def.node.child_by_field_name("body") {
        Some(b) => b,
        None => return,
    };

    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (name, line) in own_scope_targets(view, body) {
        if config.short_name_allowlist.contains(&name) {
            continue;
        }
        let entry = counts.entry(name).or_insert((0, line));
        entry.0 += 1;
    }

    let mut flagged: Vec<(String, usize, usize)> = counts
        .into_iter()
        .filter(|(_, (count, _))| *count >= config.reassign_threshold)
        .map(|(name, (count, line))| (name, count, line))
        .collect();
    flagged.sort_by(|a, b| a.2.cmp(&b.2));

    for (name, count, line) in flagged {
        proofs.push(FunctionQualityProof {
            name: format!("{}::{}", def.name, name),
            path: view.rel_path.clone(),
            line_number: line,
            status: Status::Weak,
            check: QualityCheck::Reassign,
            metric_value: Some(count as i64),
            threshold: Some(config.reassign_threshold as i64),
            reason: Some(format!(
                "'{}' reassigned {} times; prefer a new name per meaning",
                name, count
            )),
        });
    }
}
