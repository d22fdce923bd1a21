//! BCNF verification: project-wide liveness.
//!
//! Unlike the per-file analyzers this pass needs every parsed file at
//! once. It runs after the walk, over the retained views, and only reads.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::analyze::structure::{collect_imports, resolve_import, Resolution};
use crate::config::CheckConfig;
use crate::model::{Status, VerificationCheck, VerificationProof};
use crate::parser::{
    assignment_identifiers, collect_defs, collect_functions, descendants, FileView,
};

/// Run all project-wide checks over the retained file views.
pub fn analyze_project(views: &[FileView], config: &CheckConfig) -> Vec<VerificationProof> {
    let mut proofs = Vec::new();
    check_file_liveness(views, config, &mut proofs);

    let called = collect_called_names(views);
    for view in views {
        check_dead_functions(view, config, &called, &mut proofs);
        check_unused_vars(view, &mut proofs);
    }
    proofs
}

/// Count how often each file is the resolved target of an import in some
/// other file, then flag never-imported non-entry-point files.
fn check_file_liveness(
    views: &[FileView],
    config: &CheckConfig,
    proofs: &mut Vec<VerificationProof>,
) {
    let root = match &config.project_root {
        Some(r) => r.clone(),
        None => return,
    };

    let mut import_counts: HashMap<PathBuf, usize> = HashMap::new();
    for view in views {
        for import in collect_imports(view) {
            if let Resolution::Local(target) = resolve_import(&root, &view.rel_path, &import) {
                if target != view.rel_path {
                    *import_counts.entry(target).or_insert(0) += 1;
                }
            }
        }
    }

    for view in views {
        let file_name = view
            .rel_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if config.entry_point_files.contains(&file_name) {
            continue;
        }

        // A package import (`import pkg`) reaches pkg/__init__.py, which
        // keeps the whole directory's modules reachable only through
        // explicit imports; the file itself still needs a direct hit.
        let count = import_counts.get(&view.rel_path).copied().unwrap_or(0);
        proofs.push(VerificationProof {
            name: view.rel_path.display().to_string(),
            path: view.rel_path.clone(),
            line_number: 1,
            status: if count > 0 { Status::Ok } else { Status::Weak },
            check: VerificationCheck::FileImportCount,
            ref_count: count,
            reason: (count == 0).then(|| "never imported by another module".to_string()),
        });
    }
}

/// Every bare name used as a call target, attribute-call target, or
/// decorator anywhere in the project, with occurrence counts.
fn collect_called_names(views: &[FileView]) -> HashMap<String, usize> {
    let mut called: HashMap<String, usize> = HashMap::new();

    for view in views {
        let tree_root = match view.root() {
            Some(r) => r,
            None => continue,
        };
        for node in descendants(tree_root) {
            if node.kind() != "call" {
                continue;
            }
            let callee = match node.child_by_field_name("function") {
                Some(f) => f,
                None => continue,
            };
            let name = match callee.kind() {
                "identifier" => view.node_text(callee).to_string(),
                "attribute" => match callee.child_by_field_name("attribute") {
                    Some(attr) => view.node_text(attr).to_string(),
                    None => continue,
                },
                _ => continue,
            };
            *called.entry(name).or_insert(0) += 1;
        }

        for def in collect_defs(view) {
            for decorator in &def.decorators {
                let bare = decorator.split('(').next().unwrap_or("");
                if let Some(name) = bare.rsplit('.').next() {
                    if !name.is_empty() {
                        *called.entry(name.to_string()).or_insert(0) += 1;
                    }
                }
            }
        }
    }
    called
}

fn check_dead_functions(
    view: &FileView,
    config: &CheckConfig,
    called: &HashMap<String, usize>,
    proofs: &mut Vec<VerificationProof>,
) {
    for def in collect_functions(view) {
        if def.name.starts_with('_') {
            continue;
        }
        let accessor = def.decorators.iter().any(|d| {
            let bare = d.split('(').next().unwrap_or("");
            bare.ends_with(".setter") || bare.ends_with(".getter")
        });
        if accessor || def.has_decorator(&config.live_decorators) {
            continue;
        }

        let count = called.get(&def.name).copied().unwrap_or(0);
        proofs.push(VerificationProof {
            name: def.name.clone(),
            path: view.rel_path.clone(),
            line_number: def.line(),
            status: if count > 0 { Status::Ok } else { Status::Weak },
            check: VerificationCheck::DeadFunc,
            ref_count: count,
            reason: (count == 0)
                .then(|| format!("'{}' is never called anywhere in the project", def.name)),
        });
    }
}

/// Stores-minus-loads per function body. A name written by an assignment
/// but never read again is churn; `_`-prefixed names opt out by
/// convention. Only bare-name targets count as stores: in `self.x = v`
/// or `d[k] = v` the base name is being read, not rebound.
fn check_unused_vars(view: &FileView, proofs: &mut Vec<VerificationProof>) {
    for def in collect_functions(view) {
        if def.name.starts_with('_') {
            continue;
        }
        let body = match def.node.child_by_field_name("body") {
            Some(b) => b,
            None => continue,
        };

        let mut stores: HashMap<String, usize> = HashMap::new();
        let mut store_nodes: HashSet<usize> = HashSet::new();
        let mut loads: HashSet<String> = HashSet::new();

        for node in descendants(body) {
            let target = match node.kind() {
                "assignment" | "augmented_assignment" | "for_statement" => {
                    node.child_by_field_name("left")
                }
                _ => None,
            };
            let target = match target {
                Some(t) => t,
                None => continue,
            };
            for ident in assignment_identifiers(target) {
                let name = view.node_text(ident).to_string();
                store_nodes.insert(ident.id());
                stores
                    .entry(name)
                    .or_insert(ident.start_position().row + 1);
            }
        }

        for node in descendants(body) {
            if node.kind() == "identifier" && !store_nodes.contains(&node.id()) {
                loads.insert(view.node_text(node).to_string());
            }
        }

        let mut unused: Vec<(String, usize)> = stores
            .into_iter()
            .filter(|(name, _)| !name.starts_with('_') && !loads.contains(name))
            .collect();
        unused.sort_by(|a, b| a.1.cmp(&b.1));

        for (name, line) in unused {
            proofs.push(VerificationProof {
                name: format!("{}::{}", def.name, name),
                path: view.rel_path.clone(),
                line_number: line,
                status: Status::Weak,
                check: VerificationCheck::UnusedVar,
                ref_count: 0,
                reason: Some(format!("'{}' is assigned but never read", name)),
            });
        }
    }
}
