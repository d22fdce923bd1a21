//! NF2 structure analysis: do imports, calls, and type references point
//! at something that exists?
//!
//! Import targets are resolved against the project tree; direct calls and
//! annotation names are resolved against the file's own definitions,
//! its import bindings, and the builtin allow-list. Attribute-style calls
//! cannot be resolved without type inference and are always skipped.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tree_sitter::Node;

use crate::config::{CheckConfig, BUILTIN_TYPE_NAMES};
use crate::model::{Status, StructureCheck, StructureProof};
use crate::parser::{collect_defs, collect_functions, descendants, FileView};

/// One import statement extracted from a file.
#[derive(Debug, Clone)]
pub struct PyImport {
    /// Dotted module text; empty for `from . import x` forms.
    pub module: String,
    /// Leading dots of a relative import (0 for absolute).
    pub dots: usize,
    /// Imported names of a `from` import (empty for plain `import m`).
    pub names: Vec<String>,
    /// Local names this statement binds.
    pub bindings: Vec<String>,
    pub line: usize,
}

/// Where an import target resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Local module found at this path (relative to the root).
    Local(PathBuf),
    /// First segment is not part of the project; cannot verify locally.
    External,
    /// Looks local but nothing exists at the expected path.
    Unresolved,
}

/// Extract every import statement in a file.
pub fn collect_imports(view: &FileView) -> Vec<PyImport> {
    let root = match view.root() {
        Some(r) => r,
        None => return Vec::new(),
    };

    let mut imports = Vec::new();
    for node in descendants(root) {
        match node.kind() {
            "import_statement" => {
                for i in 0..node.child_count() {
                    let child = match node.child(i) {
                        Some(c) => c,
                        None => continue,
                    };
                    let (module, binding) = match child.kind() {
                        "dotted_name" => {
                            let text = view.node_text(child).to_string();
                            let first = text.split('.').next().unwrap_or("").to_string();
                            (text, first)
                        }
                        "aliased_import" => {
                            let name = child
                                .child_by_field_name("name")
                                .map(|n| view.node_text(n).to_string())
                                .unwrap_or_default();
                            let alias = child
                                .child_by_field_name("alias")
                                .map(|n| view.node_text(n).to_string())
                                .unwrap_or_default();
                            (name, alias)
                        }
                        _ => continue,
                    };
                    if module.is_empty() {
                        continue;
                    }
                    imports.push(PyImport {
                        module,
                        dots: 0,
                        names: Vec::new(),
                        bindings: vec![binding],
                        line: node.start_position().row + 1,
                    });
                }
            }
            "import_from_statement" => {
                let (module, dots) = match node.child_by_field_name("module_name") {
                    Some(m) if m.kind() == "relative_import" => {
                        let text = view.node_text(m);
                        let dots = text.chars().take_while(|c| *c == '.').count();
                        (text.trim_start_matches('.').to_string(), dots)
                    }
                    Some(m) => (view.node_text(m).to_string(), 0),
                    None => continue,
                };

                let mut names = Vec::new();
                let mut bindings = Vec::new();
                for i in 0..node.child_count() {
                    let child = match node.child(i) {
                        Some(c) => c,
                        None => continue,
                    };
                    // Skip the module_name child itself; remaining dotted
                    // names are the imported symbols.
                    if Some(child) == node.child_by_field_name("module_name") {
                        continue;
                    }
                    match child.kind() {
                        "dotted_name" => {
                            let text = view.node_text(child).to_string();
                            bindings.push(text.split('.').next_back().unwrap_or("").to_string());
                            names.push(text);
                        }
                        "aliased_import" => {
                            if let Some(name) = child.child_by_field_name("name") {
                                names.push(view.node_text(name).to_string());
                            }
                            if let Some(alias) = child.child_by_field_name("alias") {
                                bindings.push(view.node_text(alias).to_string());
                            }
                        }
                        _ => {}
                    }
                }

                imports.push(PyImport {
                    module,
                    dots,
                    names,
                    bindings,
                    line: node.start_position().row + 1,
                });
            }
            _ => {}
        }
    }
    imports
}

/// Resolve a dotted module against a base directory (relative to root).
fn resolve_dotted(root: &Path, base_rel: &Path, dotted: &str) -> Option<PathBuf> {
    let mut rel = base_rel.to_path_buf();
    for seg in dotted.split('.').filter(|s| !s.is_empty()) {
        rel.push(seg);
    }
    let abs = root.join(&rel);
    if abs.with_extension("py").is_file() {
        return Some(rel.with_extension("py"));
    }
    if abs.join("__init__.py").is_file() || abs.is_dir() {
        return Some(rel);
    }
    None
}

/// Resolve one import to a local path, an external reference, or nothing.
pub fn resolve_import(root: &Path, file_rel: &Path, import: &PyImport) -> Resolution {
    if import.dots > 0 {
        // Relative: anchor at the file's directory, one level up per
        // extra dot. Relative imports are local by definition.
        let mut base = file_rel.parent().unwrap_or(Path::new("")).to_path_buf();
        for _ in 1..import.dots {
            base = base.parent().unwrap_or(Path::new("")).to_path_buf();
        }
        if !import.module.is_empty() {
            return match resolve_dotted(root, &base, &import.module) {
                Some(p) => Resolution::Local(p),
                None => Resolution::Unresolved,
            };
        }
        // `from . import name` resolves each name as a sibling module.
        for name in &import.names {
            if let Some(p) = resolve_dotted(root, &base, name) {
                return Resolution::Local(p);
            }
        }
        return Resolution::Unresolved;
    }

    match resolve_dotted(root, Path::new(""), &import.module) {
        Some(p) => Resolution::Local(p),
        None => {
            let first = import.module.split('.').next().unwrap_or("");
            let anchored = root.join(first);
            if anchored.with_extension("py").is_file() || anchored.is_dir() {
                Resolution::Unresolved
            } else {
                Resolution::External
            }
        }
    }
}

/// Names a file defines or binds at module level: functions, classes,
/// module-level assignment targets, and import bindings.
pub fn collect_defined_names(view: &FileView) -> HashSet<String> {
    let mut names: HashSet<String> = HashSet::new();

    for def in collect_defs(view) {
        names.insert(def.name);
    }
    for import in collect_imports(view) {
        names.extend(import.bindings);
    }
    if let Some(root) = view.root() {
        for node in descendants(root) {
            if node.kind() == "assignment" {
                if let Some(left) = node.child_by_field_name("left") {
                    if left.kind() == "identifier" {
                        names.insert(view.node_text(left).to_string());
                    }
                }
            }
        }
    }
    names
}

/// Run the three NF2 passes over one file.
pub fn analyze_structure(view: &FileView, config: &CheckConfig) -> Vec<StructureProof> {
    let mut proofs = Vec::new();
    check_imports(view, config, &mut proofs);

    let defined = collect_defined_names(view);
    check_calls(view, config, &defined, &mut proofs);
    check_type_refs(view, config, &defined, &mut proofs);
    proofs
}

fn check_imports(view: &FileView, config: &CheckConfig, proofs: &mut Vec<StructureProof>) {
    let root = match &config.project_root {
        Some(r) => r.clone(),
        None => return,
    };

    for import in collect_imports(view) {
        let display = if import.dots > 0 {
            format!("{}{}", ".".repeat(import.dots), import.module)
        } else {
            import.module.clone()
        };

        let (status, target, reason) = match resolve_import(&root, &view.rel_path, &import) {
            Resolution::Local(path) => {
                (Status::Ok, Some(path.display().to_string()), None)
            }
            Resolution::External => (Status::Ok, None, Some("external module".to_string())),
            Resolution::Unresolved => (
                Status::Missing,
                None,
                Some(format!("import target '{}' not found in project", display)),
            ),
        };

        proofs.push(StructureProof {
            name: display,
            path: view.rel_path.clone(),
            line_number: import.line,
            status,
            check: StructureCheck::Import,
            target,
            reason,
        });
    }
}

fn check_calls(
    view: &FileView,
    config: &CheckConfig,
    defined: &HashSet<String>,
    proofs: &mut Vec<StructureProof>,
) {
    for def in collect_functions(view) {
        if def.name.starts_with('_') {
            continue;
        }
        let body = match def.node.child_by_field_name("body") {
            Some(b) => b,
            None => continue,
        };
        for node in descendants(body) {
            if node.kind() != "call" {
                continue;
            }
            let callee = match node.child_by_field_name("function") {
                Some(f) if f.kind() == "identifier" => f,
                // Attribute calls resolve through an object; skipped.
                _ => continue,
            };
            let name = view.node_text(callee).to_string();
            let resolved = defined.contains(&name) || config.is_known_builtin(&name);
            proofs.push(StructureProof {
                name: name.clone(),
                path: view.rel_path.clone(),
                line_number: callee.start_position().row + 1,
                status: if resolved { Status::Ok } else { Status::Weak },
                check: StructureCheck::Call,
                target: None,
                reason: (!resolved)
                    .then(|| format!("call target '{}' not defined or imported here", name)),
            });
        }
    }
}

fn check_type_refs(
    view: &FileView,
    config: &CheckConfig,
    defined: &HashSet<String>,
    proofs: &mut Vec<StructureProof>,
) {
    for def in collect_functions(view) {
        if def.name.starts_with('_') {
            continue;
        }

        let mut annotations: Vec<Node> = Vec::new();
        if let Some(params) = def.node.child_by_field_name("parameters") {
            for i in 0..params.child_count() {
                if let Some(param) = params.child(i) {
                    if let Some(ty) = param.child_by_field_name("type") {
                        annotations.push(ty);
                    }
                }
            }
        }
        if let Some(ret) = def.node.child_by_field_name("return_type") {
            annotations.push(ret);
        }

        for annotation in annotations {
            for name_node in annotation_names(annotation) {
                let name = view.node_text(name_node).to_string();
                let known = defined.contains(&name)
                    || BUILTIN_TYPE_NAMES.contains(name.as_str())
                    || config.is_known_builtin(&name);
                proofs.push(StructureProof {
                    name: name.clone(),
                    path: view.rel_path.clone(),
                    line_number: name_node.start_position().row + 1,
                    status: if known { Status::Ok } else { Status::Weak },
                    check: StructureCheck::TypeRef,
                    target: None,
                    reason: (!known)
                        .then(|| format!("type '{}' not imported or defined in this file", name)),
                });
            }
        }
    }
}

/// Identifiers referenced by an annotation, unwrapping subscripted
/// (`List[int]`) and union (`A | B`) forms. For dotted names only the
/// leftmost segment is checked; the rest needs the other module's
/// namespace.
fn annotation_names(annotation: Node) -> Vec<Node> {
    descendants(annotation)
        .into_iter()
        .filter(|n| n.kind() == "identifier")
        .filter(|n| {
            match n.parent() {
                Some(p) if p.kind() == "attribute" => {
                    p.child_by_field_name("object") == Some(*n)
                }
                _ => true,
            }
        })
        .collect()
}
