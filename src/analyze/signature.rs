//! L3 precision analysis: per-parameter/return type annotations and
//! single-character local names.

use std::collections::HashSet;

use tree_sitter::Node;

use crate::config::CheckConfig;
use crate::model::{Status, VariableCheck, VariableProof};
use crate::parser::{assignment_identifiers, collect_functions, descendants, FileView};

/// Check every non-private function's signature annotations and local
/// names. Granularity is per parameter, not per function: each missing
/// annotation is its own record.
pub fn analyze_signatures(view: &FileView, config: &CheckConfig) -> Vec<VariableProof> {
    let mut proofs = Vec::new();

    for def in collect_functions(view) {
        if def.name.starts_with('_') {
            continue;
        }

        check_parameters(view, &def.name, def.node, &mut proofs);
        check_return_type(view, &def.name, def.node, &mut proofs);
        check_short_names(view, def.node, config, &mut proofs);
    }

    proofs
}

fn check_parameters(view: &FileView, func: &str, node: Node, proofs: &mut Vec<VariableProof>) {
    let params = match node.child_by_field_name("parameters") {
        Some(p) => p,
        None => return,
    };

    for i in 0..params.child_count() {
        let param = match params.child(i) {
            Some(p) => p,
            None => continue,
        };
        let line = param.start_position().row + 1;

        let (display, annotated) = match param.kind() {
            "identifier" => (view.node_text(param).to_string(), false),
            "default_parameter" => match param.child_by_field_name("name") {
                Some(name) => (view.node_text(name).to_string(), false),
                None => continue,
            },
            "typed_parameter" => {
                // Inner node is the bare name or a splat pattern.
                let inner = (0..param.child_count())
                    .filter_map(|j| param.child(j))
                    .find(|c| {
                        matches!(
                            c.kind(),
                            "identifier" | "list_splat_pattern" | "dictionary_splat_pattern"
                        )
                    });
                match inner {
                    Some(name) => (view.node_text(name).to_string(), true),
                    None => continue,
                }
            }
            "typed_default_parameter" => match param.child_by_field_name("name") {
                Some(name) => (view.node_text(name).to_string(), true),
                None => continue,
            },
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                (view.node_text(param).to_string(), false)
            }
            _ => continue,
        };

        if display == "self" || display == "cls" {
            continue;
        }

        proofs.push(VariableProof {
            name: format!("{}({})", func, display),
            path: view.rel_path.clone(),
            line_number: line,
            status: if annotated { Status::Ok } else { Status::Missing },
            check: VariableCheck::TypeHint,
            reason: (!annotated).then(|| format!("parameter '{}' has no type annotation", display)),
        });
    }
}

fn check_return_type(view: &FileView, func: &str, node: Node, proofs: &mut Vec<VariableProof>) {
    let line = node.start_position().row + 1;
    match node.child_by_field_name("return_type") {
        Some(ret) => proofs.push(VariableProof {
            name: format!("{} -> {}", func, view.node_text(ret)),
            path: view.rel_path.clone(),
            line_number: line,
            status: Status::Ok,
            check: VariableCheck::TypeHint,
            reason: None,
        }),
        None => proofs.push(VariableProof {
            name: format!("{} -> ???", func),
            path: view.rel_path.clone(),
            line_number: line,
            status: Status::Missing,
            check: VariableCheck::TypeHint,
            reason: Some("return type annotation missing".to_string()),
        }),
    }
}

/// Purely lexical scan over assignment targets in the function body.
/// Single-character names outside the conventional loop/accumulator set
/// are flagged once per name.
fn check_short_names(
    view: &FileView,
    func_node: Node,
    config: &CheckConfig,
    proofs: &mut Vec<VariableProof>,
) {
    let body = match func_node.child_by_field_name("body") {
        Some(b) => b,
        None => return,
    };

    let mut seen: HashSet<String> = HashSet::new();
    for node in descendants(body) {
        let target = match node.kind() {
            "assignment" | "augmented_assignment" => node.child_by_field_name("left"),
            "for_statement" => node.child_by_field_name("left"),
            _ => None,
        };
        let target = match target {
            Some(t) => t,
            None => continue,
        };

        for ident in assignment_identifiers(target) {
            let name = view.node_text(ident).to_string();
            if name.chars().count() != 1 || config.short_name_allowlist.contains(&name) {
                continue;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            proofs.push(VariableProof {
                name: name.clone(),
                path: view.rel_path.clone(),
                line_number: ident.start_position().row + 1,
                status: Status::Weak,
                check: VariableCheck::ShortName,
                reason: Some(format!("single-character name '{}' obscures intent", name)),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PythonParser;
    use std::path::Path;

    fn analyze(source: &str) -> Vec<VariableProof> {
        let view = PythonParser::new().parse(Path::new("sample.py"), source.as_bytes().to_vec());
        analyze_signatures(&view, &CheckConfig::without_exemptions())
    }

    fn hints(proofs: &[VariableProof]) -> Vec<&VariableProof> {
        proofs.iter().filter(|p| p.check == VariableCheck::TypeHint).collect()
    }

    #[test]
    fn test_fully_annotated_function() {
        let proofs = analyze("def greet(name: str) -> str:\n    return name\n");
        let hints = hints(&proofs);
        assert_eq!(hints.len(), 2); // arg + return
        assert!(hints.iter().all(|p| p.status == Status::Ok));
    }

    #[test]
    fn test_missing_return_hint() {
        let proofs = analyze("def greet(name: str):\n    return name\n");
        let missing: Vec<_> = hints(&proofs)
            .into_iter()
            .filter(|p| p.status == Status::Missing)
            .collect();
        assert_eq!(missing.len(), 1);
        assert!(missing[0].name.contains("-> ???"));
    }

    #[test]
    fn test_missing_arg_hint() {
        let proofs = analyze("def greet(name) -> str:\n    return name\n");
        let missing: Vec<_> = hints(&proofs)
            .into_iter()
            .filter(|p| p.status == Status::Missing)
            .collect();
        assert_eq!(missing.len(), 1);
        assert!(missing[0].name.contains("(name)"));
    }

    #[test]
    fn test_private_function_skipped() {
        let proofs = analyze("def _internal(x):\n    return x\n");
        assert!(proofs.is_empty());
    }

    #[test]
    fn test_self_excluded() {
        let proofs = analyze("class C:\n    def method(self, value: int) -> None:\n        pass\n");
        let hints = hints(&proofs);
        assert_eq!(hints.len(), 2); // value + return, self skipped
        assert!(hints.iter().all(|p| p.status == Status::Ok));
    }

    #[test]
    fn test_vararg_hints() {
        let with_hint = analyze("def gather(*args: int) -> None:\n    pass\n");
        let ok: Vec<_> = hints(&with_hint)
            .into_iter()
            .filter(|p| p.name.contains("*args"))
            .collect();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].status, Status::Ok);

        let without = analyze("def gather(*args) -> None:\n    pass\n");
        let missing: Vec<_> = hints(&without)
            .into_iter()
            .filter(|p| p.name.contains("*args") && p.status == Status::Missing)
            .collect();
        assert_eq!(missing.len(), 1);
    }

    #[test]
    fn test_kwarg_hints() {
        let with_hint = analyze("def configure(**kwargs: str) -> None:\n    pass\n");
        let ok: Vec<_> = hints(&with_hint)
            .into_iter()
            .filter(|p| p.name.contains("**kwargs"))
            .collect();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].status, Status::Ok);

        let without = analyze("def configure(**kwargs) -> None:\n    pass\n");
        let missing: Vec<_> = hints(&without)
            .into_iter()
            .filter(|p| p.name.contains("**kwargs") && p.status == Status::Missing)
            .collect();
        assert_eq!(missing.len(), 1);
    }

    #[test]
    fn test_keyword_only_arg() {
        let proofs = analyze("def action(*, key: str) -> None:\n    pass\n");
        let key: Vec<_> = hints(&proofs)
            .into_iter()
            .filter(|p| p.name.contains("(key)"))
            .collect();
        assert_eq!(key.len(), 1);
        assert_eq!(key[0].status, Status::Ok);

        let proofs = analyze("def action(*, key) -> None:\n    pass\n");
        let missing: Vec<_> = hints(&proofs)
            .into_iter()
            .filter(|p| p.name.contains("(key)") && p.status == Status::Missing)
            .collect();
        assert_eq!(missing.len(), 1);
    }

    #[test]
    fn test_short_name_detected() {
        let proofs = analyze("def calc() -> int:\n    q = 42\n    return q\n");
        let short: Vec<_> = proofs
            .iter()
            .filter(|p| p.check == VariableCheck::ShortName)
            .collect();
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].name, "q");
        assert_eq!(short[0].status, Status::Weak);
    }

    #[test]
    fn test_loop_vars_allowed() {
        let proofs = analyze("def loop() -> None:\n    for i in range(10):\n        x = i\n");
        let short: Vec<_> = proofs
            .iter()
            .filter(|p| p.check == VariableCheck::ShortName)
            .collect();
        assert!(short.is_empty());
    }
}
