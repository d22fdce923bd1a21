//! Tree-sitter parsing and the shared per-file view.
//!
//! A `FileView` is computed once per file and passed by reference into
//! every analyzer: the raw line list feeds the comment-level checks, the
//! parse tree feeds the AST-backed ones. The global verification pass
//! borrows the whole collection of views read-only after the walk.

use std::path::{Path, PathBuf};

use tree_sitter::{Language, Node, Parser, Tree};

/// Parsed lines plus parse tree for one source file.
pub struct FileView {
    /// Path relative to the scan root.
    pub rel_path: PathBuf,
    /// Raw source bytes (kept for node text extraction).
    pub source: Vec<u8>,
    /// Source split into lines.
    pub lines: Vec<String>,
    /// Parse tree. `None` when the file could not be parsed; AST-backed
    /// analyzers skip such files, line-based ones still run.
    pub tree: Option<Tree>,
}

impl FileView {
    /// Text for a tree-sitter node.
    pub fn node_text(&self, node: Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    /// Root node, when the file parsed.
    pub fn root(&self) -> Option<Node<'_>> {
        self.tree.as_ref().map(|t| t.root_node())
    }
}

/// Python parser backed by tree-sitter.
pub struct PythonParser {
    language: Language,
}

impl PythonParser {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }

    /// Parse source into a `FileView`. A failed parse still yields a view
    /// with `tree: None`; a tree containing ERROR nodes is kept, since
    /// partial trees still support the line-anchored analyzers.
    pub fn parse(&self, rel_path: &Path, source: Vec<u8>) -> FileView {
        let text = String::from_utf8_lossy(&source);
        let lines: Vec<String> = text.lines().map(|l| l.to_string()).collect();

        let mut parser = Parser::new();
        let tree = parser
            .set_language(&self.language)
            .ok()
            .and_then(|_| parser.parse(&source, None));

        FileView {
            rel_path: rel_path.to_path_buf(),
            source,
            lines,
            tree,
        }
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

/// One function or class definition found in a file.
pub struct PyDef<'a> {
    pub name: String,
    /// `function_definition` or `class_definition` node.
    pub node: Node<'a>,
    pub decorators: Vec<String>,
    pub is_class: bool,
}

impl PyDef<'_> {
    /// Single leading underscore, excluding dunders.
    pub fn is_private(&self) -> bool {
        self.name.starts_with('_') && !self.is_dunder()
    }

    pub fn is_dunder(&self) -> bool {
        self.name.starts_with("__") && self.name.ends_with("__") && self.name.len() > 4
    }

    /// 1-indexed line of the `def`/`class` keyword.
    pub fn line(&self) -> usize {
        self.node.start_position().row + 1
    }

    pub fn has_decorator(&self, names: &std::collections::HashSet<String>) -> bool {
        self.decorators.iter().any(|d| {
            names.contains(d) || d.split('.').next_back().is_some_and(|last| names.contains(last))
        })
    }
}

/// All nodes of a subtree in preorder.
pub fn descendants(node: Node) -> Vec<Node> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        out.push(n);
        for i in (0..n.child_count()).rev() {
            if let Some(child) = n.child(i) {
                stack.push(child);
            }
        }
    }
    out
}

/// Collect every function and class definition in a view, in source order.
pub fn collect_defs(view: &FileView) -> Vec<PyDef<'_>> {
    let root = match view.root() {
        Some(r) => r,
        None => return Vec::new(),
    };

    let mut defs = Vec::new();
    for node in descendants(root) {
        let is_class = match node.kind() {
            "function_definition" => false,
            "class_definition" => true,
            _ => continue,
        };
        let name = match node.child_by_field_name("name") {
            Some(n) => view.node_text(n).to_string(),
            None => continue,
        };

        let decorators = match node.parent() {
            Some(parent) if parent.kind() == "decorated_definition" => {
                let mut decos = Vec::new();
                for i in 0..parent.child_count() {
                    if let Some(child) = parent.child(i) {
                        if child.kind() == "decorator" {
                            decos.push(view.node_text(child).trim_start_matches('@').to_string());
                        }
                    }
                }
                decos
            }
            _ => Vec::new(),
        };

        defs.push(PyDef {
            name,
            node,
            decorators,
            is_class,
        });
    }
    defs.sort_by_key(|d| d.node.start_byte());
    defs
}

/// Collect function definitions only (classes excluded).
pub fn collect_functions(view: &FileView) -> Vec<PyDef<'_>> {
    collect_defs(view).into_iter().filter(|d| !d.is_class).collect()
}

/// Bare identifiers introduced by an assignment target. Attribute and
/// subscript targets (`self.x = v`, `d[k] = v`) mutate an existing
/// binding, so their identifiers are reads of the base name, never new
/// stores.
pub fn assignment_identifiers(target: Node) -> Vec<Node> {
    match target.kind() {
        "identifier" => vec![target],
        "pattern_list" | "tuple_pattern" => (0..target.child_count())
            .filter_map(|i| target.child(i))
            .filter(|c| c.kind() == "identifier")
            .collect(),
        _ => Vec::new(),
    }
}
