//! Engine configuration.
//!
//! Every threshold, pattern list, and allow-list the analyzers consult
//! lives in one immutable `CheckConfig` built at engine start and threaded
//! through each analyzer call. A project may overlay the defaults with a
//! `proofcheck.yaml` file; the lists are replaceable tables, not
//! authoritative constants.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Config file names searched in the scan root.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["proofcheck.yaml", ".proofcheck.yaml"];

/// Hard cap on file size before a file is treated as unreadable.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// How many leading lines are scanned for a proof header.
pub const HEADER_SCAN_LINES: usize = 10;

/// How many contiguous comment lines above a definition are scanned
/// for a purpose marker.
pub const PURPOSE_SCAN_LINES: usize = 10;

/// Path fragments exempt from proof requirements by default.
const DEFAULT_EXEMPT_PATTERNS: &[&str] = &[
    r"__pycache__",
    r"\.pyc$",
    r"\.git",
    r"\.egg-info",
    r"\.venv",
    r"tests/",
    r"test_",
    r"experiments/",
];

/// Purpose texts that describe WHAT a unit is rather than WHY it exists.
/// Ordered; the first match wins and its explanation becomes the quality
/// issue on the record.
const DEFAULT_WEAK_PURPOSE_PATTERNS: &[(&str, &str)] = &[
    (r"を表す", "WHAT: 'を表す' states what this is, not why it exists"),
    (r"を保持する", "WHAT: 'を保持する' states what this holds, not why"),
    (r"を提供する", "WHAT: 'を提供する' states what this provides, not why"),
    (r"を定義する$", "WHAT: 'を定義する' states what this defines, not why"),
    (r"^データクラス$", "WHAT: no concrete purpose stated"),
    (r"^列挙型$", "WHAT: no concrete purpose stated"),
    (r"(?i)^Represents?\b", "WHAT: 'Represents' - state WHY it exists"),
    (r"(?i)^Holds?\b", "WHAT: 'Holds' - state WHY it's needed"),
    (r"(?i)^Provides?\b", "WHAT: 'Provides' - state WHY it matters"),
    (r"(?i)^Defines?\b", "WHAT: 'Defines' - state WHY it enables"),
    (r"(?i)^Handles?\b", "WHAT: 'Handles' - state WHY this handling matters"),
    (r"(?i)^Manages?\b", "WHAT: 'Manages' - state WHY management is needed"),
    (r"(?i)^Contains?\b", "WHAT: 'Contains' - state WHY containment matters"),
    (r"(?i)^Stores?\b", "WHAT: 'Stores' - state WHY storage is needed"),
    (r"(?i)^Returns?\b", "WHAT: 'Returns' - state WHY this value matters"),
];

/// Parent references that are valid without a filesystem check.
const DEFAULT_SPECIAL_PARENTS: &[&str] = &["external", "legacy", "stdlib"];

/// Single-character names conventional enough to skip the short-name check.
const DEFAULT_SHORT_NAME_ALLOWLIST: &[&str] = &["i", "j", "k", "n", "x", "y", "z", "_"];

/// Files whose module path need not be imported anywhere to be live.
const DEFAULT_ENTRY_POINT_FILES: &[&str] = &[
    "__init__.py",
    "__main__.py",
    "main.py",
    "setup.py",
    "conftest.py",
];

/// Decorator names marking a function as accessed without a call.
const DEFAULT_LIVE_DECORATORS: &[&str] = &["property", "cached_property"];

/// Builtin call targets recognized during call resolution. Incomplete by
/// construction; extend via the config file rather than editing here.
pub static PYTHON_BUILTINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "abs", "all", "any", "bool", "bytearray", "bytes", "callable", "chr", "classmethod",
        "dict", "dir", "divmod", "enumerate", "filter", "float", "format", "frozenset",
        "getattr", "hasattr", "hash", "hex", "id", "int", "isinstance", "issubclass", "iter",
        "len", "list", "map", "max", "min", "next", "object", "oct", "open", "ord", "pow",
        "print", "property", "range", "repr", "reversed", "round", "set", "setattr", "slice",
        "sorted", "staticmethod", "str", "sum", "super", "tuple", "type", "vars", "zip",
        "Exception", "ValueError", "TypeError", "KeyError", "IndexError", "AttributeError",
        "RuntimeError", "NotImplementedError", "StopIteration", "OSError", "IOError",
        "FileNotFoundError", "PermissionError", "UnicodeDecodeError", "ArithmeticError",
        "ZeroDivisionError", "OverflowError", "AssertionError", "LookupError", "NameError",
        "None", "True", "False",
    ]
    .into_iter()
    .collect()
});

/// Type names resolvable without an import during type-reference checks.
pub static BUILTIN_TYPE_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "int", "float", "str", "bytes", "bool", "list", "dict", "set", "tuple", "frozenset",
        "object", "type", "None", "Any", "Optional", "Union", "List", "Dict", "Set", "Tuple",
        "Callable", "Iterator", "Iterable", "Sequence", "Mapping", "Self",
    ]
    .into_iter()
    .collect()
});

/// YAML overlay for `CheckConfig`. Every field is optional; absent fields
/// keep their defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub exempt_patterns: Option<Vec<String>>,
    #[serde(default)]
    pub extra_exempt_patterns: Vec<String>,
    #[serde(default)]
    pub special_parents: Option<Vec<String>>,
    #[serde(default)]
    pub entry_point_files: Option<Vec<String>>,
    #[serde(default)]
    pub extra_builtins: Vec<String>,
    #[serde(default)]
    pub max_function_lines: Option<i64>,
    #[serde(default)]
    pub max_branches: Option<i64>,
    #[serde(default)]
    pub max_params: Option<i64>,
    #[serde(default)]
    pub similarity_threshold: Option<f64>,
    #[serde(default)]
    pub reassign_threshold: Option<usize>,
    #[serde(default)]
    pub check_dirs: Option<bool>,
}

impl ConfigFile {
    /// Parse an overlay from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let file: ConfigFile = serde_yaml::from_str(&content)?;
        Ok(file)
    }

    /// Look for a config file in the scan root.
    pub fn discover(root: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|p| p.is_file())
    }
}

/// Immutable engine configuration.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Regexes matched against relative path strings; a hit exempts the
    /// file or directory from proof requirements.
    pub exempt_patterns: Vec<Regex>,
    /// Ordered weak-purpose classifier: (pattern, explanation).
    pub weak_purpose_patterns: Vec<(Regex, String)>,
    /// Sentinel parents that skip filesystem validation.
    pub special_parents: Vec<String>,
    /// Allowed single-character local names.
    pub short_name_allowlist: HashSet<String>,
    /// File names exempt from the file-liveness check.
    pub entry_point_files: HashSet<String>,
    /// Decorators that keep an uncalled function alive.
    pub live_decorators: HashSet<String>,
    /// Extra call targets treated as resolvable.
    pub extra_builtins: HashSet<String>,
    /// Root used to resolve parent references and local imports.
    /// `None` disables on-disk existence checks for parents.
    pub project_root: Option<PathBuf>,

    pub max_function_lines: i64,
    pub max_branches: i64,
    pub max_params: i64,
    pub similarity_threshold: f64,
    pub reassign_threshold: usize,

    /// Layer toggles. Header/purpose/signature checks always run.
    pub check_dirs: bool,
    pub check_structure: bool,
    pub check_quality: bool,
    pub check_verification: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            exempt_patterns: compile_patterns(DEFAULT_EXEMPT_PATTERNS),
            weak_purpose_patterns: DEFAULT_WEAK_PURPOSE_PATTERNS
                .iter()
                .map(|(p, why)| (Regex::new(p).unwrap(), why.to_string()))
                .collect(),
            special_parents: DEFAULT_SPECIAL_PARENTS.iter().map(|s| s.to_string()).collect(),
            short_name_allowlist: DEFAULT_SHORT_NAME_ALLOWLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
            entry_point_files: DEFAULT_ENTRY_POINT_FILES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            live_decorators: DEFAULT_LIVE_DECORATORS.iter().map(|s| s.to_string()).collect(),
            extra_builtins: HashSet::new(),
            project_root: None,
            max_function_lines: 50,
            max_branches: 10,
            max_params: 5,
            similarity_threshold: 0.8,
            reassign_threshold: 3,
            check_dirs: true,
            check_structure: true,
            check_quality: true,
            check_verification: true,
        }
    }
}

impl CheckConfig {
    /// Configuration with no exemptions, for tests that scan scratch trees
    /// whose temp directory names would otherwise match `test_`.
    pub fn without_exemptions() -> Self {
        Self {
            exempt_patterns: Vec::new(),
            ..Self::default()
        }
    }

    /// Apply a YAML overlay on top of this configuration.
    pub fn with_overlay(mut self, file: &ConfigFile) -> anyhow::Result<Self> {
        if let Some(patterns) = &file.exempt_patterns {
            self.exempt_patterns = compile_pattern_strings(patterns)?;
        }
        if !file.extra_exempt_patterns.is_empty() {
            self.exempt_patterns
                .extend(compile_pattern_strings(&file.extra_exempt_patterns)?);
        }
        if let Some(parents) = &file.special_parents {
            self.special_parents = parents.clone();
        }
        if let Some(entries) = &file.entry_point_files {
            self.entry_point_files = entries.iter().cloned().collect();
        }
        self.extra_builtins.extend(file.extra_builtins.iter().cloned());
        if let Some(v) = file.max_function_lines {
            self.max_function_lines = v;
        }
        if let Some(v) = file.max_branches {
            self.max_branches = v;
        }
        if let Some(v) = file.max_params {
            self.max_params = v;
        }
        if let Some(v) = file.similarity_threshold {
            self.similarity_threshold = v;
        }
        if let Some(v) = file.reassign_threshold {
            self.reassign_threshold = v;
        }
        if let Some(v) = file.check_dirs {
            self.check_dirs = v;
        }
        Ok(self)
    }

    /// Whether a path (relative to the scan root) is exempt.
    pub fn is_exempt(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy().replace('\\', "/");
        self.exempt_patterns.iter().any(|p| p.is_match(&path_str))
    }

    /// Whether a call target resolves without a local definition.
    pub fn is_known_builtin(&self, name: &str) -> bool {
        PYTHON_BUILTINS.contains(name) || self.extra_builtins.contains(name)
    }
}

fn compile_patterns(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

fn compile_pattern_strings(patterns: &[String]) -> anyhow::Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|e| anyhow::anyhow!("invalid exempt pattern {:?}: {}", p, e)))
        .collect()
}
