//! Command-line interface for proofcheck.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::checker::Checker;
use crate::config::{CheckConfig, ConfigFile};
use crate::model::CheckResult;
use crate::report::{self, Format};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Existence proof checker for Python source trees.
///
/// Proofcheck walks a tree and verifies that every file, directory,
/// function, and signature carries its existence proof: `# PROOF:`
/// headers, `PROOF.md` contracts, `# PURPOSE:` markers, and type
/// annotations. On top of existence it measures structural quality:
/// unresolved references, oversized or duplicated functions, and dead
/// code nothing ever imports or calls.
#[derive(Parser)]
#[command(name = "proofcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full existence and quality check
    Check(CheckArgs),
    /// Check only purpose comments on functions and classes
    Purpose(PurposeArgs),
}

/// Arguments for the check command.
#[derive(Parser)]
pub struct CheckArgs {
    /// Path to check (file or directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Print only the coverage figure and always exit 0
    #[arg(long)]
    pub coverage: bool,

    /// CI mode: terse output, exit 1 when the check fails
    #[arg(long)]
    pub ci: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<Format>,

    /// Skip the directory-level PROOF.md checks
    #[arg(long)]
    pub no_dirs: bool,

    /// Path to config YAML file (default: auto-discover in the root)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the purpose command.
#[derive(Parser)]
pub struct PurposeArgs {
    /// Path to check (file or directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Terse one-line output
    #[arg(long)]
    pub ci: bool,

    /// Also fail on weak purposes, not only missing ones
    #[arg(long)]
    pub strict: bool,

    /// Path to config YAML file (default: auto-discover in the root)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Build the engine configuration for a run: defaults, then an explicit
/// or discovered YAML overlay.
fn load_config(root: &PathBuf, explicit: Option<&PathBuf>) -> anyhow::Result<CheckConfig> {
    let config = CheckConfig::default();
    let overlay_path = match explicit {
        Some(path) => Some(path.clone()),
        None => {
            let base = if root.is_file() {
                root.parent().map(PathBuf::from).unwrap_or_default()
            } else {
                root.clone()
            };
            ConfigFile::discover(&base)
        }
    };
    match overlay_path {
        Some(path) => {
            let file = ConfigFile::parse_file(&path)?;
            config.with_overlay(&file)
        }
        None => Ok(config),
    }
}

/// Run the check command. Returns the process exit code.
pub fn run_check(args: &CheckArgs) -> anyhow::Result<i32> {
    let mut config = load_config(&args.path, args.config.as_ref())?;
    if args.no_dirs {
        config.check_dirs = false;
    }

    let checker = Checker::new(&args.path, config);
    let result = checker.check()?;

    if args.coverage {
        println!("{:.1}", result.coverage());
        return Ok(EXIT_SUCCESS);
    }

    let format = args.format.unwrap_or(if args.ci { Format::Ci } else { Format::Text });
    print!("{}", report::render(&result, &args.path, format));

    if args.ci && !result.is_passing() {
        return Ok(EXIT_FAILED);
    }
    Ok(EXIT_SUCCESS)
}

/// Run the purpose command. Returns the process exit code.
pub fn run_purpose(args: &PurposeArgs) -> anyhow::Result<i32> {
    let config = load_config(&args.path, args.config.as_ref())?;
    let checker = Checker::new(&args.path, config);
    let result = checker.check_purposes()?;

    print!("{}", report::render_purpose(&result, args.ci));

    Ok(purpose_exit_code(&result, args.strict))
}

fn purpose_exit_code(result: &CheckResult, strict: bool) -> i32 {
    if result.functions_missing_purpose > 0 {
        return EXIT_FAILED;
    }
    if strict && result.functions_weak_purpose > 0 {
        return EXIT_FAILED;
    }
    EXIT_SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_check() {
        let cli = Cli::try_parse_from(["proofcheck", "check", "src", "--ci"]).unwrap();
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.path, PathBuf::from("src"));
                assert!(args.ci);
                assert!(args.format.is_none());
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_cli_default_path() {
        let cli = Cli::try_parse_from(["proofcheck", "check"]).unwrap();
        match cli.command {
            Commands::Check(args) => assert_eq!(args.path, PathBuf::from(".")),
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_cli_parses_format() {
        let cli =
            Cli::try_parse_from(["proofcheck", "check", "--format", "json"]).unwrap();
        match cli.command {
            Commands::Check(args) => assert_eq!(args.format, Some(Format::Json)),
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_cli_parses_purpose() {
        let cli = Cli::try_parse_from(["proofcheck", "purpose", "pkg", "--strict"]).unwrap();
        match cli.command {
            Commands::Purpose(args) => {
                assert_eq!(args.path, PathBuf::from("pkg"));
                assert!(args.strict);
            }
            _ => panic!("expected purpose"),
        }
    }

    #[test]
    fn test_purpose_exit_codes() {
        let mut result = CheckResult::default();
        assert_eq!(purpose_exit_code(&result, false), EXIT_SUCCESS);
        result.functions_weak_purpose = 1;
        assert_eq!(purpose_exit_code(&result, false), EXIT_SUCCESS);
        assert_eq!(purpose_exit_code(&result, true), EXIT_FAILED);
        result.functions_missing_purpose = 1;
        assert_eq!(purpose_exit_code(&result, false), EXIT_FAILED);
    }
}
