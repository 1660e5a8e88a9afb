//! Integration tests for the command-line surface

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use svg_annotation_transfer::cli::{describe_error, run, Args, CliError};
use svg_annotation_transfer::{SelectionError, TransferError};

const ANNOTATED: &str = include_str!("fixtures/annotated.svg");
const REGENERATED: &str = include_str!("fixtures/regenerated.svg");

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join("annotated.svg"), ANNOTATED).expect("write source");
        fs::write(dir.path().join("regenerated.svg"), REGENERATED).expect("write target");
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn arg(&self, name: &str) -> String {
        self.path(name).display().to_string()
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).expect("read file")
    }
}

fn run_args(args: &[String]) -> (Result<(), CliError>, String) {
    let mut argv = vec!["svg-annotation-transfer".to_string()];
    argv.extend(args.iter().cloned());
    let args = Args::parse_from(argv);
    let mut out = Vec::new();
    let result = run(&args, &mut out);
    (result, String::from_utf8(out).expect("utf-8 output"))
}

#[test]
fn test_copy_writes_target() {
    let ws = Workspace::new();
    let (result, output) = run_args(&[ws.arg("annotated.svg"), ws.arg("regenerated.svg")]);

    result.expect("Should succeed");
    assert_eq!(
        output,
        "Copied: arrowhead1, fade, fade-box, g10, g11, g12\n"
    );
    let written = ws.read("regenerated.svg");
    assert!(written.contains("<g id=\"g10\" inkscape:label=\"arrow\">"));
    assert_eq!(ws.read("annotated.svg"), ANNOTATED);
}

#[test]
fn test_second_run_reports_no_changes() {
    let ws = Workspace::new();
    let args = [ws.arg("annotated.svg"), ws.arg("regenerated.svg")];
    run_args(&args).0.expect("first run");
    let after_first = ws.read("regenerated.svg");

    let (result, output) = run_args(&args);
    result.expect("second run");
    assert!(output.starts_with("No changes were necessary"));
    assert_eq!(ws.read("regenerated.svg"), after_first);
}

#[test]
fn test_expression_forms() {
    let ws = Workspace::new();
    let expr = format!("{}<{}", ws.arg("regenerated.svg"), ws.arg("annotated.svg"));
    let (result, output) = run_args(&[expr, "--include".to_string(), "g10".to_string()]);

    result.expect("Should succeed");
    assert_eq!(output, "Copied: arrowhead1, g10\n");
    assert!(!ws.read("regenerated.svg").contains("id=\"g11\""));
}

#[test]
fn test_dry_run_leaves_target_untouched() {
    let ws = Workspace::new();
    let expr = format!("{}>{}", ws.arg("annotated.svg"), ws.arg("regenerated.svg"));
    let (result, output) = run_args(&["--expr".to_string(), expr, "--dry-run".to_string()]);

    result.expect("Should succeed");
    assert!(output.starts_with("(dry run) would copy: arrowhead1"));
    assert_eq!(ws.read("regenerated.svg"), REGENERATED);
}

#[test]
fn test_missing_include_leaves_target_untouched() {
    let ws = Workspace::new();
    let (result, _) = run_args(&[
        ws.arg("annotated.svg"),
        ws.arg("regenerated.svg"),
        "--include".to_string(),
        "g99".to_string(),
    ]);

    let err = result.unwrap_err();
    assert!(matches!(
        err,
        CliError::Transfer(TransferError::Selection(SelectionError::UnknownGroup { .. }))
    ));
    assert_eq!(ws.read("regenerated.svg"), REGENERATED);
}

#[test]
fn test_list_groups() {
    let ws = Workspace::new();
    let (result, output) = run_args(&["--list-groups".to_string(), ws.arg("annotated.svg")]);

    result.expect("Should succeed");
    insta::assert_snapshot!(output.trim_end(), @r"
    g10
    g11
    g12
    ");
}

#[test]
fn test_config_file_overrides_base_id() {
    let ws = Workspace::new();
    fs::write(
        ws.path("transfer.toml"),
        "[selection]\nbase_id = \"g12\"\nexclude = [\"g11\"]\n",
    )
    .expect("write config");

    let (result, output) = run_args(&[
        "--config".to_string(),
        ws.arg("transfer.toml"),
        "--list-groups".to_string(),
        ws.arg("annotated.svg"),
    ]);

    result.expect("Should succeed");
    assert_eq!(output, "figure_1\ng10\ng11\n");
}

#[test]
fn test_malformed_target_is_reported_with_context() {
    let ws = Workspace::new();
    fs::write(ws.path("broken.svg"), "<svg>\n <g id=\"figure_1\">\n</svg>\n").expect("write");
    let args = Args::parse_from([
        "svg-annotation-transfer".to_string(),
        ws.arg("annotated.svg"),
        ws.arg("broken.svg"),
    ]);
    let mut out = Vec::new();
    let err = run(&args, &mut out).unwrap_err();

    assert!(matches!(err, CliError::Transfer(TransferError::Parse { .. })));
    let message = describe_error(&err, &args);
    assert!(message.contains("broken.svg"));
    assert_eq!(
        ws.read("broken.svg"),
        "<svg>\n <g id=\"figure_1\">\n</svg>\n"
    );
}

#[test]
fn test_missing_file_is_io_error() {
    let ws = Workspace::new();
    let (result, _) = run_args(&[ws.arg("nope.svg"), ws.arg("regenerated.svg")]);
    let err = result.unwrap_err();
    assert!(matches!(err, CliError::Transfer(TransferError::Io { .. })));
    assert!(err.to_string().contains("nope.svg"));
}
