//! Command-line surface
//!
//! Paths can be given as two positionals (`SOURCE TARGET`), as flags, or as a
//! single directional expression: `source.svg>target.svg` or
//! `target.svg<source.svg`.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use thiserror::Error;

use crate::config::{ConfigError, TransferConfig};
use crate::error::{DocumentRole, TransferError};
use crate::{copy_annotations, list_groups_in_file};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "svg-annotation-transfer", version)]
#[command(about = "Copy manual annotation groups from one SVG into another")]
#[command(after_help = "Examples:\n  svg-annotation-transfer source.svg target.svg\n  svg-annotation-transfer 'source.svg>target.svg'\n  svg-annotation-transfer --list-groups source.svg")]
pub struct Args {
    /// Source and target paths, or one expression containing '>' or '<'
    pub paths: Vec<String>,

    /// Expression of the form "source.svg>target.svg" or "target.svg<source.svg"
    #[arg(short, long)]
    pub expr: Option<String>,

    /// Path to the source SVG
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Path to the target SVG
    #[arg(short, long)]
    pub target: Option<PathBuf>,

    /// Only copy the specified group ids
    #[arg(long, num_args = 1..)]
    pub include: Option<Vec<String>>,

    /// Skip the specified group ids
    #[arg(long, num_args = 1..)]
    pub exclude: Option<Vec<String>>,

    /// Preview the transfer without writing the target file
    #[arg(long)]
    pub dry_run: bool,

    /// List candidate annotation groups in the given SVG and exit
    #[arg(long, value_name = "SVG")]
    pub list_groups: Option<PathBuf>,

    /// Id of the base-figure group that is never copied
    #[arg(long)]
    pub base_id: Option<String>,

    /// Also skip groups with matplotlib-generated ids (axes_, line2d_, ...)
    #[arg(long)]
    pub skip_plot_groups: bool,

    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Errors reported by the command-line tool
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("failed to load config '{}': {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Split a directional expression into `(source, target)`
pub fn parse_expression(value: &str) -> Result<(String, String), CliError> {
    let expr = value.trim();
    let (source, target) = if let Some((left, right)) = expr.split_once('>') {
        (left.trim(), right.trim())
    } else if let Some((left, right)) = expr.split_once('<') {
        (right.trim(), left.trim())
    } else {
        return Err(CliError::Usage(
            "expression must contain '>' or '<' to indicate direction".to_string(),
        ));
    };
    if source.is_empty() || target.is_empty() {
        return Err(CliError::Usage(
            "both source and target paths are required in the expression".to_string(),
        ));
    }
    Ok((source.to_string(), target.to_string()))
}

/// Work out the source and target paths from the arguments
pub fn resolve_paths(args: &Args) -> Result<(PathBuf, PathBuf), CliError> {
    if let Some(expr) = &args.expr {
        let (source, target) = parse_expression(expr)?;
        return Ok((source.into(), target.into()));
    }
    if let (Some(source), Some(target)) = (&args.source, &args.target) {
        return Ok((source.clone(), target.clone()));
    }
    match args.paths.as_slice() {
        [single] if single.contains('>') || single.contains('<') => {
            let (source, target) = parse_expression(single)?;
            Ok((source.into(), target.into()))
        }
        [source, target] => Ok((source.into(), target.into())),
        _ => Err(CliError::Usage(
            "unable to determine source and target SVG paths from the provided arguments"
                .to_string(),
        )),
    }
}

/// Build the transfer configuration: config file first, then flags
pub fn build_config(args: &Args) -> Result<TransferConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => TransferConfig::from_file(path).map_err(|source| CliError::Config {
            path: path.clone(),
            source,
        })?,
        None => TransferConfig::default(),
    };
    if let Some(base_id) = &args.base_id {
        config = config.with_base_id(base_id.clone());
    }
    if args.skip_plot_groups {
        config = config.with_matplotlib_prefixes();
    }
    if let Some(include) = &args.include {
        config = config.with_include(include.iter().cloned());
    }
    if let Some(exclude) = &args.exclude {
        config = config.with_exclude(exclude.iter().cloned());
    }
    let dry_run = args.dry_run || config.dry_run;
    Ok(config.with_dry_run(dry_run))
}

/// Run the tool, writing human-readable results to `out`
pub fn run(args: &Args, out: &mut impl Write) -> Result<(), CliError> {
    let config = build_config(args)?;

    if let Some(path) = &args.list_groups {
        let groups = list_groups_in_file(path, &config)?;
        if groups.is_empty() {
            writeln!(out, "No candidate annotation groups found.")?;
        }
        for group in groups {
            match group.id {
                Some(id) => writeln!(out, "{id}")?,
                None => writeln!(out, "(unnamed <{}>)", group.tag)?,
            }
        }
        return Ok(());
    }

    let (source, target) = resolve_paths(args)?;
    log::debug!(source:?, target:?; "resolved paths");
    let report = copy_annotations(&source, &target, &config)?;

    for warning in &report.warnings {
        log::warn!("{warning}");
    }
    if report.changed {
        let action = if report.dry_run {
            "(dry run) would copy"
        } else {
            "Copied"
        };
        writeln!(out, "{action}: {}", report.copied.join(", "))?;
    } else {
        writeln!(
            out,
            "No changes were necessary; target SVG already contains the requested annotations."
        )?;
    }
    Ok(())
}

/// Render an error for the terminal, with source context for parse errors
pub fn describe_error(err: &CliError, args: &Args) -> String {
    if let CliError::Transfer(TransferError::Parse { role, source }) = err {
        let path = match role {
            DocumentRole::Source => args
                .list_groups
                .clone()
                .or_else(|| resolve_paths(args).ok().map(|(s, _)| s)),
            DocumentRole::Target => resolve_paths(args).ok().map(|(_, t)| t),
        };
        if let Some(text) = path.as_deref().and_then(read_for_report) {
            let name = path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            return source.format(&text, &name);
        }
    }
    format!("Error: {err}")
}

fn read_for_report(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(values: &[&str]) -> (String, String) {
        (values[0].to_string(), values[1].to_string())
    }

    #[test]
    fn test_parse_expression_directions() {
        assert_eq!(
            parse_expression("a.svg>b.svg").expect("Should parse"),
            strings(&["a.svg", "b.svg"])
        );
        assert_eq!(
            parse_expression(" b.svg < a.svg ").expect("Should parse"),
            strings(&["a.svg", "b.svg"])
        );
    }

    #[test]
    fn test_parse_expression_errors() {
        assert!(parse_expression("a.svg b.svg").is_err());
        assert!(parse_expression("a.svg>").is_err());
        assert!(parse_expression("<a.svg").is_err());
    }

    #[test]
    fn test_resolve_paths_forms() {
        let args = Args::parse_from(["svg-annotation-transfer", "a.svg", "b.svg"]);
        assert_eq!(
            resolve_paths(&args).expect("Should resolve"),
            (PathBuf::from("a.svg"), PathBuf::from("b.svg"))
        );

        let args = Args::parse_from(["svg-annotation-transfer", "b.svg<a.svg"]);
        assert_eq!(
            resolve_paths(&args).expect("Should resolve"),
            (PathBuf::from("a.svg"), PathBuf::from("b.svg"))
        );

        let args = Args::parse_from(["svg-annotation-transfer", "-s", "a.svg", "-t", "b.svg"]);
        assert_eq!(
            resolve_paths(&args).expect("Should resolve"),
            (PathBuf::from("a.svg"), PathBuf::from("b.svg"))
        );

        let args = Args::parse_from(["svg-annotation-transfer", "only.svg"]);
        assert!(resolve_paths(&args).is_err());
    }

    #[test]
    fn test_build_config_from_flags() {
        let args = Args::parse_from([
            "svg-annotation-transfer",
            "a.svg",
            "b.svg",
            "--include",
            "g1",
            "g2",
            "--exclude",
            "g2",
            "--dry-run",
            "--base-id",
            "plot",
        ]);
        assert_eq!(args.paths, vec!["a.svg", "b.svg"]);
        let config = build_config(&args).expect("Should build");
        assert_eq!(config.base_id, "plot");
        assert_eq!(
            config.include,
            Some(vec!["g1".to_string(), "g2".to_string()])
        );
        assert_eq!(config.exclude, vec!["g2".to_string()]);
        assert!(config.dry_run);
    }
}
