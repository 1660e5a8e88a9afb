//! SVG Annotation Transfer CLI
//!
//! Usage:
//!   svg-annotation-transfer [OPTIONS] [PATHS]...
//!
//! Examples:
//!   svg-annotation-transfer source.svg target.svg
//!   svg-annotation-transfer 'source.svg>target.svg' --dry-run
//!   svg-annotation-transfer --list-groups source.svg

use std::io;
use std::process;
use std::str::FromStr;

use clap::Parser;
use log::{debug, LevelFilter};

use svg_annotation_transfer::cli::{describe_error, run, Args};

fn main() {
    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            args.log_level
        );
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();
    debug!(args:?; "Parsed arguments");

    let stdout = io::stdout();
    if let Err(err) = run(&args, &mut stdout.lock()) {
        eprintln!("{}", describe_error(&err, &args));
        process::exit(1);
    }
}
