//! SVG Annotation Transfer - carry hand-made annotations between SVG files
//!
//! A plotting library produces a base figure; someone adds arrows, labels and
//! highlight boxes in a vector editor. This library copies those annotation
//! groups, together with the markers, gradients and clip paths they use, into
//! another version of the figure. Copied markup is sliced verbatim from the
//! source and spliced into the target, so no other byte of the target changes.
//!
//! # Example
//!
//! ```rust
//! use svg_annotation_transfer::{transfer, TransferConfig};
//!
//! let source = r#"<svg xmlns="http://www.w3.org/2000/svg">
//!  <g id="figure_1"/>
//!  <g id="g10"><path d="M 0 0 L 5 5"/></g>
//! </svg>"#;
//! let target = r#"<svg xmlns="http://www.w3.org/2000/svg">
//!  <g id="figure_1"/>
//! </svg>"#;
//!
//! let report = transfer(source, target, &TransferConfig::default()).unwrap();
//! assert_eq!(report.copied, vec!["g10"]);
//! assert!(report.merged.contains(r#"<g id="g10"><path d="M 0 0 L 5 5"/></g>"#));
//! ```

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod merge;
pub mod references;
pub mod select;

use std::fs;
use std::path::Path;

use log::{debug, info, warn};

pub use config::{ConfigError, TransferConfig};
pub use document::{ElementSpan, SvgDocument};
pub use error::{
    DocumentRole, MergeError, ParseError, SelectionError, TransferError, TransferWarning,
};
pub use merge::{Fragment, MergeOutcome};

/// Outcome of one transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    /// Target text with the annotations applied
    pub merged: String,
    /// Ids replaced or inserted: definitions first, then groups, then
    /// nested elements whose standalone copies in the target were refreshed
    pub copied: Vec<String>,
    /// Namespace prefixes that had to be declared on the target root
    pub declared_namespaces: Vec<String>,
    /// Non-fatal conditions encountered along the way
    pub warnings: Vec<TransferWarning>,
    /// True if `merged` differs from the original target
    pub changed: bool,
    /// True if this was a preview and nothing was written
    pub dry_run: bool,
}

/// A top-level group as shown by [`list_groups`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    /// Value of the group's `id` attribute, if any
    pub id: Option<String>,
    /// Local tag name of the element
    pub tag: String,
}

/// Copy annotation groups and their definitions from `source` into `target`.
///
/// Both texts are only read; the merged document is returned in the report.
/// Fails if either document is malformed or an include-listed group does not
/// exist in the source.
pub fn transfer(
    source: &str,
    target: &str,
    config: &TransferConfig,
) -> Result<TransferReport, TransferError> {
    let source_doc =
        SvgDocument::parse(source).map_err(|e| TransferError::parse(DocumentRole::Source, e))?;
    let target_doc =
        SvgDocument::parse(target).map_err(|e| TransferError::parse(DocumentRole::Target, e))?;

    let selection = select::select_groups(&source_doc, config)?;
    if selection.groups.is_empty() {
        return Err(SelectionError::NothingSelected.into());
    }
    debug!(groups:? = selection.ids(); "selected annotation groups");

    let closure = references::resolve_definitions(&source_doc, &selection.groups, config);

    let copied_spans: Vec<&ElementSpan> = closure
        .definitions
        .iter()
        .chain(selection.groups.iter())
        .collect();
    let nested_spans: Vec<ElementSpan> = copied_spans
        .iter()
        .flat_map(|span| source_doc.descendants(span))
        .filter(|span| span.id.is_some())
        .collect();

    let fragments: Vec<Fragment<'_>> = copied_spans
        .iter()
        .map(|span| fragment(&source_doc, span, false))
        .chain(nested_spans.iter().map(|span| fragment(&source_doc, span, true)))
        .collect();

    let used: Vec<String> = fragments
        .iter()
        .flat_map(|f| document::prefixes_in(f.markup))
        .collect();
    let namespaces: Vec<(String, String)> = source_doc
        .declared_namespaces()
        .into_iter()
        .filter(|(prefix, _)| used.contains(prefix))
        .collect();

    let outcome = merge::merge(&target_doc, &fragments, &namespaces)?;

    let mut warnings = selection.warnings;
    warnings.extend(closure.dangling);
    warnings.extend(closure.base_references);
    warnings.extend(outcome.warnings);

    let changed = outcome.text != target;
    info!(
        copied = outcome.copied.len(),
        replaced = outcome.replaced.len(),
        inserted = outcome.inserted.len(),
        changed;
        "transfer computed"
    );

    Ok(TransferReport {
        merged: outcome.text,
        copied: outcome.copied,
        declared_namespaces: outcome.declared,
        warnings,
        changed,
        dry_run: config.dry_run,
    })
}

fn fragment<'a, 'input: 'a>(
    doc: &SvgDocument<'input>,
    span: &'a ElementSpan,
    nested: bool,
) -> Fragment<'a> {
    Fragment {
        id: span.id.as_deref(),
        markup: doc.slice(span),
        indent: doc.leading_indent(span),
        offset: span.range.start,
        nested,
    }
}

/// Top-level annotation groups of `source`, in document order
pub fn list_groups(source: &str, config: &TransferConfig) -> Result<Vec<GroupEntry>, TransferError> {
    let doc =
        SvgDocument::parse(source).map_err(|e| TransferError::parse(DocumentRole::Source, e))?;
    let selection = select::eligible_groups(&doc, config);
    for warning in &selection.warnings {
        warn!("{warning}");
    }
    Ok(selection
        .groups
        .into_iter()
        .map(|g| GroupEntry { id: g.id, tag: g.tag })
        .collect())
}

/// File-based [`transfer`]: reads both files and rewrites the target.
///
/// The target is written only when the merged text differs and the
/// configuration is not a dry run. Any failure leaves the target untouched.
pub fn copy_annotations(
    source_path: &Path,
    target_path: &Path,
    config: &TransferConfig,
) -> Result<TransferReport, TransferError> {
    let source = fs::read_to_string(source_path).map_err(|e| TransferError::read(source_path, e))?;
    let target = fs::read_to_string(target_path).map_err(|e| TransferError::read(target_path, e))?;

    let report = transfer(&source, &target, config)?;

    if report.changed && !report.dry_run {
        fs::write(target_path, &report.merged).map_err(|e| TransferError::write(target_path, e))?;
        info!(path:? = target_path; "target updated");
    }
    Ok(report)
}

/// [`list_groups`] for a file on disk
pub fn list_groups_in_file(
    path: &Path,
    config: &TransferConfig,
) -> Result<Vec<GroupEntry>, TransferError> {
    let source = fs::read_to_string(path).map_err(|e| TransferError::read(path, e))?;
    list_groups(&source, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg">
 <defs>
  <marker id="arrowhead1"><path d="M 0 0 L 4 2 L 0 4 z"/></marker>
 </defs>
 <g id="figure_1"><path d="M 0 0"/></g>
 <g id="g10"><path d="M 1 1 L 9 9" marker-end="url(#arrowhead1)"/></g>
</svg>
"##;

    const TARGET: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\">\n <g id=\"figure_1\"><path d=\"M 2 2\"/></g>\n</svg>\n";

    #[test]
    fn test_transfer_copies_group_and_marker() {
        let report = transfer(SOURCE, TARGET, &TransferConfig::default()).expect("Should transfer");
        assert_eq!(report.copied, vec!["arrowhead1", "g10"]);
        assert!(report.changed);
        assert!(report.warnings.is_empty());
        assert_eq!(
            report.merged,
            "<svg xmlns=\"http://www.w3.org/2000/svg\">\n <g id=\"figure_1\"><path d=\"M 2 2\"/></g>\n  <marker id=\"arrowhead1\"><path d=\"M 0 0 L 4 2 L 0 4 z\"/></marker>\n <g id=\"g10\"><path d=\"M 1 1 L 9 9\" marker-end=\"url(#arrowhead1)\"/></g>\n</svg>\n"
        );
    }

    #[test]
    fn test_transfer_is_idempotent() {
        let config = TransferConfig::default();
        let once = transfer(SOURCE, TARGET, &config).expect("Should transfer");
        let twice = transfer(SOURCE, &once.merged, &config).expect("Should transfer");
        assert_eq!(twice.merged, once.merged);
        assert!(!twice.changed);
        assert_eq!(twice.copied, once.copied);
    }

    #[test]
    fn test_transfer_rejects_malformed_target() {
        let err = transfer(SOURCE, "<svg><g></svg>", &TransferConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            TransferError::Parse {
                role: DocumentRole::Target,
                ..
            }
        ));
    }

    #[test]
    fn test_transfer_nothing_selected() {
        let config = TransferConfig::default().with_exclude(["g10"]);
        let err = transfer(SOURCE, TARGET, &config).unwrap_err();
        assert!(matches!(
            err,
            TransferError::Selection(SelectionError::NothingSelected)
        ));
    }

    #[test]
    fn test_dry_run_is_reported() {
        let config = TransferConfig::default().with_dry_run(true);
        let report = transfer(SOURCE, TARGET, &config).expect("Should transfer");
        assert!(report.dry_run);
        assert!(report.changed);
    }

    #[test]
    fn test_list_groups() {
        let groups = list_groups(SOURCE, &TransferConfig::default()).expect("Should list");
        assert_eq!(
            groups,
            vec![GroupEntry {
                id: Some("g10".to_string()),
                tag: "g".to_string()
            }]
        );
    }
}
