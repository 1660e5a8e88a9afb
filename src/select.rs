//! Choosing which top-level groups are annotations

use std::collections::HashSet;

use log::{debug, warn};

use crate::config::TransferConfig;
use crate::document::{ElementSpan, SvgDocument};
use crate::error::{SelectionError, TransferWarning};

/// Local tag name of a group container
pub const GROUP_TAG: &str = "g";

/// Groups picked for copying, in source document order
#[derive(Debug, Default)]
pub struct Selection {
    pub groups: Vec<ElementSpan>,
    pub warnings: Vec<TransferWarning>,
}

impl Selection {
    /// Ids of the selected groups; id-less groups are skipped
    pub fn ids(&self) -> Vec<&str> {
        self.groups.iter().filter_map(|g| g.id.as_deref()).collect()
    }
}

/// Top-level groups that are not part of the base figure.
///
/// The first group carrying a given id wins; later ones produce a
/// [`TransferWarning::DuplicateId`].
pub fn eligible_groups(doc: &SvgDocument<'_>, config: &TransferConfig) -> Selection {
    let mut seen = HashSet::new();
    let mut selection = Selection::default();

    for element in doc.top_level() {
        if element.tag != GROUP_TAG {
            continue;
        }
        if let Some(id) = element.id.as_deref() {
            if config.is_base_group(id) {
                debug!(id; "skipping base figure group");
                continue;
            }
            if !seen.insert(id.to_string()) {
                warn!(id; "duplicate group id");
                selection
                    .warnings
                    .push(TransferWarning::DuplicateId { id: id.to_string() });
                continue;
            }
        }
        selection.groups.push(element);
    }
    selection
}

/// Eligible groups narrowed by the include filter, then the exclude filter.
///
/// Every include-listed id must name an eligible group. Order follows the
/// source document, not the filter arguments.
pub fn select_groups(
    doc: &SvgDocument<'_>,
    config: &TransferConfig,
) -> Result<Selection, SelectionError> {
    let mut selection = eligible_groups(doc, config);

    if let Some(include) = &config.include {
        let available: Vec<String> = selection.ids().iter().map(|id| id.to_string()).collect();
        if let Some(missing) = include.iter().find(|id| !available.contains(id)) {
            return Err(SelectionError::UnknownGroup {
                id: missing.clone(),
                available,
            });
        }
        selection
            .groups
            .retain(|g| g.id.as_ref().is_some_and(|id| include.contains(id)));
    }

    if !config.exclude.is_empty() {
        selection
            .groups
            .retain(|g| !g.id.as_ref().is_some_and(|id| config.exclude.contains(id)));
    }

    Ok(selection)
}
