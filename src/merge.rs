//! Splicing copied markup into a target document
//!
//! The target text is never re-serialized. Elements whose id already exists
//! in the target have their byte range replaced; everything else is inserted
//! as one contiguous block at the target's insertion point. Namespace
//! prefixes the copied markup needs but the target lacks are declared on the
//! target's root start tag.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use crate::document::SvgDocument;
use crate::error::{MergeError, Span, TransferWarning};

/// A piece of source markup to carry into the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment<'a> {
    /// Element id; id-less fragments can only be inserted
    pub id: Option<&'a str>,
    /// Verbatim element text from the source
    pub markup: &'a str,
    /// Whitespace that preceded the element on its source line
    pub indent: &'a str,
    /// Byte offset of the element in the source
    pub offset: usize,
    /// Travels inside another fragment's markup. Such a fragment is never
    /// inserted; it only refreshes copies of itself standing elsewhere in
    /// the target.
    pub nested: bool,
}

/// Result of a merge
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The new target text
    pub text: String,
    /// Ids replaced in place or inserted, in fragment order, then refreshed
    /// nested elements
    pub copied: Vec<String>,
    /// Ids whose existing target span was replaced
    pub replaced: Vec<String>,
    /// Ids that were newly inserted
    pub inserted: Vec<String>,
    /// Namespace prefixes declared on the target root
    pub declared: Vec<String>,
    /// Duplicate fragment ids and inserted id-less groups
    pub warnings: Vec<TransferWarning>,
}

struct Edit {
    range: Span,
    replacement: String,
}

/// Splice `fragments` into `target`.
///
/// Fragments are processed in order; callers pass definitions before groups
/// so that inserted definitions precede the groups using them, and nested
/// fragments last. `namespaces` lists the `(prefix, uri)` bindings the
/// fragments rely on.
pub fn merge(
    target: &SvgDocument<'_>,
    fragments: &[Fragment<'_>],
    namespaces: &[(String, String)],
) -> Result<MergeOutcome, MergeError> {
    let text = target.text();
    let root = target.root();

    let mut existing: HashMap<String, Vec<Span>> = HashMap::new();
    for element in target.identified() {
        if element.range == root.range {
            continue;
        }
        if let Some(id) = element.id {
            existing.entry(id).or_default().push(element.range);
        }
    }

    let mut outcome = MergeOutcome::default();
    let mut handled: HashSet<&str> = HashSet::new();
    let mut replacements: Vec<(usize, Edit)> = Vec::new();
    let mut insertions: Vec<(usize, &Fragment<'_>)> = Vec::new();

    for (index, fragment) in fragments.iter().enumerate() {
        match fragment.id {
            Some(id) if fragment.nested => {
                if !handled.insert(id) {
                    continue;
                }
                for range in existing.get(id).into_iter().flatten() {
                    replacements.push((
                        index,
                        Edit {
                            range: range.clone(),
                            replacement: fragment.markup.to_string(),
                        },
                    ));
                }
            }
            Some(id) => {
                if !handled.insert(id) {
                    warn!(id; "fragment id appears twice; keeping the first");
                    outcome
                        .warnings
                        .push(TransferWarning::DuplicateId { id: id.to_string() });
                    continue;
                }
                if let Some(range) = existing.get(id).and_then(|ranges| ranges.first()) {
                    debug!(id, start = range.start, end = range.end; "replacing existing element");
                    replacements.push((
                        index,
                        Edit {
                            range: range.clone(),
                            replacement: fragment.markup.to_string(),
                        },
                    ));
                    outcome.replaced.push(id.to_string());
                } else {
                    debug!(id; "inserting new element");
                    insertions.push((index, fragment));
                    outcome.inserted.push(id.to_string());
                }
                outcome.copied.push(id.to_string());
            }
            None => {
                if text.contains(fragment.markup) {
                    debug!(offset = fragment.offset; "unidentified group already present");
                    continue;
                }
                insertions.push((index, fragment));
                outcome
                    .warnings
                    .push(TransferWarning::UnidentifiedGroup {
                        offset: fragment.offset,
                    });
            }
        }
    }

    // A replacement nested in another one is covered by the outer markup,
    // unless that markup no longer carries the element; then it is inserted.
    replacements.sort_by_key(|(_, edit)| edit.range.start);
    let mut edits: Vec<Edit> = Vec::with_capacity(replacements.len() + 2);
    for (index, edit) in replacements {
        let fragment = &fragments[index];
        let id = fragment.id.unwrap_or_default();
        if let Some(outer) = edits.last() {
            if edit.range.end <= outer.range.end {
                if fragment.nested || carries_id(&outer.replacement, id) {
                    debug!(id; "replacement nested in another replacement");
                } else {
                    debug!(id; "element left its container; inserting it instead");
                    outcome.replaced.retain(|r| r != id);
                    outcome.inserted.push(id.to_string());
                    insertions.push((index, fragment));
                }
                continue;
            }
        }
        if fragment.nested && !outcome.replaced.iter().any(|r| r == id) {
            debug!(id, start = edit.range.start; "refreshing standalone copy of a nested element");
            outcome.replaced.push(id.to_string());
            outcome.copied.push(id.to_string());
        }
        edits.push(edit);
    }
    insertions.sort_by_key(|(index, _)| *index);

    let mut declarations = String::new();
    for (prefix, uri) in namespaces {
        if target.declares_prefix(prefix) || outcome.declared.contains(prefix) {
            continue;
        }
        debug!(prefix = prefix.as_str(), uri = uri.as_str(); "declaring namespace on target root");
        declarations.push_str(&format!(" xmlns:{prefix}=\"{}\"", uri.replace('"', "&quot;")));
        outcome.declared.push(prefix.clone());
    }
    if !declarations.is_empty() {
        let at = target.root_start_tag_end();
        edits.push(Edit {
            range: at..at,
            replacement: declarations,
        });
    }

    if !insertions.is_empty() {
        let point = target.insertion_point().ok_or_else(|| MergeError::NoInsertionPoint {
            tag: root.tag.clone(),
        })?;
        let newline = line_ending(text, point.offset);
        let mut block = String::new();
        if !point.at_line_start {
            block.push_str(newline);
        }
        for (_, fragment) in &insertions {
            block.push_str(fragment.indent);
            block.push_str(fragment.markup);
            block.push_str(newline);
        }
        edits.push(Edit {
            range: point.offset..point.offset,
            replacement: block,
        });
    }
    edits.sort_by_key(|edit| (edit.range.start, edit.range.end));

    outcome.text = apply_edits(text, &edits);
    Ok(outcome)
}

/// True if `markup` has an element whose `id` attribute is exactly `id`
fn carries_id(markup: &str, id: &str) -> bool {
    ['"', '\''].iter().any(|quote| {
        let needle = format!("id={quote}{id}{quote}");
        markup
            .match_indices(&needle)
            .any(|(at, _)| markup[..at].ends_with(char::is_whitespace))
    })
}

/// Line terminator of the line holding `offset`, or of the line before it
/// when the anchor line is unterminated
fn line_ending(text: &str, offset: usize) -> &'static str {
    let newline = text[offset..]
        .find('\n')
        .map(|i| offset + i)
        .or_else(|| text[..offset].rfind('\n'));
    match newline {
        Some(i) if text[..i].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

/// Apply non-overlapping edits sorted by position
fn apply_edits(text: &str, edits: &[Edit]) -> String {
    let growth: usize = edits.iter().map(|e| e.replacement.len()).sum();
    let mut out = String::with_capacity(text.len() + growth);
    let mut cursor = 0;
    for edit in edits {
        out.push_str(&text[cursor..edit.range.start]);
        out.push_str(&edit.replacement);
        cursor = edit.range.end;
    }
    out.push_str(&text[cursor..]);
    out
}
