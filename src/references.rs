//! Reference discovery and definition closure
//!
//! References are found by scanning raw markup, so anything that survives
//! verbatim copying (attributes, inline `style`, embedded `<style>` blocks)
//! is considered.

use std::collections::{HashSet, VecDeque};
use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;

use crate::config::TransferConfig;
use crate::document::{ElementSpan, SvgDocument};
use crate::error::TransferWarning;

/// Attributes whose value may be a bare `#id` link
const LINK_ATTRIBUTES: &[&str] = &[
    "href",
    "xlink:href",
    "marker-start",
    "marker-mid",
    "marker-end",
    "clip-path",
    "mask",
    "filter",
];

fn re_url() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| {
        Regex::new(r#"url\(\s*['"]?#([^'")\s]+)['"]?\s*\)"#).expect("url() pattern is valid")
    })
}

fn re_link() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| {
        Regex::new(r#"([\w:.-]+)\s*=\s*["']\s*#([^"'\s]+)\s*["']"#)
            .expect("link attribute pattern is valid")
    })
}

fn is_link_attribute(name: &str) -> bool {
    LINK_ATTRIBUTES.contains(&name) || name.ends_with("path-effect")
}

/// Every id referenced from `markup`, deduplicated, in order of first use.
///
/// Recognizes `url(#id)` anywhere and `#id` values of link attributes such as
/// `href`, `xlink:href` and `marker-end`. Hex colors like `fill="#ff0000"`
/// are not references.
pub fn referenced_ids(markup: &str) -> Vec<String> {
    let mut found: Vec<(usize, &str)> = re_url()
        .captures_iter(markup)
        .filter_map(|caps| caps.get(1))
        .map(|m| (m.start(), m.as_str()))
        .collect();
    found.extend(
        re_link()
            .captures_iter(markup)
            .filter(|caps| is_link_attribute(&caps[1]))
            .filter_map(|caps| caps.get(2))
            .map(|m| (m.start(), m.as_str())),
    );
    found.sort_by_key(|(pos, _)| *pos);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|(_, id)| seen.insert(*id))
        .map(|(_, id)| id.to_string())
        .collect()
}

/// Definitions required by a set of selected groups
#[derive(Debug, Default)]
pub struct Closure {
    /// Definitions to copy, deduplicated, in source document order
    pub definitions: Vec<ElementSpan>,
    /// References that resolve to nothing in the source
    pub dangling: Vec<TransferWarning>,
    /// References into the base figure, which is never copied
    pub base_references: Vec<TransferWarning>,
}

/// Compute the transitive closure of definitions referenced from `roots`.
///
/// Elements that are, or sit inside, a root are never emitted; they travel
/// with the root's own markup. A definition nested inside another emitted
/// definition is dropped in favour of its container. Elements of the base
/// figure are never emitted either: the target carries its own regenerated
/// version, so such references are left alone and reported.
pub fn resolve_definitions(
    doc: &SvgDocument<'_>,
    roots: &[ElementSpan],
    config: &TransferConfig,
) -> Closure {
    let root_element = doc.root();
    let base: Vec<ElementSpan> = doc
        .top_level()
        .into_iter()
        .filter(|e| e.id.as_deref().is_some_and(|id| config.is_base_group(id)))
        .collect();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, &str)> = roots
        .iter()
        .map(|root| (root.label(), doc.slice(root)))
        .collect();
    let mut closure = Closure::default();

    while let Some((referrer, markup)) = queue.pop_front() {
        for id in referenced_ids(markup) {
            if !visited.insert(id.clone()) {
                continue;
            }
            let Some(target) = doc.element_by_id(&id) else {
                warn!(referrer = referrer.as_str(), id = id.as_str(); "dangling reference");
                closure
                    .dangling
                    .push(TransferWarning::DanglingReference {
                        referrer: referrer.clone(),
                        id,
                    });
                continue;
            };
            if target.range == root_element.range
                || roots
                    .iter()
                    .any(|root| root.contains(&target) || target.contains(root))
            {
                debug!(id = id.as_str(); "reference satisfied by a selected group");
                continue;
            }
            if base.iter().any(|group| group.contains(&target)) {
                warn!(referrer = referrer.as_str(), id = id.as_str(); "reference into the base figure");
                closure
                    .base_references
                    .push(TransferWarning::BaseFigureReference {
                        referrer: referrer.clone(),
                        id,
                    });
                continue;
            }
            debug!(id = id.as_str(), tag = target.tag.as_str(); "definition required");
            queue.push_back((id, doc.slice(&target)));
            closure.definitions.push(target);
        }
    }

    closure.definitions.sort_by_key(|def| def.range.start);
    let mut kept: Vec<ElementSpan> = Vec::with_capacity(closure.definitions.len());
    for def in closure.definitions {
        if kept.iter().any(|outer| outer.contains(&def)) {
            continue;
        }
        kept.push(def);
    }
    closure.definitions = kept;
    closure
}
