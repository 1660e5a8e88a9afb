//! Span-preserving index over an SVG document
//!
//! The document is parsed with roxmltree only to learn its structure. Every
//! element is described by the byte range it occupies in the original text,
//! so callers can copy or replace markup verbatim instead of re-serializing
//! a tree.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use roxmltree::{Node, NodeId, ParsingOptions};

use crate::error::{ParseError, Span};

/// Local name of the container element holding reusable definitions
pub const DEFS_TAG: &str = "defs";

/// One element's exact textual extent in its owning document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpan {
    /// Local tag name (`g`, `marker`, `defs`, ...)
    pub tag: String,
    /// Value of the `id` attribute, if any
    pub id: Option<String>,
    /// Attributes keyed by local name
    pub attributes: BTreeMap<String, String>,
    /// From the `<` of the start tag through the `>` of the end tag
    pub range: Span,
    node: NodeId,
}

impl ElementSpan {
    fn from_node(node: Node<'_, '_>) -> Self {
        Self {
            tag: node.tag_name().name().to_string(),
            id: node.attribute("id").map(str::to_string),
            attributes: node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect(),
            range: node.range(),
            node: node.id(),
        }
    }

    /// True if this element is the empty-content form `<tag ... />`
    pub fn is_self_closing(&self, text: &str) -> bool {
        text[self.range.clone()].ends_with("/>")
    }

    /// True if `other` lies entirely within this element
    pub fn contains(&self, other: &ElementSpan) -> bool {
        self.range.start <= other.range.start && other.range.end <= self.range.end
    }

    /// Label used in diagnostics
    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("<{}> at byte {}", self.tag, self.range.start),
        }
    }
}

/// Where a block of new markup goes in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionPoint {
    /// Byte offset to insert at
    pub offset: usize,
    /// True if `offset` is the start of a line
    pub at_line_start: bool,
}

/// An SVG document together with its structural index
pub struct SvgDocument<'input> {
    text: &'input str,
    tree: roxmltree::Document<'input>,
}

impl<'input> SvgDocument<'input> {
    /// Parse document text; malformed markup is a fatal error
    pub fn parse(text: &'input str) -> Result<Self, ParseError> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let tree = roxmltree::Document::parse_with_options(text, options)
            .map_err(|err| ParseError::from_xml(text, &err))?;
        Ok(Self { text, tree })
    }

    /// The full, unmodified document text
    pub fn text(&self) -> &'input str {
        self.text
    }

    /// The document's root element (normally `<svg>`)
    pub fn root(&self) -> ElementSpan {
        ElementSpan::from_node(self.tree.root_element())
    }

    /// Element children of the root, in document order
    pub fn top_level(&self) -> Vec<ElementSpan> {
        self.tree
            .root_element()
            .children()
            .filter(Node::is_element)
            .map(ElementSpan::from_node)
            .collect()
    }

    /// Element children of `span`, in document order
    pub fn children(&self, span: &ElementSpan) -> Vec<ElementSpan> {
        self.node(span)
            .map(|node| {
                node.children()
                    .filter(Node::is_element)
                    .map(ElementSpan::from_node)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All element descendants of `span`, excluding `span` itself
    pub fn descendants(&self, span: &ElementSpan) -> Vec<ElementSpan> {
        self.node(span)
            .map(|node| {
                node.descendants()
                    .skip(1)
                    .filter(Node::is_element)
                    .map(ElementSpan::from_node)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every element carrying an id, in document order
    pub fn identified(&self) -> Vec<ElementSpan> {
        self.tree
            .descendants()
            .filter(|n| n.is_element() && n.attribute("id").is_some())
            .map(ElementSpan::from_node)
            .collect()
    }

    /// Find the element defining `id`.
    ///
    /// Elements inside a `<defs>` container win over elements elsewhere;
    /// within each tier the first in document order is returned.
    pub fn element_by_id(&self, id: &str) -> Option<ElementSpan> {
        let mut fallback = None;
        for node in self
            .tree
            .descendants()
            .filter(|n| n.is_element() && n.attribute("id") == Some(id))
        {
            let in_defs = node
                .ancestors()
                .skip(1)
                .any(|a| a.is_element() && a.tag_name().name() == DEFS_TAG);
            if in_defs {
                return Some(ElementSpan::from_node(node));
            }
            if fallback.is_none() {
                fallback = Some(node);
            }
        }
        fallback.map(ElementSpan::from_node)
    }

    /// The verbatim source text of an element
    pub fn slice(&self, span: &ElementSpan) -> &'input str {
        &self.text[span.range.clone()]
    }

    /// Whitespace preceding `span` on its line, or `""` if other text precedes it
    pub fn leading_indent(&self, span: &ElementSpan) -> &'input str {
        let start = span.range.start;
        let line_start = line_start(self.text, start);
        let prefix = &self.text[line_start..start];
        if prefix.chars().all(|c| c == ' ' || c == '\t') {
            prefix
        } else {
            ""
        }
    }

    /// Where newly copied markup is inserted.
    ///
    /// Before the last top-level element if it is a definitions container,
    /// otherwise before the root's closing tag. `None` if the root is
    /// self-closing.
    pub fn insertion_point(&self) -> Option<InsertionPoint> {
        let tag_start = match self.top_level().last() {
            Some(last) if last.tag == DEFS_TAG => last.range.start,
            _ => self.closing_tag_offset()?,
        };
        let line_start = line_start(self.text, tag_start);
        let at_line_start = self.text[line_start..tag_start]
            .chars()
            .all(|c| c == ' ' || c == '\t');
        Some(if at_line_start {
            InsertionPoint {
                offset: line_start,
                at_line_start: true,
            }
        } else {
            InsertionPoint {
                offset: tag_start,
                at_line_start: false,
            }
        })
    }

    /// Byte offset of the root's closing tag
    pub fn closing_tag_offset(&self) -> Option<usize> {
        let root = self.root();
        if root.is_self_closing(self.text) {
            return None;
        }
        self.text[..root.range.end].rfind("</")
    }

    /// Prefixed namespace declarations in scope on the root, as `(prefix, uri)`
    pub fn declared_namespaces(&self) -> Vec<(String, String)> {
        self.tree
            .root_element()
            .namespaces()
            .filter_map(|ns| match ns.name() {
                Some(prefix) if prefix != "xml" => Some((prefix.to_string(), ns.uri().to_string())),
                _ => None,
            })
            .collect()
    }

    /// True if `prefix` is bound to a namespace on the root element
    pub fn declares_prefix(&self, prefix: &str) -> bool {
        self.tree
            .root_element()
            .lookup_namespace_uri(Some(prefix))
            .is_some()
    }

    /// Offset of the `>` (or `/>`) closing the root's start tag
    pub fn root_start_tag_end(&self) -> usize {
        let start = self.root().range.start;
        let bytes = self.text.as_bytes();
        let mut quote = None;
        for (i, &b) in bytes.iter().enumerate().skip(start) {
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'>') => {
                    return if i > start && bytes[i - 1] == b'/' { i - 1 } else { i };
                }
                _ => {}
            }
        }
        self.text.len()
    }

    fn node(&self, span: &ElementSpan) -> Option<Node<'_, 'input>> {
        self.tree.get_node(span.node)
    }
}

fn re_prefix() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| {
        Regex::new(r"(?:</?|\s)([A-Za-z_][\w.-]*):[A-Za-z_]").expect("prefix pattern is valid")
    })
}

/// Namespace prefixes that appear on tag or attribute names in `markup`.
///
/// This is a textual scan; callers filter the result against prefixes that
/// are actually declared.
pub fn prefixes_in(markup: &str) -> Vec<String> {
    let mut prefixes: Vec<String> = Vec::new();
    for caps in re_prefix().captures_iter(markup) {
        let prefix = &caps[1];
        if !prefixes.iter().any(|p| p == prefix) {
            prefixes.push(prefix.to_string());
        }
    }
    prefixes
}

fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map_or(0, |i| i + 1)
}
