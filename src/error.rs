//! Error and warning types for annotation transfer

use std::fmt;
use std::path::PathBuf;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Malformed markup in a source or target document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed markup at {line}:{column}: {message}")]
    Syntax {
        span: Span,
        line: u32,
        column: u32,
        message: String,
    },
}

impl ParseError {
    pub(crate) fn from_xml(text: &str, err: &roxmltree::Error) -> Self {
        let pos = err.pos();
        let start = byte_offset(text, pos.row, pos.col);
        let end = text[start..]
            .chars()
            .next()
            .map_or(start, |c| start + c.len_utf8());
        ParseError::Syntax {
            span: start..end,
            line: pos.row,
            column: pos.col,
            message: err.to_string(),
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            ParseError::Syntax { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        match self {
            ParseError::Syntax { span, message, .. } => {
                let written = Report::build(ReportKind::Error, filename, span.start)
                    .with_message("malformed SVG markup")
                    .with_label(
                        Label::new((filename, span.clone()))
                            .with_message(message)
                            .with_color(Color::Red),
                    )
                    .finish()
                    .write((filename, Source::from(source)), &mut buf);
                if written.is_err() {
                    return self.to_string();
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Convert a 1-based row/column (columns counted in chars) into a byte offset
fn byte_offset(text: &str, row: u32, col: u32) -> usize {
    let mut offset = 0;
    for (index, line) in text.split_inclusive('\n').enumerate() {
        if index + 1 == row as usize {
            let column = (col as usize).saturating_sub(1);
            return offset
                + line
                    .char_indices()
                    .nth(column)
                    .map_or(line.len(), |(i, _)| i);
        }
        offset += line.len();
    }
    text.len()
}

/// Failures while choosing which groups to copy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// An include-listed id is not an eligible group in the source
    #[error("group '{id}' not found in source (available: {})", available.join(", "))]
    UnknownGroup { id: String, available: Vec<String> },

    /// Filtering left nothing to copy
    #[error("no annotation groups available after filtering")]
    NothingSelected,
}

/// Failures while splicing into the target
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("target root element <{tag}> has no closing tag to insert before")]
    NoInsertionPoint { tag: String },
}

/// Which side of a transfer a document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentRole {
    Source,
    Target,
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentRole::Source => write!(f, "source"),
            DocumentRole::Target => write!(f, "target"),
        }
    }
}

/// Errors that abort a transfer
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("could not parse {role} SVG: {source}")]
    Parse {
        role: DocumentRole,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("{action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransferError {
    pub(crate) fn parse(role: DocumentRole, source: ParseError) -> Self {
        Self::Parse { role, source }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action: "failed to read",
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action: "failed to write",
            path: path.into(),
            source,
        }
    }
}

/// Non-fatal conditions collected during a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferWarning {
    /// A reference that resolves to no element in the source
    DanglingReference { referrer: String, id: String },

    /// A reference into the base figure, left as-is and not copied
    BaseFigureReference { referrer: String, id: String },

    /// Two eligible source groups share an id; the first one is kept
    DuplicateId { id: String },

    /// A group without an id was inserted and can never be replaced later
    UnidentifiedGroup { offset: usize },
}

impl fmt::Display for TransferWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferWarning::DanglingReference { referrer, id } => {
                write!(f, "'{referrer}' references '#{id}', which is not defined in the source")
            }
            TransferWarning::BaseFigureReference { referrer, id } => write!(
                f,
                "'{referrer}' references '#{id}' in the base figure; the target's own version is kept"
            ),
            TransferWarning::DuplicateId { id } => {
                write!(f, "duplicate group id '{id}' in source; keeping the first")
            }
            TransferWarning::UnidentifiedGroup { offset } => write!(
                f,
                "group at byte {offset} has no id; it was inserted and cannot be replaced on later runs"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_offset_multiline() {
        let text = "ab\ncdé\nf";
        assert_eq!(byte_offset(text, 1, 1), 0);
        assert_eq!(byte_offset(text, 2, 3), 5);
        assert_eq!(byte_offset(text, 3, 1), 8);
        assert_eq!(byte_offset(text, 9, 1), text.len());
    }

    #[test]
    fn test_parse_error_from_xml() {
        let text = "<svg>\n  <g>\n</svg>";
        let Err(err) = roxmltree::Document::parse(text) else {
            panic!("unbalanced markup should not parse");
        };
        let parse = ParseError::from_xml(text, &err);
        let ParseError::Syntax { line, span, .. } = &parse;
        assert!(*line >= 2);
        assert!(span.start <= text.len());
        let formatted = parse.format(text, "broken.svg");
        assert!(formatted.contains("broken.svg"));
    }

    #[test]
    fn test_unknown_group_display() {
        let err = SelectionError::UnknownGroup {
            id: "g99".to_string(),
            available: vec!["g10".to_string(), "g11".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "group 'g99' not found in source (available: g10, g11)"
        );
    }

    #[test]
    fn test_warning_display() {
        let warning = TransferWarning::DanglingReference {
            referrer: "g10".to_string(),
            id: "missing".to_string(),
        };
        assert!(warning.to_string().contains("#missing"));
    }
}
