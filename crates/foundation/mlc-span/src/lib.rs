//! Source locations carried by HIR and MIR nodes for diagnostics.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Identifies one source file within a compilation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

/// A byte-offset range within a single file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    #[must_use]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// A zero-length span, used for compiler-synthesized nodes that have no
    /// corresponding source text of their own.
    #[must_use]
    pub const fn synthetic() -> Self {
        Self { start: 0, end: 0 }
    }
}

/// A span paired with the file it belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileSpan {
    pub file: FileId,
    pub span: Span,
}

impl FileSpan {
    #[must_use]
    pub const fn new(file: FileId, span: Span) -> Self {
        Self { file, span }
    }

    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.span.range()
    }

    /// A zero-length span attached to `file`, for compiler-synthesized nodes.
    #[must_use]
    pub const fn synthetic(file: FileId) -> Self {
        Self { file, span: Span::synthetic() }
    }
}

#[cfg(test)]
mod tests {
    use super::{FileId, FileSpan, Span};

    #[test]
    fn span_len_and_range() {
        let span = Span::new(4, 10);
        assert_eq!(span.len(), 6);
        assert_eq!(span.range(), 4..10);
        assert!(!span.is_empty());
    }

    #[test]
    fn synthetic_span_is_empty() {
        let span = FileSpan::synthetic(FileId(0));
        assert!(span.span.is_empty());
    }
}
