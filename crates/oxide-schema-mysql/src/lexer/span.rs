//! Byte ranges into the source text.

/// A half-open byte range `[start, end)` in the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length of the span in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if the span is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end > other.end {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }

    /// Returns the covered slice of `source`, or `""` if the span does
    /// not fit.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }

    /// 1-based line number of the span start.
    #[must_use]
    pub fn line_in(&self, source: &str) -> usize {
        line_at(source, self.start)
    }
}

/// 1-based line number of byte `offset` in `source`.
#[must_use]
pub fn line_at(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    source.as_bytes()[..offset]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_len_and_empty() {
        assert_eq!(Span::new(5, 10).len(), 5);
        assert!(Span::new(5, 5).is_empty());
        assert!(!Span::new(5, 10).is_empty());
    }

    #[test]
    fn test_span_merge() {
        let merged = Span::new(8, 15).merge(Span::new(5, 10));
        assert_eq!(merged, Span::new(5, 15));
    }

    #[test]
    fn test_text_and_line() {
        let source = "CREATE TABLE t (\n  id INT\n);";
        let span = Span::new(19, 21);
        assert_eq!(span.text(source), "id");
        assert_eq!(span.line_in(source), 2);
        assert_eq!(Span::new(100, 200).text(source), "");
        assert_eq!(line_at(source, 0), 1);
        assert_eq!(line_at(source, source.len()), 3);
    }
}
