use kava_core::Span;
use serde::{Deserialize, Serialize};

/// One grammar-rule match: the rule name, the matched byte range, and the
/// sub-matches in source order. Token-level matches have no children; their
/// text is recovered from the source through [`ParseMatch::text`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseMatch {
    pub kind: String,
    pub span: Span,
    pub children: Vec<ParseMatch>,
}

impl ParseMatch {
    pub fn leaf(kind: impl Into<String>, span: Span) -> Self {
        Self::node(kind, span, Vec::new())
    }

    pub fn node(kind: impl Into<String>, span: Span, children: Vec<ParseMatch>) -> Self {
        Self {
            kind: kind.into(),
            span,
            children,
        }
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Source text covered by this match.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.span.start..self.span.end).unwrap_or("")
    }

    /// Offset of the first matched byte.
    pub fn offset(&self) -> usize {
        self.span.start
    }

    /// First direct child of the given kind.
    pub fn child(&self, kind: &str) -> Option<&ParseMatch> {
        self.children.iter().find(|c| c.is(kind))
    }

    /// All direct children of the given kind.
    pub fn children_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a ParseMatch> + 'a {
        self.children.iter().filter(move |c| c.is(kind))
    }

    /// Indented outline of the tree, for debugging and snapshots.
    pub fn outline(&self, source: &str) -> String {
        let mut out = String::new();
        self.write_outline(source, 0, &mut out);
        out
    }

    fn write_outline(&self, source: &str, depth: usize, out: &mut String) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.kind);
        if self.children.is_empty() {
            out.push_str(" `");
            out.push_str(self.text(source));
            out.push('`');
        }
        out.push('\n');
        for child in &self.children {
            child.write_outline(source, depth + 1, out);
        }
    }
}
