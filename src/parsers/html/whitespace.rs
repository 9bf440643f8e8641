//! Whitespace and comment clean-up
//!
//! Every comment node gets detached from its parent. Every text node gets its
//! leading and trailing whitespace collapsed to at most one space on each
//! side, so a text node still separates neighbouring inline elements the way
//! it did before, minus the noise.

use std::ops::ControlFlow;

use html5ever::tendril::StrTendril;
use markup5ever_rcdom::{Handle, NodeData};

use super::dom::detach_node;
use super::walker::NodeVisitor;

/// Collapses surrounding whitespace of a text payload
///
/// Leading/trailing whitespace is judged on the original first and last
/// characters; whatever is left after trimming keeps one space on each side
/// that had any. A payload made only of whitespace becomes a single space.
pub fn normalize_whitespace(text: &str) -> String {
    let leading = text.chars().next().is_some_and(char::is_whitespace);
    let trailing = text.chars().next_back().is_some_and(char::is_whitespace);
    let trimmed = text.trim();

    match (trimmed.is_empty(), leading, trailing) {
        (true, _, _) => String::from(" "),
        (false, true, true) => format!(" {trimmed} "),
        (false, true, false) => format!(" {trimmed}"),
        (false, false, true) => format!("{trimmed} "),
        (false, false, false) => trimmed.to_string(),
    }
}

/// Visitor stripping comments and collapsing text whitespace; never stops a walk
#[derive(Debug, Default)]
pub struct TextNormalizer {
    pub comments_removed: usize,
    pub text_nodes: usize,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NodeVisitor for TextNormalizer {
    fn visit(&mut self, node: &Handle) -> ControlFlow<()> {
        match &node.data {
            NodeData::Comment { .. } => {
                detach_node(node);
                self.comments_removed += 1;
            }
            NodeData::Text { contents } => {
                let normalized = normalize_whitespace(&contents.borrow());
                *contents.borrow_mut() = StrTendril::from(normalized);
                self.text_nodes += 1;
            }
            _ => {}
        }

        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{find_nodes, html_to_dom};
    use crate::parsers::html::serializer::serialize_node;
    use crate::parsers::html::walker::walk;

    #[test]
    fn boundary_cases() {
        assert_eq!(normalize_whitespace("   "), " ");
        assert_eq!(normalize_whitespace(""), " ");
        assert_eq!(normalize_whitespace("  Foo  "), " Foo ");
        assert_eq!(normalize_whitespace("Foo  "), "Foo ");
        assert_eq!(normalize_whitespace("\n\tFoo"), " Foo");
        assert_eq!(normalize_whitespace("Foo"), "Foo");
    }

    #[test]
    fn inner_runs_are_kept() {
        assert_eq!(normalize_whitespace(" a   b "), " a   b ");
    }

    #[test]
    fn unicode_whitespace_counts() {
        assert_eq!(normalize_whitespace("\u{a0}Foo\u{2003}"), " Foo ");
        assert_eq!(normalize_whitespace("\u{3000}"), " ");
    }

    #[test]
    fn idempotent() {
        for input in ["   ", "  Foo  ", "Foo  ", "  Foo", "Foo", "\n a \n b \n", ""] {
            let once = normalize_whitespace(input);
            assert_eq!(normalize_whitespace(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn strips_comments_and_collapses_text() {
        let dom = html_to_dom(
            b"<div><!-- a --><p>\n   Hello   <b>  world </b>\n</p><!-- b --></div>",
            "utf-8",
        )
        .unwrap();
        let div = find_nodes(&dom.document, &["div"])[0].clone();

        let mut normalizer = TextNormalizer::new();
        let _ = walk(&div, &mut normalizer);

        assert_eq!(normalizer.comments_removed, 2);
        assert_eq!(normalizer.text_nodes, 3);
        assert_eq!(
            serialize_node(&div),
            "<div><p> Hello <b> world </b> </p></div>"
        );
    }

    #[test]
    fn adjacent_comments_are_all_removed() {
        let dom = html_to_dom(b"<ul><!--1--><!--2--><!--3--><li>x</li></ul>", "utf-8").unwrap();
        let ul = find_nodes(&dom.document, &["ul"])[0].clone();

        let _ = walk(&ul, &mut TextNormalizer::new());

        assert_eq!(serialize_node(&ul), "<ul><li>x</li></ul>");
    }
}
