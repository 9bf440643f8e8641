//! Script snippet builder
//!
//! Renders every marked element of a region as a statement that injects the
//! element's (rehosted, cleaned) inner markup into the live page:
//!
//! ```text
//! var t1 = document.querySelector('#main-content .story-tile:nth-of-type(1)');
//! t1.innerHTML = "...";
//! ```

use std::fmt::Write as _;
use std::ops::ControlFlow;

use markup5ever_rcdom::Handle;

use crate::parsers::html::dom::get_node_attr;
use crate::parsers::html::serializer::serialize_children;
use crate::parsers::html::walker::{walk, NodeVisitor};

#[derive(Debug, Clone)]
pub struct SnippetConfig {
    /// Selector of the element the marked elements live in
    pub container: String,
    /// Substring of the `class` attribute that marks an element
    pub marker: String,
}

impl Default for SnippetConfig {
    fn default() -> Self {
        Self {
            container: "#main-content".to_string(),
            marker: "story-tile".to_string(),
        }
    }
}

pub struct SnippetBuilder<'a> {
    config: &'a SnippetConfig,
    tile_num: usize,
    output: String,
}

impl<'a> SnippetBuilder<'a> {
    pub fn new(config: &'a SnippetConfig) -> Self {
        Self {
            config,
            tile_num: 0,
            output: String::new(),
        }
    }

    /// Walks `root` and returns the generated statements
    pub fn build(mut self, root: &Handle) -> String {
        let _ = walk(root, &mut self);
        self.output
    }

    fn push_statement(&mut self, markup: &str) {
        let n = self.tile_num;
        let _ = write!(
            self.output,
            "var t{n} = document.querySelector('{} .{}:nth-of-type({n})');\nt{n}.innerHTML = {};\n\n",
            self.config.container,
            self.config.marker,
            js_string_literal(markup),
        );
    }
}

impl NodeVisitor for SnippetBuilder<'_> {
    fn visit(&mut self, node: &Handle) -> ControlFlow<()> {
        let is_marked = get_node_attr(node, "class")
            .is_some_and(|class| class.contains(self.config.marker.as_str()));

        if is_marked {
            self.tile_num += 1;
            let markup = serialize_children(node);
            self.push_statement(&markup);
        }

        ControlFlow::Continue(())
    }
}

/// Quotes `text` as a JavaScript string literal
///
/// JSON string syntax is valid JavaScript, except that U+2028 and U+2029 end
/// a line inside older engines' string literals.
pub fn js_string_literal(text: &str) -> String {
    serde_json::Value::String(text.to_string())
        .to_string()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;
    use crate::parsers::html::walker::find_node_by_id;

    #[test]
    fn quotes_literals() {
        assert_eq!(js_string_literal("a\"b"), r#""a\"b""#);
        assert_eq!(js_string_literal("line\nbreak"), r#""line\nbreak""#);
        assert_eq!(js_string_literal("\u{2028}"), r#""\u2028""#);
        assert_eq!(js_string_literal("</script>"), r#""</script>""#);
    }

    #[test]
    fn numbers_marked_elements_in_document_order() {
        let dom = html_to_dom(
            br#"<div id="main-content">
                <div class="story-tile"><b>one</b></div>
                <div class="other">skip</div>
                <div class="story-tile wide"><i>two</i></div>
            </div>"#,
            "utf-8",
        )
        .unwrap();
        let root = find_node_by_id(&dom.document, "main-content").unwrap();
        let config = SnippetConfig::default();

        let output = SnippetBuilder::new(&config).build(&root);

        assert_eq!(
            output,
            "var t1 = document.querySelector('#main-content .story-tile:nth-of-type(1)');\n\
             t1.innerHTML = \"<b>one</b>\";\n\n\
             var t2 = document.querySelector('#main-content .story-tile:nth-of-type(2)');\n\
             t2.innerHTML = \"<i>two</i>\";\n\n"
        );
    }

    #[test]
    fn nothing_marked_yields_nothing() {
        let dom = html_to_dom(b"<div id=r><p>x</p></div>", "utf-8").unwrap();
        let root = find_node_by_id(&dom.document, "r").unwrap();
        let config = SnippetConfig::default();

        assert_eq!(SnippetBuilder::new(&config).build(&root), "");
    }

    #[test]
    fn custom_container_and_marker() {
        let dom = html_to_dom(b"<ul id=list><li class=card>a</li></ul>", "utf-8").unwrap();
        let root = find_node_by_id(&dom.document, "list").unwrap();
        let config = SnippetConfig {
            container: "#list".to_string(),
            marker: "card".to_string(),
        };

        assert_eq!(
            SnippetBuilder::new(&config).build(&root),
            "var t1 = document.querySelector('#list .card:nth-of-type(1)');\nt1.innerHTML = \"a\";\n\n"
        );
    }
}
