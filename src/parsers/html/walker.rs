//! DOM traversal
//!
//! `walk` visits a subtree in document order (a node before its children,
//! children before the next sibling). A visitor may end the *whole* walk by
//! returning `ControlFlow::Break`; nothing after that node is visited, its own
//! descendants included.
//!
//! Visitors are allowed to mutate the tree while it is being walked. The
//! child list of a node is snapshotted before descending into any of its
//! children, so detaching the node being visited (or one of its siblings)
//! never derails iteration at the parent level.

use std::ops::ControlFlow;

use markup5ever_rcdom::{Handle, NodeData};


/// Something that gets shown every node of a walk
pub trait NodeVisitor {
    /// Returns `ControlFlow::Break(())` to stop the entire traversal
    fn visit(&mut self, node: &Handle) -> ControlFlow<()>;
}

impl<F> NodeVisitor for F
where
    F: FnMut(&Handle) -> ControlFlow<()>,
{
    fn visit(&mut self, node: &Handle) -> ControlFlow<()> {
        self(node)
    }
}

/// The no-op visitor: the walk still recurses but touches nothing
pub struct Noop;

impl NodeVisitor for Noop {
    fn visit(&mut self, _node: &Handle) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Walks `node` and its descendants in document order
pub fn walk<V>(node: &Handle, visitor: &mut V) -> ControlFlow<()>
where
    V: NodeVisitor + ?Sized,
{
    visitor.visit(node)?;

    // Removal of a child by the visitor must not shift the cursor
    let children: Vec<Handle> = node.children.borrow().clone();
    for child in children.iter() {
        walk(child, visitor)?;
    }

    ControlFlow::Continue(())
}

/// Records the first element carrying a given `id`
struct IdLocator<'a> {
    id: &'a str,
    found: Option<Handle>,
}

impl NodeVisitor for IdLocator<'_> {
    fn visit(&mut self, node: &Handle) -> ControlFlow<()> {
        if let NodeData::Element { ref attrs, .. } = node.data {
            let is_match = attrs
                .borrow()
                .iter()
                .any(|attr| &*attr.name.local == "id" && &*attr.value == self.id);

            if is_match {
                self.found = Some(node.clone());
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }
}

/// Finds the first element (in document order) whose `id` attribute equals `id`
pub fn find_node_by_id(root: &Handle, id: &str) -> Option<Handle> {
    let mut locator = IdLocator { id, found: None };
    let _ = walk(root, &mut locator);
    locator.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{detach_node, get_node_attr, get_node_name, html_to_dom};

    fn tag_order(root: &Handle) -> Vec<String> {
        let mut names = Vec::new();
        let _ = walk(root, &mut |node: &Handle| {
            if let Some(name) = get_node_name(node) {
                names.push(name.to_string());
            }
            ControlFlow::Continue(())
        });
        names
    }

    #[test]
    fn visits_in_document_order() {
        let dom = html_to_dom(
            b"<div id=r><p><b></b><i></i></p><ul><li></li></ul></div>",
            "utf-8",
        )
        .unwrap();
        let root = find_node_by_id(&dom.document, "r").unwrap();

        assert_eq!(tag_order(&root), vec!["div", "p", "b", "i", "ul", "li"]);
    }

    #[test]
    fn break_stops_everything_including_descendants() {
        let dom = html_to_dom(b"<div id=r><p><b></b></p><ul></ul></div>", "utf-8").unwrap();
        let root = find_node_by_id(&dom.document, "r").unwrap();

        let mut seen = Vec::new();
        let flow = walk(&root, &mut |node: &Handle| {
            let name = get_node_name(node).unwrap_or("#other").to_string();
            seen.push(name.clone());
            if name == "p" {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        assert!(flow.is_break());
        assert_eq!(seen, vec!["div", "p"]);
    }

    #[test]
    fn noop_visitor_walks_without_effect() {
        let dom = html_to_dom(b"<p>a<!--c--></p>", "utf-8").unwrap();

        assert!(walk(&dom.document, &mut Noop).is_continue());
        assert_eq!(tag_order(&dom.document), vec!["html", "head", "body", "p"]);
    }

    #[test]
    fn tolerates_detaching_the_visited_node() {
        let dom = html_to_dom(
            b"<div id=r><i></i><b></b><i></i><b></b><em></em></div>",
            "utf-8",
        )
        .unwrap();
        let root = find_node_by_id(&dom.document, "r").unwrap();

        let mut seen = Vec::new();
        let _ = walk(&root, &mut |node: &Handle| {
            if let Some(name) = get_node_name(node) {
                seen.push(name.to_string());
                if name == "i" {
                    detach_node(node);
                }
            }
            ControlFlow::Continue(())
        });

        assert_eq!(seen, vec!["div", "i", "b", "i", "b", "em"]);
        assert_eq!(tag_order(&root), vec!["div", "b", "b", "em"]);
    }

    #[test]
    fn locator_returns_first_match_in_document_order() {
        let dom = html_to_dom(
            b"<div><section><p id=x class=first></p></section><p id=x class=second></p></div>",
            "utf-8",
        )
        .unwrap();

        let found = find_node_by_id(&dom.document, "x").unwrap();
        assert_eq!(get_node_attr(&found, "class"), Some("first".to_string()));
    }

    #[test]
    fn locator_returns_none_when_absent() {
        let dom = html_to_dom(b"<div id=y></div>", "utf-8").unwrap();

        assert!(find_node_by_id(&dom.document, "x").is_none());
        assert!(find_node_by_id(&dom.document, "Y").is_none());
    }
}
