use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::parse_document;
use html5ever::tendril::{StrTendril, TendrilSink};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

use crate::core::RehostError;

/// Converts HTML bytes into a DOM, decoding them with the given charset label
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> Result<RcDom, RehostError> {
    let s: String = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.into_owned()
        }
        None => String::from_utf8_lossy(data).into_owned(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
        .map_err(RehostError::Parse)
}

/// Finds DOM nodes along a path of tag names (e.g. `html > head > meta`)
pub fn find_nodes(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    let mut found_nodes = Vec::new();

    let Some((node_name, rest)) = node_names.split_first() else {
        return found_nodes;
    };

    let is_named = get_node_name(node) == Some(*node_name);

    if is_named && rest.is_empty() {
        found_nodes.push(node.clone());
    }

    if is_named && !rest.is_empty() {
        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, rest));
        }
    } else {
        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names));
        }
    }

    found_nodes
}

/// Returns the value of the first attribute named `attr_name`
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// Returns the local tag name of an element node
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// Returns the parent of a node, if it is still attached to one
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// Sets the value of the attribute at `index`
pub fn set_node_attr_at(node: &Handle, index: usize, attr_value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        if let Some(attr) = attrs.borrow_mut().get_mut(index) {
            attr.value = StrTendril::from_slice(attr_value);
        }
    }
}

/// Removes a node from its parent's child list and clears its parent link
pub fn detach_node(node: &Handle) {
    if let Some(parent) = node.parent.take().and_then(|weak| weak.upgrade()) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
}

/// Puts `replacement` where `node` currently sits in its parent's child list
///
/// `node` keeps its parent link unless the swap actually happens.
pub fn replace_node(node: &Handle, replacement: Handle) {
    let Some(parent) = get_parent_node(node) else {
        return;
    };
    detach_node(&replacement);

    let mut children = parent.children.borrow_mut();
    if let Some(position) = children.iter().position(|child| Rc::ptr_eq(child, node)) {
        replacement.parent.set(Some(Rc::downgrade(&parent)));
        children[position] = replacement;
        node.parent.set(None);
    }
}

/// Creates a detached text node
pub fn create_text_node(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: std::cell::RefCell::new(StrTendril::from_slice(text)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_with_the_given_charset() {
        let dom = html_to_dom(b"<p>caf\xe9</p>", "windows-1252").unwrap();
        let p = find_nodes(&dom.document, &["html", "body", "p"]);
        assert_eq!(p.len(), 1);

        let text = p[0].children.borrow()[0].clone();
        match &text.data {
            NodeData::Text { contents } => assert_eq!(&**contents.borrow(), "café"),
            _ => panic!("expected a text node"),
        }
    }

    #[test]
    fn first_attribute_wins() {
        let dom = html_to_dom(b"<img src=a.png alt=x>", "utf-8").unwrap();
        let img = &find_nodes(&dom.document, &["img"])[0];

        assert_eq!(get_node_attr(img, "src"), Some("a.png".to_string()));
        assert_eq!(get_node_attr(img, "title"), None);
    }

    #[test]
    fn detaching_keeps_siblings_consistent() {
        let dom = html_to_dom(b"<div><i></i><b></b><em></em></div>", "utf-8").unwrap();
        let div = &find_nodes(&dom.document, &["div"])[0];
        let b = &find_nodes(div, &["b"])[0];

        detach_node(b);

        let names: Vec<_> = div
            .children
            .borrow()
            .iter()
            .filter_map(|c| get_node_name(c).map(str::to_string))
            .collect();
        assert_eq!(names, vec!["i", "em"]);
        assert!(get_parent_node(b).is_none());

        // Detaching twice is harmless
        detach_node(b);
        assert_eq!(div.children.borrow().len(), 2);
    }

    #[test]
    fn get_parent_node_leaves_the_link_in_place() {
        let dom = html_to_dom(b"<div><i></i></div>", "utf-8").unwrap();
        let i = &find_nodes(&dom.document, &["i"])[0];

        assert_eq!(get_node_name(&get_parent_node(i).unwrap()), Some("div"));
        assert_eq!(get_node_name(&get_parent_node(i).unwrap()), Some("div"));
    }

    #[test]
    fn replaces_node_in_place() {
        let dom = html_to_dom(b"<p>a<img src=x.png>b</p>", "utf-8").unwrap();
        let p = &find_nodes(&dom.document, &["p"])[0];
        let img = &find_nodes(p, &["img"])[0];

        replace_node(img, create_text_node("ab.png"));

        let texts: Vec<String> = p
            .children
            .borrow()
            .iter()
            .map(|c| match &c.data {
                NodeData::Text { contents } => contents.borrow().to_string(),
                _ => String::from("<element>"),
            })
            .collect();
        assert_eq!(texts, vec!["a", "ab.png", "b"]);
        assert!(get_parent_node(&p.children.borrow()[1]).is_some());
        assert!(get_parent_node(img).is_none());
    }

    #[test]
    fn replace_keeps_parent_link_when_node_is_not_listed() {
        let dom = html_to_dom(b"<div><i></i></div>", "utf-8").unwrap();
        let div = &find_nodes(&dom.document, &["div"])[0];
        let i = find_nodes(div, &["i"])[0].clone();
        div.children.borrow_mut().clear();

        let text = create_text_node("ab.png");
        replace_node(&i, text.clone());

        assert_eq!(get_node_name(&get_parent_node(&i).unwrap()), Some("div"));
        assert!(get_parent_node(&text).is_none());
        assert!(div.children.borrow().is_empty());
    }
}
