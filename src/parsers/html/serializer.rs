use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use markup5ever_rcdom::{Handle, NodeData, SerializableHandle};

fn serialize_with_scope(node: &Handle, traversal_scope: TraversalScope) -> String {
    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableHandle = node.clone().into();
    let opts = SerializeOpts {
        traversal_scope,
        ..Default::default()
    };

    serialize(&mut buf, &serializable, opts).expect("Unable to serialize DOM into buffer");

    String::from_utf8_lossy(&buf).into_owned()
}

/// Serializes a node together with its subtree (outer markup)
///
/// A document node has no markup of its own, so only its children are rendered.
pub fn serialize_node(node: &Handle) -> String {
    match node.data {
        NodeData::Document => serialize_with_scope(node, TraversalScope::ChildrenOnly(None)),
        _ => serialize_with_scope(node, TraversalScope::IncludeNode),
    }
}

/// Serializes only the children of a node (inner markup)
pub fn serialize_children(node: &Handle) -> String {
    serialize_with_scope(node, TraversalScope::ChildrenOnly(None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{find_nodes, html_to_dom};

    #[test]
    fn outer_and_inner_markup() {
        let dom = html_to_dom(b"<div class=t><p>a &amp; b</p><img src=x.png></div>", "utf-8")
            .unwrap();
        let div = &find_nodes(&dom.document, &["div"])[0];

        assert_eq!(
            serialize_node(div),
            r#"<div class="t"><p>a &amp; b</p><img src="x.png"></div>"#
        );
        assert_eq!(serialize_children(div), r#"<p>a &amp; b</p><img src="x.png">"#);
    }

    #[test]
    fn whole_document() {
        let dom = html_to_dom(b"<!DOCTYPE html><title>t</title>", "utf-8").unwrap();

        assert_eq!(
            serialize_node(&dom.document),
            "<!DOCTYPE html><html><head><title>t</title></head><body></body></html>"
        );
    }
}
