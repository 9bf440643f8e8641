use markup5ever_rcdom::Handle;

use crate::core::parse_content_type;

use super::dom::{find_nodes, get_node_attr};

/// Reads the charset a document declares about itself
///
/// Handles both `<meta charset="...">` and
/// `<meta http-equiv="content-type" content="text/html; charset=...">`.
pub fn get_charset(node: &Handle) -> Option<String> {
    for meta_node in find_nodes(node, &["html", "head", "meta"]).iter() {
        if let Some(meta_charset_node_attr_value) = get_node_attr(meta_node, "charset") {
            return Some(meta_charset_node_attr_value);
        }

        if get_node_attr(meta_node, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type")
        {
            if let Some(meta_content_type_node_attr_value) = get_node_attr(meta_node, "content") {
                let (_media_type, charset, _is_base64) =
                    parse_content_type(&meta_content_type_node_attr_value);
                return Some(charset);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;

    #[test]
    fn meta_charset() {
        let dom = html_to_dom(b"<html><head><meta charset=\"iso-8859-1\"></head></html>", "utf-8")
            .unwrap();
        assert_eq!(get_charset(&dom.document), Some("iso-8859-1".to_string()));
    }

    #[test]
    fn meta_http_equiv() {
        let dom = html_to_dom(
            b"<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=GB2312\"></head></html>",
            "utf-8",
        )
        .unwrap();
        assert_eq!(get_charset(&dom.document), Some("GB2312".to_string()));
    }

    #[test]
    fn no_charset() {
        let dom = html_to_dom(b"<html><head><title>x</title></head></html>", "utf-8").unwrap();
        assert_eq!(get_charset(&dom.document), None);
    }
}
