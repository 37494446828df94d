//! Dotted-path lookup into a parsed JSON body.

use serde_json::Value;

/// Returns the node at `path` (`user.address.city`) in `document`.
///
/// Segments address object keys; a segment made only of digits also
/// indexes into arrays. A `null` node counts as absent.
pub(crate) fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = document;
    for segment in path.split('.') {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!node.is_null()).then_some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_top_level_key() {
        let doc = json!({"id": 7});
        assert_eq!(lookup(&doc, "id"), Some(&json!(7)));
        assert_eq!(lookup(&doc, "missing"), None);
    }

    #[test]
    fn test_nested_path() {
        let doc = json!({"user": {"address": {"city": "Oslo"}}});
        assert_eq!(lookup(&doc, "user.address.city"), Some(&json!("Oslo")));
        assert_eq!(lookup(&doc, "user.address.zip"), None);
        assert_eq!(lookup(&doc, "user.address.city.name"), None);
    }

    #[test]
    fn test_array_index() {
        let doc = json!({"tags": ["a", "b"]});
        assert_eq!(lookup(&doc, "tags.1"), Some(&json!("b")));
        assert_eq!(lookup(&doc, "tags.x"), None);
        assert_eq!(lookup(&doc, "tags"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_null_is_absent() {
        let doc = json!({"name": null});
        assert_eq!(lookup(&doc, "name"), None);
    }
}
