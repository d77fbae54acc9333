//! Tree primitives: dotted paths, lookup, insertion and structural merge.

use serde_json::Value as Node;

/// A string-keyed mapping. Keys are kept sorted, which makes encoding
/// deterministic.
pub type Tree = serde_json::Map<String, Node>;

/// Split a dotted path into segments.
///
/// Returns `None` for the empty path, empty segments (leading, trailing or
/// doubled dots) and non-ASCII input.
pub fn split_path(path: &str) -> Option<Vec<&str>> {
    if path.is_empty() || !path.is_ascii() {
        return None;
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

/// Descend through mappings only.
pub fn get_path<'a>(tree: &'a Tree, segments: &[&str]) -> Option<&'a Node> {
    let (last, parents) = segments.split_last()?;
    let mut current = tree;
    for segment in parents {
        match current.get(*segment)? {
            Node::Object(child) => current = child,
            _ => return None,
        }
    }
    current.get(*last)
}

/// Insert `node` at `segments`, creating (or replacing non-mapping)
/// intermediates.
pub fn insert_path(tree: &mut Tree, segments: &[&str], node: Node) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = tree;
    for segment in parents {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Node::Object(Tree::new()));
        if !slot.is_object() {
            *slot = Node::Object(Tree::new());
        }
        let Node::Object(child) = slot else {
            return;
        };
        current = child;
    }
    current.insert(last.to_string(), node);
}

/// Fold `incoming` into `target`: mappings merge recursively, anything else
/// present in `incoming` replaces what `target` had.
pub fn merge_into(target: &mut Tree, incoming: Tree) {
    for (key, value) in incoming {
        match (target.get_mut(&key), value) {
            (Some(Node::Object(existing)), Node::Object(child)) => merge_into(existing, child),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn tree(value: Node) -> Tree {
        match value {
            Node::Object(map) => map,
            _ => panic!("not a mapping"),
        }
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("a.b.X"), Some(vec!["a", "b", "X"]));
        assert_eq!(split_path("a"), Some(vec!["a"]));
        assert_eq!(split_path(""), None);
        assert_eq!(split_path("a..b"), None);
        assert_eq!(split_path(".a"), None);
        assert_eq!(split_path("a.b.Y."), None);
        assert_eq!(split_path("aas......asdg=234l.asdfk,"), None);
        assert_eq!(split_path("ключ"), None);
    }

    #[test]
    fn test_get_path() {
        let t = tree(json!({"a": {"b": {"X": 1}}, "list": [{"x": 1}]}));
        assert_eq!(get_path(&t, &["a", "b", "X"]), Some(&json!(1)));
        assert_eq!(get_path(&t, &["a", "b"]), Some(&json!({"X": 1})));
        assert_eq!(get_path(&t, &["a", "b", "X", "deeper"]), None);
        assert_eq!(get_path(&t, &["list", "0"]), None);
        assert_eq!(get_path(&t, &["missing"]), None);
    }

    #[test]
    fn test_insert_path_creates_and_replaces() {
        let mut t = tree(json!({"a": 1}));
        insert_path(&mut t, &["a", "b", "c"], json!("d"));
        insert_path(&mut t, &["x"], json!(true));
        assert_eq!(Node::Object(t), json!({"a": {"b": {"c": "d"}}, "x": true}));
    }

    #[test]
    fn test_merge_is_structural() {
        let mut t = tree(json!({"a": {"b": 1}}));
        merge_into(&mut t, tree(json!({"a": {"c": 2}})));
        assert_eq!(Node::Object(t), json!({"a": {"b": 1, "c": 2}}));
    }

    #[test]
    fn test_merge_overrides_non_mappings() {
        let mut t = tree(json!({"a": [1, 2, 3], "b": {"nested": true}, "c": 1}));
        merge_into(&mut t, tree(json!({"a": [4], "b": 42, "c": {"n": 1}})));
        assert_eq!(Node::Object(t), json!({"a": [4], "b": 42, "c": {"n": 1}}));
    }

    #[test]
    fn test_merge_null_overrides() {
        let mut t = tree(json!({"a": 1}));
        merge_into(&mut t, tree(json!({"a": null})));
        assert_eq!(Node::Object(t), json!({"a": null}));
    }

    fn arb_tree() -> impl Strategy<Value = Tree> {
        let leaf = prop_oneof![
            any::<bool>().prop_map(Node::Bool),
            any::<i64>().prop_map(|n| Node::Number(n.into())),
            "[a-z]{0,8}".prop_map(Node::String),
        ];
        let node = leaf.prop_recursive(3, 16, 4, |inner| {
            prop::collection::btree_map("[a-c]{1,2}", inner, 0..4)
                .prop_map(|m| Node::Object(m.into_iter().collect()))
        });
        prop::collection::btree_map("[a-c]{1,2}", node, 0..5).prop_map(|m| m.into_iter().collect())
    }

    proptest! {
        #[test]
        fn prop_empty_overlay_is_identity(target in arb_tree()) {
            let mut merged = target.clone();
            merge_into(&mut merged, Tree::new());
            prop_assert_eq!(merged, target);
        }

        #[test]
        fn prop_overlay_is_idempotent(target in arb_tree(), overlay in arb_tree()) {
            let mut once = target.clone();
            merge_into(&mut once, overlay.clone());
            let mut twice = once.clone();
            merge_into(&mut twice, overlay);
            prop_assert_eq!(once, twice);
        }
    }
}
