//! JSON codec.

use crate::encoding::{into_tree, Codec};
use crate::reader::tree::Tree;

pub struct JsonCodec;

impl Codec for JsonCodec {
    fn decode(&self, data: &[u8]) -> Result<Tree, String> {
        let node = serde_json::from_slice(data).map_err(|e| e.to_string())?;
        into_tree(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_json() {
        let tree = JsonCodec
            .decode(br#"{"a": {"b": {"X": 1, "Y": "lol", "z": true}}}"#)
            .unwrap();
        assert_eq!(tree["a"]["b"]["X"], json!(1));
        assert_eq!(tree["a"]["b"]["Y"], json!("lol"));
    }

    #[test]
    fn test_bad_json() {
        assert!(JsonCodec.decode(b"bad").is_err());
        assert!(JsonCodec.decode(b"[1,2]").is_err());
    }
}
